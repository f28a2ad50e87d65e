// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Identity provider configuration self-check.
//!
//! Reports which settings are present and whether signing keys can be
//! obtained. Setting values that are secrets are never echoed back.

use axum::{extract::State, http::StatusCode, Json};

use crate::models::{AuthDiagnostics, DiagnosticsResponse, SettingStatus};
use crate::state::AppState;

/// Check the identity provider configuration.
#[utoipa::path(
    get,
    path = "/api/auth/diagnostics",
    tag = "Auth",
    responses(
        (status = 200, description = "Configuration is usable", body = DiagnosticsResponse),
        (status = 500, description = "Signing keys cannot be obtained", body = DiagnosticsResponse),
    )
)]
pub async fn diagnostics(State(state): State<AppState>) -> (StatusCode, Json<DiagnosticsResponse>) {
    let auth = &state.auth;
    let keys_available = state.keys.is_available().await;

    let config = AuthDiagnostics {
        client_id: SettingStatus::from(!auth.client_id.is_empty()),
        client_secret: SettingStatus::from(auth.client_secret_set),
        tenant_id: SettingStatus::from(!auth.tenant_id.is_empty()),
        authority: auth.authority.clone(),
        issuer: auth.issuer.clone(),
        jwks_url: auth.jwks_url.clone(),
        jwks_cache_ttl_secs: auth.jwks_cache_ttl.as_secs(),
        keys_available,
        callback_enabled: auth.callback_enabled,
    };

    if keys_available {
        (
            StatusCode::OK,
            Json(DiagnosticsResponse {
                success: true,
                message: "Identity provider configuration is valid".to_string(),
                config,
            }),
        )
    } else {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(DiagnosticsResponse {
                success: false,
                message: "Signing keys could not be fetched from the identity provider".to_string(),
                config,
            }),
        )
    }
}
