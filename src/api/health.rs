// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::state::AppState;

/// Status of a single component, or of the service as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Ok,
    Degraded,
    Unavailable,
}

/// Readiness report for the gate's dependencies.
#[derive(Debug, Serialize, ToSchema)]
pub struct ReadyResponse {
    /// `ok` when every check passes, `degraded` otherwise.
    pub status: CheckStatus,
    pub checks: HealthChecks,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthChecks {
    pub service: CheckStatus,
    /// Whether the provider's signing key set can be obtained.
    pub jwks: CheckStatus,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: CheckStatus,
}

impl ReadyResponse {
    fn from_jwks(jwks_ok: bool) -> (StatusCode, Self) {
        if jwks_ok {
            let body = Self {
                status: CheckStatus::Ok,
                checks: HealthChecks {
                    service: CheckStatus::Ok,
                    jwks: CheckStatus::Ok,
                },
            };
            (StatusCode::OK, body)
        } else {
            let body = Self {
                status: CheckStatus::Degraded,
                checks: HealthChecks {
                    service: CheckStatus::Ok,
                    jwks: CheckStatus::Unavailable,
                },
            };
            (StatusCode::SERVICE_UNAVAILABLE, body)
        }
    }
}

/// Reports whether bearer tokens can currently be verified.
///
/// No request can authenticate without signing keys, so a missing key set
/// turns the service `degraded` and answers 503.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Signing keys available", body = ReadyResponse),
        (status = 503, description = "Signing keys unavailable", body = ReadyResponse)
    )
)]
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    let (status, body) = ReadyResponse::from_jwks(state.keys.is_available().await);
    (status, Json(body))
}

/// Liveness probe. Never touches the key resolver or the store.
#[utoipa::path(
    get,
    path = "/health/live",
    tag = "Health",
    responses(
        (status = 200, description = "Process is running", body = HealthResponse)
    )
)]
pub async fn liveness() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: CheckStatus::Ok,
    })
}

/// Readiness probe; same checks as `/health`.
#[utoipa::path(
    get,
    path = "/health/ready",
    tag = "Health",
    responses(
        (status = 200, description = "Ready to authenticate requests", body = ReadyResponse),
        (status = 503, description = "Not ready", body = ReadyResponse)
    )
)]
pub async fn readiness(state: State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    health(state).await
}
