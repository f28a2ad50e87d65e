// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::middleware::require_auth,
    error::{ErrorBody, ErrorCode, ErrorDetail},
    models::{AuthDiagnostics, CallbackRequest, DiagnosticsResponse, SettingStatus, UserResponse},
    state::AppState,
};

pub mod auth;
pub mod diagnostics;
pub mod health;

pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/api/auth/me", get(auth::me))
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    let mut public = Router::new()
        .route("/api/auth/diagnostics", get(diagnostics::diagnostics))
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness));

    if state.auth.callback_enabled {
        public = public.route("/api/auth/callback", post(auth::callback));
    }

    Router::new()
        .merge(protected)
        .merge(public)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(CorsLayer::permissive())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::me,
        auth::callback,
        diagnostics::diagnostics,
        health::health,
        health::liveness,
        health::readiness
    ),
    components(
        schemas(
            UserResponse,
            CallbackRequest,
            AuthDiagnostics,
            DiagnosticsResponse,
            SettingStatus,
            ErrorBody,
            ErrorDetail,
            ErrorCode,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse,
            health::CheckStatus
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Sign-in reconciliation and the current user"),
        (name = "Health", description = "Liveness and readiness probes")
    )
)]
struct ApiDoc;

/// Registers the `bearer` security scheme used by protected paths.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
