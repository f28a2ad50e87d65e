// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication endpoints.
//!
//! - `GET /api/auth/me`: the caller's local profile, behind the gate
//! - `POST /api/auth/callback`: reconciles the user from ID token claims the
//!   web client received from an interactive sign-in
//!
//! The callback does not verify a token. It trusts whatever claims the
//! client posts, so it must only be reachable where that trust holds; set
//! `AUTH_CALLBACK_ENABLED=false` to unmount it.

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde_json::Value;
use tracing::{debug, error};

use crate::auth::{extract_email, extract_external_id, Auth, IdTokenClaims, ReconcileError};
use crate::error::{ApiError, ErrorBody};
use crate::models::{CallbackRequest, DataResponse, UserResponse};
use crate::state::AppState;

const INVALID_CLAIMS_MESSAGE: &str = "Missing required user information in token";

/// Get the current user's profile.
#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "Auth",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Current user", body = DataResponse<UserResponse>),
        (status = 401, description = "Invalid or missing authentication token", body = ErrorBody),
    )
)]
pub async fn me(Auth(user): Auth) -> Json<DataResponse<UserResponse>> {
    Json(DataResponse::new(user.into()))
}

/// Create or update the local user after an interactive sign-in.
///
/// Claims are client-asserted and not cryptographically verified.
#[utoipa::path(
    post,
    path = "/api/auth/callback",
    tag = "Auth",
    request_body = CallbackRequest,
    responses(
        (status = 200, description = "User created or updated", body = DataResponse<UserResponse>),
        (status = 400, description = "Missing or invalid claims, or malformed body", body = ErrorBody),
        (status = 500, description = "User store failure", body = ErrorBody),
    )
)]
pub async fn callback(
    State(state): State<AppState>,
    payload: Result<Json<CallbackRequest>, JsonRejection>,
) -> Result<Json<DataResponse<UserResponse>>, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        debug!(error = %rejection.body_text(), "Rejected callback body");
        ApiError::invalid_request_body("Request body must be a JSON object")
    })?;

    let raw_claims = request
        .id_token_claims
        .and_then(non_blank)
        .ok_or_else(|| ApiError::missing_token_claims("ID token claims are required"))?;

    let claims: IdTokenClaims = serde_json::from_value(raw_claims)
        .map_err(|_| ApiError::invalid_token_claims(INVALID_CLAIMS_MESSAGE))?;

    let external_id = extract_external_id(&claims)
        .ok_or_else(|| ApiError::invalid_token_claims(INVALID_CLAIMS_MESSAGE))?;
    let email =
        extract_email(&claims).ok_or_else(|| ApiError::invalid_token_claims(INVALID_CLAIMS_MESSAGE))?;

    let user = state
        .reconciler
        .reconcile(external_id, email)
        .await
        .map_err(|e| match e {
            ReconcileError::Store(err) => {
                error!(error = %err, "User creation/update failed");
                ApiError::database_error("Failed to create or update user record")
            }
            ReconcileError::MissingExternalId | ReconcileError::MissingEmail => {
                ApiError::invalid_token_claims(INVALID_CLAIMS_MESSAGE)
            }
        })?;

    Ok(Json(DataResponse::new(user.into())))
}

/// `null`, `false`, `0` and `""` count as no claims at all.
fn non_blank(value: Value) -> Option<Value> {
    let blank = match &value {
        Value::Null | Value::Bool(false) => true,
        Value::String(s) => s.is_empty(),
        Value::Number(n) => n.as_f64() == Some(0.0),
        _ => false,
    };
    (!blank).then_some(value)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
        Router,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::api::router;
    use crate::test_support::{test_state, CountingStore, TokenBuilder};

    fn app(store: &Arc<CountingStore>) -> Router {
        router(test_state(store.clone()))
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn me_request(authorization: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri("/api/auth/me");
        if let Some(value) = authorization {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        builder.body(Body::empty()).unwrap()
    }

    fn callback_request(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/auth/callback")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn me_without_token_is_uniform_401() {
        let store = Arc::new(CountingStore::new());

        for authorization in [None, Some("Basic abc"), Some("Bearer garbage")] {
            let (status, body) = send(app(&store), me_request(authorization)).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED);
            assert_eq!(
                body,
                json!({ "error": {
                    "code": "UNAUTHORIZED",
                    "message": "Invalid or missing authentication token"
                }})
            );
        }
        assert_eq!(store.total_calls(), 0);
    }

    #[tokio::test]
    async fn me_returns_profile() {
        let store = Arc::new(CountingStore::new());
        let token = TokenBuilder::new().oid("oid-me").email("me@example.com").bearer();

        let (status, body) = send(app(&store), me_request(Some(&token))).await;

        assert_eq!(status, StatusCode::OK);
        let created = store.get("oid-me").await.unwrap();
        assert_eq!(
            body,
            json!({ "data": {
                "id": created.id.to_string(),
                "email": "me@example.com",
                "timezone": "UTC"
            }})
        );
    }

    #[tokio::test]
    async fn me_with_expired_token_is_401() {
        let store = Arc::new(CountingStore::new());
        let token = TokenBuilder::new()
            .expires_at(crate::test_support::now() - 60)
            .bearer();

        let (status, _) = send(app(&store), me_request(Some(&token))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn callback_creates_user() {
        let store = Arc::new(CountingStore::new());

        let (status, body) = send(
            app(&store),
            callback_request(r#"{"idTokenClaims":{"sub":"abc","email":"a@b.com"}}"#),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["email"], "a@b.com");
        assert_eq!(body["data"]["timezone"], "UTC");
        let created = store.get("abc").await.unwrap();
        assert_eq!(body["data"]["id"], created.id.to_string());
    }

    #[tokio::test]
    async fn callback_without_claims_object() {
        let store = Arc::new(CountingStore::new());

        for payload in [
            "{}",
            r#"{"idTokenClaims":null}"#,
            r#"{"idTokenClaims":false}"#,
            r#"{"idTokenClaims":""}"#,
            r#"{"idTokenClaims":0}"#,
        ] {
            let (status, body) = send(app(&store), callback_request(payload)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{payload}");
            assert_eq!(body["error"]["code"], "MISSING_TOKEN_CLAIMS");
        }
        assert_eq!(store.total_calls(), 0);
    }

    #[tokio::test]
    async fn callback_with_incomplete_claims() {
        let store = Arc::new(CountingStore::new());

        for payload in [
            r#"{"idTokenClaims":{"sub":"abc"}}"#,
            r#"{"idTokenClaims":{"email":"a@b.com"}}"#,
            r#"{"idTokenClaims":{"sub":"","email":"a@b.com"}}"#,
            r#"{"idTokenClaims":"not-an-object"}"#,
        ] {
            let (status, body) = send(app(&store), callback_request(payload)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{payload}");
            assert_eq!(body["error"]["code"], "INVALID_TOKEN_CLAIMS");
        }
        assert_eq!(store.total_calls(), 0);
    }

    #[tokio::test]
    async fn callback_with_malformed_body() {
        let store = Arc::new(CountingStore::new());

        let (status, body) = send(app(&store), callback_request("{not json")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "INVALID_REQUEST_BODY");
    }

    #[tokio::test]
    async fn callback_store_failure_is_500() {
        let store = Arc::new(CountingStore::new());
        store.set_offline(true);

        let (status, body) = send(
            app(&store),
            callback_request(r#"{"idTokenClaims":{"oid":"abc","email":"a@b.com"}}"#),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["code"], "DATABASE_ERROR");
    }

    #[tokio::test]
    async fn callback_updates_changed_email() {
        let store = Arc::new(CountingStore::new());
        let seeded = store.seed("abc", "old@b.com").await;

        let (status, body) = send(
            app(&store),
            callback_request(r#"{"idTokenClaims":{"oid":"abc","email":"new@b.com"}}"#),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["id"], seeded.id.to_string());
        assert_eq!(body["data"]["email"], "new@b.com");
        assert_eq!(store.updates(), 1);
    }

    #[tokio::test]
    async fn callback_and_gate_resolve_the_same_user() {
        let store = Arc::new(CountingStore::new());

        let (_, created) = send(
            app(&store),
            callback_request(r#"{"idTokenClaims":{"oid":"oid-9","sub":"pairwise-sub","email":"p@b.com"}}"#),
        )
        .await;

        let token = TokenBuilder::new()
            .oid("oid-9")
            .sub("pairwise-sub")
            .email("p@b.com")
            .bearer();
        let (_, me) = send(app(&store), me_request(Some(&token))).await;

        assert_eq!(created["data"]["id"], me["data"]["id"]);
        assert_eq!(store.user_count().await, 1);
    }

    #[tokio::test]
    async fn callback_can_be_disabled() {
        let store = Arc::new(CountingStore::new());
        let mut state = test_state(store.clone());
        let mut settings = (*state.auth).clone();
        settings.callback_enabled = false;
        state.auth = Arc::new(settings);

        let (status, _) = send(
            router(state),
            callback_request(r#"{"idTokenClaims":{"sub":"abc","email":"a@b.com"}}"#),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(store.total_calls(), 0);
    }
}
