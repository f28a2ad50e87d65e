// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractor for authenticated users.
//!
//! Use the `Auth` extractor in handlers to require authentication:
//!
//! ```rust,ignore
//! async fn my_handler(Auth(user): Auth) -> impl IntoResponse {
//!     // user is AuthenticatedUser
//! }
//! ```

use axum::{extract::FromRequestParts, http::request::Parts};

use super::AuthenticatedUser;
use crate::error::ApiError;
use crate::state::AppState;

/// Extractor for authenticated users.
///
/// Reuses the user placed in request extensions by
/// [`require_auth`](super::middleware::require_auth) when present, otherwise
/// runs the gate. Any failure is the uniform 401.
pub struct Auth(pub AuthenticatedUser);

impl FromRequestParts<AppState> for Auth {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<AuthenticatedUser>().cloned() {
            return Ok(Auth(user));
        }

        state
            .gate
            .authenticate(&parts.headers)
            .await
            .map(Auth)
            .ok_or_else(ApiError::unauthorized)
    }
}
