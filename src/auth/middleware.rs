// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication middleware for Axum.
//!
//! Protects a whole router subtree: the gate runs once per request and the
//! resulting [`AuthenticatedUser`] is stored in request extensions, where the
//! [`Auth`](super::Auth) extractor picks it up without re-validating.
//!
//! ```rust,ignore
//! let protected = Router::new()
//!     .route("/me", get(me))
//!     .route_layer(axum::middleware::from_fn_with_state(state.clone(), require_auth));
//! ```

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::error::ApiError;
use crate::state::AppState;

/// Reject unauthenticated requests with the uniform 401.
pub async fn require_auth(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    match state.gate.authenticate(request.headers()).await {
        Some(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        None => ApiError::unauthorized().into_response(),
    }
}
