// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! The per-request authentication gate.
//!
//! Steps, each short-circuiting on failure:
//!
//! 1. `Authorization` header present and prefixed exactly `"Bearer "`
//! 2. Token validates (signature, issuer, audience, expiry)
//! 3. External id from `oid`, else `sub`
//! 4. Email claim present
//! 5. Local user reconciled
//!
//! Steps 1-4 never touch the user store. Every failure collapses to "not
//! authenticated"; the reason is only logged.

use axum::http::{header::AUTHORIZATION, HeaderMap};
use tracing::{debug, warn};

use super::claims::AuthenticatedUser;
use super::error::AuthError;
use super::identity::{extract_email, extract_external_id};
use super::reconcile::UserReconciler;
use super::validator::TokenValidator;

const BEARER_PREFIX: &str = "Bearer ";

/// Authenticates requests from their headers.
#[derive(Clone)]
pub struct AuthGate {
    validator: TokenValidator,
    reconciler: UserReconciler,
}

impl AuthGate {
    pub fn new(validator: TokenValidator, reconciler: UserReconciler) -> Self {
        Self {
            validator,
            reconciler,
        }
    }

    pub fn validator(&self) -> &TokenValidator {
        &self.validator
    }

    /// Authenticate a request, or `None` for any failure at all.
    pub async fn authenticate(&self, headers: &HeaderMap) -> Option<AuthenticatedUser> {
        match self.try_authenticate(headers).await {
            Ok(user) => Some(user),
            Err(e) => {
                log_failure(&e);
                None
            }
        }
    }

    /// Authenticate a request, keeping the failure reason.
    pub async fn try_authenticate(&self, headers: &HeaderMap) -> Result<AuthenticatedUser, AuthError> {
        let token = bearer_token(headers)?;
        let claims = self.validator.validate(token).await?;

        let external_id = extract_external_id(&claims).ok_or(AuthError::MissingExternalId)?;
        let email = extract_email(&claims).ok_or(AuthError::MissingEmail)?;

        Ok(self.reconciler.reconcile(external_id, email).await?)
    }
}

/// Raw token from the `Authorization` header.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingAuthHeader)?
        .to_str()
        .map_err(|_| AuthError::InvalidAuthHeader)?;

    let token = value
        .strip_prefix(BEARER_PREFIX)
        .ok_or(AuthError::InvalidAuthHeader)?;

    if token.is_empty() {
        return Err(AuthError::EmptyToken);
    }
    Ok(token)
}

fn log_failure(e: &AuthError) {
    match e {
        AuthError::MissingAuthHeader => debug!(reason = e.reason_code(), "Request not authenticated"),
        AuthError::Reconcile(err) => warn!(
            reason = e.reason_code(),
            error = %err,
            "Authentication failed at user reconciliation"
        ),
        _ => warn!(reason = e.reason_code(), error = %e, "Authentication failed"),
    }
}
