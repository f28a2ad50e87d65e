// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors.
//!
//! Every variant is an internal diagnostic reason. Callers of the gate only
//! ever see the uniform 401 produced by [`IntoResponse`]; the reason code is
//! for logs.

use axum::response::{IntoResponse, Response};

use super::reconcile::ReconcileError;
use crate::error::ApiError;

/// Authentication failure reason.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No authorization header present
    #[error("Authorization header is required")]
    MissingAuthHeader,

    /// Header is not `Bearer <token>`
    #[error("Invalid authorization header format (expected 'Bearer <token>')")]
    InvalidAuthHeader,

    /// `Bearer ` prefix with nothing after it
    #[error("Bearer token is empty")]
    EmptyToken,

    /// Token is not a well-formed compact JWT
    #[error("Token is malformed")]
    MalformedToken,

    /// Token signature does not verify
    #[error("Token signature is invalid")]
    InvalidSignature,

    /// Header algorithm differs from the signing key's algorithm
    #[error("Token algorithm does not match the signing key")]
    AlgorithmMismatch,

    /// Token issuer is not the configured authority
    #[error("Token issuer is invalid")]
    InvalidIssuer,

    /// Token audience is not the configured client id
    #[error("Token audience is invalid")]
    InvalidAudience,

    /// Token expired (exp <= now)
    #[error("Token has expired")]
    TokenExpired,

    /// Token is not yet valid (nbf > now)
    #[error("Token is not yet valid")]
    TokenNotYetValid,

    /// A required registered claim is absent
    #[error("Token is missing required claim `{0}`")]
    MissingClaim(String),

    /// JWKS fetch failed
    #[error("Failed to fetch JWKS: {0}")]
    JwksFetch(String),

    /// No matching key in JWKS
    #[error("No matching key found in JWKS")]
    NoMatchingKey,

    /// Key in JWKS cannot be used for verification
    #[error("Unsupported key in JWKS: {0}")]
    UnsupportedKey(String),

    /// Neither `oid` nor `sub` present
    #[error("Token claims missing user id (oid or sub)")]
    MissingExternalId,

    /// No `email` claim
    #[error("Token claims missing email")]
    MissingEmail,

    /// User reconciliation failed
    #[error("User reconciliation failed: {0}")]
    Reconcile(#[from] ReconcileError),
}

impl AuthError {
    /// Stable reason code for diagnostics.
    pub fn reason_code(&self) -> &'static str {
        match self {
            AuthError::MissingAuthHeader => "missing_auth_header",
            AuthError::InvalidAuthHeader => "invalid_auth_header",
            AuthError::EmptyToken => "empty_token",
            AuthError::MalformedToken => "malformed_token",
            AuthError::InvalidSignature => "invalid_signature",
            AuthError::AlgorithmMismatch => "algorithm_mismatch",
            AuthError::InvalidIssuer => "invalid_issuer",
            AuthError::InvalidAudience => "invalid_audience",
            AuthError::TokenExpired => "token_expired",
            AuthError::TokenNotYetValid => "token_not_yet_valid",
            AuthError::MissingClaim(_) => "missing_claim",
            AuthError::JwksFetch(_) => "jwks_fetch_error",
            AuthError::NoMatchingKey => "no_matching_key",
            AuthError::UnsupportedKey(_) => "unsupported_key",
            AuthError::MissingExternalId => "missing_external_id",
            AuthError::MissingEmail => "missing_email",
            AuthError::Reconcile(_) => "reconcile_failed",
        }
    }

    /// Whether the failure happened before any user store access.
    pub fn is_pre_store(&self) -> bool {
        !matches!(self, AuthError::Reconcile(_))
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        ApiError::unauthorized().into_response()
    }
}
