// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Bearer-token authentication against the TakeYourPills CIAM tenant.
//!
//! ## Auth Flow
//!
//! 1. The web client signs the user in with the identity provider
//! 2. The client sends `Authorization: Bearer <access token>`
//! 3. The server:
//!    - Resolves the signing key from the tenant's JWKS (cached)
//!    - Verifies signature, issuer, audience, expiry
//!    - Extracts:
//!      - `oid` (else `sub`) → external id
//!      - `email`
//!    - Creates or updates the local user keyed by the external id
//!
//! ## Security
//!
//! - Every failure is the same 401; reasons only reach the logs
//! - No clock skew leeway: a token expiring now is expired
//! - The verification algorithm comes from the key, never the token header
//! - Tokens without a usable identity or email never reach the user store

pub mod claims;
pub mod error;
pub mod extractor;
pub mod gate;
pub mod identity;
pub mod jwks;
pub mod middleware;
pub mod reconcile;
pub mod refresher;
pub mod validator;

pub use claims::{AuthenticatedUser, IdTokenClaims, IdentityClaims, TokenClaims};
pub use error::AuthError;
pub use extractor::Auth;
pub use gate::AuthGate;
pub use identity::{extract_email, extract_external_id};
pub use jwks::{select_key, JwksManager, KeySource, ResolvedKey, DEFAULT_CACHE_TTL};
pub use middleware::require_auth;
pub use reconcile::{ReconcileError, UserReconciler};
pub use refresher::KeyRefresher;
pub use validator::{TokenValidator, TrustConfig};
