// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Bearer token validation.
//!
//! Checks, in order: key resolution by `kid`, signature, issuer, audience,
//! expiry (`exp` must be strictly in the future), not-before. The signing
//! algorithm always comes from the resolved key, never from the token.

use std::collections::HashMap;
use std::sync::Arc;

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, decode_header, Validation};
use serde::Deserialize;

use super::claims::{Audience, TokenClaims};
use super::error::AuthError;
use super::jwks::KeySource;

/// Trust parameters for token validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustConfig {
    /// Expected `iss`, compared exactly
    pub issuer: String,
    /// Expected `aud` (the application's client id), compared exactly
    pub audience: String,
}

/// Payload as decoded, before required claims are known to be present.
#[derive(Debug, Deserialize)]
struct RawClaims {
    #[serde(default)]
    sub: Option<String>,
    #[serde(default)]
    oid: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    aud: Option<Audience>,
    #[serde(default)]
    iss: Option<String>,
    #[serde(default)]
    exp: Option<i64>,
    #[serde(default)]
    iat: Option<i64>,
    #[serde(default)]
    nbf: Option<i64>,
    #[serde(flatten)]
    extra: HashMap<String, serde_json::Value>,
}

impl TryFrom<RawClaims> for TokenClaims {
    type Error = AuthError;

    fn try_from(raw: RawClaims) -> Result<Self, Self::Error> {
        Ok(TokenClaims {
            sub: raw.sub,
            oid: raw.oid,
            email: raw.email,
            aud: raw.aud.ok_or_else(|| AuthError::MissingClaim("aud".into()))?,
            iss: raw.iss.ok_or_else(|| AuthError::MissingClaim("iss".into()))?,
            exp: raw.exp.ok_or_else(|| AuthError::MissingClaim("exp".into()))?,
            iat: raw.iat,
            nbf: raw.nbf,
            extra: raw.extra,
        })
    }
}

/// Validates compact JWTs against a key source and trust parameters.
#[derive(Clone)]
pub struct TokenValidator {
    keys: Arc<dyn KeySource>,
    trust: TrustConfig,
}

impl TokenValidator {
    pub fn new(keys: Arc<dyn KeySource>, trust: TrustConfig) -> Self {
        Self { keys, trust }
    }

    pub fn trust(&self) -> &TrustConfig {
        &self.trust
    }

    /// Validate a raw token against the current time.
    pub async fn validate(&self, raw_token: &str) -> Result<TokenClaims, AuthError> {
        self.validate_at(raw_token, chrono::Utc::now().timestamp()).await
    }

    /// Validate a raw token as of `now` (epoch seconds).
    pub async fn validate_at(&self, raw_token: &str, now: i64) -> Result<TokenClaims, AuthError> {
        if raw_token.is_empty() {
            return Err(AuthError::EmptyToken);
        }

        let header = decode_header(raw_token).map_err(|_| AuthError::MalformedToken)?;
        let resolved = self.keys.decoding_key(header.kid.as_deref()).await?;

        if header.alg != resolved.algorithm {
            return Err(AuthError::AlgorithmMismatch);
        }

        let mut validation = Validation::new(resolved.algorithm);
        validation.leeway = 0;
        // Time-based claims are checked below against `now`
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.set_required_spec_claims(&["exp", "iss", "aud"]);
        validation.set_issuer(&[&self.trust.issuer]);
        validation.set_audience(&[&self.trust.audience]);

        let token_data =
            decode::<RawClaims>(raw_token, &resolved.key, &validation).map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature => AuthError::InvalidSignature,
                ErrorKind::InvalidIssuer => AuthError::InvalidIssuer,
                ErrorKind::InvalidAudience => AuthError::InvalidAudience,
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                ErrorKind::ImmatureSignature => AuthError::TokenNotYetValid,
                ErrorKind::InvalidAlgorithm => AuthError::AlgorithmMismatch,
                ErrorKind::MissingRequiredClaim(claim) => AuthError::MissingClaim(claim.clone()),
                _ => AuthError::MalformedToken,
            })?;

        let claims = TokenClaims::try_from(token_data.claims)?;

        if claims.exp <= now {
            return Err(AuthError::TokenExpired);
        }
        if claims.nbf.is_some_and(|nbf| nbf > now) {
            return Err(AuthError::TokenNotYetValid);
        }

        Ok(claims)
    }
}
