// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Request and response bodies of the REST API. Successful responses are
//! wrapped as `{ "data": ... }`; errors use the envelope in
//! [`crate::error::ErrorBody`].

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::AuthenticatedUser;

// =============================================================================
// Envelope
// =============================================================================

/// Success envelope.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DataResponse<T> {
    pub data: T,
}

impl<T> DataResponse<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

// =============================================================================
// Users
// =============================================================================

/// The caller's local user profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    /// Local user id
    pub id: String,
    pub email: String,
    /// IANA timezone name
    pub timezone: String,
}

impl From<AuthenticatedUser> for UserResponse {
    fn from(user: AuthenticatedUser) -> Self {
        Self {
            id: user.local_id,
            email: user.email,
            timezone: user.timezone,
        }
    }
}

/// Body posted by the web client right after an interactive sign-in.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CallbackRequest {
    /// ID token claims as reported by the browser sign-in library
    /// (`oid` or `sub`, `email`, ...)
    #[serde(default)]
    #[schema(value_type = Object)]
    pub id_token_claims: Option<serde_json::Value>,
}

// =============================================================================
// Diagnostics
// =============================================================================

/// Whether a setting has a value. Values themselves are never reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SettingStatus {
    Configured,
    Missing,
}

impl From<bool> for SettingStatus {
    fn from(present: bool) -> Self {
        if present {
            SettingStatus::Configured
        } else {
            SettingStatus::Missing
        }
    }
}

/// Identity provider configuration as seen by this process.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthDiagnostics {
    pub client_id: SettingStatus,
    pub client_secret: SettingStatus,
    pub tenant_id: SettingStatus,
    pub authority: String,
    pub issuer: String,
    pub jwks_url: String,
    pub jwks_cache_ttl_secs: u64,
    /// Signing keys are cached or could be fetched just now
    pub keys_available: bool,
    pub callback_enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DiagnosticsResponse {
    pub success: bool,
    pub message: String,
    pub config: AuthDiagnostics,
}
