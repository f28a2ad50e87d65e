// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWT claims and authenticated user representation.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::storage::UserRecord;

/// Audience claim: a single string or an array of strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    One(String),
    Many(Vec<String>),
}

impl Audience {
    /// Whether the given client id is among the audiences.
    pub fn contains(&self, client_id: &str) -> bool {
        match self {
            Audience::One(aud) => aud == client_id,
            Audience::Many(auds) => auds.iter().any(|aud| aud == client_id),
        }
    }
}

/// Verified payload of a CIAM access token.
///
/// Exists only for the duration of one validation; never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject
    #[serde(default)]
    pub sub: Option<String>,

    /// Immutable object id of the user in the tenant
    #[serde(default)]
    pub oid: Option<String>,

    #[serde(default)]
    pub email: Option<String>,

    pub aud: Audience,

    pub iss: String,

    /// Expiration timestamp (epoch seconds)
    pub exp: i64,

    /// Issued at timestamp
    #[serde(default)]
    pub iat: Option<i64>,

    /// Not before timestamp
    #[serde(default)]
    pub nbf: Option<i64>,

    /// Remaining provider-specific claims
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// Client-asserted ID token claims posted after an interactive sign-in.
///
/// Not cryptographically verified; see the callback endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdTokenClaims {
    #[serde(default)]
    pub sub: Option<String>,

    #[serde(default)]
    pub oid: Option<String>,

    #[serde(default)]
    pub email: Option<String>,

    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// Claim sources an external identity and email can be read from.
pub trait IdentityClaims {
    fn object_id(&self) -> Option<&str>;
    fn subject(&self) -> Option<&str>;
    fn email(&self) -> Option<&str>;
}

impl IdentityClaims for TokenClaims {
    fn object_id(&self) -> Option<&str> {
        self.oid.as_deref()
    }

    fn subject(&self) -> Option<&str> {
        self.sub.as_deref()
    }

    fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }
}

impl IdentityClaims for IdTokenClaims {
    fn object_id(&self) -> Option<&str> {
        self.oid.as_deref()
    }

    fn subject(&self) -> Option<&str> {
        self.sub.as_deref()
    }

    fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }
}

/// Authenticated user produced by the gate.
///
/// This is the primary type used by protected handlers to represent the
/// caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatedUser {
    /// Local primary key
    pub local_id: String,
    /// Identity provider's stable identifier
    pub external_id: String,
    pub email: String,
    pub timezone: String,
}

impl From<UserRecord> for AuthenticatedUser {
    fn from(record: UserRecord) -> Self {
        Self {
            local_id: record.id.to_string(),
            external_id: record.external_id,
            email: record.email,
            timezone: record.timezone,
        }
    }
}
