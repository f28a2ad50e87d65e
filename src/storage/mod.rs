// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Local User Store
//!
//! Persistence for the local user record keyed by the identity provider's
//! stable external identifier.
//!
//! ## Contract
//!
//! The authentication core depends on exactly three operations:
//!
//! - `find_by_external_id`
//! - `create` (fails with [`StoreError::Conflict`] if the external id exists)
//! - `update_email`
//!
//! Uniqueness of `external_id` is enforced by each backend, not by callers.
//!
//! ## Backends
//!
//! - [`UserDatabase`] - redb file under `DATA_DIR` (production)
//! - [`InMemoryUserStore`] - process-local map (development, tests)

pub mod memory;
pub mod user_db;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use memory::InMemoryUserStore;
pub use user_db::UserDatabase;

/// Timezone assigned to every newly created user.
pub const DEFAULT_TIMEZONE: &str = "UTC";

/// A persisted local user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserRecord {
    /// Local primary key
    pub id: Uuid,
    /// Identity provider's stable identifier (unique, immutable)
    pub external_id: String,
    /// Most recent email asserted by the provider
    pub email: String,
    /// IANA timezone name
    pub timezone: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for [`UserStore::create`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub external_id: String,
    pub email: String,
    pub timezone: String,
}

impl NewUser {
    /// New user with the default timezone.
    pub fn new(external_id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            external_id: external_id.into(),
            email: email.into(),
            timezone: DEFAULT_TIMEZONE.to_string(),
        }
    }

    pub(crate) fn into_record(self) -> UserRecord {
        let now = Utc::now();
        UserRecord {
            id: Uuid::new_v4(),
            external_id: self.external_id,
            email: self.email,
            timezone: self.timezone,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Error type for user store operations.
///
/// Messages never carry external identifiers or emails.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A user with this external id already exists
    #[error("user with this external id already exists")]
    Conflict,

    /// No user with this external id
    #[error("user not found")]
    NotFound,

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Blocking store task panicked or was cancelled
    #[error("store task failed: {0}")]
    Task(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Create/read/update-by-unique-key access to local users.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Look up a user by external id.
    async fn find_by_external_id(&self, external_id: &str) -> StoreResult<Option<UserRecord>>;

    /// Insert a new user.
    ///
    /// Returns [`StoreError::Conflict`] if the external id is already taken.
    async fn create(&self, user: NewUser) -> StoreResult<UserRecord>;

    /// Replace the stored email of an existing user.
    ///
    /// Returns [`StoreError::NotFound`] if the external id is unknown.
    async fn update_email(&self, external_id: &str, email: &str) -> StoreResult<UserRecord>;
}
