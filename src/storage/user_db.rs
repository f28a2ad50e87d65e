// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded user database backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `users`: external_id → serialized UserRecord (JSON bytes)
//!
//! The external id is the table key, so the storage layer itself guarantees
//! at most one record per external id. `create` checks and inserts inside a
//! single write transaction; redb admits one writer at a time, so two
//! concurrent first logins cannot both insert.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};

use super::{NewUser, StoreError, StoreResult, UserRecord, UserStore};

/// Primary table: external_id → serialized UserRecord.
const USERS: TableDefinition<&str, &[u8]> = TableDefinition::new("users");

/// File name of the database inside `DATA_DIR`.
pub const USER_DB_FILE: &str = "users.redb";

/// redb-backed [`UserStore`].
#[derive(Clone)]
pub struct UserDatabase {
    db: Arc<Database>,
}

impl UserDatabase {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let db = Database::create(path)?;

        // Pre-create the table so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(USERS)?;
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Open `users.redb` inside the given data directory.
    pub fn open_in_dir(data_dir: &Path) -> StoreResult<Self> {
        Self::open(&data_dir.join(USER_DB_FILE))
    }

    fn get_sync(db: &Database, external_id: &str) -> StoreResult<Option<UserRecord>> {
        let read_txn = db.begin_read()?;
        let table = read_txn.open_table(USERS)?;
        match table.get(external_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    fn insert_sync(db: &Database, user: NewUser) -> StoreResult<UserRecord> {
        let record = user.into_record();
        let json = serde_json::to_vec(&record)?;

        let write_txn = db.begin_write()?;
        {
            let mut table = write_txn.open_table(USERS)?;
            if table.get(record.external_id.as_str())?.is_some() {
                // Dropping the uncommitted transaction aborts it
                return Err(StoreError::Conflict);
            }
            table.insert(record.external_id.as_str(), json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(record)
    }

    fn update_email_sync(db: &Database, external_id: &str, email: &str) -> StoreResult<UserRecord> {
        let write_txn = db.begin_write()?;
        let record = {
            let mut table = write_txn.open_table(USERS)?;

            // Read existing value and deserialize before mutating
            let existing_bytes = {
                let existing = table.get(external_id)?.ok_or(StoreError::NotFound)?;
                existing.value().to_vec()
            };

            let mut record: UserRecord = serde_json::from_slice(&existing_bytes)?;
            record.email = email.to_string();
            record.updated_at = Utc::now();

            let json = serde_json::to_vec(&record)?;
            table.insert(external_id, json.as_slice())?;
            record
        };
        write_txn.commit()?;
        Ok(record)
    }

    /// Run a blocking redb operation off the async executor.
    async fn run<T, F>(&self, op: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Database) -> StoreResult<T> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || op(&db))
            .await
            .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

#[async_trait]
impl UserStore for UserDatabase {
    async fn find_by_external_id(&self, external_id: &str) -> StoreResult<Option<UserRecord>> {
        let external_id = external_id.to_string();
        self.run(move |db| Self::get_sync(db, &external_id)).await
    }

    async fn create(&self, user: NewUser) -> StoreResult<UserRecord> {
        self.run(move |db| Self::insert_sync(db, user)).await
    }

    async fn update_email(&self, external_id: &str, email: &str) -> StoreResult<UserRecord> {
        let external_id = external_id.to_string();
        let email = email.to_string();
        self.run(move |db| Self::update_email_sync(db, &external_id, &email))
            .await
    }
}

// =============================================================================
// Tests
// =============================================================================
