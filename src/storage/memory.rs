// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Process-local user store.
//!
//! Used when no `DATA_DIR` is configured and by the test suite. Records do
//! not survive a restart.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{NewUser, StoreError, StoreResult, UserRecord, UserStore};

/// In-memory user store keyed by external id.
#[derive(Default)]
pub struct InMemoryUserStore {
    users: RwLock<HashMap<String, UserRecord>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored users.
    pub async fn user_count(&self) -> usize {
        self.users.read().await.len()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_external_id(&self, external_id: &str) -> StoreResult<Option<UserRecord>> {
        Ok(self.users.read().await.get(external_id).cloned())
    }

    async fn create(&self, user: NewUser) -> StoreResult<UserRecord> {
        let mut users = self.users.write().await;
        if users.contains_key(&user.external_id) {
            return Err(StoreError::Conflict);
        }
        let record = user.into_record();
        users.insert(record.external_id.clone(), record.clone());
        Ok(record)
    }

    async fn update_email(&self, external_id: &str, email: &str) -> StoreResult<UserRecord> {
        let mut users = self.users.write().await;
        let record = users.get_mut(external_id).ok_or(StoreError::NotFound)?;
        record.email = email.to_string();
        record.updated_at = Utc::now();
        Ok(record.clone())
    }
}
