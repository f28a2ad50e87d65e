// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User reconciliation.
//!
//! Maps an external identity and email to the local user record:
//!
//! - unknown external id: create with the default timezone
//! - known, email differs: update the email in place
//! - known, email matches: return as-is, no write
//!
//! Two first logins racing for the same external id both reach `create`; the
//! store's uniqueness constraint rejects the loser with
//! [`StoreError::Conflict`], which is recovered by reading the winner's
//! record once.

use std::sync::Arc;

use tracing::{debug, info};

use super::claims::AuthenticatedUser;
use crate::logging::{redact_email, redact_id};
use crate::storage::{NewUser, StoreError, UserRecord, UserStore};

/// Reconciliation failure.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    /// Called without an external id
    #[error("external id is required")]
    MissingExternalId,

    /// Called without an email
    #[error("email is required")]
    MissingEmail,

    /// Persistence failed
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Create-or-update of local users against a [`UserStore`].
#[derive(Clone)]
pub struct UserReconciler {
    store: Arc<dyn UserStore>,
}

impl UserReconciler {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }

    pub async fn reconcile(
        &self,
        external_id: &str,
        email: &str,
    ) -> Result<AuthenticatedUser, ReconcileError> {
        if external_id.is_empty() {
            return Err(ReconcileError::MissingExternalId);
        }
        if email.is_empty() {
            return Err(ReconcileError::MissingEmail);
        }

        let record = match self.store.find_by_external_id(external_id).await? {
            Some(existing) => self.sync_email(existing, email).await?,
            None => self.create_or_adopt(external_id, email).await?,
        };

        Ok(record.into())
    }

    async fn create_or_adopt(&self, external_id: &str, email: &str) -> Result<UserRecord, StoreError> {
        match self.store.create(NewUser::new(external_id, email)).await {
            Ok(created) => {
                info!(
                    user_id = %created.id,
                    external_id = %redact_id(external_id),
                    email = %redact_email(email),
                    "First login, local user created"
                );
                Ok(created)
            }
            Err(StoreError::Conflict) => {
                debug!(
                    external_id = %redact_id(external_id),
                    "User created concurrently, re-reading"
                );
                let existing = self
                    .store
                    .find_by_external_id(external_id)
                    .await?
                    .ok_or(StoreError::NotFound)?;
                self.sync_email(existing, email).await
            }
            Err(e) => Err(e),
        }
    }

    async fn sync_email(&self, existing: UserRecord, email: &str) -> Result<UserRecord, StoreError> {
        if existing.email == email {
            return Ok(existing);
        }

        info!(
            user_id = %existing.id,
            old_email = %redact_email(&existing.email),
            new_email = %redact_email(email),
            "Email changed at identity provider, updating"
        );
        self.store.update_email(&existing.external_id, email).await
    }
}
