// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::auth::{AuthGate, KeySource, TokenValidator, TrustConfig, UserReconciler};
use crate::config::AuthSettings;
use crate::storage::UserStore;

/// Shared application state.
///
/// Built once at startup; every collaborator is injected here rather than
/// reached through globals.
#[derive(Clone)]
pub struct AppState {
    /// Per-request authentication
    pub gate: Arc<AuthGate>,
    /// Direct reconciliation for the sign-in callback
    pub reconciler: UserReconciler,
    /// Signing key source, probed by health and diagnostics
    pub keys: Arc<dyn KeySource>,
    pub auth: Arc<AuthSettings>,
}

impl AppState {
    pub fn new(keys: Arc<dyn KeySource>, store: Arc<dyn UserStore>, auth: AuthSettings) -> Self {
        let trust = TrustConfig {
            issuer: auth.issuer.clone(),
            audience: auth.client_id.clone(),
        };
        let reconciler = UserReconciler::new(store);
        let validator = TokenValidator::new(keys.clone(), trust);

        Self {
            gate: Arc::new(AuthGate::new(validator, reconciler.clone())),
            reconciler,
            keys,
            auth: Arc::new(auth),
        }
    }
}
