// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Signing Key Refresher
//!
//! Background task that keeps the JWKS cache warm so request-path lookups
//! rarely wait on the provider. Refreshes once at start, then every cache
//! TTL (never more often than [`MIN_REFRESH_INTERVAL`]).
//!
//! A failed refresh is logged and retried on the next tick; requests still
//! fetch on demand in the meantime.
//!
//! ## Shutdown
//!
//! Stops when its `tokio_util::sync::CancellationToken` is cancelled.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::jwks::{JwksManager, MIN_REFRESH_INTERVAL};

/// Periodic JWKS refresher.
pub struct KeyRefresher {
    jwks: Arc<JwksManager>,
    interval: Duration,
}

impl KeyRefresher {
    /// Refresher ticking at the manager's cache TTL.
    pub fn new(jwks: Arc<JwksManager>) -> Self {
        let interval = jwks.cache_ttl().max(MIN_REFRESH_INTERVAL);
        Self { jwks, interval }
    }

    /// Override the tick interval.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run until the cancellation token is triggered.
    ///
    /// ```rust,ignore
    /// tokio::spawn(refresher.run(shutdown.clone()));
    /// ```
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            interval_secs = self.interval.as_secs(),
            jwks_url = %self.jwks.jwks_url(),
            "Signing key refresher starting"
        );

        loop {
            if shutdown.is_cancelled() {
                info!("Signing key refresher shutting down");
                return;
            }

            self.refresh_step().await;

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {},
                _ = shutdown.cancelled() => {
                    info!("Signing key refresher shutting down");
                    return;
                }
            }
        }
    }

    async fn refresh_step(&self) {
        match self.jwks.refresh().await {
            Ok(()) => debug!("Signing keys refreshed"),
            Err(e) => warn!(
                reason = e.reason_code(),
                error = %e,
                "Signing key refresh failed, will retry"
            ),
        }
    }
}
