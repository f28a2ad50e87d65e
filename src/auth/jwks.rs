// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWKS (JSON Web Key Set) fetching and caching.
//!
//! ## Freshness
//!
//! - Keys are cached with a configurable TTL and refetched once it lapses
//! - An unknown `kid` forces a refetch (key rotation)
//! - Request-driven fetches (expiry, unknown `kid`, availability probes) are
//!   spaced at least [`MIN_REFRESH_INTERVAL`] apart, failed ones included;
//!   within that window the last known key set is served, even if stale
//! - The cache lock is never held across the HTTP request
//! - Fetch failures surface as [`AuthError::JwksFetch`], never as panics
//!
//! ## Usage
//!
//! Build one `JwksManager` at startup from the authority's discovery URL
//! (`{authority}/discovery/v2.0/keys`) and hand it to the validator as a
//! [`KeySource`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use jsonwebtoken::jwk::{AlgorithmParameters, EllipticCurve, Jwk, JwkSet, KeyAlgorithm, PublicKeyUse};
use jsonwebtoken::{Algorithm, DecodingKey};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::error::AuthError;

/// Default JWKS cache TTL (5 minutes).
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

/// Minimum time between provider requests triggered by traffic.
pub const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(10);

/// HTTP timeout for the discovery request.
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// A verification key together with the algorithm it must be used with.
#[derive(Clone)]
pub struct ResolvedKey {
    pub key: DecodingKey,
    pub algorithm: Algorithm,
}

/// Source of token verification keys.
#[async_trait]
pub trait KeySource: Send + Sync {
    /// Resolve the key for a token's declared key id.
    async fn decoding_key(&self, kid: Option<&str>) -> Result<ResolvedKey, AuthError>;

    /// Whether keys are cached or can be fetched right now.
    async fn is_available(&self) -> bool;
}

/// JWKS cache entry.
struct CacheEntry {
    jwks: JwkSet,
    fetched_at: Instant,
}

#[derive(Default)]
struct CacheState {
    entry: Option<CacheEntry>,
    /// Start of the most recent provider request, successful or not
    last_attempt: Option<Instant>,
}

/// JWKS manager with caching.
#[derive(Clone)]
pub struct JwksManager {
    /// JWKS URL (provider discovery endpoint)
    jwks_url: String,
    /// Cache TTL
    cache_ttl: Duration,
    min_refresh_interval: Duration,
    cache: Arc<RwLock<CacheState>>,
    client: reqwest::Client,
}

impl JwksManager {
    /// Create a new JWKS manager.
    ///
    /// # Arguments
    /// - `jwks_url`: The JWKS endpoint URL (e.g., `https://tenant.ciamlogin.com/<tenant-id>/discovery/v2.0/keys`)
    pub fn new(jwks_url: impl Into<String>) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(FETCH_TIMEOUT).build()?;
        Ok(Self {
            jwks_url: jwks_url.into(),
            cache_ttl: DEFAULT_CACHE_TTL,
            min_refresh_interval: MIN_REFRESH_INTERVAL,
            cache: Arc::new(RwLock::new(CacheState::default())),
            client,
        })
    }

    /// Create with custom cache TTL.
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Override the minimum spacing of traffic-driven fetches.
    pub fn with_min_refresh_interval(mut self, interval: Duration) -> Self {
        self.min_refresh_interval = interval;
        self
    }

    /// Get the JWKS URL.
    pub fn jwks_url(&self) -> &str {
        &self.jwks_url
    }

    pub fn cache_ttl(&self) -> Duration {
        self.cache_ttl
    }

    /// Fetch JWKS (with caching).
    async fn get_jwks(&self) -> Result<JwkSet, AuthError> {
        {
            let cache = self.cache.read().await;
            if let Some(entry) = &cache.entry {
                if entry.fetched_at.elapsed() < self.cache_ttl {
                    return Ok(entry.jwks.clone());
                }
            }
        }

        self.throttled_fetch().await
    }

    /// Fetch from the provider unless an attempt started within the minimum
    /// refresh interval, in which case the current key set (possibly stale)
    /// is returned instead.
    ///
    /// The attempt is stamped before fetching so failures are rate limited
    /// too. The lock is released while the request is in flight.
    async fn throttled_fetch(&self) -> Result<JwkSet, AuthError> {
        {
            let mut cache = self.cache.write().await;
            let attempted_recently = cache
                .last_attempt
                .is_some_and(|at| at.elapsed() < self.min_refresh_interval);
            if attempted_recently {
                debug!("JWKS refetch suppressed, attempted recently");
                return cache
                    .entry
                    .as_ref()
                    .map(|entry| entry.jwks.clone())
                    .ok_or_else(|| {
                        AuthError::JwksFetch(
                            "key fetch attempted recently, retry suppressed".to_string(),
                        )
                    });
            }
            cache.last_attempt = Some(Instant::now());
        }

        let jwks = self.fetch_jwks().await?;
        self.store(jwks.clone()).await;
        Ok(jwks)
    }

    async fn store(&self, jwks: JwkSet) {
        let mut cache = self.cache.write().await;
        cache.entry = Some(CacheEntry {
            jwks,
            fetched_at: Instant::now(),
        });
    }

    /// Fetch JWKS from the endpoint.
    async fn fetch_jwks(&self) -> Result<JwkSet, AuthError> {
        let response = self
            .client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| AuthError::JwksFetch(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AuthError::JwksFetch(format!(
                "HTTP {} from JWKS endpoint",
                response.status()
            )));
        }

        let jwks: JwkSet = response
            .json()
            .await
            .map_err(|e| AuthError::JwksFetch(e.to_string()))?;

        Ok(jwks)
    }

    /// Force refresh the JWKS cache, ignoring the minimum refresh interval.
    ///
    /// Meant for the background refresher, which paces itself.
    pub async fn refresh(&self) -> Result<(), AuthError> {
        self.cache.write().await.last_attempt = Some(Instant::now());
        let jwks = self.fetch_jwks().await?;
        self.store(jwks).await;
        Ok(())
    }

    /// Check if JWKS is currently cached and valid.
    pub async fn is_cached(&self) -> bool {
        let cache = self.cache.read().await;
        cache
            .entry
            .as_ref()
            .is_some_and(|entry| entry.fetched_at.elapsed() < self.cache_ttl)
    }
}

#[async_trait]
impl KeySource for JwksManager {
    async fn decoding_key(&self, kid: Option<&str>) -> Result<ResolvedKey, AuthError> {
        let jwks = self.get_jwks().await?;

        match select_key(&jwks, kid) {
            Err(AuthError::NoMatchingKey) if kid.is_some() => {
                let jwks = self.throttled_fetch().await?;
                let resolved = select_key(&jwks, kid);
                if resolved.is_ok() {
                    info!(keys = jwks.keys.len(), "JWKS refetched after unknown key id");
                }
                resolved
            }
            other => other,
        }
    }

    async fn is_available(&self) -> bool {
        if self.is_cached().await {
            return true;
        }
        match self.throttled_fetch().await {
            Ok(_) => true,
            Err(e) => {
                warn!(reason = e.reason_code(), error = %e, "JWKS unavailable");
                false
            }
        }
    }
}

/// Pick the verification key for a token from a key set.
///
/// With a `kid`, the key must carry that id. Without one, the set must hold
/// exactly one usable key.
pub fn select_key(jwks: &JwkSet, kid: Option<&str>) -> Result<ResolvedKey, AuthError> {
    match kid {
        Some(kid) => {
            let jwk = jwks
                .keys
                .iter()
                .find(|k| k.common.key_id.as_deref() == Some(kid))
                .ok_or(AuthError::NoMatchingKey)?;
            jwk_to_decoding_key(jwk)
        }
        None => {
            let mut usable = jwks.keys.iter().filter_map(|k| jwk_to_decoding_key(k).ok());
            match (usable.next(), usable.next()) {
                (Some(only), None) => Ok(only),
                _ => Err(AuthError::NoMatchingKey),
            }
        }
    }
}

/// Convert a JWK to a DecodingKey.
fn jwk_to_decoding_key(jwk: &Jwk) -> Result<ResolvedKey, AuthError> {
    if matches!(jwk.common.public_key_use, Some(PublicKeyUse::Encryption)) {
        return Err(AuthError::UnsupportedKey("encryption key".to_string()));
    }

    match &jwk.algorithm {
        AlgorithmParameters::RSA(rsa) => {
            let key = DecodingKey::from_rsa_components(&rsa.n, &rsa.e)
                .map_err(|e| AuthError::UnsupportedKey(format!("RSA key: {e}")))?;

            let algorithm = match jwk.common.key_algorithm {
                None | Some(KeyAlgorithm::RS256) => Algorithm::RS256,
                Some(KeyAlgorithm::RS384) => Algorithm::RS384,
                Some(KeyAlgorithm::RS512) => Algorithm::RS512,
                Some(other) => {
                    return Err(AuthError::UnsupportedKey(format!(
                        "RSA key with algorithm {other:?}"
                    )))
                }
            };

            Ok(ResolvedKey { key, algorithm })
        }
        AlgorithmParameters::EllipticCurve(ec) => {
            let key = DecodingKey::from_ec_components(&ec.x, &ec.y)
                .map_err(|e| AuthError::UnsupportedKey(format!("EC key: {e}")))?;

            let algorithm = match (jwk.common.key_algorithm, &ec.curve) {
                (Some(KeyAlgorithm::ES256), _) | (None, EllipticCurve::P256) => Algorithm::ES256,
                (Some(KeyAlgorithm::ES384), _) | (None, EllipticCurve::P384) => Algorithm::ES384,
                _ => {
                    return Err(AuthError::UnsupportedKey(
                        "EC key with unsupported curve or algorithm".to_string(),
                    ))
                }
            };

            Ok(ResolvedKey { key, algorithm })
        }
        _ => Err(AuthError::UnsupportedKey("key type".to_string())),
    }
}
