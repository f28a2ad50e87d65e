// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Fixtures shared by unit tests: signing keys, a token builder, a static
//! key source and an instrumented user store.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Map, Value};
use tokio::sync::Barrier;

use crate::auth::{
    select_key, AuthError, AuthGate, KeySource, ResolvedKey, TokenValidator, TrustConfig,
    UserReconciler,
};
use crate::config::AuthSettings;
use crate::state::AppState;
use crate::storage::{InMemoryUserStore, NewUser, StoreError, StoreResult, UserRecord, UserStore};

pub const TEST_ISSUER: &str = "https://login.example.test/tenant-123";
pub const TEST_AUDIENCE: &str = "client-abc";
pub const TEST_KID: &str = "kid-primary";

pub const TEST_OID: &str = "oid-test-user";
pub const TEST_EMAIL: &str = "user@example.com";

const PRIMARY_KEY_PEM: &str = include_str!("../testdata/signing_key_primary.pem");
const ROGUE_KEY_PEM: &str = include_str!("../testdata/signing_key_rogue.pem");
const EC_KEY_PEM: &str = include_str!("../testdata/signing_key_ec.pem");

const PRIMARY_MODULUS: &str = "lV4dZcoilUqk7WgertqMy1dV0jMSLlk5dyMDS8bfyGeMwJBx4JoC-xdq-Ofl0oVRmBOmXv-w95w6FamdQr6Ob6jw8t-nbmQh06YOgSxlmhA39vjt7-TjGdGVMuqQJ73M9gXqFloI0nNaJKuE2f6QVhSQFmJEOtTonHJSU7klSyVLxGqYlRb3IpysvY09bKXNOhCOqzOwhHFVqoNlUSWGQVww4ikXthJT03wp6AK_NH3AEJiD1sxnrvVinImPc0886CE5LIMwO97SbSGrHYGZBRvLbmlj1x8mfOr--HflX-RDZ476UllrbrKqXRwE6kiDBsRfKjiPefaLHAyTFIvXhQ";
const ROGUE_MODULUS: &str = "tofuBp7ys4WTHdf1jcxM3bAfjOc7DvebiN03jVXKfPIhoXaTeMXC6z4DbDWSEwNAUpHf6VZe3aY0vVB2F8yOD17YbjK08XLtPqyRcdgpYrx-sI25pJUD8zBHhZaeQTMKSJ5NQQ4XgM7hEFLU8g95w6Dznwc6unThoGsBY_EiDHt2nW9lux21UhyGjeYWzxC0S6bOj_XfgWbMrBHpTjfvK5AzEYt3nbtz7GXH_FlsrmucVbWFcffyOOhAwPH0WWiDnN9wlgZ9Cba3HTCDcKVID2cAkvutfnPrWZgyFFgFYgmrNJNycWz1ieY8WAUjQRhSw1EDWLVnqUwjWXB4OKqlSw";
const RSA_EXPONENT: &str = "AQAB";

const EC_X: &str = "fhBtB7T478eVmj4bDiHOGKcuUWTSY-sKORfO8wL7dm4";
const EC_Y: &str = "gEgGHzGz0GRZXmZrJgeBeZ9w0YaDG2ChNCLQiepM_LM";

pub fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

// =============================================================================
// Keys
// =============================================================================

fn rsa_jwk(kid: &str, modulus: &str) -> Value {
    json!({
        "kty": "RSA",
        "use": "sig",
        "alg": "RS256",
        "kid": kid,
        "n": modulus,
        "e": RSA_EXPONENT,
    })
}

/// Public half of the key tokens are normally signed with.
pub fn primary_jwk(kid: &str) -> Value {
    rsa_jwk(kid, PRIMARY_MODULUS)
}

/// Public half of a key the provider never published.
pub fn rogue_jwk(kid: &str) -> Value {
    rsa_jwk(kid, ROGUE_MODULUS)
}

/// Public half of the P-256 test key. No `alg`, so the curve decides.
pub fn ec_jwk(kid: &str) -> Value {
    json!({
        "kty": "EC",
        "use": "sig",
        "crv": "P-256",
        "kid": kid,
        "x": EC_X,
        "y": EC_Y,
    })
}

pub fn jwk_set(keys: Vec<Value>) -> JwkSet {
    serde_json::from_value(json!({ "keys": keys })).expect("valid JWK set")
}

/// Key source backed by a fixed key set.
pub struct StaticKeys {
    jwks: JwkSet,
    available: bool,
}

impl StaticKeys {
    pub fn new(jwks: JwkSet) -> Self {
        Self {
            jwks,
            available: true,
        }
    }

    /// Behaves like an unreachable discovery endpoint.
    pub fn unavailable() -> Self {
        Self {
            jwks: jwk_set(vec![]),
            available: false,
        }
    }
}

#[async_trait]
impl KeySource for StaticKeys {
    async fn decoding_key(&self, kid: Option<&str>) -> Result<ResolvedKey, AuthError> {
        if !self.available {
            return Err(AuthError::JwksFetch("connection refused".to_string()));
        }
        select_key(&self.jwks, kid)
    }

    async fn is_available(&self) -> bool {
        self.available
    }
}

pub fn static_keys() -> Arc<dyn KeySource> {
    Arc::new(StaticKeys::new(jwk_set(vec![primary_jwk(TEST_KID)])))
}

pub fn trust() -> TrustConfig {
    TrustConfig {
        issuer: TEST_ISSUER.to_string(),
        audience: TEST_AUDIENCE.to_string(),
    }
}

pub fn test_validator() -> TokenValidator {
    TokenValidator::new(static_keys(), trust())
}

pub fn test_gate(store: Arc<dyn UserStore>) -> AuthGate {
    AuthGate::new(test_validator(), UserReconciler::new(store))
}

pub fn test_settings() -> AuthSettings {
    AuthSettings {
        client_id: TEST_AUDIENCE.to_string(),
        tenant_id: "tenant-123".to_string(),
        client_secret_set: true,
        authority: TEST_ISSUER.to_string(),
        issuer: TEST_ISSUER.to_string(),
        jwks_url: format!("{TEST_ISSUER}/discovery/v2.0/keys"),
        jwks_cache_ttl: crate::auth::DEFAULT_CACHE_TTL,
        callback_enabled: true,
    }
}

/// Application state wired to static keys and the given store.
pub fn test_state(store: Arc<dyn UserStore>) -> AppState {
    AppState::new(static_keys(), store, test_settings())
}

// =============================================================================
// Tokens
// =============================================================================

/// Builds signed tokens, valid by default for [`TEST_ISSUER`] and
/// [`TEST_AUDIENCE`] with `oid` and `email` set.
pub struct TokenBuilder {
    claims: Map<String, Value>,
    kid: Option<String>,
    key: SigningKey,
}

#[derive(Clone, Copy)]
enum SigningKey {
    Primary,
    Rogue,
    Ec,
}

impl TokenBuilder {
    pub fn new() -> Self {
        let issued = now();
        let mut claims = Map::new();
        claims.insert("oid".into(), json!(TEST_OID));
        claims.insert("email".into(), json!(TEST_EMAIL));
        claims.insert("iss".into(), json!(TEST_ISSUER));
        claims.insert("aud".into(), json!(TEST_AUDIENCE));
        claims.insert("iat".into(), json!(issued));
        claims.insert("exp".into(), json!(issued + 3600));

        Self {
            claims,
            kid: Some(TEST_KID.to_string()),
            key: SigningKey::Primary,
        }
    }

    pub fn oid(self, oid: &str) -> Self {
        self.claim("oid", json!(oid))
    }

    pub fn sub(self, sub: &str) -> Self {
        self.claim("sub", json!(sub))
    }

    pub fn email(self, email: &str) -> Self {
        self.claim("email", json!(email))
    }

    pub fn expires_at(self, exp: i64) -> Self {
        self.claim("exp", json!(exp))
    }

    pub fn claim(mut self, name: &str, value: Value) -> Self {
        self.claims.insert(name.to_string(), value);
        self
    }

    pub fn without(mut self, name: &str) -> Self {
        self.claims.remove(name);
        self
    }

    pub fn kid(mut self, kid: Option<&str>) -> Self {
        self.kid = kid.map(String::from);
        self
    }

    pub fn signed_by_rogue_key(mut self) -> Self {
        self.key = SigningKey::Rogue;
        self
    }

    /// Sign with the P-256 key (ES256) instead of RSA.
    pub fn signed_by_ec_key(mut self) -> Self {
        self.key = SigningKey::Ec;
        self
    }

    pub fn claims(&self) -> Value {
        Value::Object(self.claims.clone())
    }

    pub fn sign(&self) -> String {
        let (key, algorithm) = match self.key {
            SigningKey::Primary => (
                EncodingKey::from_rsa_pem(PRIMARY_KEY_PEM.as_bytes()).expect("valid RSA PEM"),
                Algorithm::RS256,
            ),
            SigningKey::Rogue => (
                EncodingKey::from_rsa_pem(ROGUE_KEY_PEM.as_bytes()).expect("valid RSA PEM"),
                Algorithm::RS256,
            ),
            SigningKey::Ec => (
                EncodingKey::from_ec_pem(EC_KEY_PEM.as_bytes()).expect("valid EC PEM"),
                Algorithm::ES256,
            ),
        };

        let mut header = Header::new(algorithm);
        header.kid = self.kid.clone();

        encode(&header, &self.claims(), &key).expect("token signs")
    }

    /// `Authorization` header value carrying the signed token.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.sign())
    }
}

// =============================================================================
// User store
// =============================================================================

/// User store that counts calls and can simulate outages and races.
pub struct CountingStore {
    inner: InMemoryUserStore,
    finds: AtomicUsize,
    creates: AtomicUsize,
    updates: AtomicUsize,
    offline: AtomicBool,
    create_barrier: Option<Barrier>,
}

impl CountingStore {
    pub fn new() -> Self {
        Self {
            inner: InMemoryUserStore::new(),
            finds: AtomicUsize::new(0),
            creates: AtomicUsize::new(0),
            updates: AtomicUsize::new(0),
            offline: AtomicBool::new(false),
            create_barrier: None,
        }
    }

    /// Hold every `create` until `parties` callers have reached it, so
    /// concurrent first logins all observe "not found" before any insert.
    pub fn with_create_barrier(parties: usize) -> Self {
        Self {
            create_barrier: Some(Barrier::new(parties)),
            ..Self::new()
        }
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Insert a user without counting the call.
    pub async fn seed(&self, external_id: &str, email: &str) -> UserRecord {
        self.inner
            .create(NewUser::new(external_id, email))
            .await
            .expect("seed user")
    }

    pub async fn get(&self, external_id: &str) -> Option<UserRecord> {
        self.inner
            .find_by_external_id(external_id)
            .await
            .expect("in-memory lookup")
    }

    pub async fn user_count(&self) -> usize {
        self.inner.user_count().await
    }

    pub fn finds(&self) -> usize {
        self.finds.load(Ordering::SeqCst)
    }

    pub fn creates(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn updates(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        self.finds() + self.creates() + self.updates()
    }

    fn check_online(&self) -> StoreResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Task("store offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl UserStore for CountingStore {
    async fn find_by_external_id(&self, external_id: &str) -> StoreResult<Option<UserRecord>> {
        self.finds.fetch_add(1, Ordering::SeqCst);
        self.check_online()?;
        self.inner.find_by_external_id(external_id).await
    }

    async fn create(&self, user: NewUser) -> StoreResult<UserRecord> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        self.check_online()?;
        if let Some(barrier) = &self.create_barrier {
            barrier.wait().await;
        }
        self.inner.create(user).await
    }

    async fn update_email(&self, external_id: &str, email: &str) -> StoreResult<UserRecord> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        self.check_online()?;
        self.inner.update_email(external_id, email).await
    }
}
