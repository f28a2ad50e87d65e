// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is read from the environment once at startup into a typed
//! [`AppConfig`]. A missing or malformed required value fails startup; it is
//! never deferred to request time.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `AZURE_CLIENT_ID` | Application client id, the required token audience | Required |
//! | `AZURE_TENANT_ID` | CIAM tenant id | Required |
//! | `AZURE_CLIENT_SECRET` | Confidential client secret (presence only) | Optional |
//! | `AUTH_AUTHORITY_HOST` | CIAM authority host | `https://omotorciam.ciamlogin.com` |
//! | `AUTH_ISSUER` | Expected JWT issuer claim | Authority URL |
//! | `AUTH_JWKS_URL` | JWKS endpoint | `{authority}/discovery/v2.0/keys` |
//! | `JWKS_CACHE_TTL_SECS` | Key set cache lifetime | `300` |
//! | `AUTH_CALLBACK_ENABLED` | Mount `POST /api/auth/callback` | `true` |
//! | `DATA_DIR` | Directory of the user database | In-memory store |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `TLS_CERT_PATH` / `TLS_KEY_PATH` | PEM certificate chain and key | Plain HTTP |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::logging::LogFormat;

pub const AZURE_CLIENT_ID_ENV: &str = "AZURE_CLIENT_ID";
pub const AZURE_TENANT_ID_ENV: &str = "AZURE_TENANT_ID";
pub const AZURE_CLIENT_SECRET_ENV: &str = "AZURE_CLIENT_SECRET";
pub const AUTH_AUTHORITY_HOST_ENV: &str = "AUTH_AUTHORITY_HOST";
pub const AUTH_ISSUER_ENV: &str = "AUTH_ISSUER";
pub const AUTH_JWKS_URL_ENV: &str = "AUTH_JWKS_URL";
pub const JWKS_CACHE_TTL_ENV: &str = "JWKS_CACHE_TTL_SECS";
pub const AUTH_CALLBACK_ENABLED_ENV: &str = "AUTH_CALLBACK_ENABLED";

/// Directory holding `users.redb`. Unset selects the in-memory store.
pub const DATA_DIR_ENV: &str = "DATA_DIR";

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const TLS_CERT_PATH_ENV: &str = "TLS_CERT_PATH";
pub const TLS_KEY_PATH_ENV: &str = "TLS_KEY_PATH";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_AUTHORITY_HOST: &str = "https://omotorciam.ciamlogin.com";
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;

/// Path of the key discovery document relative to the authority.
pub const JWKS_PATH: &str = "discovery/v2.0/keys";

/// Configuration error raised at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("required environment variable {0} is not set")]
    Missing(&'static str),

    #[error("environment variable {var} is invalid: {reason}")]
    Invalid { var: &'static str, reason: String },

    #[error("environment variable {var} is not a valid URL: {source}")]
    InvalidUrl {
        var: &'static str,
        #[source]
        source: url::ParseError,
    },
}

/// Identity provider trust settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSettings {
    pub client_id: String,
    pub tenant_id: String,
    /// Only whether a secret is configured; the value itself is not kept
    pub client_secret_set: bool,
    /// `{authority host}/{tenant id}`
    pub authority: String,
    pub issuer: String,
    pub jwks_url: String,
    pub jwks_cache_ttl: Duration,
    pub callback_enabled: bool,
}

/// TLS certificate and key locations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsPaths {
    pub cert: PathBuf,
    pub key: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub tls: Option<TlsPaths>,
}

impl ServerSettings {
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                var: HOST_ENV,
                reason: e.to_string(),
            })
    }
}

/// Complete process configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub auth: AuthSettings,
    pub server: ServerSettings,
    pub data_dir: Option<PathBuf>,
    pub log_format: LogFormat,
}

impl AppConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load from an arbitrary variable lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let require = |name: &'static str| get(name).ok_or(ConfigError::Missing(name));

        let client_id = require(AZURE_CLIENT_ID_ENV)?;
        let tenant_id = require(AZURE_TENANT_ID_ENV)?;
        let client_secret_set = get(AZURE_CLIENT_SECRET_ENV).is_some();

        let authority_host =
            get(AUTH_AUTHORITY_HOST_ENV).unwrap_or_else(|| DEFAULT_AUTHORITY_HOST.to_string());
        let authority = authority_url(&authority_host, &tenant_id)?;

        let issuer = get(AUTH_ISSUER_ENV).unwrap_or_else(|| authority.clone());

        let jwks_url = match get(AUTH_JWKS_URL_ENV) {
            Some(url) => {
                Url::parse(&url).map_err(|source| ConfigError::InvalidUrl {
                    var: AUTH_JWKS_URL_ENV,
                    source,
                })?;
                url
            }
            None => format!("{authority}/{JWKS_PATH}"),
        };

        let jwks_cache_ttl = match get(JWKS_CACHE_TTL_ENV) {
            Some(raw) => Duration::from_secs(parse_number(JWKS_CACHE_TTL_ENV, &raw)?),
            None => crate::auth::DEFAULT_CACHE_TTL,
        };

        let callback_enabled = match get(AUTH_CALLBACK_ENABLED_ENV) {
            Some(raw) => parse_bool(AUTH_CALLBACK_ENABLED_ENV, &raw)?,
            None => true,
        };

        let port = match get(PORT_ENV) {
            Some(raw) => parse_number(PORT_ENV, &raw)?,
            None => DEFAULT_PORT,
        };

        let tls = match (get(TLS_CERT_PATH_ENV), get(TLS_KEY_PATH_ENV)) {
            (Some(cert), Some(key)) => Some(TlsPaths {
                cert: PathBuf::from(cert),
                key: PathBuf::from(key),
            }),
            (None, None) => None,
            (Some(_), None) => return Err(ConfigError::Missing(TLS_KEY_PATH_ENV)),
            (None, Some(_)) => return Err(ConfigError::Missing(TLS_CERT_PATH_ENV)),
        };

        let log_format = match get(LOG_FORMAT_ENV) {
            Some(raw) => raw.parse::<LogFormat>().map_err(|e| ConfigError::Invalid {
                var: LOG_FORMAT_ENV,
                reason: e.to_string(),
            })?,
            None => LogFormat::default(),
        };

        Ok(Self {
            auth: AuthSettings {
                client_id,
                tenant_id,
                client_secret_set,
                authority,
                issuer,
                jwks_url,
                jwks_cache_ttl,
                callback_enabled,
            },
            server: ServerSettings {
                host: get(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string()),
                port,
                tls,
            },
            data_dir: get(DATA_DIR_ENV).map(PathBuf::from),
            log_format,
        })
    }
}

/// Join host and tenant into the authority URL, without a trailing slash.
fn authority_url(host: &str, tenant_id: &str) -> Result<String, ConfigError> {
    let authority = format!(
        "{}/{}",
        host.trim_end_matches('/'),
        tenant_id.trim_matches('/')
    );
    let parsed = Url::parse(&authority).map_err(|source| ConfigError::InvalidUrl {
        var: AUTH_AUTHORITY_HOST_ENV,
        source,
    })?;
    if !matches!(parsed.scheme(), "https" | "http") {
        return Err(ConfigError::Invalid {
            var: AUTH_AUTHORITY_HOST_ENV,
            reason: format!("unsupported scheme '{}'", parsed.scheme()),
        });
    }
    Ok(authority)
}

fn parse_number<T: std::str::FromStr>(var: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
        var,
        reason: e.to_string(),
    })
}

fn parse_bool(var: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::Invalid {
            var,
            reason: format!("expected a boolean, got '{other}'"),
        }),
    }
}
