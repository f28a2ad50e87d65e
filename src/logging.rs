// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Tracing setup and PII redaction helpers.
//!
//! External identifiers and emails are personal data; log them only through
//! [`redact_id`] and [`redact_email`]. Raw tokens are never logged.

use std::fmt;
use std::str::FromStr;

use tracing_subscriber::{fmt as fmt_layer, prelude::*, EnvFilter};

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

/// Output format for log lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

/// Unrecognised `LOG_FORMAT` value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownLogFormat(pub String);

impl fmt::Display for UnknownLogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown log format '{}' (expected 'json' or 'pretty')", self.0)
    }
}

impl std::error::Error for UnknownLogFormat {}

impl FromStr for LogFormat {
    type Err = UnknownLogFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" | "text" => Ok(LogFormat::Pretty),
            _ => Err(UnknownLogFormat(s.to_string())),
        }
    }
}

/// Install the global tracing subscriber.
///
/// Call once, before anything logs.
pub fn init_tracing(format: LogFormat) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let registry = tracing_subscriber::registry().with(env_filter);

    match format {
        LogFormat::Json => registry
            .with(
                fmt_layer::layer()
                    .with_target(true)
                    .with_ansi(false)
                    .json(),
            )
            .init(),
        LogFormat::Pretty => registry.with(fmt_layer::layer().with_target(true)).init(),
    }
}

/// Redact an external identifier, keeping the first four characters.
pub fn redact_id(id: &str) -> String {
    let mut chars = id.chars();
    let prefix: String = chars.by_ref().take(4).collect();
    if chars.next().is_none() {
        "*".repeat(prefix.chars().count())
    } else {
        format!("{prefix}***")
    }
}

/// Redact an email, keeping the first character of the local part and the
/// full domain.
pub fn redact_email(email: &str) -> String {
    match email.split_once('@') {
        Some((local, domain)) => match local.chars().next() {
            Some(first) => format!("{first}***@{domain}"),
            None => format!("@{domain}"),
        },
        None => "***".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_log_format() {
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("Pretty".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert!("xml".parse::<LogFormat>().is_err());
        assert_eq!(LogFormat::default(), LogFormat::Pretty);
    }

    #[test]
    fn ids_keep_short_prefix() {
        assert_eq!(redact_id("00000000-aaaa-bbbb"), "0000***");
        assert_eq!(redact_id("abcd"), "****");
        assert_eq!(redact_id("ab"), "**");
        assert_eq!(redact_id(""), "");
    }

    #[test]
    fn emails_keep_domain() {
        assert_eq!(redact_email("patient@example.com"), "p***@example.com");
        assert_eq!(redact_email("@example.com"), "@example.com");
        assert_eq!(redact_email("not-an-email"), "***");
    }
}
