// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! TakeYourPills - Authentication Gateway Service
//!
//! This crate provides the server-side trust boundary of the TakeYourPills
//! medication tracker: bearer tokens issued by the CIAM tenant are verified
//! against its published signing keys and mapped to a local user record.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Token validation, identity extraction, user reconciliation
//! - `storage` - Local user store (redb or in-memory)
//! - `config` - Environment configuration
//! - `logging` - Tracing setup and PII redaction

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod state;
pub mod storage;

#[cfg(test)]
pub(crate) mod test_support;
