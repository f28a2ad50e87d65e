// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! External identity extraction.
//!
//! The `oid` claim is immutable for a user within the tenant, while `sub` is
//! pairwise and may be reused, so `oid` wins whenever both are present.

use super::claims::IdentityClaims;

/// Derive the stable external identifier from claims.
///
/// Prefers `oid`, falls back to `sub`. Empty strings count as absent.
pub fn extract_external_id<C: IdentityClaims + ?Sized>(claims: &C) -> Option<&str> {
    non_empty(claims.object_id()).or_else(|| non_empty(claims.subject()))
}

/// Email claim, with empty strings treated as absent.
pub fn extract_email<C: IdentityClaims + ?Sized>(claims: &C) -> Option<&str> {
    non_empty(claims.email())
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}
