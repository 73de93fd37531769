// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Access-token claims and the authenticated-user handle.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Claims carried by a signed access token.
///
/// Strongly typed: every field is required, so a token missing a claim
/// fails deserialization instead of surfacing as a runtime lookup miss.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject: the identity id as a UUID string.
    pub sub: String,
    /// Issued-at, Unix seconds.
    pub iat: i64,
    /// Expiry, Unix seconds.
    pub exp: i64,
}

/// The authenticated identity extracted from a validated access token.
///
/// This is the type handlers receive; by the time it exists, the token's
/// signature, algorithm, structure, and expiry have all been checked.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    /// Canonical identity id (the token's `sub` claim).
    pub user_id: Uuid,
}
