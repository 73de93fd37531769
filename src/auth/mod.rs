// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Self-issued session credentials for the payment API.
//!
//! ## Auth Flow
//!
//! 1. Client logs in with email + password (Argon2id verification)
//! 2. Server issues an HS256 access token (minutes) and an opaque refresh
//!    token (days); only the refresh token's SHA-256 digest is stored
//! 3. Client sends `Authorization: Bearer <access token>` on each request
//! 4. Refresh rotates the refresh token; logout revokes it
//!
//! ## Security
//!
//! - Validation is pinned to HS256; any other asserted algorithm is
//!   rejected (no algorithm-confusion path)
//! - All authentication failures produce one uniform 401 body
//! - Refresh tokens never embed identity data

pub mod claims;
pub mod error;
pub mod extractor;
pub mod password;
pub mod tokens;

pub use claims::{AccessClaims, AuthenticatedUser};
pub use error::AuthError;
pub use extractor::Auth;
pub use tokens::{IssuedTokens, SessionTokenManager, TokenConfig, TokenError};
