// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Password hashing (Argon2id) and complexity validation.
//!
//! Hashes use the PHC string format, so parameters and salt travel with
//! the hash and verification needs no configuration.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

/// Password complexity violations, one variant per rule.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum PasswordPolicyError {
    #[error("password must be at least 8 characters")]
    TooShort,

    #[error("password must be at most 64 characters")]
    TooLong,

    #[error("password may only contain printable ASCII characters")]
    InvalidCharacters,

    #[error("password must contain at least one special character")]
    MissingSpecial,

    #[error("password must contain at least one upper case character")]
    MissingUpperCase,

    #[error("password must contain at least one lower case character")]
    MissingLowerCase,

    #[error("password must contain at least one digit")]
    MissingDigit,
}

/// Hashing/verification failures (malformed stored hash, parameter errors).
#[derive(Debug, thiserror::Error)]
#[error("password hashing error: {0}")]
pub struct PasswordHashError(String);

const SPECIAL: &str = "!@#$%^&*()-_=+[]{};:,.<>?/|\\`~";

/// Validate a candidate password against the complexity rules.
pub fn validate_password(password: &str) -> Result<(), PasswordPolicyError> {
    if password.len() < 8 {
        return Err(PasswordPolicyError::TooShort);
    }
    if password.len() > 64 {
        return Err(PasswordPolicyError::TooLong);
    }

    let (mut special, mut upper, mut lower, mut digit) = (0u32, 0u32, 0u32, 0u32);
    for ch in password.chars() {
        if !ch.is_ascii() || ch.is_ascii_control() {
            return Err(PasswordPolicyError::InvalidCharacters);
        }
        match ch {
            c if SPECIAL.contains(c) => special += 1,
            c if c.is_ascii_uppercase() => upper += 1,
            c if c.is_ascii_lowercase() => lower += 1,
            c if c.is_ascii_digit() => digit += 1,
            _ => {}
        }
    }

    if special < 1 {
        return Err(PasswordPolicyError::MissingSpecial);
    }
    if upper < 1 {
        return Err(PasswordPolicyError::MissingUpperCase);
    }
    if lower < 1 {
        return Err(PasswordPolicyError::MissingLowerCase);
    }
    if digit < 1 {
        return Err(PasswordPolicyError::MissingDigit);
    }

    Ok(())
}

/// Hash a password with Argon2id and a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, PasswordHashError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PasswordHashError(e.to_string()))
}

/// Verify a password against a stored PHC-format hash.
///
/// Returns `Ok(false)` for a wrong password; errors only for a hash that
/// cannot be parsed or verified structurally.
pub fn verify_password(password: &str, stored_hash: &str) -> Result<bool, PasswordHashError> {
    let parsed = PasswordHash::new(stored_hash).map_err(|e| PasswordHashError(e.to_string()))?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordHashError(e.to_string())),
    }
}
