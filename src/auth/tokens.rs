// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session token lifecycle: issue, refresh, revoke, validate.
//!
//! Two credentials per session:
//!
//! - **Access token**: HS256-signed JWT with typed claims, short lifetime
//!   (minutes). Self-contained; validated on every request.
//! - **Refresh token**: 32 random bytes, hex-encoded, opaque. Only its
//!   SHA-256 digest is persisted, with a long expiry (days). Exchanging it
//!   rotates it: the presented token's row is replaced by a fresh one in
//!   the same write transaction, so a replayed old token fails lookup.
//!
//! Validation is pinned to the HS256 family; a token asserting any other
//! algorithm (including `none`) is rejected regardless of its signature.

use std::sync::Arc;

use base64ct::{Base64, Encoding};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use ring::rand::{SecureRandom, SystemRandom};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::claims::AccessClaims;
use crate::storage::{SessionRepository, Store, StoreError};

/// Token lifecycle failures.
///
/// `NotFound` and `Expired` are distinct so logs can tell a revoked or
/// replayed token from a stale one; the HTTP layer collapses both into a
/// uniform unauthorized response.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("refresh token not found")]
    NotFound,

    #[error("refresh token expired")]
    Expired,

    #[error("access token expired")]
    AccessExpired,

    #[error("invalid access token: {0}")]
    InvalidAccess(String),

    #[error("token generation failed: {0}")]
    Generation(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Signing key and lifetimes, built from [`crate::config::AppConfig`].
#[derive(Clone)]
pub struct TokenConfig {
    /// HMAC secret for access-token signatures.
    pub secret: String,
    /// Access-token lifetime.
    pub access_ttl: Duration,
    /// Refresh-token lifetime.
    pub refresh_ttl: Duration,
}

/// The credential pair returned by issue and refresh.
#[derive(Debug, Clone)]
pub struct IssuedTokens {
    pub access_token: String,
    pub refresh_token: String,
}

/// Issues, refreshes, revokes, and validates session credentials.
pub struct SessionTokenManager {
    store: Arc<Store>,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    access_ttl: Duration,
    refresh_ttl: Duration,
    rng: SystemRandom,
}

impl SessionTokenManager {
    pub fn new(store: Arc<Store>, config: TokenConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_aud = false;

        Self {
            store,
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            validation,
            access_ttl: config.access_ttl,
            refresh_ttl: config.refresh_ttl,
            rng: SystemRandom::new(),
        }
    }

    /// Issue a fresh access/refresh pair for an identity (login).
    pub fn issue(&self, user_id: Uuid) -> Result<IssuedTokens, TokenError> {
        let access_token = self.sign_access_token(user_id)?;
        let refresh_token = self.generate_refresh_token()?;

        let sessions = SessionRepository::new(&self.store);
        sessions.insert(
            &digest(&refresh_token),
            user_id,
            Utc::now() + self.refresh_ttl,
        )?;

        Ok(IssuedTokens {
            access_token,
            refresh_token,
        })
    }

    /// Exchange a refresh token for a new access token, rotating the
    /// refresh token in the same step.
    ///
    /// A revoked, already-rotated, or unknown token is `NotFound`; a stale
    /// one is `Expired` (and its row is removed). Terminal either way;
    /// no resurrection.
    pub fn refresh(&self, refresh_token: &str) -> Result<IssuedTokens, TokenError> {
        let old_digest = digest(refresh_token);
        let sessions = SessionRepository::new(&self.store);

        let session = sessions.find(&old_digest)?.ok_or(TokenError::NotFound)?;
        if session.expires_at <= Utc::now() {
            sessions.delete(&old_digest)?;
            return Err(TokenError::Expired);
        }

        let new_refresh = self.generate_refresh_token()?;
        match sessions.rotate(
            &old_digest,
            &digest(&new_refresh),
            session.user_id,
            Utc::now() + self.refresh_ttl,
        ) {
            Ok(()) => {}
            // Lost a race with a concurrent refresh or revoke of the same
            // token: it is gone now, which is exactly the replay case.
            Err(StoreError::NotFound(_)) => return Err(TokenError::NotFound),
            Err(e) => return Err(e.into()),
        }

        let access_token = self.sign_access_token(session.user_id)?;
        Ok(IssuedTokens {
            access_token,
            refresh_token: new_refresh,
        })
    }

    /// Revoke a refresh token (logout). Idempotent: revoking a token that
    /// is already gone succeeds.
    pub fn revoke(&self, refresh_token: &str) -> Result<(), TokenError> {
        let sessions = SessionRepository::new(&self.store);
        let removed = sessions.delete(&digest(refresh_token))?;
        if !removed {
            tracing::debug!("revoke: refresh token already absent");
        }
        Ok(())
    }

    /// Validate an access token and return the identity it names.
    ///
    /// Fails closed on every structural anomaly: wrong or missing
    /// algorithm, bad signature, missing claims, expiry, malformed subject.
    pub fn validate(&self, access_token: &str) -> Result<Uuid, TokenError> {
        let data = decode::<AccessClaims>(access_token, &self.decoding_key, &self.validation)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::AccessExpired,
                _ => TokenError::InvalidAccess(e.to_string()),
            })?;

        Uuid::parse_str(&data.claims.sub)
            .map_err(|_| TokenError::InvalidAccess("subject is not a UUID".to_string()))
    }

    fn sign_access_token(&self, user_id: Uuid) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = AccessClaims {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: (now + self.access_ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Generation(e.to_string()))
    }

    fn generate_refresh_token(&self) -> Result<String, TokenError> {
        let mut bytes = [0u8; 32];
        self.rng
            .fill(&mut bytes)
            .map_err(|_| TokenError::Generation("system RNG failure".to_string()))?;
        Ok(alloy::hex::encode(bytes))
    }
}

/// One-way digest of a refresh token: base64(SHA-256(plaintext)).
fn digest(token: &str) -> String {
    let hash = Sha256::digest(token.as_bytes());
    Base64::encode_string(&hash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64ct::Base64UrlUnpadded;

    fn test_manager(access_ttl: Duration) -> (SessionTokenManager, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(Store::open(&dir.path().join("app.redb")).unwrap());
        let manager = SessionTokenManager::new(
            store,
            TokenConfig {
                secret: "test-secret-key-for-unit-tests".to_string(),
                access_ttl,
                refresh_ttl: Duration::days(30),
            },
        );
        (manager, dir)
    }

    #[test]
    fn issue_then_validate_roundtrip() {
        let (manager, _dir) = test_manager(Duration::minutes(15));
        let user = Uuid::new_v4();

        let tokens = manager.issue(user).unwrap();
        assert_eq!(manager.validate(&tokens.access_token).unwrap(), user);
        // Refresh tokens are 32 bytes hex-encoded and never embed identity.
        assert_eq!(tokens.refresh_token.len(), 64);
        assert!(!tokens.refresh_token.contains(&user.to_string()));
    }

    #[test]
    fn refresh_rotates_and_invalidates_old_token() {
        let (manager, _dir) = test_manager(Duration::minutes(15));
        let user = Uuid::new_v4();

        let first = manager.issue(user).unwrap();
        let second = manager.refresh(&first.refresh_token).unwrap();
        assert_eq!(manager.validate(&second.access_token).unwrap(), user);

        // The presented token was rotated away; replay fails.
        assert!(matches!(
            manager.refresh(&first.refresh_token),
            Err(TokenError::NotFound)
        ));
        // The rotated-in token keeps working.
        assert!(manager.refresh(&second.refresh_token).is_ok());
    }

    #[test]
    fn revoked_token_is_dead_before_expiry() {
        let (manager, _dir) = test_manager(Duration::minutes(15));
        let tokens = manager.issue(Uuid::new_v4()).unwrap();

        manager.revoke(&tokens.refresh_token).unwrap();
        assert!(matches!(
            manager.refresh(&tokens.refresh_token),
            Err(TokenError::NotFound)
        ));
        // Revoking again is still success.
        manager.revoke(&tokens.refresh_token).unwrap();
    }

    #[test]
    fn expired_refresh_token_is_distinct_and_terminal() {
        let (manager, _dir) = test_manager(Duration::minutes(15));
        let user = Uuid::new_v4();

        // Plant an already-expired session row directly.
        let token = "a".repeat(64);
        let sessions = SessionRepository::new(&manager.store);
        sessions
            .insert(&digest(&token), user, Utc::now() - Duration::seconds(1))
            .unwrap();

        assert!(matches!(
            manager.refresh(&token),
            Err(TokenError::Expired)
        ));
        // The row was removed on sight; a second attempt is NotFound.
        assert!(matches!(
            manager.refresh(&token),
            Err(TokenError::NotFound)
        ));
    }

    #[test]
    fn expired_access_token_fails_validation() {
        let (manager, _dir) = test_manager(Duration::minutes(-5));
        let tokens = manager.issue(Uuid::new_v4()).unwrap();
        assert!(matches!(
            manager.validate(&tokens.access_token),
            Err(TokenError::AccessExpired)
        ));
    }

    #[test]
    fn tampered_access_token_fails_validation() {
        let (manager, _dir) = test_manager(Duration::minutes(15));
        let tokens = manager.issue(Uuid::new_v4()).unwrap();

        let mut tampered = tokens.access_token.clone();
        tampered.pop();
        tampered.push('A');
        assert!(matches!(
            manager.validate(&tampered),
            Err(TokenError::InvalidAccess(_))
        ));
    }

    #[test]
    fn alg_none_token_is_rejected() {
        let (manager, _dir) = test_manager(Duration::minutes(15));
        let user = Uuid::new_v4();

        let header = Base64UrlUnpadded::encode_string(br#"{"alg":"none","typ":"JWT"}"#);
        let claims = Base64UrlUnpadded::encode_string(
            format!(
                r#"{{"sub":"{user}","iat":1700000000,"exp":{}}}"#,
                (Utc::now() + Duration::hours(1)).timestamp()
            )
            .as_bytes(),
        );
        let forged = format!("{header}.{claims}.");

        assert!(matches!(
            manager.validate(&forged),
            Err(TokenError::InvalidAccess(_))
        ));
    }

    #[test]
    fn unexpected_algorithm_is_rejected_even_with_right_secret() {
        let (manager, _dir) = test_manager(Duration::minutes(15));
        let user = Uuid::new_v4();

        // Signed with the correct secret but HS384: still rejected.
        let claims = AccessClaims {
            sub: user.to_string(),
            iat: Utc::now().timestamp(),
            exp: (Utc::now() + Duration::hours(1)).timestamp(),
        };
        let hs384 = encode(
            &Header::new(Algorithm::HS384),
            &claims,
            &EncodingKey::from_secret(b"test-secret-key-for-unit-tests"),
        )
        .unwrap();

        assert!(matches!(
            manager.validate(&hs384),
            Err(TokenError::InvalidAccess(_))
        ));
    }

    #[test]
    fn missing_claims_fail_closed() {
        let (manager, _dir) = test_manager(Duration::minutes(15));

        // Valid HS256 signature over a claims set with no `sub`.
        #[derive(serde::Serialize)]
        struct Partial {
            iat: i64,
            exp: i64,
        }
        let partial = encode(
            &Header::new(Algorithm::HS256),
            &Partial {
                iat: Utc::now().timestamp(),
                exp: (Utc::now() + Duration::hours(1)).timestamp(),
            },
            &EncodingKey::from_secret(b"test-secret-key-for-unit-tests"),
        )
        .unwrap();

        assert!(matches!(
            manager.validate(&partial),
            Err(TokenError::InvalidAccess(_))
        ));
    }
}
