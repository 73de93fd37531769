// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session repository.
//!
//! A session row is keyed by the one-way digest of a refresh token; the
//! plaintext token never reaches storage. One row per issued token, so an
//! identity may hold any number of concurrent sessions. Rows are removed
//! on logout, on rotation, on observed expiry, and when the owning
//! identity is deleted.

use chrono::{DateTime, Utc};
use redb::{ReadableDatabase, ReadableTable};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::super::db::{
    pair_key, Store, StoreError, StoreResult, SESSIONS, SESSION_USER_IDX,
};

/// A stored refresh-token session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredSession {
    /// Owning identity.
    pub user_id: Uuid,
    /// When the refresh token stops being exchangeable.
    pub expires_at: DateTime<Utc>,
    /// When the token was issued.
    pub issued_at: DateTime<Utc>,
}

/// Repository for refresh-token sessions.
pub struct SessionRepository<'a> {
    store: &'a Store,
}

impl<'a> SessionRepository<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Insert a session row for a token digest.
    pub fn insert(
        &self,
        digest: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let session = StoredSession {
            user_id,
            expires_at,
            issued_at: Utc::now(),
        };
        let json = serde_json::to_vec(&session)?;
        let id = user_id.to_string();

        let write_txn = self.store.db().begin_write()?;
        {
            let mut sessions = write_txn.open_table(SESSIONS)?;
            if sessions.get(digest)?.is_some() {
                return Err(StoreError::AlreadyExists(format!("session {digest}")));
            }
            sessions.insert(digest, json.as_slice())?;

            let mut user_idx = write_txn.open_table(SESSION_USER_IDX)?;
            let idx_key = pair_key(&id, digest);
            user_idx.insert(idx_key.as_slice(), digest)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Look up a session by token digest.
    pub fn find(&self, digest: &str) -> StoreResult<Option<StoredSession>> {
        let read_txn = self.store.db().begin_read()?;
        let sessions = read_txn.open_table(SESSIONS)?;
        match sessions.get(digest)? {
            Some(v) => Ok(Some(serde_json::from_slice(v.value())?)),
            None => Ok(None),
        }
    }

    /// Delete a session row. Returns whether a row was actually removed,
    /// so callers can keep logout idempotent while logging the difference.
    pub fn delete(&self, digest: &str) -> StoreResult<bool> {
        let write_txn = self.store.db().begin_write()?;
        let removed = {
            let mut sessions = write_txn.open_table(SESSIONS)?;
            let existing = match sessions.remove(digest)? {
                Some(v) => Some(serde_json::from_slice::<StoredSession>(v.value())?),
                None => None,
            };
            if let Some(session) = &existing {
                let mut user_idx = write_txn.open_table(SESSION_USER_IDX)?;
                let idx_key = pair_key(&session.user_id.to_string(), digest);
                user_idx.remove(idx_key.as_slice())?;
            }
            existing.is_some()
        };
        write_txn.commit()?;
        Ok(removed)
    }

    /// Atomically replace one session row with another (refresh rotation).
    ///
    /// The old digest is removed and the new one inserted in a single
    /// write transaction, so no interleaving can observe both or neither.
    pub fn rotate(
        &self,
        old_digest: &str,
        new_digest: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let session = StoredSession {
            user_id,
            expires_at,
            issued_at: Utc::now(),
        };
        let json = serde_json::to_vec(&session)?;
        let id = user_id.to_string();

        let write_txn = self.store.db().begin_write()?;
        {
            let mut sessions = write_txn.open_table(SESSIONS)?;
            if sessions.remove(old_digest)?.is_none() {
                return Err(StoreError::NotFound(format!("session {old_digest}")));
            }
            sessions.insert(new_digest, json.as_slice())?;

            let mut user_idx = write_txn.open_table(SESSION_USER_IDX)?;
            user_idx.remove(pair_key(&id, old_digest).as_slice())?;
            user_idx.insert(pair_key(&id, new_digest).as_slice(), new_digest)?;
        }
        write_txn.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_store() -> (Store, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(&dir.path().join("app.redb")).unwrap();
        (store, dir)
    }

    #[test]
    fn insert_find_delete_roundtrip() {
        let (store, _dir) = test_store();
        let repo = SessionRepository::new(&store);
        let user = Uuid::new_v4();
        let expiry = Utc::now() + chrono::Duration::days(30);

        repo.insert("digest-a", user, expiry).unwrap();

        let found = repo.find("digest-a").unwrap().unwrap();
        assert_eq!(found.user_id, user);

        assert!(repo.delete("digest-a").unwrap());
        assert!(repo.find("digest-a").unwrap().is_none());
        // Second delete is a no-op, not an error.
        assert!(!repo.delete("digest-a").unwrap());
    }

    #[test]
    fn rotate_replaces_exactly_one_row() {
        let (store, _dir) = test_store();
        let repo = SessionRepository::new(&store);
        let user = Uuid::new_v4();
        let expiry = Utc::now() + chrono::Duration::days(30);

        repo.insert("digest-old", user, expiry).unwrap();
        repo.rotate("digest-old", "digest-new", user, expiry).unwrap();

        assert!(repo.find("digest-old").unwrap().is_none());
        assert!(repo.find("digest-new").unwrap().is_some());

        // Rotating a missing digest fails; the new digest is not written.
        assert!(matches!(
            repo.rotate("digest-old", "digest-other", user, expiry),
            Err(StoreError::NotFound(_))
        ));
        assert!(repo.find("digest-other").unwrap().is_none());
    }

    #[test]
    fn concurrent_sessions_per_user_coexist() {
        let (store, _dir) = test_store();
        let repo = SessionRepository::new(&store);
        let user = Uuid::new_v4();
        let expiry = Utc::now() + chrono::Duration::days(30);

        repo.insert("digest-1", user, expiry).unwrap();
        repo.insert("digest-2", user, expiry).unwrap();

        assert!(repo.find("digest-1").unwrap().is_some());
        assert!(repo.find("digest-2").unwrap().is_some());

        // Revoking one leaves the other intact.
        repo.delete("digest-1").unwrap();
        assert!(repo.find("digest-2").unwrap().is_some());
    }
}
