// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded application database backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `users`: user_id → serialized StoredUser
//! - `user_email_idx` / `user_username_idx` / `user_phone_idx`:
//!   normalized handle → user_id (uniqueness indexes)
//! - `wallet_bindings`: lowercase address → serialized StoredBinding
//! - `binding_phone_idx`: composite key (phone|address) → lowercase address
//! - `payments`: payment_id → serialized StoredPayment
//! - `payment_tx_idx`: lowercase tx hash → payment_id
//! - `payment_user_idx`: composite key (user_id|!timestamp|payment_id) → payment_id
//! - `sessions`: refresh-token digest → serialized StoredSession
//! - `session_user_idx`: composite key (user_id|digest) → digest
//!
//! Uniqueness (bound address, payment tx hash, session digest, user
//! handles) is enforced with insert-if-absent checks inside a single write
//! transaction; redb serializes writers, so concurrent duplicates resolve
//! to exactly one `AlreadyExists`.

use std::path::Path;

use redb::{Database, ReadableDatabase, TableDefinition};

// =============================================================================
// Table Definitions
// =============================================================================

/// Primary table: user_id → serialized StoredUser (JSON bytes).
pub(crate) const USERS: TableDefinition<&str, &[u8]> = TableDefinition::new("users");

/// Index: normalized email → user_id.
pub(crate) const USER_EMAIL_IDX: TableDefinition<&str, &str> =
    TableDefinition::new("user_email_idx");

/// Index: username → user_id.
pub(crate) const USER_USERNAME_IDX: TableDefinition<&str, &str> =
    TableDefinition::new("user_username_idx");

/// Index: phone number → user_id.
pub(crate) const USER_PHONE_IDX: TableDefinition<&str, &str> =
    TableDefinition::new("user_phone_idx");

/// Primary table: lowercase on-chain address → serialized StoredBinding.
pub(crate) const WALLET_BINDINGS: TableDefinition<&str, &[u8]> =
    TableDefinition::new("wallet_bindings");

/// Index: composite key (phone|address) → lowercase address.
pub(crate) const BINDING_PHONE_IDX: TableDefinition<&[u8], &str> =
    TableDefinition::new("binding_phone_idx");

/// Primary table: payment_id → serialized StoredPayment.
pub(crate) const PAYMENTS: TableDefinition<&str, &[u8]> = TableDefinition::new("payments");

/// Index: lowercase transaction hash → payment_id.
pub(crate) const PAYMENT_TX_IDX: TableDefinition<&str, &str> =
    TableDefinition::new("payment_tx_idx");

/// Index: composite key (user_id|!timestamp_be|payment_id) → payment_id.
/// The inverted timestamp gives newest-first ordering on forward scans.
pub(crate) const PAYMENT_USER_IDX: TableDefinition<&[u8], &str> =
    TableDefinition::new("payment_user_idx");

/// Primary table: refresh-token digest → serialized StoredSession.
pub(crate) const SESSIONS: TableDefinition<&str, &[u8]> = TableDefinition::new("sessions");

/// Index: composite key (user_id|digest) → digest.
pub(crate) const SESSION_USER_IDX: TableDefinition<&[u8], &str> =
    TableDefinition::new("session_user_idx");

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("illegal status transition: {from} -> {to}")]
    InvalidTransition {
        from: &'static str,
        to: &'static str,
    },
}

pub type StoreResult<T> = Result<T, StoreError>;

// =============================================================================
// Index Key Helpers
// =============================================================================

/// Build a two-part composite key: `left | right`.
pub(crate) fn pair_key(left: &str, right: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(left.len() + 1 + right.len());
    key.extend_from_slice(left.as_bytes());
    key.push(b'|');
    key.extend_from_slice(right.as_bytes());
    key
}

/// Build a composite key for time-ordered per-owner indexes.
///
/// Format: `owner | inverted_timestamp_be_bytes | id`
///
/// The inverted timestamp ensures newest-first ordering when scanning forward.
pub(crate) fn owner_time_key(owner: &str, timestamp: i64, id: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(owner.len() + 1 + 8 + 1 + id.len());
    key.extend_from_slice(owner.as_bytes());
    key.push(b'|');
    key.extend_from_slice(&(!timestamp as u64).to_be_bytes());
    key.push(b'|');
    key.extend_from_slice(id.as_bytes());
    key
}

/// Build a prefix for range scanning all composite keys of an owner.
pub(crate) fn owner_prefix(owner: &str) -> Vec<u8> {
    let mut prefix = Vec::with_capacity(owner.len() + 1);
    prefix.extend_from_slice(owner.as_bytes());
    prefix.push(b'|');
    prefix
}

/// Build the upper bound for a prefix range scan (prefix + 0xFF padding).
pub(crate) fn owner_prefix_end(owner: &str) -> Vec<u8> {
    let mut end = owner_prefix(owner);
    end.extend_from_slice(&[0xFF; 48]);
    end
}

// =============================================================================
// Store
// =============================================================================

/// Embedded ACID application store.
///
/// Cheap to share behind an `Arc`; redb serializes write transactions
/// internally, so no additional locking is needed.
pub struct Store {
    db: Database,
}

impl Store {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> StoreResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(USERS)?;
            let _ = write_txn.open_table(USER_EMAIL_IDX)?;
            let _ = write_txn.open_table(USER_USERNAME_IDX)?;
            let _ = write_txn.open_table(USER_PHONE_IDX)?;
            let _ = write_txn.open_table(WALLET_BINDINGS)?;
            let _ = write_txn.open_table(BINDING_PHONE_IDX)?;
            let _ = write_txn.open_table(PAYMENTS)?;
            let _ = write_txn.open_table(PAYMENT_TX_IDX)?;
            let _ = write_txn.open_table(PAYMENT_USER_IDX)?;
            let _ = write_txn.open_table(SESSIONS)?;
            let _ = write_txn.open_table(SESSION_USER_IDX)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    /// Access the underlying database for repository transactions.
    pub(crate) fn db(&self) -> &Database {
        &self.db
    }

    /// Verify the store is readable (used by the readiness probe).
    pub fn health_check(&self) -> StoreResult<()> {
        let read_txn = self.db.begin_read()?;
        let _ = read_txn.open_table(USERS)?;
        Ok(())
    }
}
