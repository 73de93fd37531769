// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Wallet-binding repository.
//!
//! A binding associates an on-chain address with the phone number of the
//! identity that proved control of it. The address is the unique key: one
//! address belongs to at most one identity, while an identity may bind any
//! number of addresses. Bindings are never mutated; they are removed only
//! when the owning identity is deleted.

use chrono::{DateTime, Utc};
use redb::{ReadableDatabase, ReadableTable};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::super::db::{
    owner_prefix, owner_prefix_end, pair_key, Store, StoreError, StoreResult, BINDING_PHONE_IDX,
    WALLET_BINDINGS,
};

/// A proven address ↔ identity association.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredBinding {
    /// Checksummed on-chain address.
    pub address: String,
    /// Phone number of the owning identity (the binding key).
    pub phone_number: String,
    /// Owning identity.
    pub user_id: Uuid,
    /// When the signature proof was accepted.
    pub bound_at: DateTime<Utc>,
}

/// Repository for wallet bindings.
pub struct BindingRepository<'a> {
    store: &'a Store,
}

impl<'a> BindingRepository<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Insert a new binding.
    ///
    /// The lowercased address is the primary key; `AlreadyExists` is
    /// returned when any identity (including the caller) already holds it.
    pub fn insert(&self, address: &str, phone_number: &str, user_id: Uuid) -> StoreResult<()> {
        let key = address.to_lowercase();
        let binding = StoredBinding {
            address: address.to_string(),
            phone_number: phone_number.to_string(),
            user_id,
            bound_at: Utc::now(),
        };
        let json = serde_json::to_vec(&binding)?;

        let write_txn = self.store.db().begin_write()?;
        {
            let mut bindings = write_txn.open_table(WALLET_BINDINGS)?;
            if bindings.get(key.as_str())?.is_some() {
                return Err(StoreError::AlreadyExists(format!("address {address}")));
            }
            bindings.insert(key.as_str(), json.as_slice())?;

            let mut phone_idx = write_txn.open_table(BINDING_PHONE_IDX)?;
            let idx_key = pair_key(phone_number, &key);
            phone_idx.insert(idx_key.as_slice(), key.as_str())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Look up a binding by address.
    pub fn find_by_address(&self, address: &str) -> StoreResult<Option<StoredBinding>> {
        let key = address.to_lowercase();
        let read_txn = self.store.db().begin_read()?;
        let bindings = read_txn.open_table(WALLET_BINDINGS)?;
        match bindings.get(key.as_str())? {
            Some(v) => Ok(Some(serde_json::from_slice(v.value())?)),
            None => Ok(None),
        }
    }

    /// List all bindings for a phone number, oldest first.
    pub fn list_by_phone(&self, phone_number: &str) -> StoreResult<Vec<StoredBinding>> {
        let read_txn = self.store.db().begin_read()?;
        let phone_idx = read_txn.open_table(BINDING_PHONE_IDX)?;
        let bindings = read_txn.open_table(WALLET_BINDINGS)?;

        let start = owner_prefix(phone_number);
        let end = owner_prefix_end(phone_number);

        let mut results = Vec::new();
        for entry in phone_idx.range(start.as_slice()..end.as_slice())? {
            let entry = entry?;
            let address = entry.1.value().to_string();
            if let Some(v) = bindings.get(address.as_str())? {
                results.push(serde_json::from_slice(v.value())?);
            }
        }
        results.sort_by(|a: &StoredBinding, b: &StoredBinding| a.bound_at.cmp(&b.bound_at));
        Ok(results)
    }
}
