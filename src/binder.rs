// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Wallet binding: associate a proven on-chain address with an identity.
//!
//! The caller submits a message and its signature; the server recovers the
//! signer address and inserts an (address, contact-handle) binding. No
//! private key is ever seen. An address already bound to any identity is
//! a distinct conflict, surfaced as [`BindError::AlreadyBound`]. That is
//! the one uniqueness violation here that is user-actionable.

use uuid::Uuid;

use crate::ledger::{recover_signer, SignatureError};
use crate::storage::{BindingRepository, Store, StoreError, UserRepository};

/// Wallet-binding failures.
#[derive(Debug, thiserror::Error)]
pub enum BindError {
    #[error(transparent)]
    Signature(#[from] SignatureError),

    #[error("identity not found")]
    UserNotFound,

    #[error("wallet address already bound to an account")]
    AlreadyBound,

    #[error(transparent)]
    Store(StoreError),
}

/// Binds proven wallet addresses to identities.
pub struct WalletBinder<'a> {
    store: &'a Store,
}

impl<'a> WalletBinder<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Prove control of an address and bind it to `user_id`.
    ///
    /// Returns the checksummed recovered address. Re-binding an address,
    /// by anyone including its current owner, is `AlreadyBound`, never a
    /// duplicate row.
    pub fn bind(&self, user_id: Uuid, message: &str, signature: &str) -> Result<String, BindError> {
        let address = recover_signer(message, signature)?;
        let checksummed = address.to_checksum(None);

        let users = UserRepository::new(self.store);
        let user = users
            .find_by_id(user_id)
            .map_err(BindError::Store)?
            .ok_or(BindError::UserNotFound)?;

        let bindings = BindingRepository::new(self.store);
        match bindings.insert(&checksummed, &user.phone_number, user_id) {
            Ok(()) => {
                tracing::info!(address = %checksummed, user_id = %user_id, "wallet bound");
                Ok(checksummed)
            }
            Err(StoreError::AlreadyExists(_)) => Err(BindError::AlreadyBound),
            Err(e) => Err(BindError::Store(e)),
        }
    }

    /// Addresses bound to `user_id`, resolved through its contact handle.
    pub fn addresses_of(&self, user_id: Uuid) -> Result<Vec<String>, BindError> {
        let users = UserRepository::new(self.store);
        let user = users
            .find_by_id(user_id)
            .map_err(BindError::Store)?
            .ok_or(BindError::UserNotFound)?;

        let bindings = BindingRepository::new(self.store);
        let bound = bindings
            .list_by_phone(&user.phone_number)
            .map_err(BindError::Store)?;
        Ok(bound.into_iter().map(|b| b.address).collect())
    }
}
