// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User repository: identity rows with globally unique handles.
//!
//! Email, username, and phone number each carry a uniqueness index.
//! All index maintenance happens in the same write transaction as the
//! primary row, so a crash can never leave a dangling handle.

use chrono::{DateTime, Utc};
use redb::{ReadableDatabase, ReadableTable};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::super::db::{
    owner_prefix, owner_prefix_end, Store, StoreError, StoreResult, BINDING_PHONE_IDX, SESSIONS,
    SESSION_USER_IDX, USERS, USER_EMAIL_IDX, USER_PHONE_IDX, USER_USERNAME_IDX, WALLET_BINDINGS,
};

/// A registered identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredUser {
    /// Unique user identifier.
    pub user_id: Uuid,
    /// Login / display name, globally unique.
    pub username: String,
    /// Normalized email address, globally unique.
    pub email: String,
    /// Phone number, globally unique; also the wallet-binding key.
    pub phone_number: String,
    /// Argon2id PHC-format password hash.
    pub password_hash: String,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
}

/// Repository for identity rows.
pub struct UserRepository<'a> {
    store: &'a Store,
}

impl<'a> UserRepository<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Insert a new user, enforcing handle uniqueness.
    ///
    /// Returns `AlreadyExists` naming the offending handle when the email,
    /// username, or phone number is already taken.
    pub fn create(&self, user: &StoredUser) -> StoreResult<()> {
        let json = serde_json::to_vec(user)?;
        let id = user.user_id.to_string();

        let write_txn = self.store.db().begin_write()?;
        {
            let mut email_idx = write_txn.open_table(USER_EMAIL_IDX)?;
            if email_idx.get(user.email.as_str())?.is_some() {
                return Err(StoreError::AlreadyExists(format!("email {}", user.email)));
            }
            let mut username_idx = write_txn.open_table(USER_USERNAME_IDX)?;
            if username_idx.get(user.username.as_str())?.is_some() {
                return Err(StoreError::AlreadyExists(format!(
                    "username {}",
                    user.username
                )));
            }
            let mut phone_idx = write_txn.open_table(USER_PHONE_IDX)?;
            if phone_idx.get(user.phone_number.as_str())?.is_some() {
                return Err(StoreError::AlreadyExists(format!(
                    "phone {}",
                    user.phone_number
                )));
            }

            let mut users = write_txn.open_table(USERS)?;
            users.insert(id.as_str(), json.as_slice())?;
            email_idx.insert(user.email.as_str(), id.as_str())?;
            username_idx.insert(user.username.as_str(), id.as_str())?;
            phone_idx.insert(user.phone_number.as_str(), id.as_str())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Look up a user by id.
    pub fn find_by_id(&self, user_id: Uuid) -> StoreResult<Option<StoredUser>> {
        let id = user_id.to_string();
        let read_txn = self.store.db().begin_read()?;
        let users = read_txn.open_table(USERS)?;
        match users.get(id.as_str())? {
            Some(v) => Ok(Some(serde_json::from_slice(v.value())?)),
            None => Ok(None),
        }
    }

    /// Look up a user by normalized email.
    pub fn find_by_email(&self, email: &str) -> StoreResult<Option<StoredUser>> {
        let read_txn = self.store.db().begin_read()?;
        let email_idx = read_txn.open_table(USER_EMAIL_IDX)?;
        let id = match email_idx.get(email)? {
            Some(v) => v.value().to_string(),
            None => return Ok(None),
        };
        let users = read_txn.open_table(USERS)?;
        match users.get(id.as_str())? {
            Some(v) => Ok(Some(serde_json::from_slice(v.value())?)),
            None => Ok(None),
        }
    }

    /// Replace the password hash. Fails `NotFound` when the row is missing.
    pub fn update_password(&self, user_id: Uuid, password_hash: &str) -> StoreResult<()> {
        let id = user_id.to_string();
        let write_txn = self.store.db().begin_write()?;
        {
            let mut users = write_txn.open_table(USERS)?;
            let existing = {
                let row = users
                    .get(id.as_str())?
                    .ok_or_else(|| StoreError::NotFound(format!("user {id}")))?;
                row.value().to_vec()
            };
            let mut user: StoredUser = serde_json::from_slice(&existing)?;
            user.password_hash = password_hash.to_string();
            let json = serde_json::to_vec(&user)?;
            users.insert(id.as_str(), json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Change the email address, re-pointing the uniqueness index.
    ///
    /// Fails `AlreadyExists` when another account holds the new address.
    pub fn update_email(&self, user_id: Uuid, new_email: &str) -> StoreResult<()> {
        let id = user_id.to_string();
        let write_txn = self.store.db().begin_write()?;
        {
            let mut email_idx = write_txn.open_table(USER_EMAIL_IDX)?;
            if let Some(holder) = email_idx.get(new_email)? {
                if holder.value() != id {
                    return Err(StoreError::AlreadyExists(format!("email {new_email}")));
                }
            }

            let mut users = write_txn.open_table(USERS)?;
            let existing = {
                let row = users
                    .get(id.as_str())?
                    .ok_or_else(|| StoreError::NotFound(format!("user {id}")))?;
                row.value().to_vec()
            };
            let mut user: StoredUser = serde_json::from_slice(&existing)?;
            email_idx.remove(user.email.as_str())?;
            user.email = new_email.to_string();
            let json = serde_json::to_vec(&user)?;
            users.insert(id.as_str(), json.as_slice())?;
            email_idx.insert(new_email, id.as_str())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Delete a user and cascade to owned sessions and wallet bindings.
    ///
    /// Payment rows are deliberately retained; they record on-chain events
    /// and are removed only by privileged maintenance.
    pub fn delete(&self, user_id: Uuid) -> StoreResult<()> {
        let id = user_id.to_string();
        let write_txn = self.store.db().begin_write()?;
        {
            let mut users = write_txn.open_table(USERS)?;
            let existing = {
                let row = users
                    .get(id.as_str())?
                    .ok_or_else(|| StoreError::NotFound(format!("user {id}")))?;
                row.value().to_vec()
            };
            let user: StoredUser = serde_json::from_slice(&existing)?;

            users.remove(id.as_str())?;
            let mut email_idx = write_txn.open_table(USER_EMAIL_IDX)?;
            email_idx.remove(user.email.as_str())?;
            let mut username_idx = write_txn.open_table(USER_USERNAME_IDX)?;
            username_idx.remove(user.username.as_str())?;
            let mut phone_idx = write_txn.open_table(USER_PHONE_IDX)?;
            phone_idx.remove(user.phone_number.as_str())?;

            // Cascade: wallet bindings keyed by this user's phone number.
            let mut bindings = write_txn.open_table(WALLET_BINDINGS)?;
            let mut phone_binding_idx = write_txn.open_table(BINDING_PHONE_IDX)?;
            let start = owner_prefix(&user.phone_number);
            let end = owner_prefix_end(&user.phone_number);
            let bound_addresses: Vec<(Vec<u8>, String)> = phone_binding_idx
                .range(start.as_slice()..end.as_slice())?
                .map(|entry| {
                    let entry = entry?;
                    Ok((entry.0.value().to_vec(), entry.1.value().to_string()))
                })
                .collect::<StoreResult<_>>()?;
            for (idx_key, address) in bound_addresses {
                bindings.remove(address.as_str())?;
                phone_binding_idx.remove(idx_key.as_slice())?;
            }

            // Cascade: sessions owned by this user.
            let mut sessions = write_txn.open_table(SESSIONS)?;
            let mut session_idx = write_txn.open_table(SESSION_USER_IDX)?;
            let start = owner_prefix(&id);
            let end = owner_prefix_end(&id);
            let digests: Vec<(Vec<u8>, String)> = session_idx
                .range(start.as_slice()..end.as_slice())?
                .map(|entry| {
                    let entry = entry?;
                    Ok((entry.0.value().to_vec(), entry.1.value().to_string()))
                })
                .collect::<StoreResult<_>>()?;
            for (idx_key, digest) in digests {
                sessions.remove(digest.as_str())?;
                session_idx.remove(idx_key.as_slice())?;
            }
        }
        write_txn.commit()?;
        Ok(())
    }
}
