// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Payment repository.
//!
//! A payment row records a verified on-chain transfer. The transaction
//! hash is globally unique: a second claim referencing the same hash must
//! resolve to the existing row, so the insert path reports the conflict
//! and never writes a duplicate.
//!
//! Status transitions are guarded here, not in callers. The only legal
//! transitions are `pending → confirmed` and `pending → failed`; the
//! `cancelled` value is reserved for privileged maintenance writing rows
//! out-of-band.

use chrono::{DateTime, Utc};
use redb::{ReadableDatabase, ReadableTable};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::super::db::{
    owner_prefix, owner_prefix_end, owner_time_key, Store, StoreError, StoreResult, PAYMENTS,
    PAYMENT_TX_IDX, PAYMENT_USER_IDX,
};

/// Payment confirmation status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// Claim accepted; chain confirmation not yet observed.
    Pending,
    /// Receipt shows successful execution at sufficient depth.
    Confirmed,
    /// Receipt shows reverted execution.
    Failed,
    /// Administratively voided (privileged maintenance only).
    Cancelled,
}

impl PaymentStatus {
    /// Whether a transition from `self` to `next` is permitted.
    pub fn can_transition_to(self, next: PaymentStatus) -> bool {
        matches!(
            (self, next),
            (PaymentStatus::Pending, PaymentStatus::Confirmed)
                | (PaymentStatus::Pending, PaymentStatus::Failed)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Confirmed => "confirmed",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Cancelled => "cancelled",
        }
    }
}

/// A recorded payment event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredPayment {
    /// Unique payment identifier.
    pub payment_id: Uuid,
    /// Identity that submitted the claim.
    pub user_id: Uuid,
    /// Sender address observed on chain.
    pub from_address: String,
    /// Recipient address observed on chain.
    pub to_address: String,
    /// Transfer value as a decimal base-unit string (never floating point).
    pub amount: String,
    /// Currency tag (e.g. "ETH").
    pub currency: String,
    /// On-chain transaction hash, globally unique.
    pub tx_hash: String,
    /// Containing block, once a receipt exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
    /// Gas consumed, once a receipt exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas_used: Option<u64>,
    /// Effective gas price in wei, as a decimal string.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<String>,
    /// Current confirmation status.
    pub status: PaymentStatus,
    /// Optional caller-supplied description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// When the claim was accepted.
    pub created_at: DateTime<Utc>,
    /// When the row was last touched.
    pub updated_at: DateTime<Utc>,
    /// When the confirmed status was reached.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmed_at: Option<DateTime<Utc>>,
}

/// Fields applied when a pending payment's receipt becomes available.
#[derive(Debug, Clone, Default)]
pub struct ReceiptFields {
    pub block_number: Option<u64>,
    pub gas_used: Option<u64>,
    pub gas_price: Option<String>,
}

/// Query parameters for the per-user listing.
#[derive(Debug, Clone)]
pub struct PaymentPage {
    pub status: Option<PaymentStatus>,
    pub page: usize,
    pub page_size: usize,
}

/// Repository for payment rows.
pub struct PaymentRepository<'a> {
    store: &'a Store,
}

impl<'a> PaymentRepository<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Insert a new payment.
    ///
    /// Returns `AlreadyExists` when the transaction hash is already
    /// recorded. Callers treat that as the benign concurrent-duplicate
    /// case and re-read the existing row.
    pub fn insert(&self, payment: &StoredPayment) -> StoreResult<()> {
        let id = payment.payment_id.to_string();
        let tx_key = payment.tx_hash.to_lowercase();
        let json = serde_json::to_vec(payment)?;

        let write_txn = self.store.db().begin_write()?;
        {
            let mut tx_idx = write_txn.open_table(PAYMENT_TX_IDX)?;
            if tx_idx.get(tx_key.as_str())?.is_some() {
                return Err(StoreError::AlreadyExists(format!(
                    "transaction {}",
                    payment.tx_hash
                )));
            }

            let mut payments = write_txn.open_table(PAYMENTS)?;
            payments.insert(id.as_str(), json.as_slice())?;
            tx_idx.insert(tx_key.as_str(), id.as_str())?;

            let mut user_idx = write_txn.open_table(PAYMENT_USER_IDX)?;
            let idx_key = owner_time_key(
                &payment.user_id.to_string(),
                payment.created_at.timestamp(),
                &id,
            );
            user_idx.insert(idx_key.as_slice(), id.as_str())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Look up a payment by id.
    pub fn find_by_id(&self, payment_id: Uuid) -> StoreResult<Option<StoredPayment>> {
        let id = payment_id.to_string();
        let read_txn = self.store.db().begin_read()?;
        let payments = read_txn.open_table(PAYMENTS)?;
        match payments.get(id.as_str())? {
            Some(v) => Ok(Some(serde_json::from_slice(v.value())?)),
            None => Ok(None),
        }
    }

    /// Look up a payment by transaction hash (case-insensitive).
    pub fn find_by_tx_hash(&self, tx_hash: &str) -> StoreResult<Option<StoredPayment>> {
        let key = tx_hash.to_lowercase();
        let read_txn = self.store.db().begin_read()?;
        let tx_idx = read_txn.open_table(PAYMENT_TX_IDX)?;
        let id = match tx_idx.get(key.as_str())? {
            Some(v) => v.value().to_string(),
            None => return Ok(None),
        };
        let payments = read_txn.open_table(PAYMENTS)?;
        match payments.get(id.as_str())? {
            Some(v) => Ok(Some(serde_json::from_slice(v.value())?)),
            None => Ok(None),
        }
    }

    /// Apply a guarded status transition and the receipt fields.
    ///
    /// Fails `NotFound` for a missing row and `InvalidTransition` for any
    /// move the state machine does not permit.
    pub fn update_status(
        &self,
        payment_id: Uuid,
        next: PaymentStatus,
        receipt: ReceiptFields,
    ) -> StoreResult<StoredPayment> {
        let id = payment_id.to_string();
        let write_txn = self.store.db().begin_write()?;
        let updated = {
            let mut payments = write_txn.open_table(PAYMENTS)?;
            let existing = {
                let row = payments
                    .get(id.as_str())?
                    .ok_or_else(|| StoreError::NotFound(format!("payment {id}")))?;
                row.value().to_vec()
            };
            let mut payment: StoredPayment = serde_json::from_slice(&existing)?;

            if !payment.status.can_transition_to(next) {
                return Err(StoreError::InvalidTransition {
                    from: payment.status.as_str(),
                    to: next.as_str(),
                });
            }

            payment.status = next;
            if let Some(block) = receipt.block_number {
                payment.block_number = Some(block);
            }
            if let Some(gas) = receipt.gas_used {
                payment.gas_used = Some(gas);
            }
            if let Some(price) = receipt.gas_price {
                payment.gas_price = Some(price);
            }
            payment.updated_at = Utc::now();
            if next == PaymentStatus::Confirmed {
                payment.confirmed_at = Some(payment.updated_at);
            }

            let json = serde_json::to_vec(&payment)?;
            payments.insert(id.as_str(), json.as_slice())?;
            payment
        };
        write_txn.commit()?;
        Ok(updated)
    }

    /// Newest-first page of a user's payments with an optional status filter.
    ///
    /// Returns `(rows, total_matching)`.
    pub fn list_by_user(
        &self,
        user_id: Uuid,
        page: &PaymentPage,
    ) -> StoreResult<(Vec<StoredPayment>, usize)> {
        let owner = user_id.to_string();
        let read_txn = self.store.db().begin_read()?;
        let user_idx = read_txn.open_table(PAYMENT_USER_IDX)?;
        let payments = read_txn.open_table(PAYMENTS)?;

        let start = owner_prefix(&owner);
        let end = owner_prefix_end(&owner);

        let mut matching = Vec::new();
        for entry in user_idx.range(start.as_slice()..end.as_slice())? {
            let entry = entry?;
            let id = entry.1.value().to_string();
            if let Some(v) = payments.get(id.as_str())? {
                let payment: StoredPayment = serde_json::from_slice(v.value())?;
                if page.status.is_none_or(|s| payment.status == s) {
                    matching.push(payment);
                }
            }
        }

        let total = matching.len();
        let offset = page.page.saturating_sub(1) * page.page_size;
        let rows = matching
            .into_iter()
            .skip(offset)
            .take(page.page_size)
            .collect();
        Ok((rows, total))
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

    fn test_payment(user_id: Uuid, tx_hash: &str) -> StoredPayment {
        let now = Utc::now();
        StoredPayment {
            payment_id: Uuid::new_v4(),
            user_id,
            from_address: "0x742d35Cc6634C0532925a3b844Bc9e7595f4aB12".to_string(),
            to_address: "0x8ba1f109551bD432803012645Ac136ddd64DBA72".to_string(),
            amount: "1000000000000000000".to_string(),
            currency: "ETH".to_string(),
            tx_hash: tx_hash.to_string(),
            block_number: None,
            gas_used: None,
            gas_price: None,
            status: PaymentStatus::Pending,
            description: None,
            created_at: now,
            updated_at: now,
            confirmed_at: None,
        }
    }

    #[test]
    fn insert_and_lookup_by_hash_is_case_insensitive() {
        let (store, _dir) = test_store();
        let repo = PaymentRepository::new(&store);
        let payment = test_payment(Uuid::new_v4(), "0xABCDEF0123");

        repo.insert(&payment).unwrap();

        let found = repo.find_by_tx_hash("0xabcdef0123").unwrap().unwrap();
        assert_eq!(found.payment_id, payment.payment_id);
    }

    #[test]
    fn duplicate_tx_hash_is_rejected() {
        let (store, _dir) = test_store();
        let repo = PaymentRepository::new(&store);
        let first = test_payment(Uuid::new_v4(), "0xaaa111");
        repo.insert(&first).unwrap();

        let mut second = test_payment(Uuid::new_v4(), "0xAAA111");
        second.payment_id = Uuid::new_v4();
        assert!(matches!(
            repo.insert(&second),
            Err(StoreError::AlreadyExists(_))
        ));
        // The original row is untouched.
        let found = repo.find_by_tx_hash("0xaaa111").unwrap().unwrap();
        assert_eq!(found.payment_id, first.payment_id);
    }

    #[test]
    fn pending_transitions_to_confirmed_with_receipt_fields() {
        let (store, _dir) = test_store();
        let repo = PaymentRepository::new(&store);
        let payment = test_payment(Uuid::new_v4(), "0xbbb222");
        repo.insert(&payment).unwrap();

        let updated = repo
            .update_status(
                payment.payment_id,
                PaymentStatus::Confirmed,
                ReceiptFields {
                    block_number: Some(1234),
                    gas_used: Some(21000),
                    gas_price: Some("25000000000".to_string()),
                },
            )
            .unwrap();

        assert_eq!(updated.status, PaymentStatus::Confirmed);
        assert_eq!(updated.block_number, Some(1234));
        assert_eq!(updated.gas_used, Some(21000));
        assert!(updated.confirmed_at.is_some());
    }

    #[test]
    fn illegal_transitions_are_rejected() {
        let (store, _dir) = test_store();
        let repo = PaymentRepository::new(&store);
        let payment = test_payment(Uuid::new_v4(), "0xccc333");
        repo.insert(&payment).unwrap();

        repo.update_status(
            payment.payment_id,
            PaymentStatus::Confirmed,
            ReceiptFields::default(),
        )
        .unwrap();

        for next in [
            PaymentStatus::Failed,
            PaymentStatus::Pending,
            PaymentStatus::Cancelled,
        ] {
            assert!(matches!(
                repo.update_status(payment.payment_id, next, ReceiptFields::default()),
                Err(StoreError::InvalidTransition { .. })
            ));
        }
    }

    #[test]
    fn list_by_user_pages_newest_first_and_filters() {
        let (store, _dir) = test_store();
        let repo = PaymentRepository::new(&store);
        let user = Uuid::new_v4();

        for i in 0..5 {
            let mut p = test_payment(user, &format!("0xhash{i}"));
            p.created_at = Utc::now() - chrono::Duration::seconds(100 - i);
            p.updated_at = p.created_at;
            repo.insert(&p).unwrap();
        }
        // Another user's payment must not appear.
        repo.insert(&test_payment(Uuid::new_v4(), "0xother")).unwrap();

        let (rows, total) = repo
            .list_by_user(
                user,
                &PaymentPage {
                    status: None,
                    page: 1,
                    page_size: 3,
                },
            )
            .unwrap();
        assert_eq!(total, 5);
        assert_eq!(rows.len(), 3);
        // Newest first.
        assert_eq!(rows[0].tx_hash, "0xhash4");

        let (rows, total) = repo
            .list_by_user(
                user,
                &PaymentPage {
                    status: None,
                    page: 2,
                    page_size: 3,
                },
            )
            .unwrap();
        assert_eq!(total, 5);
        assert_eq!(rows.len(), 2);

        // Status filter: confirm one row and filter on it.
        let confirmed_id = repo.find_by_tx_hash("0xhash0").unwrap().unwrap().payment_id;
        repo.update_status(confirmed_id, PaymentStatus::Confirmed, ReceiptFields::default())
            .unwrap();
        let (rows, total) = repo
            .list_by_user(
                user,
                &PaymentPage {
                    status: Some(PaymentStatus::Confirmed),
                    page: 1,
                    page_size: 10,
                },
            )
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(rows[0].payment_id, confirmed_id);
    }
}
