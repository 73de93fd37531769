// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Payment reconciliation: verify a claimed on-chain transfer against the
//! ledger and record it as an authoritative payment event.
//!
//! The ledger is the source of truth. A claim names a recipient, an exact
//! amount, and a transaction hash; the reconciler fetches the transaction,
//! checks that it was sent from one of the caller's bound wallets to the
//! claimed recipient for exactly the claimed amount, and persists a
//! payment row whose status follows the receipt.
//!
//! The transaction hash is globally unique across payments. Resubmission
//! of a known hash returns the existing row unchanged, and a concurrent
//! duplicate insert is resolved the same way: the unique constraint is
//! the arbiter, not application locks.

use alloy::primitives::{Address, U256};
use chrono::Utc;
use uuid::Uuid;

use crate::ledger::{parse_address, parse_tx_hash, LedgerError, LedgerQuery, ReceiptInfo};
use crate::storage::{
    BindingRepository, PaymentRepository, PaymentStatus, ReceiptFields, Store, StoreError,
    StoredPayment, UserRepository,
};

/// A claimed payment, as submitted by the wallet owner.
#[derive(Debug, Clone)]
pub struct PaymentClaim {
    /// Declared recipient address.
    pub to_address: String,
    /// Declared transfer value, decimal base units.
    pub amount: String,
    /// Currency tag recorded with the payment.
    pub currency: String,
    /// Hash of the already-committed on-chain transaction.
    pub tx_hash: String,
    /// Optional free-text description.
    pub description: Option<String>,
}

/// Reconciliation failures.
///
/// `LedgerUnavailable` is retryable; the validation variants are terminal
/// and never coerced to success.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("no wallet bound to this account")]
    NoWalletBound,

    #[error("invalid claim: {0}")]
    InvalidClaim(String),

    #[error("transaction not found on ledger")]
    TransactionNotFound,

    #[error("transaction was not sent from a wallet bound to this account")]
    NotFromOwnedWallet,

    #[error("claim mismatch: {0}")]
    ClaimMismatch(String),

    #[error("ledger unavailable: {0}")]
    LedgerUnavailable(String),

    #[error("payment not found")]
    PaymentNotFound,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<LedgerError> for ReconcileError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::NotFound(_) => ReconcileError::TransactionNotFound,
            LedgerError::InvalidAddress(msg) | LedgerError::InvalidTxHash(msg) => {
                ReconcileError::InvalidClaim(msg)
            }
            LedgerError::InvalidRpcUrl(msg) | LedgerError::Unavailable(msg) => {
                ReconcileError::LedgerUnavailable(msg)
            }
        }
    }
}

/// Verifies payment claims against the ledger and owns the payment rows.
pub struct PaymentReconciler<'a, L> {
    store: &'a Store,
    ledger: &'a L,
    /// Receipt depth required before a payment is confirmed.
    min_confirmations: u64,
}

impl<'a, L: LedgerQuery> PaymentReconciler<'a, L> {
    pub fn new(store: &'a Store, ledger: &'a L, min_confirmations: u64) -> Self {
        Self {
            store,
            ledger,
            min_confirmations,
        }
    }

    /// Verify a claim and record the payment.
    ///
    /// Idempotent on the transaction hash: a known hash returns the
    /// existing row without touching the ledger. A transaction without a
    /// receipt is recorded `pending`; a reverted one is recorded `failed`,
    /// since a failed transfer is still a real event worth recording.
    pub async fn submit(
        &self,
        user_id: Uuid,
        claim: &PaymentClaim,
    ) -> Result<StoredPayment, ReconcileError> {
        // Malformed input is rejected before the ledger or store is touched.
        let claimed_to = parse_address(&claim.to_address)
            .map_err(|e| ReconcileError::InvalidClaim(e.to_string()))?;
        parse_tx_hash(&claim.tx_hash)
            .map_err(|e| ReconcileError::InvalidClaim(e.to_string()))?;
        let claimed_amount = U256::from_str_radix(claim.amount.trim(), 10)
            .map_err(|e| ReconcileError::InvalidClaim(format!("amount: {e}")))?;

        let owned = self.bound_addresses(user_id)?;
        if owned.is_empty() {
            return Err(ReconcileError::NoWalletBound);
        }

        // Idempotent resubmission: the reference wins, whatever the rest of
        // the claim says.
        let payments = PaymentRepository::new(self.store);
        if let Some(existing) = payments.find_by_tx_hash(&claim.tx_hash)? {
            tracing::debug!(tx_hash = %claim.tx_hash, "resubmission of known transaction");
            return Ok(existing);
        }

        let (details, is_pending) = self.ledger.transaction_by_hash(&claim.tx_hash).await?;
        let receipt = if is_pending {
            None
        } else {
            self.ledger.receipt_by_hash(&claim.tx_hash).await?
        };

        // The sender must be one of the caller's proven wallets.
        if !owned.contains(&details.from) {
            return Err(ReconcileError::NotFromOwnedWallet);
        }

        // The on-chain recipient and value must match the claim exactly.
        match details.to {
            Some(to) if to == claimed_to => {}
            Some(to) => {
                return Err(ReconcileError::ClaimMismatch(format!(
                    "recipient {to} does not match claimed {claimed_to}"
                )))
            }
            None => {
                return Err(ReconcileError::ClaimMismatch(
                    "transaction creates a contract, it does not pay an address".to_string(),
                ))
            }
        }
        if details.value != claimed_amount {
            return Err(ReconcileError::ClaimMismatch(format!(
                "value {} does not match claimed amount {}",
                details.value, claimed_amount
            )));
        }

        let status = match &receipt {
            Some(r) if !r.success => PaymentStatus::Failed,
            Some(r) => {
                if self.depth_reached(r).await? {
                    PaymentStatus::Confirmed
                } else {
                    PaymentStatus::Pending
                }
            }
            None => PaymentStatus::Pending,
        };

        let now = Utc::now();
        let payment = StoredPayment {
            payment_id: Uuid::new_v4(),
            user_id,
            from_address: details.from.to_checksum(None),
            to_address: claimed_to.to_checksum(None),
            amount: details.value.to_string(),
            currency: claim.currency.clone(),
            tx_hash: claim.tx_hash.to_lowercase(),
            block_number: receipt.as_ref().and_then(|r| r.block_number),
            gas_used: receipt.as_ref().map(|r| r.gas_used),
            gas_price: Some(
                receipt
                    .as_ref()
                    .map(|r| r.effective_gas_price)
                    .unwrap_or(details.gas_price)
                    .to_string(),
            ),
            status,
            description: claim.description.clone(),
            created_at: now,
            updated_at: now,
            confirmed_at: (status == PaymentStatus::Confirmed).then_some(now),
        };

        match payments.insert(&payment) {
            Ok(()) => {
                tracing::info!(
                    payment_id = %payment.payment_id,
                    tx_hash = %payment.tx_hash,
                    status = payment.status.as_str(),
                    "payment recorded"
                );
                Ok(payment)
            }
            // Concurrent submission of the same hash: the constraint chose
            // a winner, so read it back and return it.
            Err(StoreError::AlreadyExists(_)) => payments
                .find_by_tx_hash(&claim.tx_hash)?
                .ok_or(ReconcileError::PaymentNotFound),
            Err(e) => Err(e.into()),
        }
    }

    /// Re-query the ledger for a pending payment and apply the receipt.
    ///
    /// Confirmed, failed, and cancelled payments return unchanged without
    /// any ledger call.
    pub async fn refresh(
        &self,
        user_id: Uuid,
        payment_id: Uuid,
    ) -> Result<StoredPayment, ReconcileError> {
        let payments = PaymentRepository::new(self.store);
        let payment = payments
            .find_by_id(payment_id)?
            .filter(|p| p.user_id == user_id)
            .ok_or(ReconcileError::PaymentNotFound)?;

        if payment.status != PaymentStatus::Pending {
            return Ok(payment);
        }

        let receipt = match self.ledger.receipt_by_hash(&payment.tx_hash).await? {
            Some(receipt) => receipt,
            // Still unmined; reconciliation stays deferred.
            None => return Ok(payment),
        };

        let next = if !receipt.success {
            PaymentStatus::Failed
        } else if self.depth_reached(&receipt).await? {
            PaymentStatus::Confirmed
        } else {
            return Ok(payment);
        };

        let fields = ReceiptFields {
            block_number: receipt.block_number,
            gas_used: Some(receipt.gas_used),
            gas_price: Some(receipt.effective_gas_price.to_string()),
        };
        match payments.update_status(payment_id, next, fields) {
            Ok(updated) => {
                tracing::info!(
                    payment_id = %payment_id,
                    status = next.as_str(),
                    "payment status reconciled"
                );
                Ok(updated)
            }
            // A concurrent refresh finished the transition first; its
            // result stands.
            Err(StoreError::InvalidTransition { .. }) => payments
                .find_by_id(payment_id)?
                .ok_or(ReconcileError::PaymentNotFound),
            Err(e) => Err(e.into()),
        }
    }

    /// Whether a successful receipt has the required confirmation depth.
    ///
    /// At the default depth of 1 an existing receipt is enough and no
    /// height query is made.
    async fn depth_reached(&self, receipt: &ReceiptInfo) -> Result<bool, ReconcileError> {
        if self.min_confirmations <= 1 {
            return Ok(true);
        }
        let Some(block) = receipt.block_number else {
            return Ok(false);
        };
        let height = self.ledger.current_height().await?;
        Ok(height.saturating_sub(block) + 1 >= self.min_confirmations)
    }

    fn bound_addresses(&self, user_id: Uuid) -> Result<Vec<Address>, ReconcileError> {
        let users = UserRepository::new(self.store);
        let user = users
            .find_by_id(user_id)?
            .ok_or(ReconcileError::NoWalletBound)?;

        let bindings = BindingRepository::new(self.store);
        let bound = bindings.list_by_phone(&user.phone_number)?;
        bound
            .iter()
            .map(|b| {
                parse_address(&b.address)
                    .map_err(|e| ReconcileError::InvalidClaim(format!("stored binding: {e}")))
            })
            .collect()
    }
}
