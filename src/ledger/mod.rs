// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ledger integration module.
//!
//! This module provides:
//! - Read-only queries against a remote EVM ledger node (balances,
//!   transactions, receipts, chain height, gas estimation)
//! - Signature recovery for wallet-ownership proofs
//!
//! The service treats the ledger as ground truth; nothing here signs or
//! broadcasts transactions.

pub mod client;
pub mod signature;
pub mod types;

pub use client::{parse_address, parse_tx_hash, LedgerClient, LedgerError, LedgerQuery};
pub use signature::{recover_signer, SignatureError};
pub use types::{format_units, ReceiptInfo, TxDetails};
