// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Storage Module
//!
//! Persistent application state lives in a single embedded redb database
//! (pure Rust, ACID). There is no in-memory coordination between request
//! handlers: wallet-binding uniqueness, payment transaction-hash
//! uniqueness, and session-digest uniqueness are all enforced by
//! insert-if-absent checks inside serialized write transactions.
//!
//! ## Layout
//!
//! ```text
//! {DATA_DIR}/chainpay.redb
//! ```
//!
//! See [`db`] for the table map and [`repository`] for the typed access
//! layer.

pub mod db;
pub mod repository;

pub use db::{Store, StoreError, StoreResult};
pub use repository::{
    BindingRepository, PaymentPage, PaymentRepository, PaymentStatus, ReceiptFields,
    SessionRepository, StoredBinding, StoredPayment, StoredSession, StoredUser, UserRepository,
};
