// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Repository layer providing typed access to the embedded store.
//!
//! Each repository provides the operations for one entity type; all row
//! bytes go through serde_json and every multi-table change runs inside a
//! single write transaction.

pub mod bindings;
pub mod payments;
pub mod sessions;
pub mod users;

pub use bindings::{BindingRepository, StoredBinding};
pub use payments::{
    PaymentPage, PaymentRepository, PaymentStatus, ReceiptFields, StoredPayment,
};
pub use sessions::{SessionRepository, StoredSession};
pub use users::{StoredUser, UserRepository};
