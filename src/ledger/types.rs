// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ledger query result types and display formatting.

use alloy::primitives::{Address, U256};

/// Details of an on-chain transaction, read back from the ledger node.
///
/// Values stay as arbitrary-precision integers; conversion to a decimal
/// display string happens only at the response boundary via
/// [`format_units`].
#[derive(Debug, Clone)]
pub struct TxDetails {
    /// Transaction hash (0x prefixed).
    pub hash: String,
    /// Recovered sender address.
    pub from: Address,
    /// Recipient address; `None` for contract creation.
    pub to: Option<Address>,
    /// Transfer value in the chain's base unit.
    pub value: U256,
    /// Gas limit the sender attached.
    pub gas_limit: u64,
    /// Gas price (legacy) or max fee per gas (dynamic-fee) in wei.
    pub gas_price: u128,
}

/// Execution outcome of a mined transaction.
#[derive(Debug, Clone, Copy)]
pub struct ReceiptInfo {
    /// Whether execution succeeded (a reverted transaction reports false).
    pub success: bool,
    /// Block the transaction was included in.
    pub block_number: Option<u64>,
    /// Gas actually consumed.
    pub gas_used: u64,
    /// Effective gas price paid, in wei.
    pub effective_gas_price: u128,
}

/// Format a base-unit amount with the given number of decimals.
///
/// Pure integer string math; never goes through floating point, so large
/// token amounts keep full precision. Fractional digits are trimmed and
/// capped at six for display.
pub fn format_units(amount: U256, decimals: u8) -> String {
    if amount.is_zero() {
        return "0".to_string();
    }

    let divisor = U256::from(10u64).pow(U256::from(decimals));
    let whole = amount / divisor;
    let remainder = amount % divisor;

    if remainder.is_zero() {
        whole.to_string()
    } else {
        let decimal_str = format!("{:0>width$}", remainder, width = decimals as usize);
        let trimmed = decimal_str.trim_end_matches('0');
        if trimmed.is_empty() {
            whole.to_string()
        } else {
            format!("{}.{}", whole, &trimmed[..trimmed.len().min(6)])
        }
    }
}
