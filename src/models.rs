// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Request and response structures for the REST API. All types derive
//! `Serialize`/`Deserialize` and `ToSchema` for JSON handling and OpenAPI
//! documentation.
//!
//! Amounts are decimal base-unit strings end to end; nothing in the API
//! surface carries a floating-point number.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::storage::{PaymentStatus, StoredPayment};

// =============================================================================
// Wallet Address Type
// =============================================================================

/// Ethereum-compatible wallet address wrapper.
///
/// Format: `0x` followed by 40 hexadecimal characters (20 bytes).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WalletAddress(pub String);

impl std::fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for WalletAddress {
    fn from(value: String) -> Self {
        WalletAddress(value)
    }
}

impl From<&str> for WalletAddress {
    fn from(value: &str) -> Self {
        WalletAddress(value.to_string())
    }
}

// =============================================================================
// Auth Models
// =============================================================================

/// Request to create an account.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SignupRequest {
    /// Unique login name.
    pub username: String,
    /// Unique email address (normalized server-side).
    pub email: String,
    /// Unique phone number; becomes the wallet-binding key.
    pub phone_number: String,
    /// Plaintext password, checked against the complexity rules.
    pub password: String,
}

/// Login credentials.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// The credential pair returned by login and refresh.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TokenPairResponse {
    /// Short-lived signed access token.
    pub access_token: String,
    /// Long-lived opaque refresh token. Rotated on every refresh.
    pub refresh_token: String,
}

/// Request carrying a refresh token (refresh and logout).
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

/// Generic acknowledgement body.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

// =============================================================================
// Account Models
// =============================================================================

/// Request to change the account password.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

/// Request to change the account email.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpdateEmailRequest {
    /// Current password, re-verified before the change.
    pub password: String,
    pub new_email: String,
}

/// Request to delete the account.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct DeleteAccountRequest {
    /// Current password, re-verified before deletion.
    pub password: String,
}

// =============================================================================
// Wallet Models
// =============================================================================

/// Request to bind a wallet by signature proof.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ConnectWalletRequest {
    /// The message that was signed in the wallet.
    pub message: String,
    /// Hex-encoded 65-byte signature (`0x` prefix accepted).
    pub signature: String,
}

/// Successful wallet binding.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ConnectWalletResponse {
    /// Checksummed address recovered from the signature.
    pub wallet_address: WalletAddress,
}

/// Addresses bound to a phone number.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AddressListResponse {
    pub addresses: Vec<WalletAddress>,
}

/// Balance of one address.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BalanceResponse {
    pub address: WalletAddress,
    /// Balance in base units (wei), full precision.
    pub balance_wei: String,
    /// Display-formatted balance.
    pub balance: String,
}

/// Balances across all of the caller's bound addresses.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct WalletBalancesResponse {
    pub wallets: Vec<BalanceResponse>,
    /// Integer sum of all balances in base units.
    pub total_wei: String,
    /// Display-formatted total.
    pub total: String,
    pub wallet_count: usize,
}

/// Request to estimate gas for a planned transfer.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct EstimateGasRequest {
    /// Sender address (must be bound to the caller).
    pub from: String,
    /// Recipient address.
    pub to: String,
    /// Transfer value in base units.
    pub amount: String,
}

/// Gas estimate for a planned transfer.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct EstimateGasResponse {
    pub gas_limit: String,
}

// =============================================================================
// Payment Models
// =============================================================================

/// Request to record a payment claim.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreatePaymentRequest {
    /// Declared recipient address.
    pub to_address: String,
    /// Declared transfer value, decimal base units.
    pub amount: String,
    /// Currency tag; defaults to "ETH".
    #[serde(default)]
    pub currency: Option<String>,
    /// Hash of the already-committed on-chain transaction.
    pub transaction_hash: String,
    /// Optional free-text description.
    #[serde(default)]
    pub description: Option<String>,
}

/// A recorded payment.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PaymentResponse {
    pub id: Uuid,
    pub from_address: WalletAddress,
    pub to_address: WalletAddress,
    pub amount: String,
    pub currency: String,
    pub transaction_hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas_used: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<String>,
    pub status: PaymentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmed_at: Option<DateTime<Utc>>,
}

impl From<StoredPayment> for PaymentResponse {
    fn from(p: StoredPayment) -> Self {
        Self {
            id: p.payment_id,
            from_address: WalletAddress(p.from_address),
            to_address: WalletAddress(p.to_address),
            amount: p.amount,
            currency: p.currency,
            transaction_hash: p.tx_hash,
            block_number: p.block_number,
            gas_used: p.gas_used,
            gas_price: p.gas_price,
            status: p.status,
            description: p.description,
            created_at: p.created_at,
            confirmed_at: p.confirmed_at,
        }
    }
}

/// Query parameters for the payment listing.
#[derive(Debug, Deserialize, IntoParams)]
pub struct PaymentListQuery {
    /// Status filter.
    pub status: Option<PaymentStatus>,
    /// 1-based page number (default 1).
    pub page: Option<usize>,
    /// Page size (default 20, clamped to 1..=100).
    pub page_size: Option<usize>,
}

/// Paginated payment listing.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PaymentListResponse {
    pub payments: Vec<PaymentResponse>,
    pub total_count: usize,
    pub page: usize,
    pub page_size: usize,
    pub total_pages: usize,
}

/// Per-user payment statistics.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PaymentStatsResponse {
    pub total_payments: usize,
    pub confirmed: usize,
    pub pending: usize,
    pub failed: usize,
    /// Sum of confirmed amounts in base units, full precision.
    pub total_amount: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_response_from_stored_payment() {
        let now = Utc::now();
        let stored = StoredPayment {
            payment_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            from_address: "0x742d35Cc6634C0532925a3b844Bc9e7595f4aB12".to_string(),
            to_address: "0x8ba1f109551bD432803012645Ac136ddd64DBA72".to_string(),
            amount: "1000000000000000000".to_string(),
            currency: "ETH".to_string(),
            tx_hash: "0xabc".to_string(),
            block_number: Some(100),
            gas_used: Some(21000),
            gas_price: Some("25000000000".to_string()),
            status: PaymentStatus::Confirmed,
            description: Some("rent".to_string()),
            created_at: now,
            updated_at: now,
            confirmed_at: Some(now),
        };

        let response = PaymentResponse::from(stored.clone());
        assert_eq!(response.id, stored.payment_id);
        assert_eq!(response.transaction_hash, stored.tx_hash);
        assert_eq!(response.status, PaymentStatus::Confirmed);
        // The owning user id is not part of the response.
        let json = serde_json::to_string(&response).unwrap();
        assert!(!json.contains(&stored.user_id.to_string()));
    }

    #[test]
    fn payment_status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&PaymentStatus::Confirmed).unwrap(),
            r#""confirmed""#
        );
        let parsed: PaymentStatus = serde_json::from_str(r#""failed""#).unwrap();
        assert_eq!(parsed, PaymentStatus::Failed);
    }
}
