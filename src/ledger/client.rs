// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ledger node client for on-chain queries.
//!
//! A stateless query façade over an alloy HTTP provider. The service never
//! signs or broadcasts; it only reads balances, transactions, receipts,
//! and the chain head to verify payment claims.
//!
//! Every call is bounded by the configured timeout so a slow node cannot
//! pin a request worker. Transport failures and timeouts surface as
//! [`LedgerError::Unavailable`] (retryable); an object the ledger has
//! never seen is [`LedgerError::NotFound`] (terminal). A transaction that
//! is in the mempool but unmined is *not* an error: it comes back with
//! `is_pending = true` and no receipt.

use std::future::Future;
use std::str::FromStr;
use std::time::Duration;

use alloy::{
    consensus::Transaction as _,
    network::Ethereum,
    primitives::{Address, TxHash, U256},
    providers::{
        fillers::{BlobGasFiller, ChainIdFiller, FillProvider, GasFiller, JoinFill, NonceFiller},
        Identity, Provider, ProviderBuilder, RootProvider,
    },
    rpc::types::TransactionRequest,
};

use super::types::{ReceiptInfo, TxDetails};

/// HTTP provider type (with all fillers).
type HttpProvider = FillProvider<
    JoinFill<
        Identity,
        JoinFill<GasFiller, JoinFill<BlobGasFiller, JoinFill<NonceFiller, ChainIdFiller>>>,
    >,
    RootProvider<Ethereum>,
>;

/// Errors from ledger queries.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("invalid RPC URL: {0}")]
    InvalidRpcUrl(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid transaction hash: {0}")]
    InvalidTxHash(String),

    #[error("object not found on ledger: {0}")]
    NotFound(String),

    #[error("ledger unavailable: {0}")]
    Unavailable(String),
}

/// The query operations the payment reconciler depends on.
///
/// Split out as a trait so reconciliation logic can be exercised against a
/// scripted ledger in tests; [`LedgerClient`] is the production
/// implementation.
pub trait LedgerQuery {
    /// Fetch a transaction by hash; `is_pending` is true for a mempool
    /// transaction that has not been mined yet.
    fn transaction_by_hash(
        &self,
        tx_hash: &str,
    ) -> impl Future<Output = Result<(TxDetails, bool), LedgerError>> + Send;

    /// Fetch the execution receipt; `None` while the transaction is unmined.
    fn receipt_by_hash(
        &self,
        tx_hash: &str,
    ) -> impl Future<Output = Result<Option<ReceiptInfo>, LedgerError>> + Send;

    /// Current chain height.
    fn current_height(&self) -> impl Future<Output = Result<u64, LedgerError>> + Send;
}

/// Ledger node client.
pub struct LedgerClient {
    provider: HttpProvider,
    request_timeout: Duration,
}

impl LedgerClient {
    /// Create a new client for the given RPC endpoint.
    pub fn new(rpc_url: &str, request_timeout: Duration) -> Result<Self, LedgerError> {
        let url: url::Url = rpc_url
            .parse()
            .map_err(|e: url::ParseError| LedgerError::InvalidRpcUrl(e.to_string()))?;

        let provider = ProviderBuilder::new().connect_http(url);

        Ok(Self {
            provider,
            request_timeout,
        })
    }

    /// Run a provider call under the configured timeout.
    async fn bounded<T, E, F>(&self, what: &str, fut: F) -> Result<T, LedgerError>
    where
        E: std::fmt::Display,
        F: std::future::IntoFuture<Output = Result<T, E>>,
    {
        match tokio::time::timeout(self.request_timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                tracing::warn!(call = what, error = %e, "ledger call failed");
                Err(LedgerError::Unavailable(e.to_string()))
            }
            Err(_) => {
                tracing::warn!(call = what, "ledger call timed out");
                Err(LedgerError::Unavailable(format!("{what} timed out")))
            }
        }
    }

    /// Get the native balance of an address, in base units.
    pub async fn balance_of(&self, address: &str) -> Result<U256, LedgerError> {
        let addr = parse_address(address)?;
        self.bounded("get_balance", self.provider.get_balance(addr))
            .await
    }

    /// Current chain height.
    pub async fn height(&self) -> Result<u64, LedgerError> {
        self.bounded("get_block_number", self.provider.get_block_number())
            .await
    }

    /// Fetch a transaction by hash.
    pub async fn transaction(&self, tx_hash: &str) -> Result<(TxDetails, bool), LedgerError> {
        let hash = parse_tx_hash(tx_hash)?;
        let tx = self
            .bounded(
                "get_transaction_by_hash",
                self.provider.get_transaction_by_hash(hash),
            )
            .await?
            .ok_or_else(|| LedgerError::NotFound(format!("transaction {tx_hash}")))?;

        let is_pending = tx.block_number.is_none();
        let details = TxDetails {
            hash: format!("{:#x}", hash),
            from: tx.inner.signer(),
            to: tx.to(),
            value: tx.value(),
            gas_limit: tx.gas_limit(),
            gas_price: tx.gas_price().unwrap_or_else(|| tx.max_fee_per_gas()),
        };
        Ok((details, is_pending))
    }

    /// Fetch the execution receipt; `None` while the transaction is unmined.
    pub async fn receipt(&self, tx_hash: &str) -> Result<Option<ReceiptInfo>, LedgerError> {
        let hash = parse_tx_hash(tx_hash)?;
        let receipt = self
            .bounded(
                "get_transaction_receipt",
                self.provider.get_transaction_receipt(hash),
            )
            .await?;

        Ok(receipt.map(|r| ReceiptInfo {
            success: r.status(),
            block_number: r.block_number,
            gas_used: r.gas_used,
            effective_gas_price: r.effective_gas_price,
        }))
    }

    /// Estimate gas for a plain value transfer.
    pub async fn estimate_gas(
        &self,
        from: &str,
        to: &str,
        value: U256,
    ) -> Result<u64, LedgerError> {
        let from_addr = parse_address(from)?;
        let to_addr = parse_address(to)?;

        let tx = TransactionRequest::default()
            .from(from_addr)
            .to(to_addr)
            .value(value);

        self.bounded("estimate_gas", self.provider.estimate_gas(tx))
            .await
    }
}

impl LedgerQuery for LedgerClient {
    async fn transaction_by_hash(&self, tx_hash: &str) -> Result<(TxDetails, bool), LedgerError> {
        self.transaction(tx_hash).await
    }

    async fn receipt_by_hash(&self, tx_hash: &str) -> Result<Option<ReceiptInfo>, LedgerError> {
        self.receipt(tx_hash).await
    }

    async fn current_height(&self) -> Result<u64, LedgerError> {
        self.height().await
    }
}

/// Parse and validate a 0x-prefixed address.
pub fn parse_address(address: &str) -> Result<Address, LedgerError> {
    Address::from_str(address).map_err(|e| LedgerError::InvalidAddress(e.to_string()))
}

/// Parse and validate a 0x-prefixed 32-byte transaction hash.
pub fn parse_tx_hash(tx_hash: &str) -> Result<TxHash, LedgerError> {
    TxHash::from_str(tx_hash).map_err(|e| LedgerError::InvalidTxHash(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_construction_validates_url() {
        assert!(LedgerClient::new("http://127.0.0.1:8545", Duration::from_secs(5)).is_ok());
        assert!(matches!(
            LedgerClient::new("not a url", Duration::from_secs(5)),
            Err(LedgerError::InvalidRpcUrl(_))
        ));
    }

    #[test]
    fn address_parsing_rejects_malformed_input() {
        assert!(parse_address("0x742d35Cc6634C0532925a3b844Bc9e7595f4aB12").is_ok());
        assert!(matches!(
            parse_address("0x742d"),
            Err(LedgerError::InvalidAddress(_))
        ));
        assert!(matches!(
            parse_address("742d35Cc6634C0532925a3b844Bc9e7595f4aB12zz"),
            Err(LedgerError::InvalidAddress(_))
        ));
    }

    #[test]
    fn tx_hash_parsing_rejects_malformed_input() {
        assert!(parse_tx_hash(
            "0x88df016429689c079f3b2f6ad39fa052532c56795b733da78a91ebe6a713944b"
        )
        .is_ok());
        assert!(matches!(
            parse_tx_hash("0x1234"),
            Err(LedgerError::InvalidTxHash(_))
        ));
    }

    #[tokio::test]
    async fn unreachable_node_reports_unavailable() {
        // Port 9 (discard) with a tight timeout: the call must come back
        // as Unavailable, never hang or panic.
        let client =
            LedgerClient::new("http://127.0.0.1:9", Duration::from_millis(250)).unwrap();
        let result = client.height().await;
        assert!(matches!(result, Err(LedgerError::Unavailable(_))));
    }
}
