// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! EVM JSON-RPC client and the chain interfaces the swap engine depends on.

use std::future::{Future, IntoFuture};
use std::time::Duration;

use alloy::{
    eips::BlockId,
    network::Ethereum,
    primitives::{Address, Bytes, U256},
    providers::{Provider, RootProvider},
    rpc::types::TransactionRequest,
    transports::{RpcError, TransportErrorKind},
};
use async_trait::async_trait;

use super::erc20::Erc20Contract;
use super::types::{NetworkConfig, ReceiptStatus, TxHash};
use crate::models::TransactionIntent;

/// Read side of the chain.
#[async_trait]
pub trait BlockchainReader: Send + Sync {
    /// Transaction count for `address`, including pending transactions.
    async fn pending_nonce(&self, address: Address) -> Result<u64, ChainClientError>;

    /// Receipt status for `hash`, or `None` while the transaction is unmined.
    async fn receipt(&self, hash: TxHash) -> Result<Option<ReceiptStatus>, ChainClientError>;

    /// Current gas price in wei.
    async fn gas_price(&self) -> Result<u128, ChainClientError>;

    /// Gas needed to execute `intent` from `from`.
    async fn estimate_gas(
        &self,
        from: Address,
        intent: &TransactionIntent,
    ) -> Result<u64, ChainClientError>;

    /// ERC-20 `allowance(owner, spender)` read directly from the token contract.
    async fn token_allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> Result<U256, ChainClientError>;
}

/// Write side of the chain.
#[async_trait]
pub trait BlockchainWriter: Send + Sync {
    /// Submit a signed, EIP-2718 encoded transaction.
    async fn broadcast(&self, raw_transaction: Bytes) -> Result<TxHash, ChainClientError>;
}

/// JSON-RPC client for an EVM chain.
///
/// Every call is bounded by the configured timeout and none is retried.
pub struct EvmClient {
    /// Network configuration
    network: NetworkConfig,
    /// Alloy HTTP provider
    provider: RootProvider<Ethereum>,
    /// Per-call timeout
    timeout: Duration,
}

impl EvmClient {
    /// Create a new client for the specified network.
    pub fn new(network: NetworkConfig, timeout: Duration) -> Result<Self, ChainClientError> {
        let url: url::Url = network
            .rpc_url
            .parse()
            .map_err(|e: url::ParseError| ChainClientError::InvalidRpcUrl(e.to_string()))?;

        let provider = RootProvider::<Ethereum>::new_http(url);

        Ok(Self {
            network,
            provider,
            timeout,
        })
    }

    /// Get the network configuration.
    pub fn network(&self) -> &NetworkConfig {
        &self.network
    }

    async fn bounded<T, F>(&self, call: &'static str, fut: F) -> Result<T, ChainClientError>
    where
        F: Future<Output = Result<T, RpcError<TransportErrorKind>>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result.map_err(|e| classify_rpc_error(call, e)),
            Err(_) => Err(ChainClientError::Timeout {
                call,
                after: self.timeout,
            }),
        }
    }
}

#[async_trait]
impl BlockchainReader for EvmClient {
    async fn pending_nonce(&self, address: Address) -> Result<u64, ChainClientError> {
        self.bounded(
            "eth_getTransactionCount",
            self.provider
                .get_transaction_count(address)
                .block_id(BlockId::pending())
                .into_future(),
        )
        .await
    }

    async fn receipt(&self, hash: TxHash) -> Result<Option<ReceiptStatus>, ChainClientError> {
        let receipt = self
            .bounded(
                "eth_getTransactionReceipt",
                self.provider.get_transaction_receipt(hash),
            )
            .await?;
        Ok(receipt.map(|r| ReceiptStatus::from_status_flag(r.status())))
    }

    async fn gas_price(&self) -> Result<u128, ChainClientError> {
        self.bounded("eth_gasPrice", self.provider.get_gas_price())
            .await
    }

    async fn estimate_gas(
        &self,
        from: Address,
        intent: &TransactionIntent,
    ) -> Result<u64, ChainClientError> {
        let tx = TransactionRequest::default()
            .from(from)
            .to(intent.to)
            .value(intent.value)
            .input(intent.data.clone().into());

        self.bounded("eth_estimateGas", self.provider.estimate_gas(tx).into_future())
            .await
    }

    async fn token_allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> Result<U256, ChainClientError> {
        let contract = Erc20Contract::new(&self.provider, token);
        match tokio::time::timeout(self.timeout, contract.allowance(owner, spender)).await {
            Ok(result) => result,
            Err(_) => Err(ChainClientError::Timeout {
                call: "allowance",
                after: self.timeout,
            }),
        }
    }
}

#[async_trait]
impl BlockchainWriter for EvmClient {
    async fn broadcast(&self, raw_transaction: Bytes) -> Result<TxHash, ChainClientError> {
        let pending = self
            .bounded(
                "eth_sendRawTransaction",
                self.provider.send_raw_transaction(&raw_transaction),
            )
            .await?;
        Ok(*pending.tx_hash())
    }
}

/// Split node-side rejections (JSON-RPC error responses) from transport failures.
fn classify_rpc_error(call: &'static str, error: RpcError<TransportErrorKind>) -> ChainClientError {
    match error {
        RpcError::ErrorResp(payload) => ChainClientError::Rejected(format!(
            "{call}: {} (code {})",
            payload.message, payload.code
        )),
        other => ChainClientError::Transport(format!("{call}: {other}")),
    }
}

/// Errors that can occur during blockchain operations.
#[derive(Debug, thiserror::Error)]
pub enum ChainClientError {
    #[error("Invalid RPC URL: {0}")]
    InvalidRpcUrl(String),

    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("RPC call {call} timed out after {after:?}")]
    Timeout { call: &'static str, after: Duration },

    #[error("RPC transport error: {0}")]
    Transport(String),

    #[error("RPC rejected request: {0}")]
    Rejected(String),

    #[error("Contract error: {0}")]
    Contract(String),

    #[error("Signing failed: {0}")]
    Signing(String),
}

impl ChainClientError {
    /// Whether the node answered and refused, as opposed to being unreachable.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            ChainClientError::Rejected(_) | ChainClientError::Contract(_) | ChainClientError::Signing(_)
        )
    }
}
