// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! DEX aggregator REST client.

use std::fmt;
use std::time::Duration;

use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::types::{AllowanceBody, QuoteBody, SpenderBody, SwapBody, TransactionBody};
use crate::blockchain::is_native;
use crate::config::EngineConfig;
use crate::error::SwapError;
use crate::models::{Quote, SwapRequest, TransactionIntent};

/// The four logical aggregator calls the engine makes, plus the spender
/// lookup used when allowances are read on-chain.
#[async_trait]
pub trait AggregatorApi: Send + Sync {
    /// Price `amount` of `src` in `dst`. Never retried: quotes go stale.
    async fn quote(&self, src: Address, dst: Address, amount: U256) -> Result<Quote, AggregatorError>;

    /// The aggregator's view of the router allowance `owner` granted on `token`.
    async fn allowance(&self, token: Address, owner: Address) -> Result<U256, AggregatorError>;

    /// Router contract that approvals are granted to.
    async fn spender(&self) -> Result<Address, AggregatorError>;

    /// Approval payload for exactly `amount` of `token`.
    async fn approval_transaction(
        &self,
        token: Address,
        amount: U256,
    ) -> Result<TransactionIntent, AggregatorError>;

    /// Final swap payload for `request`, executed from `from`.
    async fn swap_transaction(
        &self,
        request: &SwapRequest,
        from: Address,
    ) -> Result<TransactionIntent, AggregatorError>;
}

#[derive(Debug, thiserror::Error)]
pub enum AggregatorError {
    #[error("Aggregator configuration invalid: {0}")]
    Config(String),

    #[error("Aggregator returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Aggregator request failed: {0}")]
    Transport(String),

    #[error("Aggregator response was invalid: {0}")]
    InvalidResponse(String),
}

impl From<AggregatorError> for SwapError {
    fn from(error: AggregatorError) -> Self {
        match error {
            AggregatorError::Status { status, body } => SwapError::Aggregator { status, body },
            AggregatorError::Transport(msg) => SwapError::Network(msg),
            AggregatorError::InvalidResponse(msg) => SwapError::InvalidResponse(msg),
            AggregatorError::Config(msg) => SwapError::Config(msg),
        }
    }
}

/// 1inch-compatible swap API client.
#[derive(Clone)]
pub struct OneInchClient {
    /// Endpoint root including the chain id, without trailing slash
    base_url: String,
    api_key: Option<String>,
    http: Client,
}

impl OneInchClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, AggregatorError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        url::Url::parse(&base_url)
            .map_err(|e| AggregatorError::Config(format!("invalid base URL `{base_url}`: {e}")))?;

        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AggregatorError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url,
            api_key,
            http,
        })
    }

    pub fn from_config(config: &EngineConfig) -> Result<Self, AggregatorError> {
        Self::new(
            config.aggregator_url(),
            config.aggregator_api_key.clone(),
            config.http_timeout,
        )
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, AggregatorError> {
        let mut request = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .header("Accept", "application/json")
            .query(query);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AggregatorError::Transport(format!("GET {path} failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AggregatorError::Transport(format!("GET {path} body failed: {e}")))?;

        if !status.is_success() {
            debug!(path, status = status.as_u16(), body = %body, "Aggregator request rejected");
            return Err(AggregatorError::Status {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body)
            .map_err(|e| AggregatorError::InvalidResponse(format!("GET {path} invalid JSON: {e}")))
    }
}

impl fmt::Debug for OneInchClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OneInchClient")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish_non_exhaustive()
    }
}

/// Lower-case hex rendering the aggregator expects for account addresses.
fn lower_hex(address: &Address) -> String {
    address.to_string().to_ascii_lowercase()
}

#[async_trait]
impl AggregatorApi for OneInchClient {
    async fn quote(&self, src: Address, dst: Address, amount: U256) -> Result<Quote, AggregatorError> {
        let body: QuoteBody = self
            .get_json(
                "/quote",
                &[
                    ("src", src.to_string()),
                    ("dst", dst.to_string()),
                    ("amount", amount.to_string()),
                    ("includeTokensInfo", "true".to_string()),
                    ("includeProtocols", "true".to_string()),
                    ("includeGas", "true".to_string()),
                ],
            )
            .await?;
        body.into_quote(amount)
    }

    async fn allowance(&self, token: Address, owner: Address) -> Result<U256, AggregatorError> {
        if is_native(&token) {
            return Ok(U256::MAX);
        }
        let body: AllowanceBody = self
            .get_json(
                "/approve/allowance",
                &[
                    ("tokenAddress", token.to_string()),
                    ("walletAddress", lower_hex(&owner)),
                ],
            )
            .await?;
        super::types::parse_u256("allowance", &body.allowance)
    }

    async fn spender(&self) -> Result<Address, AggregatorError> {
        let body: SpenderBody = self.get_json("/approve/spender", &[]).await?;
        Ok(body.address)
    }

    async fn approval_transaction(
        &self,
        token: Address,
        amount: U256,
    ) -> Result<TransactionIntent, AggregatorError> {
        let body: TransactionBody = self
            .get_json(
                "/approve/transaction",
                &[
                    ("tokenAddress", token.to_string()),
                    ("amount", amount.to_string()),
                ],
            )
            .await?;
        body.into_intent()
    }

    async fn swap_transaction(
        &self,
        request: &SwapRequest,
        from: Address,
    ) -> Result<TransactionIntent, AggregatorError> {
        let body: SwapBody = self
            .get_json(
                "/swap",
                &[
                    ("src", request.source_token.to_string()),
                    ("dst", request.destination_token.to_string()),
                    ("amount", request.amount.to_string()),
                    ("from", lower_hex(&from)),
                    ("slippage", request.slippage.to_string()),
                    ("disableEstimate", "false".to_string()),
                    ("allowPartialFill", "false".to_string()),
                ],
            )
            .await?;
        body.tx.into_intent()
    }
}
