// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Swap Data Models
//!
//! Every value here lives for a single coordinator run. Nothing is persisted;
//! the only durable effect of a swap is the on-chain state its transactions
//! change.
//!
//! ## Boundary types
//!
//! - [`SwapInput`] is what the calling layer hands over (strings, unvalidated).
//! - [`SwapRequest`] is the validated form the engine works with.
//! - [`SwapResponse`] is the JSON shape handed back.

use std::fmt;

use alloy::primitives::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};

use crate::blockchain::TxHash;
use crate::error::SwapError;

/// Lowest accepted slippage, in whole percent.
pub const MIN_SLIPPAGE_PERCENT: u8 = 1;
/// Highest accepted slippage, in whole percent.
pub const MAX_SLIPPAGE_PERCENT: u8 = 50;

// =============================================================================
// Request
// =============================================================================

/// Swap input as received from the calling layer.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapInput {
    /// Token to sell (0x + 40 hex chars, or the native sentinel)
    pub source_token: String,
    /// Amount in the token's smallest unit, as a decimal string
    pub amount: String,
    /// Maximum slippage in whole percent
    pub slippage: i64,
}

/// A validated swap request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapRequest {
    pub source_token: Address,
    pub destination_token: Address,
    /// Amount in smallest token units, always non-zero
    pub amount: U256,
    /// Slippage in whole percent, within `[1, 50]`
    pub slippage: u8,
}

impl SwapRequest {
    /// Validate caller input against the configured destination token.
    pub fn from_input(input: &SwapInput, destination_token: Address) -> Result<Self, SwapError> {
        let source_token = parse_address(&input.source_token)?;
        let amount = parse_units(&input.amount)?;
        let slippage = validate_slippage(input.slippage)?;

        if source_token == destination_token {
            return Err(SwapError::Validation(
                "Source token must differ from the destination token".to_string(),
            ));
        }

        Ok(Self {
            source_token,
            destination_token,
            amount,
            slippage,
        })
    }
}

/// Parse an address that must be `0x` followed by 40 hex characters.
pub fn parse_address(raw: &str) -> Result<Address, SwapError> {
    let raw = raw.trim();
    if !raw.starts_with("0x") {
        return Err(SwapError::Validation("Address must start with 0x".to_string()));
    }
    if raw.len() != 42 {
        return Err(SwapError::Validation(
            "Address must be 42 characters (0x + 40 hex)".to_string(),
        ));
    }
    if !raw[2..].chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(SwapError::Validation(
            "Address must contain only hex characters".to_string(),
        ));
    }
    raw.parse()
        .map_err(|e| SwapError::Validation(format!("Invalid address: {e}")))
}

/// Parse a decimal string of smallest units into a non-zero amount.
pub fn parse_units(raw: &str) -> Result<U256, SwapError> {
    let raw = raw.trim();
    if raw.is_empty() || !raw.chars().all(|c| c.is_ascii_digit()) {
        return Err(SwapError::Validation(
            "Amount must be a decimal integer in the token's smallest unit".to_string(),
        ));
    }
    let amount = U256::from_str_radix(raw, 10)
        .map_err(|e| SwapError::Validation(format!("Amount out of range: {e}")))?;
    if amount.is_zero() {
        return Err(SwapError::Validation("Amount must be greater than zero".to_string()));
    }
    Ok(amount)
}

fn validate_slippage(raw: i64) -> Result<u8, SwapError> {
    let range = i64::from(MIN_SLIPPAGE_PERCENT)..=i64::from(MAX_SLIPPAGE_PERCENT);
    if !range.contains(&raw) {
        return Err(SwapError::Validation(format!(
            "Slippage must be between {MIN_SLIPPAGE_PERCENT} and {MAX_SLIPPAGE_PERCENT} percent"
        )));
    }
    // Range check above guarantees the value fits.
    Ok(raw as u8)
}

// =============================================================================
// Aggregator outputs
// =============================================================================

/// Priced route for a swap. Never reused across coordinator runs.
#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    pub source_amount: U256,
    pub destination_amount: U256,
    pub estimated_gas: u64,
    /// Opaque routing metadata (protocol split) as returned by the aggregator
    pub route: serde_json::Value,
}

/// An unsigned call produced by the aggregator, signed and sent immediately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionIntent {
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
    /// Gas limit suggested by the aggregator, if any
    pub gas_limit: Option<u64>,
    /// Gas price suggested by the aggregator, if any
    pub gas_price: Option<u128>,
}

impl fmt::Display for TransactionIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "call to {} with {} bytes of data and value {}",
            self.to,
            self.data.len(),
            self.value
        )
    }
}

// =============================================================================
// Result
// =============================================================================

/// Outcome of a completed coordinator run.
#[derive(Debug, Clone, PartialEq)]
pub struct SwapResult {
    /// Present only when an approval had to be submitted
    pub approval_tx_hash: Option<TxHash>,
    pub swap_tx_hash: TxHash,
    pub quote: Quote,
}

/// JSON response handed back to the calling layer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approval_tx_hash: Option<String>,
    pub swap_tx_hash: String,
    pub quote: QuoteResponse,
}

/// Quote summary in the response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteResponse {
    pub src_amount: String,
    pub dst_amount: String,
    pub estimated_gas: u64,
    pub protocols: serde_json::Value,
}

impl From<&SwapResult> for SwapResponse {
    fn from(result: &SwapResult) -> Self {
        Self {
            approval_tx_hash: result.approval_tx_hash.map(|h| h.to_string()),
            swap_tx_hash: result.swap_tx_hash.to_string(),
            quote: QuoteResponse {
                src_amount: result.quote.source_amount.to_string(),
                dst_amount: result.quote.destination_amount.to_string(),
                estimated_gas: result.quote.estimated_gas,
                protocols: result.quote.route.clone(),
            },
        }
    }
}
