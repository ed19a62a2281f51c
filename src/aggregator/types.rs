// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Aggregator wire formats.
//!
//! Amounts and gas prices arrive as decimal strings; gas limits as numbers.
//! Field aliases cover the v5 response names still returned by some
//! deployments.

use std::str::FromStr;

use alloy::primitives::{Address, Bytes, U256};
use serde::Deserialize;

use super::client::AggregatorError;
use crate::models::{Quote, TransactionIntent};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct QuoteBody {
    #[serde(default, alias = "fromTokenAmount", alias = "fromAmount")]
    pub src_amount: Option<String>,
    #[serde(alias = "toTokenAmount", alias = "toAmount")]
    pub dst_amount: String,
    #[serde(default, alias = "estimatedGas")]
    pub gas: u64,
    #[serde(default)]
    pub protocols: serde_json::Value,
}

impl QuoteBody {
    /// `requested` stands in for the source amount when the response omits it.
    pub fn into_quote(self, requested: U256) -> Result<Quote, AggregatorError> {
        let source_amount = match self.src_amount {
            Some(raw) => parse_u256("srcAmount", &raw)?,
            None => requested,
        };
        Ok(Quote {
            source_amount,
            destination_amount: parse_u256("dstAmount", &self.dst_amount)?,
            estimated_gas: self.gas,
            route: self.protocols,
        })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct AllowanceBody {
    pub allowance: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SpenderBody {
    pub address: Address,
}

/// Transaction payload shared by the approval and swap endpoints.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TransactionBody {
    pub to: Address,
    pub data: Bytes,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub gas: Option<u64>,
    #[serde(default)]
    pub gas_price: Option<String>,
}

impl TransactionBody {
    pub fn into_intent(self) -> Result<TransactionIntent, AggregatorError> {
        let value = match self.value.as_deref() {
            Some(raw) => parse_u256("value", raw)?,
            None => U256::ZERO,
        };
        let gas_price = self
            .gas_price
            .as_deref()
            .map(|raw| {
                raw.trim().parse::<u128>().map_err(|e| {
                    AggregatorError::InvalidResponse(format!("gasPrice `{raw}`: {e}"))
                })
            })
            .transpose()?;

        Ok(TransactionIntent {
            to: self.to,
            data: self.data,
            value,
            // Zero means the aggregator skipped estimation.
            gas_limit: self.gas.filter(|g| *g > 0),
            gas_price,
        })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct SwapBody {
    pub tx: TransactionBody,
}

pub(crate) fn parse_u256(field: &str, raw: &str) -> Result<U256, AggregatorError> {
    U256::from_str(raw.trim())
        .map_err(|e| AggregatorError::InvalidResponse(format!("{field} `{raw}`: {e}")))
}
