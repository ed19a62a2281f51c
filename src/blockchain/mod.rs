// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Blockchain integration for EVM chains.
//!
//! This module provides functionality for:
//! - Reading pending nonces, receipts, gas prices and ERC-20 allowances
//! - Local transaction signing with per-account nonce serialisation
//! - Broadcasting raw transactions

pub mod client;
pub mod erc20;
pub mod signing;
pub mod types;

pub use client::{BlockchainReader, BlockchainWriter, ChainClientError, EvmClient};
pub use signing::{ensure_active, NonceLocks, SigningCredential, TransactionSigner};
pub use types::*;
