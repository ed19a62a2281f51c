// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Relational Swap Engine - Asset to Stablecoin Swaps
//!
//! Converts a user-held asset into the configured stablecoin by sequencing a
//! DEX aggregator quote, an ERC-20 approval when one is needed, and the swap
//! transaction itself. Transactions are signed locally and broadcast over
//! JSON-RPC.
//!
//! ## Modules
//!
//! - `aggregator` - DEX aggregator REST client (reqwest)
//! - `blockchain` - EVM chain client, ERC-20 bindings and signing (alloy)
//! - `config` - Engine configuration and environment loading
//! - `error` - Error taxonomy and HTTP mapping
//! - `logging` - Tracing subscriber setup
//! - `models` - Request, quote and result types
//! - `swap` - Allowance guard, swap executor and the coordinating state machine

pub mod aggregator;
pub mod blockchain;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod swap;

pub use config::EngineConfig;
pub use error::{ApiError, SetupError, SwapError};
pub use models::{SwapInput, SwapRequest, SwapResponse, SwapResult};
pub use swap::SwapCoordinator;
