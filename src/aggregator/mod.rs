// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! DEX aggregator integration: quotes, allowance views and ready-to-sign
//! approval and swap payloads.

pub mod client;
mod types;

pub use client::{AggregatorApi, AggregatorError, OneInchClient};
