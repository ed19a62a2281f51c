// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Swap orchestration.
//!
//! - `allowance` - approval check, submission and bounded confirmation wait
//! - `executor` - final swap transaction
//! - `coordinator` - the per-request state machine tying the steps together

pub mod allowance;
pub mod coordinator;
pub mod executor;

#[cfg(test)]
pub(crate) mod testing;

pub use allowance::{AllowanceCheck, AllowanceGuard, Confirmation};
pub use coordinator::{StageTracker, SwapCoordinator, SwapStage};
pub use executor::SwapExecutor;
