// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Final swap transaction: built by the aggregator, signed and broadcast locally.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::aggregator::AggregatorApi;
use crate::blockchain::{ensure_active, TransactionSigner, TxHash};
use crate::error::SwapError;
use crate::models::SwapRequest;

pub struct SwapExecutor {
    aggregator: Arc<dyn AggregatorApi>,
}

impl SwapExecutor {
    pub fn new(aggregator: Arc<dyn AggregatorApi>) -> Self {
        Self { aggregator }
    }

    /// Build the swap for the signer's account and broadcast it.
    ///
    /// Not retried; aggregator and chain errors are returned as they are.
    pub async fn execute(
        &self,
        request: &SwapRequest,
        signer: &TransactionSigner<'_>,
        cancel: &CancellationToken,
    ) -> Result<TxHash, SwapError> {
        ensure_active(cancel)?;
        let intent = self
            .aggregator
            .swap_transaction(request, signer.address())
            .await?;

        let hash = signer.sign_and_send(&intent, cancel).await?;
        info!(swap_tx = %hash, router = %intent.to, "Swap submitted");
        Ok(hash)
    }
}
