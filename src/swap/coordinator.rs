// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Top-level swap state machine.
//!
//! ```text
//! QUOTING -> CHECKING_ALLOWANCE -> [APPROVING -> AWAITING_CONFIRMATION] -> SWAPPING -> DONE
//! ```
//!
//! Any stage can end in `FAILED`. The run is not atomic: an approval that
//! landed before a failed swap stays on-chain, so re-issuing the whole run
//! skips straight from the allowance check to the swap.

use std::fmt;
use std::sync::Arc;

use alloy::primitives::Address;
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use super::allowance::AllowanceGuard;
use super::executor::SwapExecutor;
use crate::aggregator::{AggregatorApi, OneInchClient};
use crate::blockchain::{
    ensure_active, BlockchainReader, BlockchainWriter, EvmClient, NonceLocks, SigningCredential,
    TransactionSigner,
};
use crate::config::EngineConfig;
use crate::error::{SetupError, SwapError};
use crate::models::{SwapInput, SwapRequest, SwapResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapStage {
    Quoting,
    CheckingAllowance,
    Approving,
    AwaitingConfirmation,
    Swapping,
    Done,
    Failed,
}

impl fmt::Display for SwapStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SwapStage::Quoting => "QUOTING",
            SwapStage::CheckingAllowance => "CHECKING_ALLOWANCE",
            SwapStage::Approving => "APPROVING",
            SwapStage::AwaitingConfirmation => "AWAITING_CONFIRMATION",
            SwapStage::Swapping => "SWAPPING",
            SwapStage::Done => "DONE",
            SwapStage::Failed => "FAILED",
        };
        f.write_str(name)
    }
}

/// Stages a run has passed through, in order.
#[derive(Debug, Default)]
pub struct StageTracker {
    history: Vec<SwapStage>,
}

impl StageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest stage, or `None` before the run starts.
    pub fn current(&self) -> Option<SwapStage> {
        self.history.last().copied()
    }

    pub fn history(&self) -> &[SwapStage] {
        &self.history
    }

    fn enter(&mut self, stage: SwapStage) {
        info!(stage = %stage, "Swap stage");
        self.history.push(stage);
    }

    fn fail(&mut self, error: &SwapError) {
        let stage = self.current();
        warn!(
            stage = %stage.map(|s| s.to_string()).unwrap_or_default(),
            error = %error,
            retryable = error.is_retryable(),
            "Swap failed"
        );
        self.history.push(SwapStage::Failed);
    }
}

/// Sequences quote, allowance, approval and swap for one request at a time.
///
/// A coordinator is shared by every run of one engine; its [`NonceLocks`]
/// keep concurrent runs for the same account from colliding on nonces.
pub struct SwapCoordinator {
    chain_id: u64,
    destination_token: Address,
    aggregator: Arc<dyn AggregatorApi>,
    reader: Arc<dyn BlockchainReader>,
    writer: Arc<dyn BlockchainWriter>,
    locks: Arc<NonceLocks>,
    guard: AllowanceGuard,
    executor: SwapExecutor,
}

impl SwapCoordinator {
    pub fn new(
        config: &EngineConfig,
        aggregator: Arc<dyn AggregatorApi>,
        reader: Arc<dyn BlockchainReader>,
        writer: Arc<dyn BlockchainWriter>,
    ) -> Self {
        let guard = AllowanceGuard::new(
            aggregator.clone(),
            reader.clone(),
            config.allowance_source,
            config.confirmation,
        );
        let executor = SwapExecutor::new(aggregator.clone());

        Self {
            chain_id: config.network.chain_id,
            destination_token: config.destination_token,
            aggregator,
            reader,
            writer,
            locks: Arc::new(NonceLocks::new()),
            guard,
            executor,
        }
    }

    /// Wire the HTTP aggregator client and the JSON-RPC chain client.
    pub fn from_config(config: &EngineConfig) -> Result<Self, SetupError> {
        let aggregator = Arc::new(OneInchClient::from_config(config)?);
        let chain = Arc::new(EvmClient::new(config.network.clone(), config.rpc_timeout)?);
        info!(
            network = %config.network.name,
            chain_id = config.network.chain_id,
            destination = %config.destination_token,
            "Swap engine ready"
        );
        Ok(Self::new(config, aggregator, chain.clone(), chain))
    }

    pub fn destination_token(&self) -> Address {
        self.destination_token
    }

    /// Validate caller input against this engine's destination token.
    pub fn request_from_input(&self, input: &SwapInput) -> Result<SwapRequest, SwapError> {
        SwapRequest::from_input(input, self.destination_token)
    }

    /// Run a complete swap for the credential's account.
    pub async fn perform_complete_swap(
        &self,
        request: &SwapRequest,
        credential: &SigningCredential,
        cancel: &CancellationToken,
    ) -> Result<SwapResult, SwapError> {
        let mut stages = StageTracker::new();
        self.perform_tracked(request, credential, cancel, &mut stages)
            .await
    }

    /// Like [`Self::perform_complete_swap`], recording each stage in `stages`.
    pub async fn perform_tracked(
        &self,
        request: &SwapRequest,
        credential: &SigningCredential,
        cancel: &CancellationToken,
        stages: &mut StageTracker,
    ) -> Result<SwapResult, SwapError> {
        let span = info_span!(
            "swap",
            swap_id = %Uuid::new_v4(),
            account = %credential.address(),
            src = %request.source_token,
            dst = %request.destination_token,
            amount = %request.amount,
        );

        async {
            let result = self.run(request, credential, cancel, stages).await;
            match &result {
                Ok(outcome) => {
                    stages.enter(SwapStage::Done);
                    info!(
                        approval_tx = ?outcome.approval_tx_hash,
                        swap_tx = %outcome.swap_tx_hash,
                        "Swap complete"
                    );
                }
                Err(e) => stages.fail(e),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn run(
        &self,
        request: &SwapRequest,
        credential: &SigningCredential,
        cancel: &CancellationToken,
        stages: &mut StageTracker,
    ) -> Result<SwapResult, SwapError> {
        let signer = TransactionSigner::new(
            credential,
            self.reader.clone(),
            self.writer.clone(),
            self.locks.clone(),
            self.chain_id,
        );

        stages.enter(SwapStage::Quoting);
        ensure_active(cancel)?;
        let quote = self
            .aggregator
            .quote(request.source_token, request.destination_token, request.amount)
            .await?;
        info!(
            dst_amount = %quote.destination_amount,
            estimated_gas = quote.estimated_gas,
            "Quote received"
        );

        stages.enter(SwapStage::CheckingAllowance);
        let approval_tx_hash = self
            .guard
            .ensure_allowance_observed(
                request.source_token,
                request.amount,
                &signer,
                cancel,
                |stage| stages.enter(stage),
            )
            .await?;

        stages.enter(SwapStage::Swapping);
        let swap_tx_hash = self.executor.execute(request, &signer, cancel).await?;

        Ok(SwapResult {
            approval_tx_hash,
            swap_tx_hash,
            quote,
        })
    }
}
