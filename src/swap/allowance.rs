// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Spending approvals for the aggregator router.
//!
//! [`AllowanceGuard::ensure_allowance`] is a no-op for the native asset and
//! for tokens whose allowance already covers the swap. Otherwise it submits an
//! approval for exactly the swap amount and waits, bounded, for the receipt.
//! An approval that is not confirmed in time (or reverts) does not stop the
//! run under [`ApprovalPolicy::Proceed`]: the swap that follows reverts on its
//! own if the allowance really is missing.

use std::fmt;
use std::sync::Arc;

use alloy::primitives::{Address, U256};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::coordinator::SwapStage;
use crate::aggregator::AggregatorApi;
use crate::blockchain::{
    ensure_active, is_native, BlockchainReader, ReceiptStatus, TransactionSigner, TxHash,
};
use crate::config::{AllowanceSource, ApprovalPolicy, ConfirmationSettings};
use crate::error::SwapError;

/// Result of comparing the current allowance with the swap amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllowanceCheck {
    /// Native asset; there is nothing to approve.
    NotApplicable,
    Sufficient(U256),
    Required { current: U256 },
}

/// How the wait for an approval receipt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Confirmed,
    Reverted,
    TimedOut,
}

impl fmt::Display for Confirmation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Confirmation::Confirmed => write!(f, "confirmed"),
            Confirmation::Reverted => write!(f, "receipt reported failure"),
            Confirmation::TimedOut => write!(f, "confirmation timed out"),
        }
    }
}

pub struct AllowanceGuard {
    aggregator: Arc<dyn AggregatorApi>,
    reader: Arc<dyn BlockchainReader>,
    source: AllowanceSource,
    confirmation: ConfirmationSettings,
}

impl AllowanceGuard {
    pub fn new(
        aggregator: Arc<dyn AggregatorApi>,
        reader: Arc<dyn BlockchainReader>,
        source: AllowanceSource,
        confirmation: ConfirmationSettings,
    ) -> Self {
        Self {
            aggregator,
            reader,
            source,
            confirmation,
        }
    }

    /// Make sure the router may spend `required` of `token` for the signer's
    /// account, approving it if needed.
    ///
    /// Returns the approval hash when an approval was broadcast, even if it
    /// was never confirmed (unless the policy is [`ApprovalPolicy::Abort`]).
    pub async fn ensure_allowance(
        &self,
        token: Address,
        required: U256,
        signer: &TransactionSigner<'_>,
        cancel: &CancellationToken,
    ) -> Result<Option<TxHash>, SwapError> {
        self.ensure_allowance_observed(token, required, signer, cancel, |_| {})
            .await
    }

    /// [`Self::ensure_allowance`], reporting each approval stage to `observe`
    /// as it is entered.
    pub async fn ensure_allowance_observed<F>(
        &self,
        token: Address,
        required: U256,
        signer: &TransactionSigner<'_>,
        cancel: &CancellationToken,
        mut observe: F,
    ) -> Result<Option<TxHash>, SwapError>
    where
        F: FnMut(SwapStage),
    {
        match self.check(token, required, signer.address(), cancel).await? {
            AllowanceCheck::NotApplicable | AllowanceCheck::Sufficient(_) => Ok(None),
            AllowanceCheck::Required { current } => {
                observe(SwapStage::Approving);
                info!(%token, %current, %required, "Allowance too low");
                let hash = self.submit_approval(token, required, signer, cancel).await?;

                observe(SwapStage::AwaitingConfirmation);
                self.settle(hash, cancel).await?;
                Ok(Some(hash))
            }
        }
    }

    /// Read the current allowance of `owner` for `token`.
    pub async fn check(
        &self,
        token: Address,
        required: U256,
        owner: Address,
        cancel: &CancellationToken,
    ) -> Result<AllowanceCheck, SwapError> {
        if is_native(&token) {
            return Ok(AllowanceCheck::NotApplicable);
        }

        ensure_active(cancel)?;
        let current = match self.source {
            AllowanceSource::Aggregator => self.aggregator.allowance(token, owner).await?,
            AllowanceSource::Chain => {
                let spender = self.aggregator.spender().await?;
                ensure_active(cancel)?;
                self.reader
                    .token_allowance(token, owner, spender)
                    .await
                    .map_err(|e| SwapError::Network(e.to_string()))?
            }
        };

        debug!(%token, %owner, %current, %required, source = ?self.source, "Allowance read");
        if current >= required {
            Ok(AllowanceCheck::Sufficient(current))
        } else {
            Ok(AllowanceCheck::Required { current })
        }
    }

    /// Build, sign and broadcast an approval for exactly `amount`.
    pub async fn submit_approval(
        &self,
        token: Address,
        amount: U256,
        signer: &TransactionSigner<'_>,
        cancel: &CancellationToken,
    ) -> Result<TxHash, SwapError> {
        ensure_active(cancel)?;
        let intent = self.aggregator.approval_transaction(token, amount).await?;
        let hash = signer.sign_and_send(&intent, cancel).await?;
        info!(%token, %amount, approval_tx = %hash, "Approval submitted");
        Ok(hash)
    }

    /// Poll for the receipt of `hash` until it is mined or the wait expires.
    ///
    /// The deadline also cuts short a poll that is still in flight. Failed
    /// polls are logged and retried until the deadline.
    pub async fn await_confirmation(
        &self,
        hash: TxHash,
        cancel: &CancellationToken,
    ) -> Result<Confirmation, SwapError> {
        let deadline = Instant::now() + self.confirmation.timeout;

        loop {
            ensure_active(cancel)?;
            let polled = tokio::select! {
                biased;
                polled = self.reader.receipt(hash) => polled,
                _ = cancel.cancelled() => return Err(SwapError::Cancelled),
                _ = tokio::time::sleep_until(deadline) => {
                    debug!(%hash, "Receipt poll still pending at deadline");
                    return Ok(Confirmation::TimedOut);
                }
            };
            match polled {
                Ok(Some(ReceiptStatus::Success)) => return Ok(Confirmation::Confirmed),
                Ok(Some(ReceiptStatus::Failure)) => return Ok(Confirmation::Reverted),
                Ok(None) => debug!(%hash, "Approval not mined yet"),
                Err(e) => warn!(%hash, error = %e, "Receipt poll failed"),
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(Confirmation::TimedOut);
            }
            let pause = self.confirmation.poll_interval.min(deadline - now);

            tokio::select! {
                _ = tokio::time::sleep(pause) => {},
                _ = cancel.cancelled() => return Err(SwapError::Cancelled),
            }
        }
    }

    /// Wait for `hash` and apply the configured policy to the outcome.
    pub async fn settle(&self, hash: TxHash, cancel: &CancellationToken) -> Result<(), SwapError> {
        let outcome = self.await_confirmation(hash, cancel).await?;
        if outcome == Confirmation::Confirmed {
            info!(approval_tx = %hash, "Approval confirmed");
            return Ok(());
        }

        match self.confirmation.policy {
            ApprovalPolicy::Proceed => {
                warn!(
                    approval_tx = %hash,
                    outcome = %outcome,
                    "Approval unconfirmed, continuing to swap"
                );
                Ok(())
            }
            ApprovalPolicy::Abort => {
                warn!(approval_tx = %hash, outcome = %outcome, "Approval unconfirmed, aborting");
                Err(SwapError::ApprovalUnconfirmed {
                    hash,
                    reason: outcome.to_string(),
                })
            }
        }
    }
}
