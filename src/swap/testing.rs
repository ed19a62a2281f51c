// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-memory aggregator and chain used by the engine's unit tests.
//!
//! Both fakes share a [`Ledger`] of token allowances. A broadcast approval
//! raises the allowance only when receipts are configured to succeed, so
//! the aggregator's view and the chain stay consistent unless a test marks
//! the aggregator view as stale.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use alloy::{
    consensus::{Transaction, TxEnvelope},
    eips::eip2718::Decodable2718,
    primitives::{address, Address, Bytes, U256},
    sol_types::SolCall,
};
use async_trait::async_trait;

use crate::aggregator::{AggregatorApi, AggregatorError};
use crate::blockchain::erc20::IERC20;
use crate::blockchain::{
    is_native, BlockchainReader, BlockchainWriter, ChainClientError, ReceiptStatus, TxHash,
};
use crate::models::{Quote, SwapRequest, TransactionIntent};

/// Throwaway signing key and the account it controls.
pub(crate) const TEST_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcaf784d7bf4f2ff80";
pub(crate) const TEST_ADDRESS: Address = address!("0x500d75F1329cf98352c32Cf238c2192ca78faFFE");
pub(crate) const FAKE_ROUTER: Address = address!("0x111111125421cA6dc452d289314280a0f8842A65");
pub(crate) const FAKE_GAS_PRICE: u128 = 25_000_000_000;
pub(crate) const USDC: Address = address!("0xB97EF9Ef8734C71904D8002F8b6Bc66Dd9c48a6E");
pub(crate) const USDT: Address = address!("0x9702230A8Ea53601f5cD2dc00fDBc13d4dF4A8c7");

/// Token allowances granted to [`FAKE_ROUTER`], keyed by token.
#[derive(Default)]
pub(crate) struct Ledger {
    allowances: Mutex<HashMap<Address, U256>>,
}

impl Ledger {
    fn get(&self, token: &Address) -> U256 {
        self.allowances
            .lock()
            .unwrap()
            .get(token)
            .copied()
            .unwrap_or_default()
    }

    fn set(&self, token: Address, amount: U256) {
        self.allowances.lock().unwrap().insert(token, amount);
    }
}

/// Build an aggregator and chain sharing one ledger.
pub(crate) fn fakes() -> (Arc<FakeAggregator>, Arc<FakeChain>) {
    let ledger = Arc::new(Ledger::default());
    (
        Arc::new(FakeAggregator::with_ledger(ledger.clone())),
        Arc::new(FakeChain::with_ledger(ledger)),
    )
}

// =============================================================================
// Aggregator
// =============================================================================

#[derive(Default)]
struct AggregatorState {
    calls: Vec<&'static str>,
    quote_failure: Option<(u16, String)>,
    stale_allowance: Option<U256>,
    approval_amounts: Vec<U256>,
}

pub(crate) struct FakeAggregator {
    ledger: Arc<Ledger>,
    state: Mutex<AggregatorState>,
}

impl FakeAggregator {
    fn with_ledger(ledger: Arc<Ledger>) -> Self {
        Self {
            ledger,
            state: Mutex::new(AggregatorState::default()),
        }
    }

    /// Pretend an earlier approval already landed on-chain.
    pub fn set_allowance(&self, token: Address, amount: U256) {
        self.ledger.set(token, amount);
    }

    /// Make the aggregator's allowance view report `amount` regardless of the chain.
    pub fn set_stale_allowance(&self, amount: U256) {
        self.state.lock().unwrap().stale_allowance = Some(amount);
    }

    pub fn fail_quotes(&self, status: u16, body: &str) {
        self.state.lock().unwrap().quote_failure = Some((status, body.to_string()));
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn approval_amounts(&self) -> Vec<U256> {
        self.state.lock().unwrap().approval_amounts.clone()
    }

    fn record(&self, call: &'static str) {
        self.state.lock().unwrap().calls.push(call);
    }
}

#[async_trait]
impl AggregatorApi for FakeAggregator {
    async fn quote(&self, _src: Address, _dst: Address, amount: U256) -> Result<Quote, AggregatorError> {
        self.record("quote");
        if let Some((status, body)) = self.state.lock().unwrap().quote_failure.clone() {
            return Err(AggregatorError::Status { status, body });
        }
        Ok(Quote {
            source_amount: amount,
            destination_amount: amount / U256::from(2u64),
            estimated_gas: 180_000,
            route: serde_json::json!([[[{"name": "PANGOLIN", "part": 100}]]]),
        })
    }

    async fn allowance(&self, token: Address, _owner: Address) -> Result<U256, AggregatorError> {
        self.record("allowance");
        if is_native(&token) {
            return Ok(U256::MAX);
        }
        if let Some(stale) = self.state.lock().unwrap().stale_allowance {
            return Ok(stale);
        }
        Ok(self.ledger.get(&token))
    }

    async fn spender(&self) -> Result<Address, AggregatorError> {
        self.record("spender");
        Ok(FAKE_ROUTER)
    }

    async fn approval_transaction(
        &self,
        token: Address,
        amount: U256,
    ) -> Result<TransactionIntent, AggregatorError> {
        self.record("approve");
        self.state.lock().unwrap().approval_amounts.push(amount);
        let call = IERC20::approveCall {
            spender: FAKE_ROUTER,
            amount,
        };
        Ok(TransactionIntent {
            to: token,
            data: call.abi_encode().into(),
            value: U256::ZERO,
            gas_limit: None,
            gas_price: Some(FAKE_GAS_PRICE),
        })
    }

    async fn swap_transaction(
        &self,
        request: &SwapRequest,
        _from: Address,
    ) -> Result<TransactionIntent, AggregatorError> {
        self.record("swap");
        let value = if is_native(&request.source_token) {
            request.amount
        } else {
            U256::ZERO
        };
        let mut data = request.source_token.to_vec();
        data.extend_from_slice(&request.amount.to_be_bytes::<32>());
        Ok(TransactionIntent {
            to: FAKE_ROUTER,
            data: data.into(),
            value,
            gas_limit: None,
            gas_price: Some(FAKE_GAS_PRICE),
        })
    }
}

// =============================================================================
// Chain
// =============================================================================

/// How the fake chain answers receipt queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ReceiptMode {
    /// Mined successfully after this many `None` answers.
    SuccessAfter(usize),
    /// Mined but reverted.
    Failure,
    /// Never mined.
    Never,
}

#[derive(Debug, Clone)]
pub(crate) struct Broadcast {
    pub hash: TxHash,
    pub envelope: TxEnvelope,
}

struct ChainState {
    next_nonce: u64,
    broadcasts: Vec<Broadcast>,
    receipts: ReceiptMode,
    receipt_polls: usize,
    nonce_reads: usize,
    reject_broadcasts: Option<String>,
    broadcast_delay: Option<Duration>,
}

pub(crate) struct FakeChain {
    ledger: Arc<Ledger>,
    state: Mutex<ChainState>,
}

impl FakeChain {
    pub const ESTIMATED_GAS: u64 = 65_000;
    pub const GAS_PRICE: u128 = 30_000_000_000;

    pub fn new() -> Self {
        Self::with_ledger(Arc::new(Ledger::default()))
    }

    fn with_ledger(ledger: Arc<Ledger>) -> Self {
        Self {
            ledger,
            state: Mutex::new(ChainState {
                next_nonce: 0,
                broadcasts: Vec::new(),
                receipts: ReceiptMode::SuccessAfter(0),
                receipt_polls: 0,
                nonce_reads: 0,
                reject_broadcasts: None,
                broadcast_delay: None,
            }),
        }
    }

    pub fn set_pending_nonce(&self, nonce: u64) {
        self.state.lock().unwrap().next_nonce = nonce;
    }

    pub fn set_receipts(&self, mode: ReceiptMode) {
        self.state.lock().unwrap().receipts = mode;
    }

    pub fn reject_broadcasts(&self, reason: &str) {
        self.state.lock().unwrap().reject_broadcasts = Some(reason.to_string());
    }

    pub fn set_broadcast_delay(&self, delay: Duration) {
        self.state.lock().unwrap().broadcast_delay = Some(delay);
    }

    pub fn broadcasts(&self) -> Vec<Broadcast> {
        self.state.lock().unwrap().broadcasts.clone()
    }

    pub fn approvals(&self) -> Vec<Broadcast> {
        self.broadcasts()
            .into_iter()
            .filter(|b| b.envelope.input().starts_with(&IERC20::approveCall::SELECTOR))
            .collect()
    }

    pub fn nonce_reads(&self) -> usize {
        self.state.lock().unwrap().nonce_reads
    }

    pub fn receipt_polls(&self) -> usize {
        self.state.lock().unwrap().receipt_polls
    }

    /// Router calls pulling an ERC-20 revert unless the allowance covers the
    /// amount. Router call data is the token followed by the amount.
    fn check_swap(&self, intent_to: Address, input: &[u8], value: U256) -> Result<(), ChainClientError> {
        if intent_to != FAKE_ROUTER || !value.is_zero() || input.len() != 52 {
            return Ok(());
        }
        let token = Address::from_slice(&input[..20]);
        let amount = U256::from_be_slice(&input[20..]);
        if self.ledger.get(&token) < amount {
            return Err(ChainClientError::Rejected(
                "execution reverted: ERC20: insufficient allowance".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl BlockchainReader for FakeChain {
    async fn pending_nonce(&self, _address: Address) -> Result<u64, ChainClientError> {
        let mut state = self.state.lock().unwrap();
        state.nonce_reads += 1;
        Ok(state.next_nonce)
    }

    async fn receipt(&self, hash: TxHash) -> Result<Option<ReceiptStatus>, ChainClientError> {
        let mut state = self.state.lock().unwrap();
        state.receipt_polls += 1;
        if !state.broadcasts.iter().any(|b| b.hash == hash) {
            return Ok(None);
        }
        Ok(match state.receipts {
            ReceiptMode::SuccessAfter(n) if state.receipt_polls > n => Some(ReceiptStatus::Success),
            ReceiptMode::SuccessAfter(_) | ReceiptMode::Never => None,
            ReceiptMode::Failure => Some(ReceiptStatus::Failure),
        })
    }

    async fn gas_price(&self) -> Result<u128, ChainClientError> {
        Ok(Self::GAS_PRICE)
    }

    async fn estimate_gas(
        &self,
        _from: Address,
        intent: &TransactionIntent,
    ) -> Result<u64, ChainClientError> {
        self.check_swap(intent.to, &intent.data, intent.value)?;
        Ok(Self::ESTIMATED_GAS)
    }

    async fn token_allowance(
        &self,
        token: Address,
        _owner: Address,
        spender: Address,
    ) -> Result<U256, ChainClientError> {
        if spender != FAKE_ROUTER {
            return Ok(U256::ZERO);
        }
        Ok(self.ledger.get(&token))
    }
}

#[async_trait]
impl BlockchainWriter for FakeChain {
    async fn broadcast(&self, raw_transaction: Bytes) -> Result<TxHash, ChainClientError> {
        let delay = self.state.lock().unwrap().broadcast_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut buf: &[u8] = &raw_transaction;
        let envelope = TxEnvelope::decode_2718(&mut buf)
            .map_err(|e| ChainClientError::Rejected(format!("undecodable transaction: {e}")))?;

        let mut state = self.state.lock().unwrap();
        if let Some(reason) = &state.reject_broadcasts {
            return Err(ChainClientError::Rejected(reason.clone()));
        }
        if envelope.nonce() < state.next_nonce {
            return Err(ChainClientError::Rejected("nonce too low".to_string()));
        }

        let hash = *envelope.tx_hash();
        if let Ok(approve) = IERC20::approveCall::abi_decode(envelope.input()) {
            let mined_ok = matches!(state.receipts, ReceiptMode::SuccessAfter(_));
            if mined_ok {
                if let Some(token) = envelope.to() {
                    self.ledger.set(token, approve.amount);
                }
            }
        }

        state.next_nonce = envelope.nonce() + 1;
        state.broadcasts.push(Broadcast { hash, envelope });
        Ok(hash)
    }
}
