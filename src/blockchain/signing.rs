// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Transaction signing for the swap engine.
//!
//! A [`SigningCredential`] wraps one account's private key. It is handed to
//! the engine per call by the key-custody layer and is never logged or kept
//! past the call. [`TransactionSigner`] turns a [`TransactionIntent`] into a
//! broadcast transaction, holding the account's [`NonceLocks`] entry from the
//! nonce read until the node has accepted the transaction.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use alloy::{
    consensus::{SignableTransaction, TxEnvelope, TxLegacy},
    eips::eip2718::Encodable2718,
    network::TxSignerSync,
    primitives::{Address, Bytes, TxKind},
    signers::local::PrivateKeySigner,
};
use k256::SecretKey;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::client::{BlockchainReader, BlockchainWriter, ChainClientError};
use super::types::TxHash;
use crate::error::SwapError;
use crate::models::TransactionIntent;

/// Private key material for a single account.
pub struct SigningCredential {
    signer: PrivateKeySigner,
}

impl SigningCredential {
    /// Create a credential from a hex private key (with or without `0x`).
    pub fn from_hex(private_key_hex: &str) -> Result<Self, ChainClientError> {
        let key_bytes = alloy::hex::decode(private_key_hex.trim())
            .map_err(|e| ChainClientError::InvalidPrivateKey(e.to_string()))?;

        let signer = PrivateKeySigner::from_slice(&key_bytes)
            .map_err(|e| ChainClientError::InvalidPrivateKey(e.to_string()))?;
        Ok(Self { signer })
    }

    /// Create a credential from a PEM-encoded key (SEC1 or PKCS#8).
    pub fn from_pem(pem_bytes: &[u8]) -> Result<Self, ChainClientError> {
        let secret_key = secret_key_from_pem(pem_bytes)?;
        let signer = PrivateKeySigner::from_slice(&secret_key.to_bytes())
            .map_err(|e| ChainClientError::InvalidPrivateKey(e.to_string()))?;
        Ok(Self { signer })
    }

    /// The account this credential signs for.
    pub fn address(&self) -> Address {
        self.signer.address()
    }

    fn sign(&self, mut tx: TxLegacy) -> Result<(TxHash, Bytes), ChainClientError> {
        let signature = self
            .signer
            .sign_transaction_sync(&mut tx)
            .map_err(|e| ChainClientError::Signing(e.to_string()))?;
        let signed = tx.into_signed(signature);
        let hash = *signed.hash();
        let raw = TxEnvelope::from(signed).encoded_2718();
        Ok((hash, raw.into()))
    }
}

impl fmt::Debug for SigningCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningCredential")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}

/// Parse a PEM private key, trying SEC1 first and then PKCS#8.
fn secret_key_from_pem(pem_bytes: &[u8]) -> Result<SecretKey, ChainClientError> {
    let pem_str = std::str::from_utf8(pem_bytes)
        .map_err(|e| ChainClientError::InvalidPrivateKey(format!("Invalid UTF-8: {}", e)))?;

    let pem = pem::parse(pem_str)
        .map_err(|e| ChainClientError::InvalidPrivateKey(format!("Invalid PEM: {}", e)))?;

    SecretKey::from_sec1_der(pem.contents())
        .or_else(|_| {
            use k256::pkcs8::DecodePrivateKey;
            SecretKey::from_pkcs8_der(pem.contents())
        })
        .map_err(|e| ChainClientError::InvalidPrivateKey(format!("Invalid key format: {}", e)))
}

/// Per-account locks serialising nonce assignment.
///
/// Two swaps for the same account would otherwise read the same pending
/// nonce and one of the broadcasts would be rejected or replace the other.
#[derive(Default)]
pub struct NonceLocks {
    accounts: Mutex<HashMap<Address, Arc<Mutex<()>>>>,
}

impl NonceLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive signing rights on `account`.
    ///
    /// Entries no caller holds or waits on are dropped here, so the map only
    /// tracks accounts with signing in progress.
    pub async fn acquire(&self, account: Address) -> OwnedMutexGuard<()> {
        let lock = {
            let mut accounts = self.accounts.lock().await;
            accounts.retain(|_, lock| Arc::strong_count(lock) > 1);
            accounts.entry(account).or_default().clone()
        };
        lock.lock_owned().await
    }

    #[cfg(test)]
    async fn tracked(&self) -> usize {
        self.accounts.lock().await.len()
    }
}

/// Signs and broadcasts intents for one account.
pub struct TransactionSigner<'a> {
    credential: &'a SigningCredential,
    reader: Arc<dyn BlockchainReader>,
    writer: Arc<dyn BlockchainWriter>,
    locks: Arc<NonceLocks>,
    chain_id: u64,
}

impl<'a> TransactionSigner<'a> {
    pub fn new(
        credential: &'a SigningCredential,
        reader: Arc<dyn BlockchainReader>,
        writer: Arc<dyn BlockchainWriter>,
        locks: Arc<NonceLocks>,
        chain_id: u64,
    ) -> Self {
        Self {
            credential,
            reader,
            writer,
            locks,
            chain_id,
        }
    }

    /// The account transactions are sent from.
    pub fn address(&self) -> Address {
        self.credential.address()
    }

    /// Sign `intent` with a freshly read pending nonce and broadcast it.
    ///
    /// Failures are never retried here: resubmitting with a stale nonce could
    /// replace or duplicate a transaction the node already accepted.
    pub async fn sign_and_send(
        &self,
        intent: &TransactionIntent,
        cancel: &CancellationToken,
    ) -> Result<TxHash, SwapError> {
        let from = self.address();
        let _account_guard = self.locks.acquire(from).await;

        ensure_active(cancel)?;
        let nonce = self
            .reader
            .pending_nonce(from)
            .await
            .map_err(|e| chain_failure(intent, None, e))?;

        let gas_limit = match intent.gas_limit {
            Some(limit) => limit,
            None => {
                ensure_active(cancel)?;
                self.reader
                    .estimate_gas(from, intent)
                    .await
                    .map_err(|e| chain_failure(intent, Some(nonce), e))?
            }
        };
        let gas_price = match intent.gas_price {
            Some(price) => price,
            None => {
                ensure_active(cancel)?;
                self.reader
                    .gas_price()
                    .await
                    .map_err(|e| chain_failure(intent, Some(nonce), e))?
            }
        };

        let tx = TxLegacy {
            chain_id: Some(self.chain_id),
            nonce,
            gas_price,
            gas_limit,
            to: TxKind::Call(intent.to),
            value: intent.value,
            input: intent.data.clone(),
        };
        let (local_hash, raw) = self
            .credential
            .sign(tx)
            .map_err(|e| chain_failure(intent, Some(nonce), e))?;
        debug!(%local_hash, nonce, gas_limit, gas_price, "Signed transaction");

        ensure_active(cancel)?;
        let hash = self
            .writer
            .broadcast(raw)
            .await
            .map_err(|e| chain_failure(intent, Some(nonce), e))?;

        info!(
            tx_hash = %hash,
            from = %from,
            to = %intent.to,
            nonce,
            "Transaction broadcast"
        );
        Ok(hash)
    }
}

/// Fail with [`SwapError::Cancelled`] once the caller has given up.
pub fn ensure_active(cancel: &CancellationToken) -> Result<(), SwapError> {
    if cancel.is_cancelled() {
        Err(SwapError::Cancelled)
    } else {
        Ok(())
    }
}

/// Node rejections become `Chain` errors carrying the intent; unreachable
/// nodes and timeouts stay `Network` errors.
fn chain_failure(intent: &TransactionIntent, nonce: Option<u64>, error: ChainClientError) -> SwapError {
    if error.is_rejection() {
        SwapError::Chain {
            intent: Box::new(intent.clone()),
            nonce,
            cause: error.to_string(),
        }
    } else {
        SwapError::Network(error.to_string())
    }
}
