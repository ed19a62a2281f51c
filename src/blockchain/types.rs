// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Blockchain types and constants.

use alloy::primitives::{address, Address, B256};

/// Transaction hash as returned by `eth_sendRawTransaction`.
pub type TxHash = B256;

/// Conventional placeholder address for the chain's native coin.
///
/// The aggregator accepts it wherever a token address is expected. It has no
/// ERC-20 contract behind it, so allowance checks never apply to it.
pub const NATIVE_TOKEN: Address = address!("0xEeeeeEeeeEeEeeEeEeEeeEEEeeeeEeeeeeeeEEeE");

/// Returns `true` when `token` is the native-asset sentinel.
pub fn is_native(token: &Address) -> bool {
    *token == NATIVE_TOKEN
}

/// EVM network configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkConfig {
    /// Network name for display
    pub name: String,
    /// Chain ID (EIP-155 replay protection and aggregator routing)
    pub chain_id: u64,
    /// RPC endpoint URL
    pub rpc_url: String,
    /// Block explorer URL
    pub explorer_url: String,
}

impl NetworkConfig {
    /// Avalanche C-Chain Mainnet configuration.
    pub fn avalanche_mainnet() -> Self {
        Self {
            name: "Avalanche C-Chain".to_string(),
            chain_id: 43114,
            rpc_url: "https://api.avax.network/ext/bc/C/rpc".to_string(),
            explorer_url: "https://snowtrace.io".to_string(),
        }
    }

    /// Avalanche Fuji Testnet configuration.
    pub fn avalanche_fuji() -> Self {
        Self {
            name: "Avalanche Fuji Testnet".to_string(),
            chain_id: 43113,
            rpc_url: "https://api.avax-test.network/ext/bc/C/rpc".to_string(),
            explorer_url: "https://testnet.snowtrace.io".to_string(),
        }
    }

    /// Explorer link for a transaction hash.
    pub fn explorer_tx_url(&self, hash: &TxHash) -> String {
        format!("{}/tx/{hash}", self.explorer_url.trim_end_matches('/'))
    }
}

/// Network preset identifiers accepted from configuration.
pub const NETWORK_MAINNET: &str = "mainnet";
pub const NETWORK_FUJI: &str = "fuji";

/// Resolve a network preset by name.
pub fn network_preset(raw: &str) -> Result<NetworkConfig, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        NETWORK_MAINNET => Ok(NetworkConfig::avalanche_mainnet()),
        NETWORK_FUJI => Ok(NetworkConfig::avalanche_fuji()),
        other => Err(format!(
            "unknown network `{other}` (expected `{NETWORK_MAINNET}` or `{NETWORK_FUJI}`)"
        )),
    }
}

/// Well-known ERC-20 token deployments.
#[derive(Debug, Clone)]
pub struct Erc20Token {
    pub symbol: &'static str,
    pub name: &'static str,
    pub decimals: u8,
    /// Mainnet contract address
    pub mainnet_address: Address,
    /// Fuji testnet contract address
    pub fuji_address: Address,
}

impl Erc20Token {
    /// Contract address on the given chain, if deployed there.
    pub fn address_on(&self, chain_id: u64) -> Option<Address> {
        match chain_id {
            43114 => Some(self.mainnet_address),
            43113 => Some(self.fuji_address),
            _ => None,
        }
    }
}

/// USDC, the default swap target.
pub const USDC_TOKEN: Erc20Token = Erc20Token {
    symbol: "USDC",
    name: "USD Coin",
    decimals: 6,
    // Official USDC on Avalanche C-Chain
    mainnet_address: address!("0xB97EF9Ef8734C71904D8002F8b6Bc66Dd9c48a6E"),
    // Fuji testnet USDC (Circle's test token)
    fuji_address: address!("0x5425890298aed601595a70AB815c96711a31Bc65"),
};

/// Outcome recorded in a mined transaction's receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptStatus {
    Success,
    Failure,
}

impl ReceiptStatus {
    pub fn from_status_flag(success: bool) -> Self {
        if success {
            ReceiptStatus::Success
        } else {
            ReceiptStatus::Failure
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn native_sentinel_is_recognised_case_insensitively() {
        let parsed: Address = "0xeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeee".parse().unwrap();
        assert!(is_native(&parsed));
        assert!(!is_native(&USDC_TOKEN.mainnet_address));
    }

    #[test]
    fn network_preset_accepts_known_names() {
        assert_eq!(network_preset("Mainnet").unwrap().chain_id, 43114);
        assert_eq!(network_preset(" fuji ").unwrap().chain_id, 43113);
        assert!(network_preset("sepolia").is_err());
    }

    #[test]
    fn usdc_resolves_per_chain() {
        assert_eq!(USDC_TOKEN.address_on(43114), Some(USDC_TOKEN.mainnet_address));
        assert_eq!(USDC_TOKEN.address_on(43113), Some(USDC_TOKEN.fuji_address));
        assert_eq!(USDC_TOKEN.address_on(1), None);
    }

    #[test]
    fn explorer_url_contains_hash() {
        let network = NetworkConfig::avalanche_fuji();
        let url = network.explorer_tx_url(&TxHash::ZERO);
        assert!(url.starts_with("https://testnet.snowtrace.io/tx/0x"));
    }
}
