// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Engine Configuration
//!
//! [`EngineConfig`] is an explicit value handed to the coordinator at
//! construction. Nothing in the engine reads the environment afterwards.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `SWAP_NETWORK` | Network preset (`mainnet` or `fuji`) | `mainnet` |
//! | `SWAP_RPC_URL` | RPC endpoint override | preset |
//! | `SWAP_CHAIN_ID` | Chain id override | preset |
//! | `AGGREGATOR_BASE_URL` | Aggregator REST base, chain id is appended | `https://api.1inch.dev/swap/v6.0` |
//! | `AGGREGATOR_API_KEY` | Aggregator bearer token | Optional |
//! | `SWAP_DESTINATION_TOKEN` | Target stablecoin | USDC on the network |
//! | `SWAP_HTTP_TIMEOUT_SECS` | Aggregator request timeout | `15` |
//! | `SWAP_RPC_TIMEOUT_SECS` | Per RPC call timeout | `15` |
//! | `SWAP_CONFIRMATION_TIMEOUT_SECS` | Approval confirmation bound | `120` |
//! | `SWAP_CONFIRMATION_POLL_SECS` | Receipt polling interval | `3` |
//! | `SWAP_ON_APPROVAL_UNCONFIRMED` | `proceed` or `abort` | `proceed` |
//! | `SWAP_ALLOWANCE_SOURCE` | `aggregator` or `chain` | `aggregator` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info` |

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use alloy::primitives::Address;

use crate::blockchain::{network_preset, NetworkConfig, USDC_TOKEN};
use crate::models::parse_address;

pub const NETWORK_ENV: &str = "SWAP_NETWORK";
pub const RPC_URL_ENV: &str = "SWAP_RPC_URL";
pub const CHAIN_ID_ENV: &str = "SWAP_CHAIN_ID";
pub const AGGREGATOR_BASE_URL_ENV: &str = "AGGREGATOR_BASE_URL";
pub const AGGREGATOR_API_KEY_ENV: &str = "AGGREGATOR_API_KEY";
pub const DESTINATION_TOKEN_ENV: &str = "SWAP_DESTINATION_TOKEN";
pub const HTTP_TIMEOUT_ENV: &str = "SWAP_HTTP_TIMEOUT_SECS";
pub const RPC_TIMEOUT_ENV: &str = "SWAP_RPC_TIMEOUT_SECS";
pub const CONFIRMATION_TIMEOUT_ENV: &str = "SWAP_CONFIRMATION_TIMEOUT_SECS";
pub const CONFIRMATION_POLL_ENV: &str = "SWAP_CONFIRMATION_POLL_SECS";
pub const APPROVAL_POLICY_ENV: &str = "SWAP_ON_APPROVAL_UNCONFIRMED";
pub const ALLOWANCE_SOURCE_ENV: &str = "SWAP_ALLOWANCE_SOURCE";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_NETWORK: &str = "mainnet";
pub const DEFAULT_AGGREGATOR_BASE_URL: &str = "https://api.1inch.dev/swap/v6.0";
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(15);
pub const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(15);
/// Upper bound on waiting for an approval to be mined.
pub const DEFAULT_CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(120);
pub const DEFAULT_CONFIRMATION_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// What to do when an approval is not confirmed as successful in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ApprovalPolicy {
    /// Log and continue to the swap; a later revert is the failure signal.
    #[default]
    Proceed,
    /// Stop the run with [`crate::error::SwapError::ApprovalUnconfirmed`].
    Abort,
}

impl FromStr for ApprovalPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "proceed" => Ok(ApprovalPolicy::Proceed),
            "abort" => Ok(ApprovalPolicy::Abort),
            other => Err(format!("expected `proceed` or `abort`, got `{other}`")),
        }
    }
}

/// Where the current allowance is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AllowanceSource {
    /// The aggregator's allowance view. May lag the chain.
    #[default]
    Aggregator,
    /// `allowance(owner, spender)` on the token contract.
    Chain,
}

impl FromStr for AllowanceSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "aggregator" => Ok(AllowanceSource::Aggregator),
            "chain" => Ok(AllowanceSource::Chain),
            other => Err(format!("expected `aggregator` or `chain`, got `{other}`")),
        }
    }
}

/// Settings for the approval confirmation wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmationSettings {
    pub timeout: Duration,
    pub poll_interval: Duration,
    pub policy: ApprovalPolicy,
}

impl Default for ConfirmationSettings {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_CONFIRMATION_TIMEOUT,
            poll_interval: DEFAULT_CONFIRMATION_POLL_INTERVAL,
            policy: ApprovalPolicy::Proceed,
        }
    }
}

/// Complete engine configuration.
#[derive(Clone)]
pub struct EngineConfig {
    pub network: NetworkConfig,
    pub aggregator_base_url: String,
    pub aggregator_api_key: Option<String>,
    /// Stablecoin every swap converts into
    pub destination_token: Address,
    pub http_timeout: Duration,
    pub rpc_timeout: Duration,
    pub confirmation: ConfirmationSettings,
    pub allowance_source: AllowanceSource,
}

impl EngineConfig {
    /// Defaults for `network`, swapping into `destination_token`.
    pub fn new(network: NetworkConfig, destination_token: Address) -> Self {
        Self {
            network,
            aggregator_base_url: DEFAULT_AGGREGATOR_BASE_URL.to_string(),
            aggregator_api_key: None,
            destination_token,
            http_timeout: DEFAULT_HTTP_TIMEOUT,
            rpc_timeout: DEFAULT_RPC_TIMEOUT,
            confirmation: ConfirmationSettings::default(),
            allowance_source: AllowanceSource::default(),
        }
    }

    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let network_name = var(NETWORK_ENV).unwrap_or_else(|| DEFAULT_NETWORK.to_string());
        let mut network = network_preset(&network_name).map_err(|reason| ConfigError::Invalid {
            name: NETWORK_ENV,
            reason,
        })?;
        if let Some(rpc_url) = var(RPC_URL_ENV) {
            network.rpc_url = rpc_url;
        }
        if let Some(chain_id) = var(CHAIN_ID_ENV) {
            network.chain_id = parse_with(CHAIN_ID_ENV, &chain_id)?;
        }

        let destination_token = match var(DESTINATION_TOKEN_ENV) {
            Some(raw) => parse_address(&raw).map_err(|e| ConfigError::Invalid {
                name: DESTINATION_TOKEN_ENV,
                reason: e.to_string(),
            })?,
            None => USDC_TOKEN
                .address_on(network.chain_id)
                .ok_or(ConfigError::Missing(DESTINATION_TOKEN_ENV))?,
        };

        let mut config = Self::new(network, destination_token);
        if let Some(base) = var(AGGREGATOR_BASE_URL_ENV) {
            config.aggregator_base_url = base;
        }
        config.aggregator_api_key = var(AGGREGATOR_API_KEY_ENV);
        if let Some(raw) = var(HTTP_TIMEOUT_ENV) {
            config.http_timeout = parse_secs(HTTP_TIMEOUT_ENV, &raw)?;
        }
        if let Some(raw) = var(RPC_TIMEOUT_ENV) {
            config.rpc_timeout = parse_secs(RPC_TIMEOUT_ENV, &raw)?;
        }
        if let Some(raw) = var(CONFIRMATION_TIMEOUT_ENV) {
            config.confirmation.timeout = parse_secs(CONFIRMATION_TIMEOUT_ENV, &raw)?;
        }
        if let Some(raw) = var(CONFIRMATION_POLL_ENV) {
            config.confirmation.poll_interval = parse_secs(CONFIRMATION_POLL_ENV, &raw)?;
        }
        if let Some(raw) = var(APPROVAL_POLICY_ENV) {
            config.confirmation.policy = parse_with(APPROVAL_POLICY_ENV, &raw)?;
        }
        if let Some(raw) = var(ALLOWANCE_SOURCE_ENV) {
            config.allowance_source = parse_with(ALLOWANCE_SOURCE_ENV, &raw)?;
        }

        Ok(config)
    }

    /// Aggregator endpoint root for the configured chain.
    pub fn aggregator_url(&self) -> String {
        format!(
            "{}/{}",
            self.aggregator_base_url.trim_end_matches('/'),
            self.network.chain_id
        )
    }
}

impl fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineConfig")
            .field("network", &self.network)
            .field("aggregator_base_url", &self.aggregator_base_url)
            .field(
                "aggregator_api_key",
                &self.aggregator_api_key.as_ref().map(|_| "<redacted>"),
            )
            .field("destination_token", &self.destination_token)
            .field("http_timeout", &self.http_timeout)
            .field("rpc_timeout", &self.rpc_timeout)
            .field("confirmation", &self.confirmation)
            .field("allowance_source", &self.allowance_source)
            .finish()
    }
}

fn parse_with<T>(name: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
        name,
        reason: e.to_string(),
    })
}

fn parse_secs(name: &'static str, raw: &str) -> Result<Duration, ConfigError> {
    let secs: u64 = parse_with(name, raw)?;
    if secs == 0 {
        return Err(ConfigError::Invalid {
            name,
            reason: "must be at least 1 second".to_string(),
        });
    }
    Ok(Duration::from_secs(secs))
}

/// Configuration loading errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration missing: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<EngineConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        EngineConfig::from_lookup(|name| map.get(name).cloned())
    }

    #[test]
    fn defaults_target_usdc_on_mainnet() {
        let config = load(&[]).unwrap();
        assert_eq!(config.network.chain_id, 43114);
        assert_eq!(config.destination_token, USDC_TOKEN.mainnet_address);
        assert_eq!(config.confirmation.timeout, Duration::from_secs(120));
        assert_eq!(config.confirmation.policy, ApprovalPolicy::Proceed);
        assert_eq!(config.allowance_source, AllowanceSource::Aggregator);
        assert_eq!(config.aggregator_url(), "https://api.1inch.dev/swap/v6.0/43114");
    }

    #[test]
    fn overrides_are_applied() {
        let config = load(&[
            (NETWORK_ENV, "fuji"),
            (RPC_URL_ENV, "http://localhost:8545"),
            (AGGREGATOR_BASE_URL_ENV, "http://127.0.0.1:9000/"),
            (AGGREGATOR_API_KEY_ENV, "secret"),
            (CONFIRMATION_TIMEOUT_ENV, "30"),
            (CONFIRMATION_POLL_ENV, "1"),
            (APPROVAL_POLICY_ENV, "ABORT"),
            (ALLOWANCE_SOURCE_ENV, "chain"),
        ])
        .unwrap();
        assert_eq!(config.network.rpc_url, "http://localhost:8545");
        assert_eq!(config.destination_token, USDC_TOKEN.fuji_address);
        assert_eq!(config.aggregator_url(), "http://127.0.0.1:9000/43113");
        assert_eq!(config.aggregator_api_key.as_deref(), Some("secret"));
        assert_eq!(config.confirmation.timeout, Duration::from_secs(30));
        assert_eq!(config.confirmation.poll_interval, Duration::from_secs(1));
        assert_eq!(config.confirmation.policy, ApprovalPolicy::Abort);
        assert_eq!(config.allowance_source, AllowanceSource::Chain);
    }

    #[test]
    fn unknown_chain_requires_explicit_destination() {
        let err = load(&[(CHAIN_ID_ENV, "1")]).unwrap_err();
        assert!(matches!(err, ConfigError::Missing(DESTINATION_TOKEN_ENV)));

        let config = load(&[
            (CHAIN_ID_ENV, "1"),
            (DESTINATION_TOKEN_ENV, "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48"),
        ])
        .unwrap();
        assert_eq!(config.network.chain_id, 1);
    }

    #[test]
    fn invalid_values_name_the_variable() {
        let err = load(&[(CONFIRMATION_TIMEOUT_ENV, "soon")]).unwrap_err();
        assert!(err.to_string().contains(CONFIRMATION_TIMEOUT_ENV));

        let err = load(&[(HTTP_TIMEOUT_ENV, "0")]).unwrap_err();
        assert!(err.to_string().contains(HTTP_TIMEOUT_ENV));

        let err = load(&[(APPROVAL_POLICY_ENV, "maybe")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: APPROVAL_POLICY_ENV, .. }));
    }

    #[test]
    fn debug_redacts_api_key() {
        let config = load(&[(AGGREGATOR_API_KEY_ENV, "super-secret")]).unwrap();
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
