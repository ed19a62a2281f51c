// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{ArgGroup, Parser};
use relational_swap_engine::{
    blockchain::SigningCredential, config::ConfigError, logging, EngineConfig, SetupError,
    SwapCoordinator, SwapError, SwapInput, SwapResponse,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Swap an on-chain asset into the configured stablecoin.
#[derive(Debug, Parser)]
#[command(name = "relational-swap-engine", version)]
#[command(group(ArgGroup::new("key").required(true).args(["key_file", "key_hex"])))]
struct Args {
    /// Token to sell; `0xEeeeeEeeeEeEeeEeEeEeeEEEeeeeEeeeeeeeEEeE` for the native asset
    #[arg(long)]
    source_token: String,

    /// Amount in the token's smallest units
    #[arg(long)]
    amount: String,

    /// Maximum slippage in percent (1-50)
    #[arg(long, default_value_t = 1)]
    slippage: i64,

    /// PEM private key file (SEC1 or PKCS#8)
    #[arg(long, env = "SWAP_KEY_FILE")]
    key_file: Option<PathBuf>,

    /// Hex private key
    #[arg(long, env = "SWAP_KEY_HEX", hide_env_values = true)]
    key_hex: Option<String>,
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Setup(#[from] SetupError),

    #[error(transparent)]
    Swap(#[from] SwapError),
}

impl CliError {
    fn exit_code(&self) -> ExitCode {
        match self {
            CliError::Swap(SwapError::Validation(_)) => ExitCode::from(2),
            _ => ExitCode::FAILURE,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    logging::init();

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling swap");
            trigger.cancel();
        }
    });

    match run(args, &cancel).await {
        Ok(response) => match serde_json::to_string_pretty(&response) {
            Ok(json) => {
                println!("{json}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("error: failed to encode result: {e}");
                ExitCode::FAILURE
            }
        },
        Err(e) => {
            eprintln!("error: {e}");
            e.exit_code()
        }
    }
}

async fn run(args: Args, cancel: &CancellationToken) -> Result<SwapResponse, CliError> {
    let config = EngineConfig::from_env().map_err(SetupError::from)?;
    info!(?config, "Configuration loaded");

    let coordinator = SwapCoordinator::from_config(&config)?;
    let request = coordinator.request_from_input(&SwapInput {
        source_token: args.source_token,
        amount: args.amount,
        slippage: args.slippage,
    })?;
    let credential = load_credential(args.key_file.as_deref(), args.key_hex.as_deref())?;

    let result = coordinator
        .perform_complete_swap(&request, &credential, cancel)
        .await?;
    info!(
        explorer = %config.network.explorer_tx_url(&result.swap_tx_hash),
        "Swap transaction"
    );
    Ok(SwapResponse::from(&result))
}

/// A key file takes precedence over a hex key.
fn load_credential(
    key_file: Option<&Path>,
    key_hex: Option<&str>,
) -> Result<SigningCredential, SetupError> {
    if let Some(path) = key_file {
        let pem = std::fs::read(path).map_err(|source| SetupError::KeyFile {
            path: path.display().to_string(),
            source,
        })?;
        return Ok(SigningCredential::from_pem(&pem)?);
    }

    match key_hex {
        Some(hex) => Ok(SigningCredential::from_hex(hex)?),
        None => Err(ConfigError::Missing("SWAP_KEY_FILE or SWAP_KEY_HEX").into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use k256::pkcs8::{EncodePrivateKey, LineEnding};
    use std::io::Write;

    const KEY_HEX: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcaf784d7bf4f2ff80";
    const KEY_ADDRESS: &str = "0x500d75F1329cf98352c32Cf238c2192ca78faFFE";

    #[test]
    fn cli_definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn loads_pem_key_file() {
        let secret = k256::SecretKey::from_slice(&alloy::hex::decode(KEY_HEX).unwrap()).unwrap();
        let pem = secret.to_pkcs8_pem(LineEnding::LF).unwrap();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(pem.as_bytes()).unwrap();

        let credential = load_credential(Some(file.path()), None).unwrap();
        assert_eq!(credential.address().to_string(), KEY_ADDRESS);
    }

    #[test]
    fn missing_key_file_names_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.pem");

        let err = load_credential(Some(&path), Some(KEY_HEX)).unwrap_err();
        assert!(matches!(err, SetupError::KeyFile { .. }));
        assert!(err.to_string().contains("absent.pem"));
    }

    #[test]
    fn falls_back_to_hex_key() {
        let credential = load_credential(None, Some(KEY_HEX)).unwrap();
        assert_eq!(credential.address().to_string(), KEY_ADDRESS);
    }

    #[test]
    fn validation_errors_exit_with_2() {
        let invalid = CliError::Swap(SwapError::Validation("slippage".into()));
        assert_eq!(format!("{:?}", invalid.exit_code()), format!("{:?}", ExitCode::from(2)));

        let upstream = CliError::Swap(SwapError::Network("timeout".into()));
        assert_eq!(format!("{:?}", upstream.exit_code()), format!("{:?}", ExitCode::FAILURE));
    }
}
