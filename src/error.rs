// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Swap engine errors and their HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::aggregator::AggregatorError;
use crate::blockchain::{ChainClientError, TxHash};
use crate::config::ConfigError;
use crate::models::TransactionIntent;

/// Errors surfaced by a coordinator run.
///
/// Nothing inside the engine retries. Every variant except `Validation` and
/// `Config` can be recovered from by re-issuing the whole swap: an allowance
/// raised by an earlier attempt is observed and the approval step is skipped.
#[derive(Debug, thiserror::Error)]
pub enum SwapError {
    /// Malformed request; the caller's fault.
    #[error("Invalid swap request: {0}")]
    Validation(String),

    /// Transport failure or timeout talking to the aggregator or the chain.
    #[error("Network error: {0}")]
    Network(String),

    /// Non-2xx aggregator response.
    #[error("Aggregator returned {status}: {body}")]
    Aggregator { status: u16, body: String },

    /// 2xx aggregator response the engine could not interpret.
    #[error("Aggregator response was invalid: {0}")]
    InvalidResponse(String),

    /// Signing, gas estimation or broadcast refused by the chain.
    #[error("Chain rejected transaction ({intent}, nonce {nonce:?}): {cause}")]
    Chain {
        intent: Box<TransactionIntent>,
        nonce: Option<u64>,
        cause: String,
    },

    /// Approval never confirmed and the engine is configured to stop.
    #[error("Approval {hash} was not confirmed: {reason}")]
    ApprovalUnconfirmed { hash: TxHash, reason: String },

    /// Caller cancelled the run between steps.
    #[error("Swap cancelled")]
    Cancelled,

    /// The engine itself is wired up wrongly; re-issuing cannot help.
    #[error("Engine misconfigured: {0}")]
    Config(String),
}

impl SwapError {
    /// Whether re-issuing the complete swap could succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, SwapError::Validation(_) | SwapError::Config(_))
    }

    /// HTTP status the calling layer should answer with.
    pub fn status_code(&self) -> StatusCode {
        match self {
            SwapError::Validation(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Failures while wiring an engine together at startup.
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Aggregator(#[from] AggregatorError),

    #[error(transparent)]
    Chain(#[from] ChainClientError),

    #[error("Failed to read key file {path}: {source}")]
    KeyFile {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }
}

impl From<SwapError> for ApiError {
    fn from(error: SwapError) -> Self {
        Self::new(error.status_code(), error.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message,
        });
        (self.status, body).into_response()
    }
}
