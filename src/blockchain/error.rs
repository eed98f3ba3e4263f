// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Typed failure taxonomy for transaction submission.
//!
//! Failures are classified once, where they leave alloy, so the retry loop in
//! [`super::executor`] branches on the variant and never on message text.

use std::error::Error as StdError;

use alloy::{
    providers::PendingTransactionError,
    transports::{RpcError, TransportError, TransportErrorKind},
};

/// Substrings marking a transaction rejected by contract logic.
const REVERT_PATTERNS: &[&str] = &["revert", "call_exception"];

/// Substrings marking an insufficient gas budget.
const OUT_OF_GAS_PATTERNS: &[&str] = &[
    "out of gas",
    "gas required exceeds",
    "intrinsic gas too low",
    "insufficient gas",
];

/// Substrings marking transport trouble.
const NETWORK_PATTERNS: &[&str] = &[
    "timeout",
    "timed out",
    "network",
    "econnrefused",
    "econnreset",
    "enotfound",
    "socket hang up",
    "connection",
];

/// Substrings marking a stale or conflicting nonce.
const NONCE_PATTERNS: &[&str] = &[
    "nonce too low",
    "nonce has already been used",
    "nonce_expired",
    "replacement transaction underpriced",
    "already known",
];

/// A classified transaction or RPC failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TxError {
    /// Executed and rejected by contract logic.
    #[error("transaction reverted: {0}")]
    Reverted(String),

    #[error("out of gas: {0}")]
    OutOfGas(String),

    #[error("network timeout: {0}")]
    NetworkTimeout(String),

    #[error("nonce conflict: {0}")]
    NonceConflict(String),

    #[error("{0}")]
    Unknown(String),
}

impl TxError {
    /// Classify a failure by its message.
    ///
    /// Matching is case-insensitive. A revert that also mentions gas
    /// exhaustion is treated as out-of-gas.
    pub fn classify(message: impl Into<String>) -> Self {
        let message = message.into();
        let lower = message.to_lowercase();
        let matches = |patterns: &[&str]| patterns.iter().any(|p| lower.contains(p));

        let out_of_gas = matches(OUT_OF_GAS_PATTERNS);
        if matches(REVERT_PATTERNS) && !out_of_gas {
            TxError::Reverted(message)
        } else if out_of_gas {
            TxError::OutOfGas(message)
        } else if matches(NETWORK_PATTERNS) {
            TxError::NetworkTimeout(message)
        } else if matches(NONCE_PATTERNS) {
            TxError::NonceConflict(message)
        } else {
            TxError::Unknown(message)
        }
    }

    /// Whether a write should be resubmitted after this failure.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TxError::OutOfGas(_) | TxError::NetworkTimeout(_) | TxError::NonceConflict(_)
        )
    }

    /// Whether an idempotent read should be repeated after this failure.
    pub fn is_retryable_read(&self) -> bool {
        matches!(self, TxError::NetworkTimeout(_))
    }

    /// The underlying failure message, without the classification prefix.
    pub fn message(&self) -> &str {
        match self {
            TxError::Reverted(m)
            | TxError::OutOfGas(m)
            | TxError::NetworkTimeout(m)
            | TxError::NonceConflict(m)
            | TxError::Unknown(m) => m,
        }
    }
}

impl From<alloy::contract::Error> for TxError {
    fn from(e: alloy::contract::Error) -> Self {
        match e {
            alloy::contract::Error::TransportError(e) => classify_transport(&e),
            alloy::contract::Error::PendingTransactionError(e) => e.into(),
            other => TxError::classify(error_chain(&other)),
        }
    }
}

impl From<TransportError> for TxError {
    fn from(e: TransportError) -> Self {
        classify_transport(&e)
    }
}

impl From<PendingTransactionError> for TxError {
    fn from(e: PendingTransactionError) -> Self {
        match e {
            PendingTransactionError::TransportError(e) => classify_transport(&e),
            PendingTransactionError::TxWatcher(e) => TxError::NetworkTimeout(error_chain(&e)),
            other => TxError::classify(error_chain(&other)),
        }
    }
}

/// Classify an RPC failure.
///
/// Failures to reach the node are network failures whatever their text; error
/// responses from the node are classified by message.
fn classify_transport(e: &TransportError) -> TxError {
    let message = error_chain(e);
    match e {
        RpcError::Transport(kind) if is_connectivity_failure(kind) => {
            TxError::NetworkTimeout(message)
        }
        _ => TxError::classify(message),
    }
}

fn is_connectivity_failure(kind: &TransportErrorKind) -> bool {
    match kind {
        TransportErrorKind::HttpError(http) => kind.is_retry_err() || http.status >= 500,
        TransportErrorKind::Custom(_)
        | TransportErrorKind::BackendGone
        | TransportErrorKind::MissingBatchResponse(_) => true,
        _ => false,
    }
}

/// `err` followed by every message in its source chain not already shown.
///
/// Transport errors name only the failed request at the top level; the cause
/// (refused connection, timeout) sits further down the chain.
fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}

/// Terminal failure of a retried operation.
///
/// Carries the last underlying [`TxError`] unchanged, plus the operation label
/// and number of attempts made.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{label} failed after {attempts} attempt(s): {source}")]
pub struct ExecutionError {
    pub label: String,
    pub attempts: u32,
    #[source]
    pub source: TxError,
}

impl ExecutionError {
    pub fn cause(&self) -> &TxError {
        &self.source
    }

    pub fn into_cause(self) -> TxError {
        self.source
    }
}
