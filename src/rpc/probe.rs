// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JSON-RPC liveness probing.

use std::future::Future;

use reqwest::Client;
use serde_json::{json, Value};

/// Reasons a liveness probe can fail.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("unexpected status {0}")]
    Status(reqwest::StatusCode),

    #[error("invalid response body: {0}")]
    InvalidBody(String),

    #[error("rpc error: {0}")]
    Rpc(String),
}

/// Issues a minimal liveness request against an RPC endpoint.
///
/// The caller bounds and times each probe; implementations only report
/// whether the endpoint answered successfully.
pub trait EndpointProber: Send + Sync {
    fn probe(&self, url: &str) -> impl Future<Output = Result<(), ProbeError>> + Send;
}

/// Probes endpoints with `eth_blockNumber` over HTTP.
#[derive(Debug, Clone, Default)]
pub struct JsonRpcProber {
    http: Client,
}

impl JsonRpcProber {
    pub fn new(http: Client) -> Self {
        Self { http }
    }
}

impl EndpointProber for JsonRpcProber {
    async fn probe(&self, url: &str) -> Result<(), ProbeError> {
        let payload = json!({
            "jsonrpc": "2.0",
            "method": "eth_blockNumber",
            "params": [],
            "id": 1
        });

        let response = self.http.post(url).json(&payload).send().await?;
        if !response.status().is_success() {
            return Err(ProbeError::Status(response.status()));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ProbeError::InvalidBody(e.to_string()))?;
        check_rpc_body(&body)
    }
}

/// Reject bodies carrying a JSON-RPC `error` member or lacking a `result`.
fn check_rpc_body(body: &Value) -> Result<(), ProbeError> {
    if let Some(error) = body.get("error").filter(|e| !e.is_null()) {
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string());
        return Err(ProbeError::Rpc(message));
    }

    if body.get("result").is_none() {
        return Err(ProbeError::InvalidBody("missing result".to_string()));
    }

    Ok(())
}
