// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Public chain registry lookup for candidate RPC endpoints.

use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;

/// Timeout for fetching the registry document.
pub const DISCOVERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Source of candidate RPC URLs for a chain.
///
/// Implementations never fail: any lookup problem yields an empty list.
pub trait ChainRegistry: Send + Sync {
    fn rpc_urls(&self, chain_id: u64) -> impl Future<Output = Vec<String>> + Send;
}

/// One entry of the chainlist-style registry document.
#[derive(Debug, Deserialize)]
struct ChainRecord {
    #[serde(rename = "chainId")]
    chain_id: u64,
    #[serde(default)]
    rpc: Vec<RpcEntry>,
}

/// RPC entries are plain strings in `chains.json` and objects in some mirrors.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RpcEntry {
    Url(String),
    Detailed { url: String },
}

impl RpcEntry {
    fn into_url(self) -> String {
        match self {
            RpcEntry::Url(url) | RpcEntry::Detailed { url } => url,
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum DiscoveryError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("unexpected status {0}")]
    Status(reqwest::StatusCode),

    #[error("malformed registry payload: {0}")]
    Payload(#[from] serde_json::Error),
}

/// Registry backed by a chainlist JSON document over HTTPS.
#[derive(Debug, Clone)]
pub struct ChainlistRegistry {
    url: String,
    http: Client,
}

impl ChainlistRegistry {
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_client(url, Client::new())
    }

    pub fn with_client(url: impl Into<String>, http: Client) -> Self {
        Self {
            url: url.into(),
            http,
        }
    }

    async fn fetch(&self, chain_id: u64) -> Result<Vec<String>, DiscoveryError> {
        let response = self
            .http
            .get(&self.url)
            .timeout(DISCOVERY_TIMEOUT)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(DiscoveryError::Status(response.status()));
        }

        let body = response.bytes().await?;
        Ok(rpc_urls_for_chain(&body, chain_id)?)
    }
}

impl ChainRegistry for ChainlistRegistry {
    async fn rpc_urls(&self, chain_id: u64) -> Vec<String> {
        match self.fetch(chain_id).await {
            Ok(urls) => {
                tracing::debug!(chain_id, count = urls.len(), "Discovered RPC candidates");
                urls
            }
            Err(e) => {
                tracing::warn!(chain_id, registry = %self.url, error = %e, "RPC discovery failed");
                Vec::new()
            }
        }
    }
}

/// Extract the RPC list for `chain_id` from a registry document.
///
/// A document without a matching record yields an empty list.
fn rpc_urls_for_chain(body: &[u8], chain_id: u64) -> Result<Vec<String>, serde_json::Error> {
    let records: Vec<ChainRecord> = serde_json::from_slice(body)?;
    Ok(records
        .into_iter()
        .find(|record| record.chain_id == chain_id)
        .map(|record| record.rpc.into_iter().map(RpcEntry::into_url).collect())
        .unwrap_or_default())
}
