// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Latency-based RPC endpoint selection.
//!
//! ## Strategy
//!
//! 1. **Discovery**: ask the [`ChainRegistry`] for the chain's published RPC URLs
//!    while the fallback is already being probed.
//! 2. **Filtering**: keep HTTPS URLs without `${...}` API-key placeholders; for
//!    known test networks also require the network's marker substring.
//! 3. **Probing**: probe every remaining candidate concurrently.
//! 4. **Selection**: lowest finite latency wins, ties going to the earlier
//!    candidate. If nothing answers, the fallback is returned.
//!
//! Discovery and every probe share one deadline, [`PROBE_TIMEOUT`] after the
//! call starts, so selection returns within the probe timeout whatever the
//! registry does. Selection never fails.

use std::time::Duration;

use futures::future::join_all;
use tokio::time::{timeout_at, Instant};

use super::probe::{EndpointProber, JsonRpcProber};
use super::registry::{ChainRegistry, ChainlistRegistry};
use crate::blockchain::test_network_marker;

/// Upper bound for a whole selection, discovery included.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

const SECURE_SCHEME: &str = "https://";
const PLACEHOLDER_MARKER: &str = "${";

/// Probe outcome for one candidate; `None` latency means unreachable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    pub url: String,
    pub latency: Option<Duration>,
}

/// Picks the fastest live RPC endpoint for a chain.
#[derive(Debug, Clone)]
pub struct EndpointSelector<R, P> {
    registry: R,
    prober: P,
    probe_timeout: Duration,
}

impl EndpointSelector<ChainlistRegistry, JsonRpcProber> {
    /// Selector backed by a chainlist document and HTTP JSON-RPC probes.
    pub fn chainlist(registry_url: impl Into<String>) -> Self {
        let http = reqwest::Client::new();
        Self::new(
            ChainlistRegistry::with_client(registry_url, http.clone()),
            JsonRpcProber::new(http),
        )
    }
}

impl<R: ChainRegistry, P: EndpointProber> EndpointSelector<R, P> {
    pub fn new(registry: R, prober: P) -> Self {
        Self {
            registry,
            prober,
            probe_timeout: PROBE_TIMEOUT,
        }
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Return the lowest-latency reachable endpoint for `chain_id`, or
    /// `fallback` when no candidate answers.
    pub async fn select_best_endpoint(&self, chain_id: u64, fallback: &str) -> String {
        let deadline = Instant::now() + self.probe_timeout;

        let discovery = async {
            match timeout_at(deadline, self.registry.rpc_urls(chain_id)).await {
                Ok(urls) => urls,
                Err(_) => {
                    tracing::warn!(chain_id, "RPC discovery timed out, probing fallback only");
                    Vec::new()
                }
            }
        };
        let (discovered, fallback_result) =
            tokio::join!(discovery, self.probe_until(fallback, deadline));

        let candidates = assemble_candidates(filter_candidates(chain_id, discovered), fallback);
        let others: Vec<String> = candidates
            .iter()
            .filter(|url| url.as_str() != fallback)
            .cloned()
            .collect();
        let mut other_results =
            join_all(others.iter().map(|url| self.probe_until(url, deadline)))
                .await
                .into_iter();

        // Reassemble in candidate order so ties keep discovery order.
        let mut fallback_result = Some(fallback_result);
        let results: Vec<ProbeResult> = candidates
            .iter()
            .filter_map(|url| {
                if url == fallback {
                    fallback_result.take()
                } else {
                    other_results.next()
                }
            })
            .collect();

        let selected = pick_fastest(results, fallback);
        tracing::info!(
            chain_id,
            candidates = candidates.len(),
            selected = %selected,
            "Selected RPC endpoint"
        );
        selected
    }

    /// Probe every candidate concurrently, each bounded by the probe timeout;
    /// failures become `None` latency.
    pub async fn probe_all(&self, candidates: &[String]) -> Vec<ProbeResult> {
        let deadline = Instant::now() + self.probe_timeout;
        join_all(candidates.iter().map(|url| self.probe_until(url, deadline))).await
    }

    async fn probe_until(&self, url: &str, deadline: Instant) -> ProbeResult {
        let started = Instant::now();
        let latency = match timeout_at(deadline, self.prober.probe(url)).await {
            Ok(Ok(())) => Some(started.elapsed()),
            Ok(Err(e)) => {
                tracing::debug!(url = %url, error = %e, "RPC probe failed");
                None
            }
            Err(_) => {
                tracing::debug!(url = %url, "RPC probe timed out");
                None
            }
        };
        ProbeResult {
            url: url.to_string(),
            latency,
        }
    }
}

/// Drop candidates that are insecure, templated, or on the wrong network.
pub fn filter_candidates(chain_id: u64, discovered: Vec<String>) -> Vec<String> {
    let marker = test_network_marker(chain_id);

    discovered
        .into_iter()
        .filter(|url| url.starts_with(SECURE_SCHEME))
        .filter(|url| !url.contains(PLACEHOLDER_MARKER))
        .filter(|url| marker.is_none_or(|m| url.contains(m)))
        .collect()
}

/// Discovered candidates in order followed by the fallback, without duplicates.
pub fn assemble_candidates(filtered: Vec<String>, fallback: &str) -> Vec<String> {
    let mut candidates: Vec<String> = Vec::with_capacity(filtered.len() + 1);
    for url in filtered.into_iter().chain(std::iter::once(fallback.to_string())) {
        if !candidates.contains(&url) {
            candidates.push(url);
        }
    }
    candidates
}

/// Choose the candidate with the smallest finite latency.
///
/// Stable with respect to input order; returns `fallback` when every probe
/// failed or `results` is empty.
pub fn pick_fastest(mut results: Vec<ProbeResult>, fallback: &str) -> String {
    results.sort_by_key(|r| r.latency.unwrap_or(Duration::MAX));

    match results.into_iter().next() {
        Some(ProbeResult {
            url,
            latency: Some(_),
        }) => url,
        _ => {
            tracing::warn!(fallback, "No RPC candidate responded, using fallback");
            fallback.to_string()
        }
    }
}
