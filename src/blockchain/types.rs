// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Blockchain types and constants.

use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// EVM network configuration.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Network name for display
    pub name: &'static str,
    /// Chain ID
    pub chain_id: u64,
    /// Known-good RPC endpoint, used as the selection fallback
    pub rpc_url: &'static str,
    /// Block explorer URL
    pub explorer_url: &'static str,
}

/// Oasis Sapphire Testnet configuration.
pub const SAPPHIRE_TESTNET: NetworkConfig = NetworkConfig {
    name: "Oasis Sapphire Testnet",
    chain_id: 23295,
    rpc_url: "https://testnet.sapphire.oasis.io",
    explorer_url: "https://explorer.oasis.io/testnet/sapphire",
};

/// Hoodi Testnet configuration.
pub const HOODI: NetworkConfig = NetworkConfig {
    name: "Hoodi Testnet",
    chain_id: 560048,
    rpc_url: "https://rpc.hoodi.ethpandaops.io",
    explorer_url: "https://hoodi.etherscan.io",
};

/// Test networks and the substring every RPC URL for them must carry.
///
/// Discovered endpoints for these chains that lack the marker are discarded so
/// a mainnet endpoint is never picked for testnet traffic.
const TEST_NETWORK_MARKERS: &[(u64, &str)] = &[
    (560048, "hoodi"),
    (23295, "testnet"),
    (11155111, "sepolia"),
    (17000, "holesky"),
];

/// Case-sensitive marker required in RPC URLs for a known test network.
pub fn test_network_marker(chain_id: u64) -> Option<&'static str> {
    TEST_NETWORK_MARKERS
        .iter()
        .find(|(id, _)| *id == chain_id)
        .map(|(_, marker)| *marker)
}

/// Gas limit multiplier applied to a fresh estimate on each attempt.
///
/// Stored in percent so escalation stays in integer arithmetic:
/// attempt 0 is 100%, attempt 1 is 150%, attempt 2 is 200%, and so on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct GasMultiplier {
    percent: u64,
}

impl GasMultiplier {
    pub const BASE: GasMultiplier = GasMultiplier { percent: 100 };
    const STEP_PERCENT: u64 = 50;

    /// Multiplier used for the given 0-based attempt.
    pub fn for_attempt(attempt: u32) -> Self {
        Self {
            percent: 100 + Self::STEP_PERCENT * u64::from(attempt),
        }
    }

    /// Scale a gas estimate, rounding up.
    pub fn apply(self, estimate: u64) -> u64 {
        let scaled = (u128::from(estimate) * u128::from(self.percent)).div_ceil(100);
        u64::try_from(scaled).unwrap_or(u64::MAX)
    }

    pub fn as_f64(self) -> f64 {
        self.percent as f64 / 100.0
    }
}

impl fmt::Display for GasMultiplier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}x", self.as_f64())
    }
}

/// Transaction receipt after confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TxReceipt {
    /// Transaction hash
    pub tx_hash: String,
    /// Block number where transaction was included
    pub block_number: u64,
    /// Gas actually used
    pub gas_used: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multiplier_sequence_escalates_by_half() {
        let seq: Vec<f64> = (0..4).map(|a| GasMultiplier::for_attempt(a).as_f64()).collect();
        assert_eq!(seq, vec![1.0, 1.5, 2.0, 2.5]);
        assert_eq!(GasMultiplier::for_attempt(0), GasMultiplier::BASE);
    }

    #[test]
    fn multiplier_applies_to_estimate_with_round_up() {
        assert_eq!(GasMultiplier::for_attempt(0).apply(21_000), 21_000);
        assert_eq!(GasMultiplier::for_attempt(1).apply(21_000), 31_500);
        assert_eq!(GasMultiplier::for_attempt(2).apply(21_000), 42_000);
        assert_eq!(GasMultiplier::for_attempt(1).apply(3), 5);
        assert_eq!(GasMultiplier::for_attempt(2).apply(u64::MAX), u64::MAX);
    }

    #[test]
    fn multiplier_display() {
        assert_eq!(GasMultiplier::for_attempt(1).to_string(), "1.5x");
    }

    #[test]
    fn known_test_networks_have_markers() {
        assert_eq!(test_network_marker(HOODI.chain_id), Some("hoodi"));
        assert_eq!(test_network_marker(SAPPHIRE_TESTNET.chain_id), Some("testnet"));
        assert_eq!(test_network_marker(1), None);
        // Fallbacks must satisfy their own network's filter.
        assert!(HOODI.rpc_url.contains("hoodi"));
        assert!(SAPPHIRE_TESTNET.rpc_url.contains("testnet"));
    }
}
