// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is read from the environment once at startup into an
//! [`AppConfig`] and injected into request handlers through
//! [`crate::state::AppState`]. Nothing in the crate reads the environment
//! after startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `PKEY` | Hex private key of the deployer/sponsor wallet | Required for chain operations |
//! | `SAPPHIRE_RPC_URL` | Fallback Sapphire RPC endpoint | `https://testnet.sapphire.oasis.io` |
//! | `SAPPHIRE_CHAIN_ID` | Sapphire chain id | `23295` |
//! | `HOODI_RPC_URL` | Fallback Hoodi RPC endpoint | `https://rpc.hoodi.ethpandaops.io` |
//! | `HOODI_CHAIN_ID` | Hoodi chain id | `560048` |
//! | `CHAIN_REGISTRY_URL` | Public chain registry used for endpoint discovery | `https://chainid.network/chains.json` |
//! | `CONFIDENTIAL_AUTH_ADDRESS` | ConfidentialAuth contract on Sapphire | see [`DEFAULT_CONFIDENTIAL_AUTH_ADDRESS`] |
//! | `SECOND_LEVEL_INTERACTOR_ADDRESS` | ENS controller on Hoodi | see [`DEFAULT_SECOND_LEVEL_INTERACTOR_ADDRESS`] |
//! | `PUBLIC_RESOLVER_ADDRESS` | ENS public resolver on Hoodi | see [`DEFAULT_PUBLIC_RESOLVER_ADDRESS`] |
//! | `ENS_REGISTRY_ADDRESS` | ENS registry on Hoodi (enables registration skip check) | Optional |
//! | `ENS_PARENT_DOMAIN` | Parent domain label | `authdemo1765462240433` |
//! | `ENS_TLD` | Top-level domain | `global` |
//! | `TX_MAX_RETRIES` | Retries after the first transaction attempt | `2` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::str::FromStr;

use alloy::primitives::Address;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";

/// Environment variable holding the hex-encoded signer key.
///
/// Checked per request rather than at startup so that the service can still
/// answer health probes while misconfigured.
pub const PRIVATE_KEY_ENV: &str = "PKEY";

pub const SAPPHIRE_RPC_URL_ENV: &str = "SAPPHIRE_RPC_URL";
pub const SAPPHIRE_CHAIN_ID_ENV: &str = "SAPPHIRE_CHAIN_ID";
pub const HOODI_RPC_URL_ENV: &str = "HOODI_RPC_URL";
pub const HOODI_CHAIN_ID_ENV: &str = "HOODI_CHAIN_ID";
pub const CHAIN_REGISTRY_URL_ENV: &str = "CHAIN_REGISTRY_URL";
pub const CONFIDENTIAL_AUTH_ADDRESS_ENV: &str = "CONFIDENTIAL_AUTH_ADDRESS";
pub const SECOND_LEVEL_INTERACTOR_ADDRESS_ENV: &str = "SECOND_LEVEL_INTERACTOR_ADDRESS";
pub const PUBLIC_RESOLVER_ADDRESS_ENV: &str = "PUBLIC_RESOLVER_ADDRESS";
pub const ENS_REGISTRY_ADDRESS_ENV: &str = "ENS_REGISTRY_ADDRESS";
pub const ENS_PARENT_DOMAIN_ENV: &str = "ENS_PARENT_DOMAIN";
pub const ENS_TLD_ENV: &str = "ENS_TLD";
pub const TX_MAX_RETRIES_ENV: &str = "TX_MAX_RETRIES";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_CHAIN_REGISTRY_URL: &str = "https://chainid.network/chains.json";

/// `ConfidentialAuthAddressBased` deployment on Sapphire testnet.
pub const DEFAULT_CONFIDENTIAL_AUTH_ADDRESS: &str = "0xf4B4d8b8a9b1F104b2100F6d68e1ab21C3a2DF76";
/// `SecondLevelInteractor` controlling the parent domain on Hoodi.
pub const DEFAULT_SECOND_LEVEL_INTERACTOR_ADDRESS: &str =
    "0x5bA6D4749AE9573f703E19f9197AE783dFaa78f8";
pub const DEFAULT_PUBLIC_RESOLVER_ADDRESS: &str = "0x9427fF61d53deDB42102d84E0EC2927F910eF8f2";
pub const DEFAULT_ENS_PARENT_DOMAIN: &str = "authdemo1765462240433";
pub const DEFAULT_ENS_TLD: &str = "global";
pub const DEFAULT_TX_MAX_RETRIES: u32 = 2;

/// Errors raised while loading configuration at startup.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {reason}")]
    InvalidValue { name: &'static str, reason: String },
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

/// ENS naming settings for the Hoodi registration pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnsConfig {
    pub second_level_interactor: Address,
    pub public_resolver: Address,
    pub registry: Option<Address>,
    pub parent_domain: String,
    pub tld: String,
}

/// Fully resolved application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub private_key: Option<String>,
    pub sapphire_rpc_url: String,
    pub sapphire_chain_id: u64,
    pub hoodi_rpc_url: String,
    pub hoodi_chain_id: u64,
    pub chain_registry_url: String,
    pub confidential_auth: Address,
    pub ens: EnsConfig,
    pub tx_max_retries: u32,
    pub log_format: LogFormat,
}

impl AppConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Empty values behave like unset ones
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let host = get(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = parse_or(&get, PORT_ENV, DEFAULT_PORT)?;

        let ens = EnsConfig {
            second_level_interactor: address_or(
                &get,
                SECOND_LEVEL_INTERACTOR_ADDRESS_ENV,
                DEFAULT_SECOND_LEVEL_INTERACTOR_ADDRESS,
            )?,
            public_resolver: address_or(
                &get,
                PUBLIC_RESOLVER_ADDRESS_ENV,
                DEFAULT_PUBLIC_RESOLVER_ADDRESS,
            )?,
            registry: get(ENS_REGISTRY_ADDRESS_ENV)
                .map(|raw| parse_address(ENS_REGISTRY_ADDRESS_ENV, &raw))
                .transpose()?,
            parent_domain: get(ENS_PARENT_DOMAIN_ENV)
                .unwrap_or_else(|| DEFAULT_ENS_PARENT_DOMAIN.to_string()),
            tld: get(ENS_TLD_ENV).unwrap_or_else(|| DEFAULT_ENS_TLD.to_string()),
        };

        let log_format = match get(LOG_FORMAT_ENV).as_deref().map(str::to_ascii_lowercase) {
            Some(ref v) if v == "json" => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        Ok(Self {
            host,
            port,
            private_key: get(PRIVATE_KEY_ENV),
            sapphire_rpc_url: get(SAPPHIRE_RPC_URL_ENV)
                .unwrap_or_else(|| crate::blockchain::SAPPHIRE_TESTNET.rpc_url.to_string()),
            sapphire_chain_id: parse_or(
                &get,
                SAPPHIRE_CHAIN_ID_ENV,
                crate::blockchain::SAPPHIRE_TESTNET.chain_id,
            )?,
            hoodi_rpc_url: get(HOODI_RPC_URL_ENV)
                .unwrap_or_else(|| crate::blockchain::HOODI.rpc_url.to_string()),
            hoodi_chain_id: parse_or(&get, HOODI_CHAIN_ID_ENV, crate::blockchain::HOODI.chain_id)?,
            chain_registry_url: get(CHAIN_REGISTRY_URL_ENV)
                .unwrap_or_else(|| DEFAULT_CHAIN_REGISTRY_URL.to_string()),
            confidential_auth: address_or(
                &get,
                CONFIDENTIAL_AUTH_ADDRESS_ENV,
                DEFAULT_CONFIDENTIAL_AUTH_ADDRESS,
            )?,
            ens,
            tx_max_retries: parse_or(&get, TX_MAX_RETRIES_ENV, DEFAULT_TX_MAX_RETRIES)?,
            log_format,
        })
    }

    /// Socket address string for the HTTP listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        // Defaults are all valid constants, so an empty lookup cannot fail.
        Self::from_lookup(|_| None).unwrap_or_else(|e| unreachable!("default config: {e}"))
    }
}

fn parse_or<G, T>(get: &G, name: &'static str, default: T) -> Result<T, ConfigError>
where
    G: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match get(name) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            name,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

fn address_or<G>(get: &G, name: &'static str, default: &str) -> Result<Address, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    let raw = get(name).unwrap_or_else(|| default.to_string());
    parse_address(name, &raw)
}

fn parse_address(name: &'static str, raw: &str) -> Result<Address, ConfigError> {
    Address::from_str(raw.trim()).map_err(|e| ConfigError::InvalidValue {
        name,
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_apply_when_environment_is_empty() {
        let config = AppConfig::from_lookup(|_| None).unwrap();

        assert_eq!(config.bind_address(), "0.0.0.0:8080");
        assert_eq!(config.private_key, None);
        assert_eq!(config.sapphire_rpc_url, "https://testnet.sapphire.oasis.io");
        assert_eq!(config.sapphire_chain_id, 23295);
        assert_eq!(config.hoodi_rpc_url, "https://rpc.hoodi.ethpandaops.io");
        assert_eq!(config.hoodi_chain_id, 560048);
        assert_eq!(config.chain_registry_url, DEFAULT_CHAIN_REGISTRY_URL);
        assert_eq!(config.tx_max_retries, 2);
        assert_eq!(config.ens.registry, None);
        assert_eq!(config.ens.tld, "global");
        assert_eq!(config.log_format, LogFormat::Pretty);
    }

    #[test]
    fn overrides_are_parsed() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("PORT", "9000"),
            ("PKEY", "abcd"),
            ("TX_MAX_RETRIES", "4"),
            ("LOG_FORMAT", "JSON"),
            ("ENS_REGISTRY_ADDRESS", "0x0000000000000000000000000000000000000001"),
            ("ENS_PARENT_DOMAIN", "example"),
        ]))
        .unwrap();

        assert_eq!(config.port, 9000);
        assert_eq!(config.private_key.as_deref(), Some("abcd"));
        assert_eq!(config.tx_max_retries, 4);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.ens.registry, Some(Address::with_last_byte(1)));
        assert_eq!(config.ens.parent_domain, "example");
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let config = AppConfig::from_lookup(lookup_from(&[("PKEY", "  "), ("PORT", "")])).unwrap();
        assert_eq!(config.private_key, None);
        assert_eq!(config.port, DEFAULT_PORT);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let err = AppConfig::from_lookup(lookup_from(&[("PORT", "not-a-port")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { name: "PORT", .. }));

        let err = AppConfig::from_lookup(lookup_from(&[("CONFIDENTIAL_AUTH_ADDRESS", "0x12")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                name: "CONFIDENTIAL_AUTH_ADDRESS",
                ..
            }
        ));
    }
}
