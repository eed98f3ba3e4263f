// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Signing EVM client bound to one RPC endpoint.

use alloy::{
    network::{Ethereum, EthereumWallet},
    primitives::Address,
    providers::{DynProvider, Provider, ProviderBuilder},
    signers::local::PrivateKeySigner,
};

/// Signing client for a single chain, connected to an already-selected endpoint.
///
/// Built per request; nothing is cached across requests.
#[derive(Clone)]
pub struct ChainClient {
    /// Chain ID the client was built for
    chain_id: u64,
    /// Endpoint the provider talks to
    rpc_url: String,
    /// Address of the signing wallet
    signer_address: Address,
    /// Alloy HTTP provider with wallet and fillers
    provider: DynProvider<Ethereum>,
}

impl std::fmt::Debug for ChainClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainClient")
            .field("chain_id", &self.chain_id)
            .field("rpc_url", &self.rpc_url)
            .field("signer_address", &self.signer_address)
            .finish()
    }
}

impl ChainClient {
    /// Connect a signing provider to `rpc_url`.
    pub fn connect(
        chain_id: u64,
        rpc_url: &str,
        signer: PrivateKeySigner,
    ) -> Result<Self, ChainClientError> {
        let url: url::Url = rpc_url
            .parse()
            .map_err(|e: url::ParseError| ChainClientError::InvalidRpcUrl(e.to_string()))?;

        let signer_address = signer.address();
        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(signer))
            .connect_http(url)
            .erased();

        Ok(Self {
            chain_id,
            rpc_url: rpc_url.to_string(),
            signer_address,
            provider,
        })
    }

    pub fn provider(&self) -> &DynProvider<Ethereum> {
        &self.provider
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }

    pub fn signer_address(&self) -> Address {
        self.signer_address
    }

    /// Create a signer from a hex private key, with or without `0x` prefix.
    pub fn create_signer(private_key_hex: &str) -> Result<PrivateKeySigner, ChainClientError> {
        let trimmed = private_key_hex.trim();
        let hex = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        let key_bytes = alloy::hex::decode(hex)
            .map_err(|e| ChainClientError::InvalidPrivateKey(e.to_string()))?;

        PrivateKeySigner::from_slice(&key_bytes)
            .map_err(|e| ChainClientError::InvalidPrivateKey(e.to_string()))
    }
}

/// Errors that can occur while setting up chain access.
#[derive(Debug, thiserror::Error)]
pub enum ChainClientError {
    #[error("Invalid RPC URL: {0}")]
    InvalidRpcUrl(String),

    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(String),
}
