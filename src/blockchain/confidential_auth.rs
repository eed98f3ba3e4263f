// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! `ConfidentialAuthAddressBased` contract interactions on Oasis Sapphire.
//!
//! The contract keeps each user's secret in confidential storage and derives
//! a wallet address per username. Calls carrying a secret are sealed with
//! [`super::sapphire`] before they leave the process.

use alloy::{
    network::{Ethereum, TransactionBuilder},
    primitives::{Address, Bytes},
    providers::{DynProvider, Provider},
    rpc::types::TransactionRequest,
    sol,
    sol_types::SolCall,
};

use super::error::{ExecutionError, TxError};
use super::executor::{execute_read_with_retry, execute_with_retry, RetryPolicy, SentTx};
use super::sapphire::{seal_calldata, RuntimeKey, CALLDATA_PUBLIC_KEY_METHOD};
use super::types::{GasMultiplier, TxReceipt};

sol! {
    #[sol(rpc)]
    interface IConfidentialAuth {
        function storeSecret(string username, bytes secret) external;
        function deleteSecret(string username, bytes secret) external;
        function getWalletAddress(string username) external view returns (address);
    }
}

/// ConfidentialAuth contract wrapper.
pub struct ConfidentialAuth {
    provider: DynProvider<Ethereum>,
    contract: IConfidentialAuth::IConfidentialAuthInstance<DynProvider<Ethereum>>,
    policy: RetryPolicy,
}

impl ConfidentialAuth {
    pub fn new(provider: DynProvider<Ethereum>, address: Address, policy: RetryPolicy) -> Self {
        Self {
            contract: IConfidentialAuth::new(address, provider.clone()),
            provider,
            policy,
        }
    }

    pub fn address(&self) -> Address {
        *self.contract.address()
    }

    /// Look up the wallet address derived for `username`.
    ///
    /// Returns `None` when the contract reports no such user, either with the
    /// zero address or by reverting.
    pub async fn wallet_address(&self, username: &str) -> Result<Option<Address>, ExecutionError> {
        let contract = &self.contract;
        let lookup = execute_read_with_retry("getWalletAddress", self.policy, move || async move {
            contract
                .getWalletAddress(username.to_string())
                .call()
                .await
                .map_err(TxError::from)
        })
        .await;

        match lookup {
            Ok(address) if address.is_zero() => Ok(None),
            Ok(address) => Ok(Some(address)),
            Err(e) if matches!(e.cause(), TxError::Reverted(_)) => {
                tracing::debug!(username, error = %e, "Wallet lookup reverted, treating as absent");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Store `secret` for `username`.
    pub async fn store_secret(
        &self,
        username: &str,
        secret: &[u8],
    ) -> Result<TxReceipt, ExecutionError> {
        let calldata = IConfidentialAuth::storeSecretCall {
            username: username.to_string(),
            secret: Bytes::copy_from_slice(secret),
        }
        .abi_encode();
        self.send_confidential("storeSecret", &calldata).await
    }

    /// Delete the secret for `username`; the contract checks `secret` matches.
    pub async fn delete_secret(
        &self,
        username: &str,
        secret: &[u8],
    ) -> Result<TxReceipt, ExecutionError> {
        let calldata = IConfidentialAuth::deleteSecretCall {
            username: username.to_string(),
            secret: Bytes::copy_from_slice(secret),
        }
        .abi_encode();
        self.send_confidential("deleteSecret", &calldata).await
    }

    /// Send `calldata` to the contract sealed to the runtime key.
    async fn send_confidential(
        &self,
        label: &str,
        calldata: &[u8],
    ) -> Result<TxReceipt, ExecutionError> {
        let provider = &self.provider;
        let runtime = execute_read_with_retry(CALLDATA_PUBLIC_KEY_METHOD, self.policy, move || {
            RuntimeKey::fetch(provider)
        })
        .await?;
        let runtime = &runtime;

        execute_with_retry(label, self.policy, move |multiplier| {
            self.submit_sealed(runtime, calldata, multiplier)
        })
        .await
    }

    async fn submit_sealed(
        &self,
        runtime: &RuntimeKey,
        calldata: &[u8],
        multiplier: GasMultiplier,
    ) -> Result<SentTx, TxError> {
        let tx = TransactionRequest::default()
            .with_to(self.address())
            .with_input(seal_calldata(runtime, calldata)?);

        let estimate = self.provider.estimate_gas(tx.clone()).await?;
        let gas_limit = multiplier.apply(estimate);
        let pending = self
            .provider
            .send_transaction(tx.with_gas_limit(gas_limit))
            .await?;
        Ok(SentTx::new(pending, gas_limit))
    }
}
