// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # ENS Subdomain Registration
//!
//! Registers `{label}.{parent}.{tld}` on Hoodi through the parent domain's
//! `SecondLevelInteractor` and points the subdomain's address record at the
//! user's wallet.
//!
//! ## Pipeline
//!
//! Registration is an ordered list of [`RegistrationStep`]s. Before running a
//! step the pipeline asks its [`RegistrationBackend`] whether the step's
//! effect is already present and skips it if so, so a request that failed
//! half-way can simply be re-run. [`EnsContracts`] is the on-chain backend;
//! each of its steps goes through [`execute_with_retry`] on its own.
//!
//! 1. **RegisterSubnode**: `registerSubnodeRecord(owner, label, parent, expiry)`.
//!    Considered done when an ENS registry is configured and reports the node.
//! 2. **SetAddress**: `executeTransaction(resolver, setAddr(node, owner))`.
//!    Considered done when the resolver already returns `owner` for the node.

use std::future::Future;

use alloy::{
    ens::namehash,
    network::Ethereum,
    primitives::{Address, Bytes, B256, U256},
    providers::DynProvider,
    sol,
    sol_types::SolCall,
};

use super::error::{ExecutionError, TxError};
use super::executor::{execute_read_with_retry, execute_with_retry, RetryPolicy, SentTx};
use super::types::{GasMultiplier, TxReceipt};
use crate::config::EnsConfig;

/// Subdomain registrations last one year.
pub const REGISTRATION_PERIOD_SECS: u64 = 365 * 24 * 60 * 60;

sol! {
    #[sol(rpc)]
    interface ISecondLevelInteractor {
        function registerSubnodeRecord(address owner, string label, string name, uint256 expiry) external;
        function executeTransaction(address target, bytes data) external;
    }

    #[sol(rpc)]
    interface IPublicResolver {
        function setAddr(bytes32 node, address a) external;
        function addr(bytes32 node) external view returns (address);
    }

    #[sol(rpc)]
    interface IEnsRegistry {
        function recordExists(bytes32 node) external view returns (bool);
    }
}

/// One step of the registration pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationStep {
    RegisterSubnode,
    SetAddress,
}

impl RegistrationStep {
    pub const ALL: [RegistrationStep; 2] =
        [RegistrationStep::RegisterSubnode, RegistrationStep::SetAddress];

    pub fn label(self) -> &'static str {
        match self {
            RegistrationStep::RegisterSubnode => "registerSubnodeRecord",
            RegistrationStep::SetAddress => "setAddr",
        }
    }
}

/// What happened to a single step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// Already in effect on chain; nothing submitted.
    Skipped,
    Executed(TxReceipt),
}

impl StepOutcome {
    pub fn receipt(&self) -> Option<&TxReceipt> {
        match self {
            StepOutcome::Skipped => None,
            StepOutcome::Executed(receipt) => Some(receipt),
        }
    }
}

/// Result of a completed registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnsRegistration {
    pub subdomain: String,
    pub node: B256,
    pub register: StepOutcome,
    pub set_address: StepOutcome,
}

/// Failure of a registration step.
#[derive(Debug, thiserror::Error)]
#[error("ENS step {step:?} failed: {source}")]
pub struct RegistrationError {
    pub step: RegistrationStep,
    #[source]
    pub source: ExecutionError,
}

/// Full subdomain name for `label` under the configured parent.
pub fn subdomain_name(config: &EnsConfig, label: &str) -> String {
    format!("{}.{}.{}", label, config.parent_domain, config.tld)
}

/// Chain access for the registration pipeline.
pub trait RegistrationBackend: Send + Sync {
    /// Whether `step` is already in effect for `node`.
    fn is_complete(
        &self,
        step: RegistrationStep,
        node: B256,
        owner: Address,
    ) -> impl Future<Output = Result<bool, ExecutionError>> + Send;

    /// Submit `step` and wait for its receipt.
    fn execute(
        &self,
        step: RegistrationStep,
        label: &str,
        node: B256,
        owner: Address,
    ) -> impl Future<Output = Result<TxReceipt, ExecutionError>> + Send;
}

/// Registers subdomains under one parent domain.
pub struct EnsRegistrar<B = EnsContracts> {
    backend: B,
    config: EnsConfig,
}

impl EnsRegistrar {
    pub fn new(provider: DynProvider<Ethereum>, config: EnsConfig, policy: RetryPolicy) -> Self {
        let backend = EnsContracts::new(provider, config.clone(), policy);
        Self::with_backend(backend, config)
    }
}

impl<B: RegistrationBackend> EnsRegistrar<B> {
    pub fn with_backend(backend: B, config: EnsConfig) -> Self {
        Self { backend, config }
    }

    /// Run every pipeline step for `label`, skipping steps already in effect.
    pub async fn register(
        &self,
        label: &str,
        owner: Address,
    ) -> Result<EnsRegistration, RegistrationError> {
        let subdomain = subdomain_name(&self.config, label);
        let node = namehash(&subdomain);
        tracing::info!(subdomain = %subdomain, owner = %owner, node = %node, "Registering ENS subdomain");

        let mut outcomes = Vec::with_capacity(RegistrationStep::ALL.len());
        for step in RegistrationStep::ALL {
            let outcome = self
                .run_step(step, label, node, owner)
                .await
                .map_err(|source| RegistrationError { step, source })?;
            outcomes.push(outcome);
        }

        let set_address = outcomes.pop().unwrap_or(StepOutcome::Skipped);
        let register = outcomes.pop().unwrap_or(StepOutcome::Skipped);

        Ok(EnsRegistration {
            subdomain,
            node,
            register,
            set_address,
        })
    }

    async fn run_step(
        &self,
        step: RegistrationStep,
        label: &str,
        node: B256,
        owner: Address,
    ) -> Result<StepOutcome, ExecutionError> {
        if self.backend.is_complete(step, node, owner).await? {
            tracing::info!(step = step.label(), node = %node, "ENS step already complete, skipping");
            return Ok(StepOutcome::Skipped);
        }

        let receipt = self.backend.execute(step, label, node, owner).await?;
        Ok(StepOutcome::Executed(receipt))
    }
}

/// [`RegistrationBackend`] talking to the interactor, resolver and registry.
pub struct EnsContracts {
    provider: DynProvider<Ethereum>,
    config: EnsConfig,
    policy: RetryPolicy,
}

impl EnsContracts {
    pub fn new(provider: DynProvider<Ethereum>, config: EnsConfig, policy: RetryPolicy) -> Self {
        Self {
            provider,
            config,
            policy,
        }
    }

    async fn submit_register(
        &self,
        owner: Address,
        label: &str,
        expiry: u64,
        multiplier: GasMultiplier,
    ) -> Result<SentTx, TxError> {
        let interactor =
            ISecondLevelInteractor::new(self.config.second_level_interactor, &self.provider);
        let call = interactor.registerSubnodeRecord(
            owner,
            label.to_string(),
            self.config.parent_domain.clone(),
            U256::from(expiry),
        );
        let gas_limit = multiplier.apply(call.estimate_gas().await?);
        Ok(SentTx::new(call.gas(gas_limit).send().await?, gas_limit))
    }

    async fn submit_set_address(
        &self,
        data: &Bytes,
        multiplier: GasMultiplier,
    ) -> Result<SentTx, TxError> {
        let interactor =
            ISecondLevelInteractor::new(self.config.second_level_interactor, &self.provider);
        let call = interactor.executeTransaction(self.config.public_resolver, data.clone());
        let gas_limit = multiplier.apply(call.estimate_gas().await?);
        Ok(SentTx::new(call.gas(gas_limit).send().await?, gas_limit))
    }
}

impl RegistrationBackend for EnsContracts {
    async fn is_complete(
        &self,
        step: RegistrationStep,
        node: B256,
        owner: Address,
    ) -> Result<bool, ExecutionError> {
        match step {
            RegistrationStep::RegisterSubnode => {
                let Some(registry) = self.config.registry else {
                    return Ok(false);
                };
                let registry = IEnsRegistry::new(registry, &self.provider);
                let registry = &registry;
                execute_read_with_retry("recordExists", self.policy, move || async move {
                    registry.recordExists(node).call().await.map_err(TxError::from)
                })
                .await
            }
            RegistrationStep::SetAddress => {
                let resolver = IPublicResolver::new(self.config.public_resolver, &self.provider);
                let resolver = &resolver;
                let current = execute_read_with_retry("addr", self.policy, move || async move {
                    resolver.addr(node).call().await.map_err(TxError::from)
                })
                .await;
                match current {
                    Ok(address) => Ok(address == owner),
                    // A resolver without a record for the node reverts.
                    Err(e) if matches!(e.cause(), TxError::Reverted(_)) => Ok(false),
                    Err(e) => Err(e),
                }
            }
        }
    }

    async fn execute(
        &self,
        step: RegistrationStep,
        label: &str,
        node: B256,
        owner: Address,
    ) -> Result<TxReceipt, ExecutionError> {
        match step {
            RegistrationStep::RegisterSubnode => {
                let expiry = expiry_from(chrono::Utc::now().timestamp());
                execute_with_retry(step.label(), self.policy, move |multiplier| {
                    self.submit_register(owner, label, expiry, multiplier)
                })
                .await
            }
            RegistrationStep::SetAddress => {
                let data = set_addr_calldata(node, owner);
                let data = &data;
                execute_with_retry(step.label(), self.policy, move |multiplier| {
                    self.submit_set_address(data, multiplier)
                })
                .await
            }
        }
    }
}

/// Expiry timestamp one registration period after `now` (unix seconds).
fn expiry_from(now: i64) -> u64 {
    u64::try_from(now).unwrap_or(0) + REGISTRATION_PERIOD_SECS
}

/// ABI-encoded `setAddr(node, owner)` for the public resolver.
fn set_addr_calldata(node: B256, owner: Address) -> Bytes {
    IPublicResolver::setAddrCall { node, a: owner }.abi_encode().into()
}
