// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Account Onboarding
//!
//! Creates and deletes users across both chains:
//!
//! 1. Select the fastest Sapphire endpoint and connect a signing provider.
//! 2. Refuse duplicates, then `storeSecret` and read back the derived wallet.
//! 3. Select the fastest Hoodi endpoint and run the ENS registration pipeline.
//!
//! An ENS failure does not undo the Sapphire user; it is reported in the
//! response instead. Endpoints and providers are chosen per request by a
//! [`ChainConnector`]; [`SelectedChains`] is the live one.

use std::future::Future;
use std::sync::Arc;

use alloy::{primitives::Address, signers::local::PrivateKeySigner};
use futures::future::{BoxFuture, FutureExt};

use crate::blockchain::{
    ens::subdomain_name, ChainClient, ChainClientError, ConfidentialAuth, EnsContracts,
    EnsRegistrar, EnsRegistration, ExecutionError, RegistrationBackend, RegistrationError,
    RetryPolicy, TxReceipt,
};
use crate::config::AppConfig;
use crate::models::{
    CreateUserResponse, DeleteUserResponse, EnsResult, NewUser, OasisResult, UserDeletion,
};
use crate::rpc::{ChainRegistry, EndpointProber, EndpointSelector};

/// Errors surfaced by onboarding operations.
#[derive(Debug, thiserror::Error)]
pub enum OnboardingError {
    #[error("PKEY environment variable not set")]
    MissingPrivateKey,

    #[error(transparent)]
    Client(#[from] ChainClientError),

    #[error("User '{0}' already exists on Oasis")]
    UserExists(String),

    #[error("User '{0}' does not exist on Oasis")]
    UserNotFound(String),

    #[error("No wallet address recorded for '{0}' after creation")]
    MissingWalletAddress(String),

    #[error(transparent)]
    Execution(#[from] ExecutionError),
}

/// User lifecycle operations exposed over HTTP.
pub trait AccountService: Send + Sync {
    fn create_user(&self, user: NewUser)
        -> BoxFuture<'_, Result<CreateUserResponse, OnboardingError>>;

    fn delete_user(
        &self,
        deletion: UserDeletion,
    ) -> BoxFuture<'_, Result<DeleteUserResponse, OnboardingError>>;
}

/// Confidential per-user secret storage.
pub trait SecretStore: Send + Sync {
    fn contract_address(&self) -> Address;

    /// Wallet derived for `username`, `None` when the user does not exist.
    fn wallet_address(
        &self,
        username: &str,
    ) -> impl Future<Output = Result<Option<Address>, ExecutionError>> + Send;

    fn store_secret(
        &self,
        username: &str,
        secret: &[u8],
    ) -> impl Future<Output = Result<TxReceipt, ExecutionError>> + Send;

    fn delete_secret(
        &self,
        username: &str,
        secret: &[u8],
    ) -> impl Future<Output = Result<TxReceipt, ExecutionError>> + Send;
}

impl SecretStore for ConfidentialAuth {
    fn contract_address(&self) -> Address {
        self.address()
    }

    fn wallet_address(
        &self,
        username: &str,
    ) -> impl Future<Output = Result<Option<Address>, ExecutionError>> + Send {
        ConfidentialAuth::wallet_address(self, username)
    }

    fn store_secret(
        &self,
        username: &str,
        secret: &[u8],
    ) -> impl Future<Output = Result<TxReceipt, ExecutionError>> + Send {
        ConfidentialAuth::store_secret(self, username, secret)
    }

    fn delete_secret(
        &self,
        username: &str,
        secret: &[u8],
    ) -> impl Future<Output = Result<TxReceipt, ExecutionError>> + Send {
        ConfidentialAuth::delete_secret(self, username, secret)
    }
}

/// Registers a user's ENS subdomain.
pub trait SubdomainRegistrar: Send + Sync {
    fn register(
        &self,
        label: &str,
        owner: Address,
    ) -> impl Future<Output = Result<EnsRegistration, RegistrationError>> + Send;
}

impl<B: RegistrationBackend> SubdomainRegistrar for EnsRegistrar<B> {
    fn register(
        &self,
        label: &str,
        owner: Address,
    ) -> impl Future<Output = Result<EnsRegistration, RegistrationError>> + Send {
        EnsRegistrar::<B>::register(self, label, owner)
    }
}

/// Connects signing clients for both chains.
pub trait ChainConnector: Send + Sync {
    type Store: SecretStore;
    type Registrar: SubdomainRegistrar;

    /// ConfidentialAuth access on Sapphire.
    fn secret_store(
        &self,
        signer: PrivateKeySigner,
    ) -> impl Future<Output = Result<Self::Store, OnboardingError>> + Send;

    /// ENS registration access on Hoodi.
    fn registrar(
        &self,
        signer: PrivateKeySigner,
    ) -> impl Future<Output = Result<Self::Registrar, OnboardingError>> + Send;
}

/// [`ChainConnector`] selecting the fastest endpoint on every connection.
pub struct SelectedChains<R, P> {
    config: Arc<AppConfig>,
    selector: EndpointSelector<R, P>,
}

impl<R: ChainRegistry, P: EndpointProber> SelectedChains<R, P> {
    pub fn new(config: Arc<AppConfig>, selector: EndpointSelector<R, P>) -> Self {
        Self { config, selector }
    }

    fn policy(&self) -> RetryPolicy {
        RetryPolicy::default().with_max_retries(self.config.tx_max_retries)
    }

    /// Select the best endpoint for `chain_id` and connect a signing client.
    async fn connect(
        &self,
        chain_id: u64,
        fallback: &str,
        signer: PrivateKeySigner,
    ) -> Result<ChainClient, OnboardingError> {
        let rpc_url = self.selector.select_best_endpoint(chain_id, fallback).await;
        Ok(ChainClient::connect(chain_id, &rpc_url, signer)?)
    }
}

impl<R: ChainRegistry, P: EndpointProber> ChainConnector for SelectedChains<R, P> {
    type Store = ConfidentialAuth;
    type Registrar = EnsRegistrar<EnsContracts>;

    async fn secret_store(&self, signer: PrivateKeySigner) -> Result<ConfidentialAuth, OnboardingError> {
        let client = self
            .connect(self.config.sapphire_chain_id, &self.config.sapphire_rpc_url, signer)
            .await?;
        Ok(ConfidentialAuth::new(
            client.provider().clone(),
            self.config.confidential_auth,
            self.policy(),
        ))
    }

    async fn registrar(
        &self,
        signer: PrivateKeySigner,
    ) -> Result<EnsRegistrar<EnsContracts>, OnboardingError> {
        let client = self
            .connect(self.config.hoodi_chain_id, &self.config.hoodi_rpc_url, signer)
            .await?;
        Ok(EnsRegistrar::new(
            client.provider().clone(),
            self.config.ens.clone(),
            self.policy(),
        ))
    }
}

/// [`AccountService`] backed by the Sapphire and Hoodi contracts.
pub struct ChainAccountService<C> {
    config: Arc<AppConfig>,
    chains: C,
}

impl<C: ChainConnector> ChainAccountService<C> {
    pub fn new(config: Arc<AppConfig>, chains: C) -> Self {
        Self { config, chains }
    }

    fn signer(&self) -> Result<PrivateKeySigner, OnboardingError> {
        let key = self
            .config
            .private_key
            .as_deref()
            .ok_or(OnboardingError::MissingPrivateKey)?;
        Ok(ChainClient::create_signer(key)?)
    }

    async fn create(&self, user: NewUser) -> Result<CreateUserResponse, OnboardingError> {
        let signer = self.signer()?;
        tracing::info!(username = %user.username, "Creating Oasis user");

        let store = self.chains.secret_store(signer.clone()).await?;

        if store.wallet_address(&user.username).await?.is_some() {
            return Err(OnboardingError::UserExists(user.username));
        }

        let receipt = store
            .store_secret(&user.username, user.password.as_bytes())
            .await?;

        let user_address = store
            .wallet_address(&user.username)
            .await?
            .ok_or_else(|| OnboardingError::MissingWalletAddress(user.username.clone()))?;

        tracing::info!(
            username = %user.username,
            address = %user_address,
            block_number = receipt.block_number,
            "User created on Oasis"
        );

        let ens = self.register_ens(&user.username, user_address, signer).await;

        Ok(CreateUserResponse {
            success: true,
            message: "User created successfully on Oasis Sapphire and registered on ENS"
                .to_string(),
            oasis: OasisResult {
                tx_hash: receipt.tx_hash,
                user_address: user_address.to_checksum(None),
                block_number: receipt.block_number,
                contract_address: store.contract_address().to_checksum(None),
            },
            ens,
            auth_username: user.auth_username,
            username: user.username,
        })
    }

    /// Run the ENS pipeline; failures are reported, not propagated.
    async fn register_ens(&self, label: &str, owner: Address, signer: PrivateKeySigner) -> EnsResult {
        let subdomain = subdomain_name(&self.config.ens, label);

        let outcome: Result<EnsRegistration, EnsFailure> = async {
            let registrar = self.chains.registrar(signer).await?;
            Ok(registrar.register(label, owner).await?)
        }
        .await;

        match outcome {
            Ok(registration) => {
                tracing::info!(subdomain = %registration.subdomain, "ENS subdomain registered");
                let register = registration.register.receipt();
                EnsResult {
                    subdomain: registration.subdomain.clone(),
                    tx_hash: register.map(|r| r.tx_hash.clone()),
                    block_number: register.map(|r| r.block_number),
                    set_addr_tx_hash: registration
                        .set_address
                        .receipt()
                        .map(|r| r.tx_hash.clone()),
                    success: true,
                    error: None,
                }
            }
            Err(e) => {
                tracing::error!(subdomain = %subdomain, error = %e, "ENS registration failed");
                EnsResult {
                    subdomain,
                    tx_hash: None,
                    block_number: None,
                    set_addr_tx_hash: None,
                    success: false,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    async fn delete(&self, deletion: UserDeletion) -> Result<DeleteUserResponse, OnboardingError> {
        let signer = self.signer()?;
        tracing::info!(auth_username = %deletion.auth_username, "Deleting Oasis user");

        let store = self.chains.secret_store(signer).await?;

        if store.wallet_address(&deletion.auth_username).await?.is_none() {
            return Err(OnboardingError::UserNotFound(deletion.auth_username));
        }

        let receipt = store
            .delete_secret(&deletion.auth_username, deletion.password.as_bytes())
            .await?;

        Ok(DeleteUserResponse {
            success: true,
            message: "User deleted successfully from Oasis Sapphire".to_string(),
            tx_hash: receipt.tx_hash,
            block_number: receipt.block_number,
            auth_username: deletion.auth_username,
        })
    }
}

#[derive(Debug, thiserror::Error)]
enum EnsFailure {
    #[error(transparent)]
    Setup(#[from] OnboardingError),

    #[error(transparent)]
    Registration(#[from] RegistrationError),
}

impl<C: ChainConnector + 'static> AccountService for ChainAccountService<C> {
    fn create_user(
        &self,
        user: NewUser,
    ) -> BoxFuture<'_, Result<CreateUserResponse, OnboardingError>> {
        self.create(user).boxed()
    }

    fn delete_user(
        &self,
        deletion: UserDeletion,
    ) -> BoxFuture<'_, Result<DeleteUserResponse, OnboardingError>> {
        self.delete(deletion).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::{RegistrationStep, StepOutcome, TxError};
    use crate::rpc::ProbeError;
    use alloy::ens::namehash;
    use std::collections::HashMap;
    use std::sync::Mutex;

    const TEST_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    /// Registry and prober that must never be reached.
    struct Unreachable;

    impl ChainRegistry for Unreachable {
        async fn rpc_urls(&self, _chain_id: u64) -> Vec<String> {
            panic!("endpoint discovery should not run");
        }
    }

    impl EndpointProber for Unreachable {
        async fn probe(&self, _url: &str) -> Result<(), ProbeError> {
            panic!("endpoint probing should not run");
        }
    }

    type LiveService = ChainAccountService<SelectedChains<Unreachable, Unreachable>>;

    fn config(private_key: Option<&str>) -> Arc<AppConfig> {
        Arc::new(AppConfig {
            private_key: private_key.map(str::to_string),
            ..AppConfig::default()
        })
    }

    fn service(private_key: Option<&str>) -> LiveService {
        let config = config(private_key);
        let chains = SelectedChains::new(
            config.clone(),
            EndpointSelector::new(Unreachable, Unreachable),
        );
        ChainAccountService::new(config, chains)
    }

    /// Chain state shared by the fake store and registrar.
    #[derive(Clone, Default)]
    struct Ledger {
        wallets: Arc<Mutex<HashMap<String, Address>>>,
        stored: Arc<Mutex<Vec<String>>>,
        registered: Arc<Mutex<Vec<(String, Address)>>>,
    }

    impl Ledger {
        fn with_user(self, username: &str) -> Self {
            self.wallets
                .lock()
                .unwrap()
                .insert(username.to_string(), wallet());
            self
        }
    }

    fn wallet() -> Address {
        Address::with_last_byte(0xaa)
    }

    fn receipt(tx_hash: &str, block_number: u64) -> TxReceipt {
        TxReceipt {
            tx_hash: tx_hash.to_string(),
            block_number,
            gas_used: 21_000,
        }
    }

    struct FakeStore(Ledger);

    impl SecretStore for FakeStore {
        fn contract_address(&self) -> Address {
            Address::with_last_byte(0xbb)
        }

        async fn wallet_address(&self, username: &str) -> Result<Option<Address>, ExecutionError> {
            Ok(self.0.wallets.lock().unwrap().get(username).copied())
        }

        async fn store_secret(
            &self,
            username: &str,
            _secret: &[u8],
        ) -> Result<TxReceipt, ExecutionError> {
            self.0.stored.lock().unwrap().push(username.to_string());
            self.0
                .wallets
                .lock()
                .unwrap()
                .insert(username.to_string(), wallet());
            Ok(receipt("0x01", 10))
        }

        async fn delete_secret(
            &self,
            username: &str,
            _secret: &[u8],
        ) -> Result<TxReceipt, ExecutionError> {
            self.0.wallets.lock().unwrap().remove(username);
            Ok(receipt("0x04", 11))
        }
    }

    struct FakeRegistrar {
        ledger: Ledger,
        fails: bool,
    }

    impl SubdomainRegistrar for FakeRegistrar {
        async fn register(
            &self,
            label: &str,
            owner: Address,
        ) -> Result<EnsRegistration, RegistrationError> {
            if self.fails {
                return Err(RegistrationError {
                    step: RegistrationStep::SetAddress,
                    source: ExecutionError {
                        label: "setAddr".into(),
                        attempts: 3,
                        source: TxError::NetworkTimeout("connection reset".into()),
                    },
                });
            }
            self.ledger
                .registered
                .lock()
                .unwrap()
                .push((label.to_string(), owner));
            let subdomain = format!("{label}.authdemo.global");
            Ok(EnsRegistration {
                node: namehash(&subdomain),
                subdomain,
                register: StepOutcome::Executed(receipt("0x02", 20)),
                set_address: StepOutcome::Executed(receipt("0x03", 21)),
            })
        }
    }

    struct FakeChains {
        ledger: Ledger,
        ens_fails: bool,
    }

    impl ChainConnector for FakeChains {
        type Store = FakeStore;
        type Registrar = FakeRegistrar;

        async fn secret_store(&self, _signer: PrivateKeySigner) -> Result<FakeStore, OnboardingError> {
            Ok(FakeStore(self.ledger.clone()))
        }

        async fn registrar(&self, _signer: PrivateKeySigner) -> Result<FakeRegistrar, OnboardingError> {
            Ok(FakeRegistrar {
                ledger: self.ledger.clone(),
                fails: self.ens_fails,
            })
        }
    }

    fn fake_service(ledger: Ledger, ens_fails: bool) -> ChainAccountService<FakeChains> {
        ChainAccountService::new(config(Some(TEST_KEY)), FakeChains { ledger, ens_fails })
    }

    fn new_user() -> NewUser {
        NewUser {
            username: "alice".into(),
            password: "secret1".into(),
            auth_username: "alice@example.com".into(),
        }
    }

    fn deletion(auth_username: &str) -> UserDeletion {
        UserDeletion {
            auth_username: auth_username.into(),
            password: "secret1".into(),
        }
    }

    #[tokio::test]
    async fn create_without_private_key_fails_before_network() {
        let err = service(None).create_user(new_user()).await.unwrap_err();
        assert!(matches!(err, OnboardingError::MissingPrivateKey));
    }

    #[tokio::test]
    async fn delete_with_invalid_private_key_fails_before_network() {
        let err = service(Some("zz"))
            .delete_user(deletion("alice"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            OnboardingError::Client(ChainClientError::InvalidPrivateKey(_))
        ));
    }

    #[test]
    fn retry_policy_follows_configuration() {
        let mut config = AppConfig::default();
        config.tx_max_retries = 5;
        let chains = SelectedChains::new(
            Arc::new(config),
            EndpointSelector::new(Unreachable, Unreachable),
        );
        assert_eq!(chains.policy().max_retries, 5);
    }

    #[tokio::test]
    async fn create_stores_secret_and_registers_subdomain() {
        let ledger = Ledger::default();
        let response = fake_service(ledger.clone(), false)
            .create_user(new_user())
            .await
            .unwrap();

        assert!(response.success);
        assert_eq!(response.username, "alice");
        assert_eq!(response.auth_username, "alice@example.com");
        assert_eq!(response.oasis.tx_hash, "0x01");
        assert_eq!(response.oasis.user_address, wallet().to_checksum(None));
        assert_eq!(
            response.oasis.contract_address,
            Address::with_last_byte(0xbb).to_checksum(None)
        );
        assert!(response.ens.success);
        assert_eq!(response.ens.subdomain, "alice.authdemo.global");
        assert_eq!(response.ens.tx_hash.as_deref(), Some("0x02"));
        assert_eq!(response.ens.block_number, Some(20));
        assert_eq!(response.ens.set_addr_tx_hash.as_deref(), Some("0x03"));
        assert_eq!(
            *ledger.registered.lock().unwrap(),
            vec![("alice".to_string(), wallet())]
        );
    }

    #[tokio::test]
    async fn create_refuses_existing_user_without_storing() {
        let ledger = Ledger::default().with_user("alice");
        let err = fake_service(ledger.clone(), false)
            .create_user(new_user())
            .await
            .unwrap_err();

        assert!(matches!(err, OnboardingError::UserExists(ref name) if name == "alice"));
        assert!(ledger.stored.lock().unwrap().is_empty());
        assert!(ledger.registered.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn ens_failure_is_reported_without_failing_creation() {
        let ledger = Ledger::default();
        let response = fake_service(ledger.clone(), true)
            .create_user(new_user())
            .await
            .unwrap();

        assert!(response.success);
        assert_eq!(*ledger.stored.lock().unwrap(), vec!["alice".to_string()]);
        assert!(!response.ens.success);
        assert_eq!(
            response.ens.subdomain,
            subdomain_name(&AppConfig::default().ens, "alice")
        );
        assert_eq!(response.ens.tx_hash, None);
        let error = response.ens.error.expect("ENS error is reported");
        assert!(error.contains("SetAddress"), "{error}");
        assert!(error.contains("network timeout"), "{error}");
    }

    #[tokio::test]
    async fn delete_missing_user_is_not_found() {
        let err = fake_service(Ledger::default(), false)
            .delete_user(deletion("ghost"))
            .await
            .unwrap_err();
        assert!(matches!(err, OnboardingError::UserNotFound(ref name) if name == "ghost"));
    }

    #[tokio::test]
    async fn delete_existing_user_removes_secret() {
        let ledger = Ledger::default().with_user("alice");
        let response = fake_service(ledger.clone(), false)
            .delete_user(deletion("alice"))
            .await
            .unwrap();

        assert!(response.success);
        assert_eq!(response.tx_hash, "0x04");
        assert_eq!(response.block_number, 11);
        assert!(ledger.wallets.lock().unwrap().is_empty());
    }
}
