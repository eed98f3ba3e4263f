// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Blockchain integration for Oasis Sapphire and Hoodi.
//!
//! This module provides functionality for:
//! - Signing providers bound to a selected RPC endpoint
//! - Classified transaction failures and retried execution
//! - Sapphire calldata encryption
//! - The ConfidentialAuth contract on Sapphire
//! - ENS subdomain registration on Hoodi

pub mod client;
pub mod confidential_auth;
pub mod ens;
pub mod error;
pub mod executor;
pub mod sapphire;
pub mod types;

pub use client::{ChainClient, ChainClientError};
pub use confidential_auth::ConfidentialAuth;
pub use ens::{
    EnsContracts, EnsRegistrar, EnsRegistration, RegistrationBackend, RegistrationError,
    RegistrationStep, StepOutcome,
};
pub use error::{ExecutionError, TxError};
pub use executor::{
    execute_read_with_retry, execute_with_retry, RetryPolicy, SentTx, SubmittedTx,
};
pub use sapphire::{seal_calldata, EnvelopeError, RuntimeKey};
pub use types::*;
