// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Confidential Auth Gateway
//!
//! REST service that stores user secrets in an Oasis Sapphire confidential
//! contract and registers a matching ENS subdomain on Hoodi.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `blockchain` - contract bindings and the resilient transaction executor
//! - `rpc` - chain-registry discovery and fastest-endpoint selection
//! - `onboarding` - user creation and deletion across both chains

pub mod api;
pub mod blockchain;
pub mod config;
pub mod error;
pub mod models;
pub mod onboarding;
pub mod rpc;
pub mod state;
