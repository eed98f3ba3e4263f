// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::config::AppConfig;
use crate::onboarding::{AccountService, ChainAccountService, SelectedChains};
use crate::rpc::EndpointSelector;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub accounts: Arc<dyn AccountService>,
}

impl AppState {
    pub fn new(config: Arc<AppConfig>, accounts: Arc<dyn AccountService>) -> Self {
        Self { config, accounts }
    }

    /// State wired to the live chains through chainlist endpoint discovery.
    pub fn from_config(config: AppConfig) -> Self {
        let config = Arc::new(config);
        let selector = EndpointSelector::chainlist(config.chain_registry_url.clone());
        let chains = SelectedChains::new(config.clone(), selector);
        let accounts = ChainAccountService::new(config.clone(), chains);
        Self::new(config, Arc::new(accounts))
    }
}
