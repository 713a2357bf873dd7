//! Per-network connection handle.
//!
//! There is no global RPC singleton: a [`ChainContext`] is constructed for
//! one network and passed by reference into every component. Switching
//! networks means connecting a new context; in-flight requests keep the old
//! provider and cannot mix chains.

use alloy::providers::{Provider, RootProvider};
use alloy_provider::DynProvider;
use url::Url;

use crate::config::NetworkConfig;
use crate::error::WalletError;

#[derive(Debug, Clone)]
pub struct ChainContext {
    network: NetworkConfig,
    provider: DynProvider,
}

impl ChainContext {
    /// Connects to the network's RPC endpoint (env overrides applied).
    pub fn connect(network: NetworkConfig) -> Result<Self, WalletError> {
        let rpc_url = network.rpc_url();
        let url = Url::parse(&rpc_url)
            .map_err(|e| WalletError::InvalidInput(format!("invalid RPC URL {}: {}", rpc_url, e)))?;
        let provider = RootProvider::new_http(url).erased();
        tracing::debug!("connected chain context for network {}", network.id);
        Ok(Self { network, provider })
    }

    /// Wraps an existing provider; used by tests with a mocked transport.
    pub fn with_provider(network: NetworkConfig, provider: DynProvider) -> Self {
        Self { network, provider }
    }

    /// Returns a fresh context for another network, leaving `self` untouched.
    pub fn switch(&self, network: NetworkConfig) -> Result<Self, WalletError> {
        Self::connect(network)
    }

    pub fn network(&self) -> &NetworkConfig {
        &self.network
    }

    pub fn provider(&self) -> DynProvider {
        self.provider.clone()
    }

    pub fn rpc_url(&self) -> String {
        self.network.rpc_url()
    }

    pub fn chain_id(&self) -> Option<u64> {
        self.network.chain_id()
    }
}
