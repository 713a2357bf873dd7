//! Network configuration, loaded from a JSON file under the home directory.
//!
//! The engine only reads network definitions; the file is user-maintained.
//! `GALLEON_RPC_URL` and `GALLEON_CHAIN_ID` override the active network's
//! endpoint for quick switching without editing the file.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

const DEFAULT_NETWORKS: &str = include_str!("../resources/networks.json");

static EMBEDDED_NETWORKS: Lazy<Vec<NetworkConfig>> = Lazy::new(|| {
    serde_json::from_str(DEFAULT_NETWORKS).expect("embedded networks.json is valid")
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BridgeLink {
    pub name: String,
    pub url: String,
}

impl Default for BridgeLink {
    fn default() -> Self {
        Self {
            name: String::new(),
            url: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NetworkConfig {
    pub id: String,
    pub name: String,
    pub rpc_url: String,
    pub chain_id: Option<u64>,
    /// Legacy single-bridge field, superseded by `bridges`.
    pub bridge_url: Option<String>,
    pub bridges: Vec<BridgeLink>,
    /// Symbol -> Chainlink aggregator address.
    pub chainlink_feeds: HashMap<String, String>,
    /// ERC-721 contracts scanned by the discovery fallbacks.
    pub nft_contracts: Vec<String>,
}

impl NetworkConfig {
    /// Effective RPC URL, honoring the env override.
    pub fn rpc_url(&self) -> String {
        match std::env::var("GALLEON_RPC_URL") {
            Ok(url) if !url.trim().is_empty() => url,
            _ => self.rpc_url.clone(),
        }
    }

    /// Effective chain id, honoring the env override.
    pub fn chain_id(&self) -> Option<u64> {
        if let Ok(raw) = std::env::var("GALLEON_CHAIN_ID") {
            if let Ok(id) = raw.trim().parse::<u64>() {
                return Some(id);
            }
        }
        self.chain_id
    }

    /// Bridge links, falling back to the legacy `bridgeUrl` field.
    pub fn bridge_links(&self) -> Vec<BridgeLink> {
        if !self.bridges.is_empty() {
            return self.bridges.clone();
        }
        match &self.bridge_url {
            Some(url) if !url.trim().is_empty() => vec![BridgeLink {
                name: "Bridge".to_string(),
                url: url.clone(),
            }],
            _ => Vec::new(),
        }
    }

    /// Discovery allow-list: configured contracts plus the
    /// `GALLEON_NFT_CONTRACTS` comma-separated env override, deduplicated.
    pub fn nft_contract_allowlist(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        if let Ok(env) = std::env::var("GALLEON_NFT_CONTRACTS") {
            for part in env.split(',') {
                let v = part.trim();
                if !v.is_empty() {
                    out.push(v.to_lowercase());
                }
            }
        }
        for c in &self.nft_contracts {
            let v = c.trim().to_lowercase();
            if !v.is_empty() {
                out.push(v);
            }
        }
        let mut seen = std::collections::HashSet::new();
        out.retain(|c| seen.insert(c.clone()));
        out
    }
}

/// The set of configured networks.
#[derive(Debug, Clone)]
pub struct Networks {
    networks: Vec<NetworkConfig>,
}

impl Networks {
    /// Loads `networks.json` from the config directory, falling back to the
    /// embedded defaults when the file is missing or malformed.
    pub fn load() -> Self {
        let path = Self::networks_file_path();
        let loaded = fs::read_to_string(&path)
            .ok()
            .and_then(|raw| match serde_json::from_str::<Vec<NetworkConfig>>(&raw) {
                Ok(networks) => Some(networks),
                Err(e) => {
                    tracing::error!("failed to deserialize {}: {}", path.display(), e);
                    None
                }
            })
            .filter(|networks| !networks.is_empty());

        let networks = loaded.unwrap_or_else(|| EMBEDDED_NETWORKS.clone());
        Self { networks }
    }

    pub fn from_list(networks: Vec<NetworkConfig>) -> Self {
        Self { networks }
    }

    pub fn all(&self) -> &[NetworkConfig] {
        &self.networks
    }

    pub fn get(&self, id: &str) -> Option<&NetworkConfig> {
        self.networks.iter().find(|n| n.id == id)
    }

    /// First configured network; the default selection.
    pub fn default_network(&self) -> Option<&NetworkConfig> {
        self.networks.first()
    }

    pub fn config_dir() -> PathBuf {
        let home = std::env::var("HOME").expect("env HOME is not set");
        let mut path = PathBuf::from(home);
        path.push(".galleon");
        path
    }

    fn networks_file_path() -> PathBuf {
        let mut path = Self::config_dir();
        path.push("networks.json");
        path
    }

    /// Path of the user-writable token overlay file.
    pub fn custom_tokens_path() -> PathBuf {
        let mut path = Self::config_dir();
        path.push("tokens.json");
        path
    }
}
