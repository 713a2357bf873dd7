//! JSON-backed token registry: embedded defaults plus a user-writable
//! overlay file. Every mutation re-serializes the whole in-memory set to the
//! overlay, so additions survive restarts and the merge stays trivial.

use std::fs;
use std::path::PathBuf;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use crate::config::Networks;
use crate::error::WalletError;

const DEFAULT_TOKENS: &str = include_str!("../resources/tokens.json");

/// ERC-20 metadata. Uniqueness key is `(network_id, address)`; the address
/// is normalized lowercase.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TokenMeta {
    pub network_id: String,
    pub address: String,
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub decimals: Option<u8>,
}

impl TokenMeta {
    fn normalized(mut self) -> Self {
        self.address = self.address.trim().to_lowercase();
        self
    }

    fn key(&self) -> String {
        format!("{}:{}", self.network_id, self.address).to_lowercase()
    }
}

#[derive(Debug)]
pub struct JsonTokenRepository {
    custom_path: PathBuf,
    tokens: RwLock<Vec<TokenMeta>>,
}

impl JsonTokenRepository {
    pub fn new() -> Self {
        Self::with_custom_path(Networks::custom_tokens_path())
    }

    pub fn with_custom_path(custom_path: PathBuf) -> Self {
        let repo = Self {
            custom_path,
            tokens: RwLock::new(Vec::new()),
        };
        repo.reload();
        repo
    }

    /// Rebuilds the in-memory set: defaults, then the overlay file, with the
    /// overlay winning on key collisions.
    pub fn reload(&self) {
        let mut loaded: Vec<TokenMeta> =
            serde_json::from_str(DEFAULT_TOKENS).unwrap_or_default();

        if self.custom_path.exists() {
            match fs::read_to_string(&self.custom_path)
                .map_err(|e| e.to_string())
                .and_then(|raw| {
                    serde_json::from_str::<Vec<TokenMeta>>(&raw).map_err(|e| e.to_string())
                }) {
                Ok(custom) => loaded.extend(custom),
                Err(e) => tracing::warn!(
                    "ignoring unreadable token overlay {}: {}",
                    self.custom_path.display(),
                    e
                ),
            }
        }

        let merged = dedupe_and_sort(loaded);
        *self.tokens.write().expect("token repository poisoned") = merged;
    }

    pub fn list_by_network(&self, network_id: &str) -> Vec<TokenMeta> {
        let tokens = self.tokens.read().expect("token repository poisoned");
        tokens
            .iter()
            .filter(|t| t.network_id == network_id)
            .cloned()
            .collect()
    }

    pub fn find(&self, network_id: &str, address: &str) -> Option<TokenMeta> {
        let addr = address.trim().to_lowercase();
        let tokens = self.tokens.read().expect("token repository poisoned");
        tokens
            .iter()
            .find(|t| t.network_id == network_id && t.address == addr)
            .cloned()
    }

    /// Adds or replaces a token (last write wins on the key) and persists.
    pub fn add(&self, token: TokenMeta) -> Result<(), WalletError> {
        if token.network_id.trim().is_empty() || token.address.trim().is_empty() {
            return Err(WalletError::InvalidInput(
                "token requires networkId and address".to_string(),
            ));
        }
        let token = token.normalized();
        {
            let mut tokens = self.tokens.write().expect("token repository poisoned");
            tokens.retain(|t| t.key() != token.key());
            tokens.push(token);
            let merged = dedupe_and_sort(std::mem::take(&mut *tokens));
            *tokens = merged;
        }
        self.persist()
    }

    pub fn remove(&self, network_id: &str, address: &str) -> Result<(), WalletError> {
        let addr = address.trim().to_lowercase();
        {
            let mut tokens = self.tokens.write().expect("token repository poisoned");
            tokens.retain(|t| !(t.network_id == network_id && t.address == addr));
        }
        self.persist()
    }

    /// Writes the entire merged set to the overlay file.
    fn persist(&self) -> Result<(), WalletError> {
        let tokens = self.tokens.read().expect("token repository poisoned");
        if let Some(parent) = self.custom_path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                WalletError::InvalidInput(format!("failed to create {}: {}", parent.display(), e))
            })?;
        }
        let json = serde_json::to_string_pretty(&*tokens)
            .map_err(|e| WalletError::InvalidInput(format!("failed to serialize tokens: {}", e)))?;
        fs::write(&self.custom_path, json).map_err(|e| {
            WalletError::InvalidInput(format!(
                "failed to write {}: {}",
                self.custom_path.display(),
                e
            ))
        })
    }
}

impl Default for JsonTokenRepository {
    fn default() -> Self {
        Self::new()
    }
}

fn dedupe_and_sort(tokens: Vec<TokenMeta>) -> Vec<TokenMeta> {
    let mut map: std::collections::HashMap<String, TokenMeta> = std::collections::HashMap::new();
    for token in tokens {
        if token.network_id.trim().is_empty() || token.address.trim().is_empty() {
            continue;
        }
        let token = token.normalized();
        map.insert(token.key(), token);
    }
    let mut merged: Vec<TokenMeta> = map.into_values().collect();
    merged.sort_by(|a, b| {
        a.network_id.cmp(&b.network_id).then_with(|| {
            let sa = a.symbol.as_deref().unwrap_or("").to_lowercase();
            let sb = b.symbol.as_deref().unwrap_or("").to_lowercase();
            sa.cmp(&sb)
        })
    });
    merged
}
