//! Persistence collaborators for wallet profiles and transaction logs.
//!
//! The engine does not own a database; it talks to these traits. The
//! in-memory implementations back tests and lightweight embeddings.

use std::sync::Mutex;

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};

use crate::error::WalletError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxStatus {
    Pending,
    Success,
    Failed,
}

impl std::fmt::Display for TxStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TxStatus::Pending => write!(f, "PENDING"),
            TxStatus::Success => write!(f, "SUCCESS"),
            TxStatus::Failed => write!(f, "FAILED"),
        }
    }
}

/// A stored wallet. `address` is fixed at creation, lowercase-normalized;
/// `encrypted_secret` is the envelope JSON wrapping the raw private key.
#[derive(Debug, Clone, PartialEq)]
pub struct WalletProfile {
    pub id: i64,
    pub name: String,
    pub address: String,
    pub encrypted_secret: String,
    pub created_at: DateTime<Utc>,
}

/// Append-only record of a broadcast transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionLog {
    pub id: i64,
    pub wallet_address: String,
    pub tx_hash: String,
    pub amount: BigDecimal,
    pub asset_symbol: String,
    pub status: TxStatus,
    pub created_at: DateTime<Utc>,
}

impl TransactionLog {
    pub fn new(
        wallet_address: String,
        tx_hash: String,
        amount: BigDecimal,
        asset_symbol: String,
        status: TxStatus,
    ) -> Self {
        Self {
            id: 0,
            wallet_address,
            tx_hash,
            amount,
            asset_symbol,
            status,
            created_at: Utc::now(),
        }
    }
}

/// Wallet profile storage, keyed by unique display name. `save` upserts:
/// re-importing under an existing name replaces the stored profile.
#[cfg_attr(test, mockall::automock)]
pub trait ProfileStore: Send + Sync {
    fn save(&self, profile: WalletProfile) -> Result<(), WalletError>;
    fn find_by_name(&self, name: &str) -> Result<Option<WalletProfile>, WalletError>;
    fn all(&self) -> Result<Vec<WalletProfile>, WalletError>;
}

/// Transaction log storage. Entries are inserted once and never edited.
#[cfg_attr(test, mockall::automock)]
pub trait TxLogStore: Send + Sync {
    fn save(&self, entry: TransactionLog) -> Result<(), WalletError>;
    fn find_by_address(&self, address: &str) -> Result<Vec<TransactionLog>, WalletError>;
}

#[derive(Debug, Default)]
pub struct MemoryProfileStore {
    profiles: Mutex<Vec<WalletProfile>>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProfileStore for MemoryProfileStore {
    fn save(&self, mut profile: WalletProfile) -> Result<(), WalletError> {
        let mut profiles = self.profiles.lock().expect("profile store poisoned");
        if let Some(existing) = profiles.iter_mut().find(|p| p.name == profile.name) {
            profile.id = existing.id;
            *existing = profile;
        } else {
            profile.id = profiles.iter().map(|p| p.id).max().unwrap_or(0) + 1;
            profiles.push(profile);
        }
        Ok(())
    }

    fn find_by_name(&self, name: &str) -> Result<Option<WalletProfile>, WalletError> {
        let profiles = self.profiles.lock().expect("profile store poisoned");
        Ok(profiles.iter().find(|p| p.name == name).cloned())
    }

    fn all(&self) -> Result<Vec<WalletProfile>, WalletError> {
        let profiles = self.profiles.lock().expect("profile store poisoned");
        Ok(profiles.clone())
    }
}

#[derive(Debug, Default)]
pub struct MemoryTxLogStore {
    entries: Mutex<Vec<TransactionLog>>,
}

impl MemoryTxLogStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TxLogStore for MemoryTxLogStore {
    fn save(&self, mut entry: TransactionLog) -> Result<(), WalletError> {
        let mut entries = self.entries.lock().expect("tx log store poisoned");
        entry.id = entries.len() as i64 + 1;
        entries.push(entry);
        Ok(())
    }

    fn find_by_address(&self, address: &str) -> Result<Vec<TransactionLog>, WalletError> {
        let entries = self.entries.lock().expect("tx log store poisoned");
        Ok(entries
            .iter()
            .filter(|e| e.wallet_address.eq_ignore_ascii_case(address))
            .cloned()
            .collect())
    }
}
