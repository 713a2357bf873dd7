//! NFT ownership discovery and metadata resolution.
//!
//! Discovery is layered: an indexer API when one is reachable, an
//! `alchemy_getAssetTransfers` sweep when the REST surface is not, and a raw
//! `eth_getLogs` scan over configured contracts as the last resort. Every
//! candidate from the fallbacks is re-verified on chain with `ownerOf`
//! before it is reported.

pub mod discovery;
pub mod indexer;
pub mod metadata;

pub use discovery::NftDiscovery;

use alloy::primitives::{Address, U256};
use serde::Serialize;

/// A displayable NFT owned by an address.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NftItem {
    /// Lowercase contract address.
    pub contract: String,
    /// Decimal token id.
    pub token_id: String,
    pub name: String,
    pub collection_name: Option<String>,
    pub image_url: Option<String>,
}

/// A `(contract, tokenId)` pair awaiting verification and enrichment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TokenRef {
    pub contract: Address,
    pub token_id: U256,
}

impl TokenRef {
    /// Placeholder display name when no metadata could be resolved.
    pub fn fallback_name(&self) -> String {
        format!("Token #{}", self.token_id)
    }
}
