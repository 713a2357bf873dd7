//! Layered NFT ownership discovery.
//!
//! 1. Indexer REST lookup, when an API key is available.
//! 2. `alchemy_getAssetTransfers` sweep of incoming ERC-721 transfers.
//! 3. Chunked `eth_getLogs` scan over the configured contract allow-list.
//!
//! The two on-chain paths only produce candidates: every `(contract,
//! tokenId)` pair is re-verified with `ownerOf` before it is reported, since
//! a transfer in means nothing once the token moved out again. Long scans
//! honor a cancellation token between chunks and pages; cancelling returns
//! whatever was collected so far.

use std::borrow::Cow;
use std::collections::HashSet;

use alloy::primitives::{Address, U256};
use alloy::providers::Provider;
use alloy::rpc::types::Filter;
use alloy::sol_types::{SolCall, SolEvent};
use futures::future::join_all;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::config::NetworkConfig;
use crate::error::WalletError;
use crate::eth::abi::Erc721;
use crate::eth::{parse_address, ChainClient, ChainContext};
use crate::nft::indexer::{IndexedNft, NftIndexer};
use crate::nft::metadata;
use crate::nft::{NftItem, TokenRef};

/// How far back the log scan reaches from the chain head.
const LOG_LOOKBACK_BLOCKS: u64 = 200_000;
/// Block span per `eth_getLogs` request; public nodes reject larger ranges.
const LOG_CHUNK_BLOCKS: u64 = 5_000;
/// Page cap for the transfers sweep.
const TRANSFER_MAX_PAGES: u32 = 5;
/// Per-page transfer count, hex-encoded per the RPC contract.
const TRANSFER_MAX_COUNT: &str = "0x3e8";
/// Log chunks in flight at once.
const LOG_SCAN_CONCURRENCY: usize = 4;

pub struct NftDiscovery {
    client: ChainClient,
    network: NetworkConfig,
    http: reqwest::Client,
}

impl NftDiscovery {
    pub fn new(ctx: &ChainContext) -> Self {
        Self {
            client: ChainClient::new(ctx),
            network: ctx.network().clone(),
            http: reqwest::Client::new(),
        }
    }

    /// Everything `owner` currently holds, best effort across the layers.
    pub async fn discover(
        &self,
        owner: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<NftItem>, WalletError> {
        let owner = parse_address(owner)?;

        if let Some(indexer) = NftIndexer::from_network(self.http.clone(), &self.network) {
            match indexer.owned_nfts(&format!("{:#x}", owner)).await {
                Ok(indexed) if !indexed.is_empty() => {
                    return Ok(self.enrich_indexed(indexed, cancel).await);
                }
                Ok(_) => tracing::debug!("indexer reported no holdings, trying on-chain paths"),
                Err(e) => tracing::warn!("indexer lookup failed, trying on-chain paths: {}", e),
            }
        }

        let mut candidates = match self.transfer_sweep(owner, cancel).await {
            Ok(candidates) => candidates,
            Err(e) => {
                tracing::warn!("asset transfers sweep failed, falling back to log scan: {}", e);
                Vec::new()
            }
        };
        if candidates.is_empty() {
            candidates = self.log_scan(owner, cancel).await?;
        }
        self.verify_and_enrich(owner, candidates, cancel).await
    }

    /// Fills image and name gaps in indexer results from `tokenURI`
    /// metadata, concurrently per item.
    async fn enrich_indexed(
        &self,
        indexed: Vec<IndexedNft>,
        cancel: &CancellationToken,
    ) -> Vec<NftItem> {
        let futures = indexed.into_iter().map(|entry| async move {
            let IndexedNft {
                mut item,
                token_uri,
            } = entry;
            // Enrich when the image is missing or the name is the raw
            // token-id placeholder; complete items pass through untouched.
            let complete = item.image_url.is_some() && !item.name.starts_with("Token #");
            if complete || cancel.is_cancelled() {
                return item;
            }
            let Some(uri) = token_uri else { return item };
            match metadata::resolve(&self.http, &uri).await {
                Ok(Some(meta)) => {
                    if item.image_url.is_none() {
                        item.image_url = meta.image_source();
                    }
                    if item.name.starts_with("Token #") {
                        if let Some(name) = meta.display_name() {
                            item.name = name;
                        }
                    }
                }
                Ok(None) => {}
                Err(e) => tracing::debug!("metadata enrichment failed for {}: {}", uri, e),
            }
            item
        });
        join_all(futures).await
    }

    /// Incoming ERC-721 transfers to `owner`, paged and restricted to the
    /// allow-listed contracts. Without an allow-list there is nothing to
    /// restrict to, so the sweep is skipped.
    async fn transfer_sweep(
        &self,
        owner: Address,
        cancel: &CancellationToken,
    ) -> Result<Vec<TokenRef>, WalletError> {
        let contract_addresses = self.network.nft_contract_allowlist();
        if contract_addresses.is_empty() {
            tracing::debug!("no contracts configured for transfers sweep");
            return Ok(Vec::new());
        }
        // Not every endpoint honors the contract filter; enforce it locally
        // as well.
        let allowed: HashSet<Address> = contract_addresses
            .iter()
            .filter_map(|c| parse_address(c).ok())
            .collect();
        let provider = self.client.provider();
        let mut candidates = Vec::new();
        let mut page_key: Option<String> = None;
        for _ in 0..TRANSFER_MAX_PAGES {
            if cancel.is_cancelled() {
                break;
            }
            let params = AssetTransfersParams {
                from_block: "0x0".to_string(),
                to_block: "latest".to_string(),
                to_address: format!("{:#x}", owner),
                category: vec!["erc721".to_string()],
                contract_addresses: contract_addresses.clone(),
                with_metadata: false,
                max_count: TRANSFER_MAX_COUNT.to_string(),
                page_key: page_key.take(),
            };
            let result: AssetTransfersResult = provider
                .raw_request(Cow::Borrowed("alchemy_getAssetTransfers"), (params,))
                .await
                .map_err(|e| {
                    WalletError::ChainRequest(format!("alchemy_getAssetTransfers failed: {}", e))
                })?;

            for transfer in result.transfers {
                let Some(contract) = transfer.raw_contract.address else {
                    continue;
                };
                let Ok(contract) = parse_address(&contract) else {
                    continue;
                };
                if !allowed.contains(&contract) {
                    continue;
                }
                let raw_id = transfer.erc721_token_id.or(transfer.token_id);
                let Some(token_id) = raw_id.as_deref().and_then(parse_hex_u256) else {
                    continue;
                };
                candidates.push(TokenRef { contract, token_id });
            }

            page_key = result.page_key.filter(|k| !k.is_empty());
            if page_key.is_none() {
                break;
            }
        }
        Ok(candidates)
    }

    /// Scans `Transfer` logs to `owner` over the allow-listed contracts.
    async fn log_scan(
        &self,
        owner: Address,
        cancel: &CancellationToken,
    ) -> Result<Vec<TokenRef>, WalletError> {
        let contracts: Vec<Address> = self
            .network
            .nft_contract_allowlist()
            .iter()
            .filter_map(|c| parse_address(c).ok())
            .collect();
        if contracts.is_empty() {
            tracing::debug!("no contracts configured for log scan");
            return Ok(Vec::new());
        }

        let provider = self.client.provider();
        let latest = provider
            .get_block_number()
            .await
            .map_err(|e| WalletError::ChainRequest(format!("failed to get block number: {}", e)))?;
        let start = latest.saturating_sub(LOG_LOOKBACK_BLOCKS);

        let mut ranges = Vec::new();
        let mut from = start;
        while from <= latest {
            let to = (from + LOG_CHUNK_BLOCKS - 1).min(latest);
            ranges.push((from, to));
            from = to + 1;
        }

        // Chunks run with bounded concurrency. A chunk that fails, or that
        // starts after cancellation, contributes nothing; it never aborts
        // the scan.
        let chunk_logs = futures::stream::iter(ranges.into_iter().map(|(from, to)| {
            let provider = provider.clone();
            let contracts = contracts.clone();
            async move {
                if cancel.is_cancelled() {
                    return Vec::new();
                }
                let filter = Filter::new()
                    .address(contracts)
                    .event_signature(Erc721::Transfer::SIGNATURE_HASH)
                    .topic2(owner.into_word())
                    .from_block(from)
                    .to_block(to);
                match provider.get_logs(&filter).await {
                    Ok(logs) => logs,
                    Err(e) => {
                        tracing::warn!("eth_getLogs failed for blocks {}-{}: {}", from, to, e);
                        Vec::new()
                    }
                }
            }
        }))
        .buffer_unordered(LOG_SCAN_CONCURRENCY)
        .collect::<Vec<_>>()
        .await;

        let mut candidates = Vec::new();
        for log in chunk_logs.into_iter().flatten() {
            let topics = log.topics();
            // Indexed (from, to, tokenId) plus the signature topic.
            if topics.len() == 4 {
                candidates.push(TokenRef {
                    contract: log.address(),
                    token_id: U256::from_be_bytes(topics[3].0),
                });
            }
        }
        Ok(candidates)
    }

    /// Keeps candidates the owner still holds and resolves their metadata.
    async fn verify_and_enrich(
        &self,
        owner: Address,
        candidates: Vec<TokenRef>,
        cancel: &CancellationToken,
    ) -> Result<Vec<NftItem>, WalletError> {
        let mut seen = HashSet::new();
        let unique: Vec<TokenRef> = candidates
            .into_iter()
            .filter(|c| seen.insert(*c))
            .collect();
        let futures = unique
            .into_iter()
            .map(|candidate| self.resolve_candidate(owner, candidate, cancel));
        Ok(join_all(futures).await.into_iter().flatten().collect())
    }

    async fn resolve_candidate(
        &self,
        owner: Address,
        candidate: TokenRef,
        cancel: &CancellationToken,
    ) -> Option<NftItem> {
        if cancel.is_cancelled() {
            return None;
        }
        let current_owner = match self
            .erc721_call(
                candidate.contract,
                Erc721::ownerOfCall {
                    tokenId: candidate.token_id,
                },
            )
            .await
        {
            Ok(address) => address,
            // Burned tokens revert here; they are simply not holdings.
            Err(e) => {
                tracing::debug!(
                    "ownerOf({}) failed on {:#x}: {}",
                    candidate.token_id,
                    candidate.contract,
                    e
                );
                return None;
            }
        };
        if current_owner != owner {
            return None;
        }

        let mut name = candidate.fallback_name();
        let mut image_url = None;
        if let Ok(uri) = self
            .erc721_call(
                candidate.contract,
                Erc721::tokenURICall {
                    tokenId: candidate.token_id,
                },
            )
            .await
        {
            if let Ok(Some(meta)) = metadata::resolve(&self.http, &uri).await {
                if let Some(resolved) = meta.display_name() {
                    name = resolved;
                }
                image_url = meta.image_source();
            }
        }
        let contract = format!("{:#x}", candidate.contract);
        Some(NftItem {
            collection_name: Some(contract.clone()),
            contract,
            token_id: candidate.token_id.to_string(),
            name,
            image_url,
        })
    }

    async fn erc721_call<C: SolCall>(&self, to: Address, call: C) -> Result<C::Return, WalletError> {
        let data = self.client.call(to, call.abi_encode().into()).await?;
        C::abi_decode_returns(&data).map_err(|e| {
            WalletError::ChainRequest(format!(
                "failed to decode {} response: {}",
                C::SIGNATURE,
                e
            ))
        })
    }
}

fn parse_hex_u256(raw: &str) -> Option<U256> {
    let raw = raw.trim();
    let digits = raw.strip_prefix("0x").unwrap_or(raw);
    U256::from_str_radix(digits, 16).ok()
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct AssetTransfersParams {
    from_block: String,
    to_block: String,
    to_address: String,
    category: Vec<String>,
    contract_addresses: Vec<String>,
    with_metadata: bool,
    max_count: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    page_key: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AssetTransfersResult {
    #[serde(default)]
    transfers: Vec<AssetTransfer>,
    #[serde(default)]
    page_key: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AssetTransfer {
    #[serde(default)]
    raw_contract: RawContract,
    #[serde(default)]
    erc721_token_id: Option<String>,
    #[serde(default)]
    token_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawContract {
    #[serde(default)]
    address: Option<String>,
}
