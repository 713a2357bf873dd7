//! Indexer-backed ownership lookup over the Alchemy NFT REST API.
//!
//! The REST surface shares the RPC endpoint's host and API key; the key is
//! taken from `GALLEON_NFT_API_KEY`, then `ALCHEMY_API_KEY`, then the path
//! segment after `/v2/` in the RPC URL. Without a key there is no indexer
//! and discovery falls through to the on-chain paths.

use serde::Deserialize;
use url::Url;

use crate::config::NetworkConfig;
use crate::error::WalletError;
use crate::nft::NftItem;

const PAGE_SIZE: u32 = 100;
const MAX_PAGES: u32 = 20;

/// An indexer result plus the `tokenURI` needed to enrich it when the
/// indexer had no image cached.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedNft {
    pub item: NftItem,
    pub token_uri: Option<String>,
}

pub struct NftIndexer {
    http: reqwest::Client,
    base_url: String,
}

impl NftIndexer {
    /// `None` when no API key can be resolved for the network.
    pub fn from_network(http: reqwest::Client, network: &NetworkConfig) -> Option<Self> {
        let rpc_url = network.rpc_url();
        let key = resolve_api_key(&rpc_url)?;
        let host = Url::parse(&rpc_url).ok()?.host_str()?.to_string();
        Some(Self {
            http,
            base_url: format!("https://{}/nft/v3/{}", host, key),
        })
    }

    /// All NFTs the indexer attributes to `owner`, following page keys.
    pub async fn owned_nfts(&self, owner: &str) -> Result<Vec<IndexedNft>, WalletError> {
        let mut out = Vec::new();
        let mut page_key: Option<String> = None;
        for _ in 0..MAX_PAGES {
            let mut url = format!(
                "{}/getNFTsForOwner?owner={}&withMetadata=true&pageSize={}",
                self.base_url, owner, PAGE_SIZE
            );
            if let Some(key) = &page_key {
                url.push_str("&pageKey=");
                url.push_str(key);
            }
            let response: OwnedNftsResponse = self
                .http
                .get(&url)
                .send()
                .await
                .map_err(|e| WalletError::ChainRequest(format!("indexer request failed: {}", e)))?
                .error_for_status()
                .map_err(|e| WalletError::ChainRequest(format!("indexer request failed: {}", e)))?
                .json()
                .await
                .map_err(|e| WalletError::ChainRequest(format!("invalid indexer response: {}", e)))?;

            out.extend(response.owned_nfts.into_iter().filter_map(OwnedNft::into_indexed));
            page_key = response.page_key.filter(|k| !k.is_empty());
            if page_key.is_none() {
                break;
            }
        }
        Ok(out)
    }
}

pub(crate) fn resolve_api_key(rpc_url: &str) -> Option<String> {
    for var in ["GALLEON_NFT_API_KEY", "ALCHEMY_API_KEY"] {
        if let Ok(key) = std::env::var(var) {
            let key = key.trim().to_string();
            if !key.is_empty() {
                return Some(key);
            }
        }
    }
    api_key_from_url(rpc_url)
}

/// Alchemy-style RPC URLs embed the key as the path segment after `/v2/`.
fn api_key_from_url(rpc_url: &str) -> Option<String> {
    let (_, rest) = rpc_url.split_once("/v2/")?;
    let key = rest.split('/').next().unwrap_or_default().trim();
    if key.is_empty() {
        None
    } else {
        Some(key.to_string())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OwnedNftsResponse {
    #[serde(default)]
    owned_nfts: Vec<OwnedNft>,
    #[serde(default)]
    page_key: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OwnedNft {
    #[serde(default)]
    contract: NftContract,
    #[serde(default)]
    token_id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    image: NftImage,
    #[serde(default)]
    media: Vec<NftMedia>,
    #[serde(default)]
    token_uri: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NftContract {
    #[serde(default)]
    address: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NftImage {
    #[serde(default)]
    cached_url: Option<String>,
    #[serde(default)]
    thumbnail_url: Option<String>,
    #[serde(default)]
    png_url: Option<String>,
    #[serde(default)]
    original_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NftMedia {
    #[serde(default)]
    gateway: Option<String>,
    #[serde(default)]
    raw: Option<String>,
}

impl OwnedNft {
    fn into_indexed(self) -> Option<IndexedNft> {
        let contract = self.contract.address.as_deref()?.trim().to_lowercase();
        let token_id = self.token_id.as_deref()?.trim().to_string();
        if contract.is_empty() || token_id.is_empty() {
            return None;
        }
        let collection_name = self
            .contract
            .name
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .or_else(|| Some(contract.clone()));
        let name = [&self.name, &self.title]
            .into_iter()
            .flatten()
            .map(|s| s.trim())
            .find(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("Token #{}", token_id));
        let image_url = self.best_image();
        Some(IndexedNft {
            item: NftItem {
                contract,
                token_id,
                name,
                collection_name,
                image_url,
            },
            token_uri: self.token_uri,
        })
    }

    fn best_image(&self) -> Option<String> {
        let mut candidates = vec![
            &self.image.cached_url,
            &self.image.thumbnail_url,
            &self.image.png_url,
            &self.image.original_url,
        ];
        if let Some(media) = self.media.first() {
            candidates.push(&media.gateway);
            candidates.push(&media.raw);
        }
        candidates
            .into_iter()
            .flatten()
            .map(|s| s.trim())
            .find(|s| !s.is_empty())
            .map(crate::nft::metadata::to_gateway_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_key_from_rpc_url() {
        assert_eq!(
            api_key_from_url("https://eth-sepolia.g.alchemy.com/v2/abc123"),
            Some("abc123".to_string())
        );
        assert_eq!(
            api_key_from_url("https://eth-mainnet.g.alchemy.com/v2/key/extra"),
            Some("key".to_string())
        );
        assert_eq!(api_key_from_url("https://rpc.example.org"), None);
        assert_eq!(api_key_from_url("https://rpc.example.org/v2/"), None);
    }

    #[test]
    fn test_response_deserialization_and_conversion() {
        let raw = r#"{
            "ownedNfts": [
                {
                    "contract": {"address": "0xABCDEF0000000000000000000000000000000001", "name": "Example Collection"},
                    "tokenId": "42",
                    "name": "Piece #42",
                    "image": {"cachedUrl": "https://cdn.example/42.png"},
                    "tokenUri": "ipfs://QmMeta/42.json"
                },
                {
                    "contract": {"address": "0xabcdef0000000000000000000000000000000002"},
                    "tokenId": "7",
                    "image": {},
                    "media": [{"raw": "ipfs://QmImg/7.png"}]
                },
                {
                    "contract": {},
                    "tokenId": "1"
                }
            ],
            "pageKey": null
        }"#;
        let response: OwnedNftsResponse = serde_json::from_str(raw).unwrap();
        let items: Vec<IndexedNft> = response
            .owned_nfts
            .into_iter()
            .filter_map(OwnedNft::into_indexed)
            .collect();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].item.contract, "0xabcdef0000000000000000000000000000000001");
        assert_eq!(items[0].item.name, "Piece #42");
        assert_eq!(
            items[0].item.image_url.as_deref(),
            Some("https://cdn.example/42.png")
        );
        assert_eq!(items[0].token_uri.as_deref(), Some("ipfs://QmMeta/42.json"));
        assert_eq!(
            items[0].item.collection_name.as_deref(),
            Some("Example Collection")
        );

        // Media fallback, gateway rewrite, and name placeholder.
        assert_eq!(items[1].item.name, "Token #7");
        assert_eq!(
            items[1].item.image_url.as_deref(),
            Some("https://ipfs.io/ipfs/QmImg/7.png")
        );
    }

    #[test]
    fn test_image_precedence_prefers_cached() {
        let nft: OwnedNft = serde_json::from_str(
            r#"{
                "contract": {"address": "0x01"},
                "tokenId": "1",
                "image": {
                    "cachedUrl": "https://cached.example",
                    "pngUrl": "https://png.example"
                },
                "media": [{"gateway": "https://gateway.example"}]
            }"#,
        )
        .unwrap();
        assert_eq!(nft.best_image().as_deref(), Some("https://cached.example"));
    }

    #[test]
    fn test_from_network_requires_resolvable_key() {
        // Key embedded in the RPC URL path.
        let network = NetworkConfig {
            rpc_url: "https://eth-sepolia.g.alchemy.com/v2/testkey".to_string(),
            ..NetworkConfig::default()
        };
        let indexer = NftIndexer::from_network(reqwest::Client::new(), &network).unwrap();
        assert_eq!(
            indexer.base_url,
            "https://eth-sepolia.g.alchemy.com/nft/v3/testkey"
        );
    }
}
