//! Token metadata resolution from `tokenURI` values.
//!
//! A `tokenURI` may be an inline data URI (base64 or percent-encoded JSON),
//! an HTTP(S) URL, or an `ipfs://` reference. IPFS and Arweave references
//! are rewritten to public gateways; inline SVG markup is wrapped in a data
//! URI so it can be handed straight to an image view.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use percent_encoding::percent_decode_str;
use serde::Deserialize;

use crate::error::WalletError;

const IPFS_GATEWAY: &str = "https://ipfs.io/ipfs/";
const ARWEAVE_GATEWAY: &str = "https://arweave.net/";

/// The JSON document behind a `tokenURI`. Collections disagree on field
/// names; every spelling seen in the wild gets its own slot and
/// [`TokenMetadata::image_source`] picks in a fixed order.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TokenMetadata {
    pub name: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    #[serde(rename = "image_url")]
    pub image_url: Option<String>,
    #[serde(rename = "imageUrl")]
    pub image_url_camel: Option<String>,
    #[serde(rename = "image_uri")]
    pub image_uri: Option<String>,
    #[serde(rename = "imageURI")]
    pub image_uri_upper: Option<String>,
    #[serde(rename = "image_data")]
    pub image_data: Option<String>,
}

impl TokenMetadata {
    /// `name`, then `title`.
    pub fn display_name(&self) -> Option<String> {
        [&self.name, &self.title]
            .into_iter()
            .flatten()
            .map(|s| s.trim())
            .find(|s| !s.is_empty())
            .map(str::to_string)
    }

    /// First usable image reference, gateway-rewritten. Inline SVG markup
    /// in `image_data` becomes a base64 data URI.
    pub fn image_source(&self) -> Option<String> {
        let candidates = [
            &self.image,
            &self.image_url,
            &self.image_url_camel,
            &self.image_uri,
            &self.image_uri_upper,
        ];
        if let Some(url) = candidates
            .into_iter()
            .flatten()
            .map(|s| s.trim())
            .find(|s| !s.is_empty())
        {
            return Some(to_gateway_url(url));
        }
        let data = self.image_data.as_deref()?.trim();
        if data.starts_with("<svg") {
            return Some(format!(
                "data:image/svg+xml;base64,{}",
                BASE64.encode(data.as_bytes())
            ));
        }
        None
    }
}

/// Rewrites decentralized-storage schemes to HTTP gateways; everything else
/// passes through untouched.
pub fn to_gateway_url(url: &str) -> String {
    let url = url.trim();
    if let Some(rest) = url.strip_prefix("ipfs://") {
        // Some URIs carry a redundant "ipfs/" path segment after the scheme.
        let path = rest.strip_prefix("ipfs/").unwrap_or(rest);
        return format!("{}{}", IPFS_GATEWAY, path);
    }
    if let Some(rest) = url.strip_prefix("ar://") {
        return format!("{}{}", ARWEAVE_GATEWAY, rest);
    }
    url.to_string()
}

/// Fetches and parses the document a `tokenURI` points at. `Ok(None)` means
/// the URI scheme is unusable, not a transport failure.
pub async fn resolve(http: &reqwest::Client, token_uri: &str) -> Result<Option<TokenMetadata>, WalletError> {
    let uri = token_uri.trim();
    if uri.is_empty() {
        return Ok(None);
    }
    if let Some(payload) = uri.strip_prefix("data:") {
        return decode_data_uri(payload).map(Some);
    }
    let url = to_gateway_url(uri);
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Ok(None);
    }
    let response = http
        .get(&url)
        .send()
        .await
        .map_err(|e| WalletError::ChainRequest(format!("metadata fetch failed for {}: {}", url, e)))?
        .error_for_status()
        .map_err(|e| WalletError::ChainRequest(format!("metadata fetch failed for {}: {}", url, e)))?;
    let metadata = response
        .json::<TokenMetadata>()
        .await
        .map_err(|e| WalletError::ChainRequest(format!("invalid metadata from {}: {}", url, e)))?;
    Ok(Some(metadata))
}

fn decode_data_uri(payload: &str) -> Result<TokenMetadata, WalletError> {
    let (header, body) = payload
        .split_once(',')
        .ok_or_else(|| WalletError::InvalidInput("malformed data URI".to_string()))?;
    let json = if header.contains("base64") {
        let raw = BASE64
            .decode(body.trim())
            .map_err(|e| WalletError::InvalidInput(format!("invalid base64 data URI: {}", e)))?;
        String::from_utf8(raw)
            .map_err(|e| WalletError::InvalidInput(format!("data URI is not UTF-8: {}", e)))?
    } else {
        percent_decode_str(body)
            .decode_utf8()
            .map_err(|e| WalletError::InvalidInput(format!("data URI is not UTF-8: {}", e)))?
            .into_owned()
    };
    serde_json::from_str(&json)
        .map_err(|e| WalletError::InvalidInput(format!("invalid metadata JSON: {}", e)))
}
