//! USD price quotes from Chainlink aggregators.
//!
//! Feed addresses come from the network config; a symbol without a
//! configured aggregator is a [`WalletError::NotFound`], not a guess.

use std::collections::HashMap;

use alloy::primitives::{I256, U256};
use alloy::sol_types::SolCall;
use bigdecimal::BigDecimal;

use crate::error::WalletError;
use crate::eth::abi::ChainlinkAggregator;
use crate::eth::amount::from_raw_u256;
use crate::eth::{parse_address, ChainClient, ChainContext};

/// Chainlink USD aggregators answer with 8 decimals.
const FEED_DECIMALS: u8 = 8;

pub struct PriceFeed {
    client: ChainClient,
    feeds: HashMap<String, String>,
}

impl PriceFeed {
    pub fn new(ctx: &ChainContext) -> Self {
        Self {
            client: ChainClient::new(ctx),
            feeds: ctx.network().chainlink_feeds.clone(),
        }
    }

    /// USD price for `symbol` (case-insensitive against configured feeds).
    pub async fn usd_price(&self, symbol: &str) -> Result<BigDecimal, WalletError> {
        let feed = self
            .feeds
            .iter()
            .find(|(s, _)| s.eq_ignore_ascii_case(symbol))
            .map(|(_, addr)| addr.as_str())
            .ok_or_else(|| {
                WalletError::NotFound(format!("no price feed configured for {}", symbol))
            })?;
        let feed = parse_address(feed)?;

        let data = self
            .client
            .call(feed, ChainlinkAggregator::latestRoundDataCall {}.abi_encode().into())
            .await?;
        let round = ChainlinkAggregator::latestRoundDataCall::abi_decode_returns(&data)
            .map_err(|e| {
                WalletError::ChainRequest(format!("failed to decode price feed response: {}", e))
            })?;

        Ok(from_raw_u256(positive(round.answer)?, FEED_DECIMALS))
    }
}

fn positive(answer: I256) -> Result<U256, WalletError> {
    if answer.is_negative() {
        return Err(WalletError::ChainRequest(format!(
            "price feed returned a negative answer: {}",
            answer
        )));
    }
    Ok(answer.into_raw())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    use alloy::primitives::Bytes;
    use alloy::providers::{mock::Asserter, Provider, ProviderBuilder};
    use alloy::sol_types::SolValue;

    use crate::config::NetworkConfig;

    fn mocked_feed(asserter: Asserter) -> PriceFeed {
        let provider = ProviderBuilder::new()
            .connect_mocked_client(asserter)
            .erased();
        let mut network = NetworkConfig::default();
        network.chainlink_feeds.insert(
            "ETH".to_string(),
            "0x00000000000000000000000000000000000000fe".to_string(),
        );
        let ctx = ChainContext::with_provider(network, provider);
        PriceFeed::new(&ctx)
    }

    fn round_data(answer: i64) -> Bytes {
        let ret = (
            U256::from(1u64),
            I256::try_from(answer).unwrap(),
            U256::from(0u64),
            U256::from(0u64),
            U256::from(1u64),
        );
        Bytes::from(ret.abi_encode())
    }

    #[tokio::test]
    async fn test_usd_price_scales_eight_decimals() {
        let asserter = Asserter::new();
        asserter.push_success(&round_data(2_500_12345678));
        let feed = mocked_feed(asserter);
        let price = feed.usd_price("ETH").await.unwrap();
        assert_eq!(price, BigDecimal::from_str("2500.12345678").unwrap());
    }

    #[tokio::test]
    async fn test_symbol_match_is_case_insensitive() {
        let asserter = Asserter::new();
        asserter.push_success(&round_data(100_000_000));
        let feed = mocked_feed(asserter);
        let price = feed.usd_price("eth").await.unwrap();
        assert_eq!(price, BigDecimal::from_str("1").unwrap());
    }

    #[tokio::test]
    async fn test_unconfigured_symbol_is_not_found() {
        let feed = mocked_feed(Asserter::new());
        let err = feed.usd_price("DOGE").await.unwrap_err();
        assert!(matches!(err, WalletError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_negative_answer_is_rejected() {
        let asserter = Asserter::new();
        asserter.push_success(&round_data(-1));
        let feed = mocked_feed(asserter);
        let err = feed.usd_price("ETH").await.unwrap_err();
        assert!(matches!(err, WalletError::ChainRequest(_)));
    }
}
