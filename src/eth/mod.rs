//! Ethereum-side plumbing: connection context, RPC façade, amount scaling,
//! contract ABIs, and the token and price services built on them.

pub mod abi;
pub mod amount;
pub mod client;
pub mod context;
pub mod price_feed;
pub mod token_service;

pub use client::{ChainClient, GAS_FALLBACK};
pub use context::ChainContext;
pub use price_feed::PriceFeed;
pub use token_service::TokenService;

use alloy::primitives::Address;
use std::str::FromStr;

use crate::error::WalletError;

/// Parses a user-supplied address, rejecting anything that is not 20 bytes
/// of hex.
pub fn parse_address(input: &str) -> Result<Address, WalletError> {
    Address::from_str(input.trim())
        .map_err(|_| WalletError::InvalidInput(format!("invalid Ethereum address: {}", input)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_address_accepts_mixed_case() {
        let addr = parse_address(" 0xD8dA6BF26964aF9D7eEd9e03E53415D37aA96045 ").unwrap();
        assert_eq!(
            format!("{:#x}", addr),
            "0xd8da6bf26964af9d7eed9e03e53415d37aa96045"
        );
    }

    #[test]
    fn test_parse_address_rejects_garbage() {
        for bad in ["", "0x123", "hello", "0xzz000000000000000000000000000000000000zz"] {
            assert!(matches!(
                parse_address(bad),
                Err(WalletError::InvalidInput(_))
            ));
        }
    }
}
