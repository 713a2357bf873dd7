//! Self-custody wallet engine for EVM chains.
//!
//! The crate covers the full lifecycle of an embedded wallet: BIP-39/44 key
//! derivation, envelope encryption of private keys, native and ERC-20
//! transfers over legacy transactions, a token registry, Chainlink price
//! quotes, and layered NFT ownership discovery. It is a library; hosts bring
//! their own storage by implementing the traits in [`store`].

pub mod config;
pub mod envelope_encryption;
pub mod error;
pub mod eth;
pub mod mnemonic;
pub mod nft;
pub mod store;
pub mod token_repository;
pub mod utils;
pub mod wallet_service;

pub use config::{NetworkConfig, Networks};
pub use error::WalletError;
pub use eth::{ChainClient, ChainContext, PriceFeed, TokenService};
pub use nft::{NftDiscovery, NftItem};
pub use store::{ProfileStore, TransactionLog, TxLogStore, TxStatus, WalletProfile};
pub use token_repository::{JsonTokenRepository, TokenMeta};
pub use wallet_service::WalletService;
