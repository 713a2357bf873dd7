//! Wallet lifecycle and native-coin transfers.
//!
//! This is the orchestration layer: it owns no crypto and no RPC details,
//! only the sequencing between the stores, the envelope, the mnemonic
//! derivation, and the chain client. Private keys exist in memory only
//! between a successful unlock and the end of the operation.

use std::str::FromStr;
use std::sync::Arc;

use alloy::primitives::{Bytes, B256};
use alloy_signer_local::PrivateKeySigner;
use bigdecimal::{BigDecimal, Zero};
use zeroize::Zeroizing;

use crate::envelope_encryption::{self, Envelope};
use crate::error::WalletError;
use crate::eth::{parse_address, ChainClient, ChainContext};
use crate::eth::amount::{from_raw_u256, to_raw_u256};
use crate::mnemonic;
use crate::store::{ProfileStore, TransactionLog, TxLogStore, TxStatus, WalletProfile};

const NATIVE_DECIMALS: u8 = 18;
const NATIVE_SYMBOL: &str = "ETH";

/// Decrypts the envelope and reconstructs the signer. All failure modes
/// collapse into [`WalletError::Authentication`].
pub(crate) fn unlock_signer(
    encrypted_secret: &str,
    password: &str,
) -> Result<PrivateKeySigner, WalletError> {
    let envelope = Envelope::from_json(encrypted_secret)?;
    let plain = Zeroizing::new(envelope_encryption::decrypt(&envelope, password)?);
    let key_hex = std::str::from_utf8(&plain).map_err(|_| WalletError::Authentication)?;
    PrivateKeySigner::from_str(key_hex.trim()).map_err(|_| WalletError::Authentication)
}

pub struct WalletService<P: ProfileStore, L: TxLogStore> {
    client: ChainClient,
    profiles: Arc<P>,
    tx_logs: Arc<L>,
}

impl<P: ProfileStore, L: TxLogStore> WalletService<P, L> {
    pub fn new(ctx: &ChainContext, profiles: Arc<P>, tx_logs: Arc<L>) -> Self {
        Self {
            client: ChainClient::new(ctx),
            profiles,
            tx_logs,
        }
    }

    pub fn generate_mnemonic(&self) -> Result<String, WalletError> {
        mnemonic::generate()
    }

    /// Creates a wallet from a fresh mnemonic. Returns the stored profile
    /// and the phrase; the phrase is shown once and never persisted.
    pub fn create_wallet(
        &self,
        name: &str,
        password: &str,
    ) -> Result<(WalletProfile, String), WalletError> {
        let phrase = mnemonic::generate()?;
        let profile = self.import_wallet(name, &phrase, "", password)?;
        Ok((profile, phrase))
    }

    /// Derives the account from an existing phrase and stores it under
    /// `name`, with the private key sealed in an envelope.
    pub fn import_wallet(
        &self,
        name: &str,
        phrase: &str,
        passphrase: &str,
        password: &str,
    ) -> Result<WalletProfile, WalletError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(WalletError::InvalidInput(
                "wallet name must not be empty".to_string(),
            ));
        }
        if password.is_empty() {
            return Err(WalletError::InvalidInput(
                "password must not be empty".to_string(),
            ));
        }
        let signer = mnemonic::derive_signer(phrase, passphrase)?;
        let key_hex = Zeroizing::new(format!("{:x}", signer.to_bytes()));
        let envelope = envelope_encryption::encrypt(key_hex.as_bytes(), password)?;

        let profile = WalletProfile {
            id: 0,
            name: name.to_string(),
            address: format!("{:#x}", signer.address()),
            encrypted_secret: envelope.to_json()?,
            created_at: chrono::Utc::now(),
        };
        self.profiles.save(profile)?;
        tracing::info!("stored wallet profile {}", name);
        self.profiles
            .find_by_name(name)?
            .ok_or_else(|| WalletError::NotFound(format!("wallet {} was not stored", name)))
    }

    /// Unseals the named wallet's signer.
    pub fn unlock(&self, name: &str, password: &str) -> Result<PrivateKeySigner, WalletError> {
        let profile = self.profile(name)?;
        unlock_signer(&profile.encrypted_secret, password)
    }

    pub fn list_wallets(&self) -> Result<Vec<WalletProfile>, WalletError> {
        self.profiles.all()
    }

    pub fn transaction_history(&self, address: &str) -> Result<Vec<TransactionLog>, WalletError> {
        self.tx_logs.find_by_address(address)
    }

    /// Native coin balance, scaled from wei.
    pub async fn native_balance(&self, address: &str) -> Result<BigDecimal, WalletError> {
        let address = parse_address(address)?;
        let wei = self.client.native_balance(address).await?;
        Ok(from_raw_u256(wei, NATIVE_DECIMALS))
    }

    /// Signs and broadcasts a native transfer, logging it as pending.
    /// Use [`WalletService::confirm`] to follow it to a final status.
    pub async fn send_native(
        &self,
        name: &str,
        password: &str,
        recipient: &str,
        amount: &BigDecimal,
    ) -> Result<B256, WalletError> {
        if amount <= &BigDecimal::zero() {
            return Err(WalletError::InvalidInput(
                "amount must be positive".to_string(),
            ));
        }
        let to = parse_address(recipient)?;
        let profile = self.profile(name)?;
        let signer = unlock_signer(&profile.encrypted_secret, password)?;
        let value = to_raw_u256(amount, NATIVE_DECIMALS)?;

        let gas_limit = self
            .client
            .estimate_gas(signer.address(), to, value, Bytes::new())
            .await;
        let gas_price = self.client.gas_price().await?;
        let hash = self
            .client
            .send_raw(&signer, to, Bytes::new(), value, gas_price, gas_limit)
            .await?;
        tracing::info!("broadcast native transfer {:#x} ({} ETH)", hash, amount);

        self.tx_logs.save(TransactionLog::new(
            profile.address,
            format!("{:#x}", hash),
            amount.clone(),
            NATIVE_SYMBOL.to_string(),
            TxStatus::Pending,
        ))?;
        Ok(hash)
    }

    /// Waits for a broadcast transaction to land and appends a log entry
    /// with the observed status. A transaction that never surfaces a receipt
    /// stays pending.
    pub async fn confirm(
        &self,
        wallet_address: &str,
        tx_hash: B256,
        amount: &BigDecimal,
        asset_symbol: &str,
    ) -> Result<TxStatus, WalletError> {
        let status = match self.client.wait_for_receipt(tx_hash).await? {
            Some(true) => TxStatus::Success,
            Some(false) => TxStatus::Failed,
            None => TxStatus::Pending,
        };
        if status != TxStatus::Pending {
            self.tx_logs.save(TransactionLog::new(
                wallet_address.to_string(),
                format!("{:#x}", tx_hash),
                amount.clone(),
                asset_symbol.to_string(),
                status,
            ))?;
        }
        Ok(status)
    }

    fn profile(&self, name: &str) -> Result<WalletProfile, WalletError> {
        self.profiles
            .find_by_name(name)?
            .ok_or_else(|| WalletError::NotFound(format!("no wallet named {}", name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use alloy::providers::{mock::Asserter, Provider, ProviderBuilder};
    use alloy::primitives::{U128, U256, U64};

    use crate::config::NetworkConfig;
    use crate::store::{MemoryProfileStore, MemoryTxLogStore};

    const TEST_PHRASE: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";
    const TEST_ADDRESS: &str = "0x9858effd232b4033e47d90003d41ec34ecaeda94";

    fn service(asserter: Asserter) -> WalletService<MemoryProfileStore, MemoryTxLogStore> {
        let provider = ProviderBuilder::new()
            .connect_mocked_client(asserter)
            .erased();
        let ctx = ChainContext::with_provider(NetworkConfig::default(), provider);
        WalletService::new(
            &ctx,
            Arc::new(MemoryProfileStore::new()),
            Arc::new(MemoryTxLogStore::new()),
        )
    }

    #[test]
    fn test_import_derives_known_address() {
        let service = service(Asserter::new());
        let profile = service
            .import_wallet("main", TEST_PHRASE, "", "pw")
            .unwrap();
        assert_eq!(profile.address, TEST_ADDRESS);
        assert_eq!(profile.id, 1);
        assert!(profile.encrypted_secret.contains("cipherText"));
    }

    #[test]
    fn test_create_wallet_roundtrips_through_unlock() {
        let service = service(Asserter::new());
        let (profile, phrase) = service.create_wallet("fresh", "pw").unwrap();
        assert!(mnemonic::validate(&phrase));

        let signer = service.unlock("fresh", "pw").unwrap();
        assert_eq!(format!("{:#x}", signer.address()), profile.address);
    }

    #[test]
    fn test_unlock_wrong_password_is_opaque() {
        let service = service(Asserter::new());
        service.import_wallet("main", TEST_PHRASE, "", "pw").unwrap();
        assert_eq!(
            service.unlock("main", "nope").unwrap_err(),
            WalletError::Authentication
        );
    }

    #[test]
    fn test_unlock_unknown_wallet_is_not_found() {
        let service = service(Asserter::new());
        assert!(matches!(
            service.unlock("ghost", "pw").unwrap_err(),
            WalletError::NotFound(_)
        ));
    }

    #[test]
    fn test_import_rejects_blank_name_and_password() {
        let service = service(Asserter::new());
        assert!(matches!(
            service.import_wallet("  ", TEST_PHRASE, "", "pw").unwrap_err(),
            WalletError::InvalidInput(_)
        ));
        assert!(matches!(
            service.import_wallet("main", TEST_PHRASE, "", "").unwrap_err(),
            WalletError::InvalidInput(_)
        ));
    }

    #[test]
    fn test_reimport_same_name_replaces_profile() {
        let service = service(Asserter::new());
        service.import_wallet("main", TEST_PHRASE, "", "pw").unwrap();
        service
            .import_wallet("main", TEST_PHRASE, "other account", "pw")
            .unwrap();
        let wallets = service.list_wallets().unwrap();
        assert_eq!(wallets.len(), 1);
        assert_ne!(wallets[0].address, TEST_ADDRESS);
    }

    #[tokio::test]
    async fn test_native_balance_is_scaled_from_wei() {
        let asserter = Asserter::new();
        asserter.push_success(&U256::from(1_500_000_000_000_000_000u64));
        let service = service(asserter);
        let balance = service.native_balance(TEST_ADDRESS).await.unwrap();
        assert_eq!(balance, BigDecimal::from_str("1.5").unwrap());
    }

    #[tokio::test]
    async fn test_send_native_broadcasts_and_logs_pending() {
        let asserter = Asserter::new();
        // estimate_gas, eth_gasPrice, nonce, raw send.
        asserter.push_success(&U64::from(21_000u64));
        asserter.push_success(&U128::from(3_000_000_000u64));
        asserter.push_success(&U64::from(7u64));
        asserter.push_success(&B256::repeat_byte(0x22));
        let service = service(asserter);
        service.import_wallet("main", TEST_PHRASE, "", "pw").unwrap();

        let hash = service
            .send_native(
                "main",
                "pw",
                "0x00000000000000000000000000000000000000cc",
                &BigDecimal::from_str("0.25").unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(hash, B256::repeat_byte(0x22));

        let history = service.transaction_history(TEST_ADDRESS).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].status, TxStatus::Pending);
        assert_eq!(history[0].asset_symbol, "ETH");
        assert_eq!(history[0].amount, BigDecimal::from_str("0.25").unwrap());
    }

    #[tokio::test]
    async fn test_send_native_rejects_nonpositive_amount() {
        let service = service(Asserter::new());
        service.import_wallet("main", TEST_PHRASE, "", "pw").unwrap();
        let err = service
            .send_native(
                "main",
                "pw",
                "0x00000000000000000000000000000000000000cc",
                &BigDecimal::from_str("0").unwrap(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, WalletError::InvalidInput(_)));
        assert!(service.transaction_history(TEST_ADDRESS).unwrap().is_empty());
    }

    #[test]
    fn test_profile_store_errors_propagate() {
        let mut profiles = crate::store::MockProfileStore::new();
        profiles
            .expect_find_by_name()
            .returning(|_| Err(WalletError::ChainRequest("store unavailable".to_string())));
        let provider = ProviderBuilder::new()
            .connect_mocked_client(Asserter::new())
            .erased();
        let ctx = ChainContext::with_provider(NetworkConfig::default(), provider);
        let service = WalletService::new(&ctx, Arc::new(profiles), Arc::new(MemoryTxLogStore::new()));

        let err = service.unlock("main", "pw").unwrap_err();
        assert!(matches!(err, WalletError::ChainRequest(_)));
    }

    #[tokio::test]
    async fn test_send_native_surfaces_insufficient_funds() {
        let asserter = Asserter::new();
        asserter.push_success(&U64::from(21_000u64));
        asserter.push_success(&U128::from(3_000_000_000u64));
        asserter.push_success(&U64::from(0u64));
        asserter.push_failure_msg("insufficient funds for gas * price + value");
        let service = service(asserter);
        service.import_wallet("main", TEST_PHRASE, "", "pw").unwrap();

        let err = service
            .send_native(
                "main",
                "pw",
                "0x00000000000000000000000000000000000000cc",
                &BigDecimal::from_str("1000000").unwrap(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, WalletError::InsufficientFunds(_)));
        assert!(service.transaction_history(TEST_ADDRESS).unwrap().is_empty());
    }
}
