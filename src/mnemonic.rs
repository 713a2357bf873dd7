//! BIP-39 mnemonic handling and BIP-44 account derivation.

use alloy_signer_local::coins_bip39::{English, Mnemonic};
use alloy_signer_local::{MnemonicBuilder, PrivateKeySigner};

use crate::error::WalletError;

/// Fixed account path: BIP-44, Ethereum coin type, first account.
pub const DERIVATION_PATH: &str = "m/44'/60'/0'/0/0";

const WORD_COUNT: usize = 12;

/// Generates a 12-word phrase from 128 bits of CSPRNG entropy.
pub fn generate() -> Result<String, WalletError> {
    let mut rng = rand::thread_rng();
    let mnemonic = Mnemonic::<English>::new_with_count(&mut rng, WORD_COUNT)
        .map_err(|e| WalletError::InvalidInput(format!("mnemonic generation failed: {}", e)))?;
    Ok(mnemonic.to_phrase())
}

/// Checks wordlist membership and checksum.
pub fn validate(phrase: &str) -> bool {
    Mnemonic::<English>::new_from_phrase(phrase).is_ok()
}

/// Derives the account signer at [`DERIVATION_PATH`].
///
/// An invalid mnemonic is rejected before any derivation work.
pub fn derive_signer(phrase: &str, passphrase: &str) -> Result<PrivateKeySigner, WalletError> {
    if !validate(phrase) {
        return Err(WalletError::InvalidInput(
            "invalid mnemonic phrase".to_string(),
        ));
    }
    MnemonicBuilder::<English>::default()
        .phrase(phrase)
        .password(passphrase)
        .derivation_path(DERIVATION_PATH)
        .map_err(|e| WalletError::InvalidInput(format!("invalid derivation path: {}", e)))?
        .build()
        .map_err(|e| WalletError::InvalidInput(format!("key derivation failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_is_twelve_valid_words() {
        let phrase = generate().unwrap();
        assert_eq!(phrase.split_whitespace().count(), 12);
        assert!(validate(&phrase));
    }

    #[test]
    fn test_generate_is_random() {
        assert_ne!(generate().unwrap(), generate().unwrap());
    }

    #[test]
    fn test_validate_rejects_bad_checksum() {
        // Valid words, wrong checksum word.
        let phrase = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon";
        assert!(!validate(phrase));
    }

    #[test]
    fn test_validate_rejects_unknown_words() {
        assert!(!validate("definitely not bip39 words at all zero zero zero zero zero zero"));
        assert!(!validate(""));
    }

    #[test]
    fn test_derivation_is_deterministic() {
        let phrase = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";
        let a = derive_signer(phrase, "").unwrap();
        let b = derive_signer(phrase, "").unwrap();
        assert_eq!(a.address(), b.address());
        assert_eq!(a.to_bytes(), b.to_bytes());
    }

    #[test]
    fn test_known_test_vector_address() {
        // The all-"abandon" test mnemonic derives this account at m/44'/60'/0'/0/0.
        let phrase = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";
        let signer = derive_signer(phrase, "").unwrap();
        assert_eq!(
            format!("{:#x}", signer.address()),
            "0x9858effd232b4033e47d90003d41ec34ecaeda94"
        );
    }

    #[test]
    fn test_invalid_mnemonic_rejected_before_derivation() {
        let err = derive_signer("not a mnemonic", "").unwrap_err();
        assert!(matches!(err, WalletError::InvalidInput(_)));
    }

    #[test]
    fn test_passphrase_changes_account() {
        let phrase = generate().unwrap();
        let plain = derive_signer(&phrase, "").unwrap();
        let guarded = derive_signer(&phrase, "extra secret").unwrap();
        assert_ne!(plain.address(), guarded.address());
    }
}
