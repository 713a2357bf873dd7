//! Envelope encryption for secret material (private keys).
//!
//! The scheme uses:
//! - PBKDF2-HMAC-SHA256 for password-based key derivation
//! - AES-256-GCM for authenticated encryption (tag appended to ciphertext)
//!
//! # Storage Format
//! A JSON object `{"salt": b64, "iv": b64, "cipherText": b64}`. The KDF
//! parameters are not persisted per-envelope; [`PBKDF2_ROUNDS`] is pinned as
//! part of the format and must not change without versioning the envelope.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::Aes256Gcm;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::error::WalletError;

pub const SALT_SIZE: usize = 16;
pub const NONCE_SIZE: usize = 12;
pub const KEY_SIZE: usize = 32;

/// Pinned KDF iteration count. Part of the persisted format.
pub const PBKDF2_ROUNDS: u32 = 65_536;

/// Persisted envelope, base64 fields over the JSON boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub salt: String,
    pub iv: String,
    pub cipher_text: String,
}

impl Envelope {
    pub fn to_json(&self) -> Result<String, WalletError> {
        serde_json::to_string(self)
            .map_err(|e| WalletError::InvalidInput(format!("failed to serialize envelope: {}", e)))
    }

    /// Parsing failures are indistinguishable from decryption failures.
    pub fn from_json(json: &str) -> Result<Self, WalletError> {
        serde_json::from_str(json).map_err(|_| WalletError::Authentication)
    }
}

pub fn encrypt(plaintext: &[u8], password: &str) -> Result<Envelope, WalletError> {
    let salt = rand::random::<[u8; SALT_SIZE]>();
    let nonce = rand::random::<[u8; NONCE_SIZE]>();
    let key = derive_key(password, &salt);

    let cipher = Aes256Gcm::new((&*key).into());
    let ciphertext = cipher
        .encrypt(&nonce.into(), plaintext)
        .map_err(|_| WalletError::InvalidInput("AES-GCM encryption failed".to_string()))?;

    Ok(Envelope {
        salt: BASE64.encode(salt),
        iv: BASE64.encode(nonce),
        cipher_text: BASE64.encode(ciphertext),
    })
}

/// Decrypts and verifies an envelope. Every failure mode collapses into the
/// opaque [`WalletError::Authentication`] so a caller cannot distinguish a
/// wrong password from a corrupted envelope.
pub fn decrypt(envelope: &Envelope, password: &str) -> Result<Vec<u8>, WalletError> {
    let salt = BASE64
        .decode(&envelope.salt)
        .map_err(|_| WalletError::Authentication)?;
    let nonce_bytes = BASE64
        .decode(&envelope.iv)
        .map_err(|_| WalletError::Authentication)?;
    let ciphertext = BASE64
        .decode(&envelope.cipher_text)
        .map_err(|_| WalletError::Authentication)?;

    let nonce: [u8; NONCE_SIZE] = nonce_bytes
        .as_slice()
        .try_into()
        .map_err(|_| WalletError::Authentication)?;

    let key = derive_key(password, &salt);
    let cipher = Aes256Gcm::new((&*key).into());
    cipher
        .decrypt(&nonce.into(), ciphertext.as_slice())
        .map_err(|_| WalletError::Authentication)
}

/// The derived key lives in a `Zeroizing` buffer so it is wiped when dropped,
/// on success and failure paths alike.
fn derive_key(password: &str, salt: &[u8]) -> Zeroizing<[u8; KEY_SIZE]> {
    let mut key = Zeroizing::new([0u8; KEY_SIZE]);
    pbkdf2::pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, PBKDF2_ROUNDS, &mut *key);
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let plaintext = b"secret data";
        let password = "my_secure_password";
        let envelope = encrypt(plaintext, password).unwrap();
        let decrypted = decrypt(&envelope, password).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn test_wrong_password_is_opaque() {
        let envelope = encrypt(b"secret data", "correct_password").unwrap();
        let result = decrypt(&envelope, "wrong_password");
        assert_eq!(result, Err(WalletError::Authentication));
    }

    #[test]
    fn test_tampered_ciphertext_matches_wrong_password_error() {
        let envelope = encrypt(b"secret data", "password").unwrap();

        let mut raw = BASE64.decode(&envelope.cipher_text).unwrap();
        raw[4] ^= 0xFF;
        let tampered = Envelope {
            cipher_text: BASE64.encode(raw),
            ..envelope.clone()
        };

        let wrong_password = decrypt(&envelope, "other").unwrap_err();
        let corrupted = decrypt(&tampered, "password").unwrap_err();
        assert_eq!(wrong_password, corrupted);
    }

    #[test]
    fn test_json_roundtrip_uses_camel_case() {
        let envelope = encrypt(b"payload", "pw").unwrap();
        let json = envelope.to_json().unwrap();
        assert!(json.contains("\"cipherText\""));
        assert!(json.contains("\"iv\""));
        assert!(json.contains("\"salt\""));
        let parsed = Envelope::from_json(&json).unwrap();
        assert_eq!(parsed, envelope);
        assert_eq!(decrypt(&parsed, "pw").unwrap(), b"payload");
    }

    #[test]
    fn test_garbage_envelope_json() {
        assert_eq!(
            Envelope::from_json("not json").unwrap_err(),
            WalletError::Authentication
        );
        let bad = Envelope {
            salt: "!!!".to_string(),
            iv: "!!!".to_string(),
            cipher_text: "!!!".to_string(),
        };
        assert_eq!(decrypt(&bad, "pw").unwrap_err(), WalletError::Authentication);
    }

    #[test]
    fn test_large_payload() {
        let plaintext = vec![42u8; 10_000];
        let envelope = encrypt(&plaintext, "password").unwrap();
        assert_eq!(decrypt(&envelope, "password").unwrap(), plaintext);
    }
}
