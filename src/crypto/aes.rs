use crate::error::{AppError, Result};
use aes_gcm::aead::rand_core::RngCore;
use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit, OsRng},
};
use base64::{Engine as _, engine::general_purpose};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// The size of the AES-256 key in bytes.
pub const KEY_SIZE: usize = 32;
/// The size of the AES-GCM nonce in bytes.
pub const NONCE_SIZE: usize = 12;

/// A secure key wrapper that ensures the key is zeroized on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SecureKey([u8; KEY_SIZE]);

impl SecureKey {
    /// Creates a new `SecureKey` from a byte array.
    pub fn new(key: [u8; KEY_SIZE]) -> Self {
        Self(key)
    }

    /// Returns a reference to the key as a byte slice.
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

/// Generates a new random AES-GCM nonce.
fn generate_nonce() -> [u8; NONCE_SIZE] {
    let mut nonce = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce);
    nonce
}

/// Encrypts a plaintext and packs it into a portable text blob.
///
/// The blob layout is `base64(ciphertext || nonce)` with the 12-byte nonce
/// at the end. Session tokens and security-log entries are both stored in
/// this form.
pub fn seal(key: &SecureKey, plaintext: &[u8]) -> Result<String> {
    let cipher = Aes256Gcm::new(key.as_bytes().into());

    let nonce_bytes = generate_nonce();
    let nonce = Nonce::from(nonce_bytes);

    let ciphertext = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|e| AppError::Encryption(format!("Encryption failed: {}", e)))?;

    let mut packed = Vec::with_capacity(ciphertext.len() + NONCE_SIZE);
    packed.extend_from_slice(&ciphertext);
    packed.extend_from_slice(&nonce_bytes);

    Ok(general_purpose::STANDARD.encode(packed))
}

/// Decrypts a blob produced by [`seal`].
///
/// Fails on malformed base64, a truncated payload, or an authentication
/// failure (wrong key or tampered ciphertext).
pub fn open(key: &SecureKey, blob: &str) -> Result<Vec<u8>> {
    let packed = general_purpose::STANDARD
        .decode(blob)
        .map_err(|e| AppError::Encryption(format!("Invalid blob encoding: {}", e)))?;

    if packed.len() <= NONCE_SIZE {
        return Err(AppError::Encryption("Blob too short".to_string()));
    }

    let (ciphertext, nonce_bytes) = packed.split_at(packed.len() - NONCE_SIZE);
    let nonce_arr: [u8; NONCE_SIZE] = nonce_bytes
        .try_into()
        .map_err(|_| AppError::Encryption("Invalid nonce size".to_string()))?;
    let nonce = Nonce::from(nonce_arr);

    let cipher = Aes256Gcm::new(key.as_bytes().into());
    cipher
        .decrypt(&nonce, ciphertext)
        .map_err(|e| AppError::Encryption(format!("Decryption failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(byte: u8) -> SecureKey {
        SecureKey::new([byte; KEY_SIZE])
    }

    #[test]
    fn seal_open_round_trip() {
        let k = key(7);
        let blob = seal(&k, b"laboratory").unwrap();
        assert_eq!(open(&k, &blob).unwrap(), b"laboratory");
    }

    #[test]
    fn open_fails_closed_under_a_different_key() {
        let blob = seal(&key(7), b"laboratory").unwrap();
        assert!(open(&key(8), &blob).is_err());
    }

    #[test]
    fn open_rejects_garbage() {
        assert!(open(&key(7), "not base64 at all!").is_err());
        assert!(open(&key(7), "QUJD").is_err());
    }
}
