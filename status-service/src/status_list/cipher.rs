//! # Symmetric Cipher Wrapper
//!
//! AES-256-GCM with a random 96-bit nonce. Frames are `nonce || ciphertext`
//! where the ciphertext carries the 16-byte authentication tag.
//!
//! Keys are owned by the caller; the service never generates or persists
//! them outside of tests and tooling.

use std::fmt;

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use rand::rngs::OsRng;
use rand::RngCore;

use shared::constants::{CIPHER_NONCE_LEN, CIPHER_TAG_LEN, SYMMETRIC_KEY_LEN};
use shared::error::{StatusError, StatusResult};

/// 256-bit symmetric key
#[derive(Clone, PartialEq, Eq)]
pub struct SymmetricKey([u8; SYMMETRIC_KEY_LEN]);

impl SymmetricKey {
    /// Parse 64 hex characters, optionally `0x`-prefixed
    pub fn from_hex(input: &str) -> StatusResult<Self> {
        let trimmed = input.trim();
        let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);

        let bytes = hex::decode(digits)
            .map_err(|e| StatusError::InvalidKey(format!("key is not valid hex: {e}")))?;

        let key: [u8; SYMMETRIC_KEY_LEN] = bytes.try_into().map_err(|bytes: Vec<u8>| {
            StatusError::InvalidKey(format!(
                "expected {SYMMETRIC_KEY_LEN} bytes, got {}",
                bytes.len()
            ))
        })?;

        Ok(Self(key))
    }

    /// Random key, for tests and tooling
    pub fn generate() -> Self {
        let mut key = [0u8; SYMMETRIC_KEY_LEN];
        OsRng.fill_bytes(&mut key);
        Self(key)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn as_bytes(&self) -> &[u8; SYMMETRIC_KEY_LEN] {
        &self.0
    }
}

impl fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SymmetricKey(<redacted>)")
    }
}

/// Encrypt `plaintext`, returning `nonce || ciphertext`
pub fn encrypt(plaintext: &[u8], key: &SymmetricKey) -> StatusResult<Vec<u8>> {
    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| StatusError::InvalidKey(e.to_string()))?;

    let mut nonce_bytes = [0u8; CIPHER_NONCE_LEN];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|e| StatusError::EncodingError(format!("encryption failed: {e}")))?;

    let mut frame = Vec::with_capacity(CIPHER_NONCE_LEN + ciphertext.len());
    frame.extend_from_slice(&nonce_bytes);
    frame.extend_from_slice(&ciphertext);
    Ok(frame)
}

/// Decrypt a frame produced by [`encrypt`]
pub fn decrypt(frame: &[u8], key: &SymmetricKey) -> StatusResult<Vec<u8>> {
    if frame.len() < CIPHER_NONCE_LEN + CIPHER_TAG_LEN {
        return Err(StatusError::DecryptionError(format!(
            "ciphertext too short ({} bytes)",
            frame.len()
        )));
    }
    let (nonce_bytes, ciphertext) = frame.split_at(CIPHER_NONCE_LEN);

    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| StatusError::InvalidKey(e.to_string()))?;

    cipher
        .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
        .map_err(|_| StatusError::DecryptionError("wrong key or tampered ciphertext".into()))
}
