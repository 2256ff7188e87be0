// src/cipher.rs
//! Encryption-at-rest boundary for the `password` field.
//!
//! The repository seals passwords before they reach the record store and opens
//! them on the way out. `PlaintextCipher` is the default; `ChaChaCipher` keeps
//! ChaCha20Poly1305 ciphertext on disk under an Argon2id-derived key.

use crate::config::Argon2Params;
use crate::error::{CryptoError, CryptoResult};
use log;

use argon2::Argon2;
use chacha20poly1305::{
    aead::{Aead, NewAead, Payload},
    ChaCha20Poly1305, Nonce,
};
use hex;
use rand::rngs::OsRng;
use rand::RngCore;

const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;
const KEY_LEN: usize = 32;

/// Prefix of every value produced by `ChaChaCipher::seal`.
pub const SEALED_PREFIX: &str = "enc:v1:";

pub trait SecretCipher: Send + Sync {
    /// Turns a plaintext secret into its at-rest form.
    fn seal(&self, plaintext: &str) -> CryptoResult<String>;
    /// Recovers the plaintext from an at-rest value.
    fn open(&self, stored: &str) -> CryptoResult<String>;
}

pub fn is_sealed(stored: &str) -> bool {
    stored.starts_with(SEALED_PREFIX)
}

/// Stores secrets as given.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlaintextCipher;

impl SecretCipher for PlaintextCipher {
    fn seal(&self, plaintext: &str) -> CryptoResult<String> {
        Ok(plaintext.to_string())
    }

    fn open(&self, stored: &str) -> CryptoResult<String> {
        if is_sealed(stored) {
            log::warn!("Encountered a sealed secret but no passphrase is configured.");
            return Err(CryptoError::Locked);
        }
        Ok(stored.to_string())
    }
}

pub struct ChaChaCipher {
    passphrase: String,
    params: Argon2Params,
    salt: [u8; SALT_LEN],
    key: [u8; KEY_LEN],
}

impl std::fmt::Debug for ChaChaCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChaChaCipher")
            .field("salt", &hex::encode(self.salt))
            .finish_non_exhaustive()
    }
}

impl ChaChaCipher {
    /// Derives the instance key over a fresh random salt.
    pub fn new(passphrase: &str, params: &Argon2Params) -> CryptoResult<Self> {
        let salt = generate_salt();
        let key = derive_key(passphrase, &salt, params)?;
        Ok(Self {
            passphrase: passphrase.to_string(),
            params: params.clone(),
            salt,
            key,
        })
    }

    fn key_for(&self, salt: &[u8; SALT_LEN]) -> CryptoResult<[u8; KEY_LEN]> {
        if *salt == self.salt {
            return Ok(self.key);
        }
        derive_key(&self.passphrase, salt, &self.params)
    }
}

impl SecretCipher for ChaChaCipher {
    fn seal(&self, plaintext: &str) -> CryptoResult<String> {
        let nonce = generate_nonce();
        let ciphertext = encrypt_data(plaintext.as_bytes(), &self.key, &nonce)?;
        Ok(format!(
            "{}{}:{}:{}",
            SEALED_PREFIX,
            hex::encode(self.salt),
            hex::encode(nonce),
            hex::encode(ciphertext)
        ))
    }

    fn open(&self, stored: &str) -> CryptoResult<String> {
        let Some(body) = stored.strip_prefix(SEALED_PREFIX) else {
            // Written before encryption was enabled.
            return Ok(stored.to_string());
        };

        let mut parts = body.splitn(3, ':');
        let (Some(salt_hex), Some(nonce_hex), Some(ct_hex)) = (parts.next(), parts.next(), parts.next()) else {
            return Err(CryptoError::Malformed("expected salt:nonce:ciphertext".to_string()));
        };

        let salt: [u8; SALT_LEN] = decode_fixed(salt_hex)?;
        let nonce: [u8; NONCE_LEN] = decode_fixed(nonce_hex)?;
        let ciphertext = hex::decode(ct_hex).map_err(|e| CryptoError::HexDecoding(e.to_string()))?;

        let key = self.key_for(&salt)?;
        let plaintext = decrypt_data(&ciphertext, &key, &nonce)?;
        String::from_utf8(plaintext)
            .map_err(|e| CryptoError::Malformed(format!("plaintext is not UTF-8: {}", e)))
    }
}

fn decode_fixed<const N: usize>(hex_str: &str) -> CryptoResult<[u8; N]> {
    let bytes = hex::decode(hex_str).map_err(|e| CryptoError::HexDecoding(e.to_string()))?;
    bytes.try_into().map_err(|_| CryptoError::InvalidLength)
}

/// Encrypts data using ChaCha20Poly1305.
pub fn encrypt_data(data: &[u8], key_bytes: &[u8; KEY_LEN], nonce_bytes: &[u8; NONCE_LEN]) -> CryptoResult<Vec<u8>> {
    let cipher = ChaCha20Poly1305::new(key_bytes.into());
    let nonce = Nonce::from_slice(nonce_bytes);

    cipher.encrypt(nonce, Payload { msg: data, aad: &[] })
        .map_err(|e| {
            let msg = format!("Encryption failed: {}", e);
            log::error!("encrypt_data: {}", msg);
            CryptoError::ChaCha(msg)
        })
}

/// Decrypts data using ChaCha20Poly1305.
pub fn decrypt_data(encrypted_data: &[u8], key_bytes: &[u8; KEY_LEN], nonce_bytes: &[u8; NONCE_LEN]) -> CryptoResult<Vec<u8>> {
    let cipher = ChaCha20Poly1305::new(key_bytes.into());
    let nonce = Nonce::from_slice(nonce_bytes);

    cipher.decrypt(nonce, Payload { msg: encrypted_data, aad: &[] })
        .map_err(|e| {
            // Wrong passphrase and tampered data look the same here.
            let msg = format!("Decryption failed (key/nonce/data mismatch?): {}", e);
            log::warn!("decrypt_data: {}", msg);
            CryptoError::ChaCha(msg)
        })
}

fn generate_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    salt
}

fn generate_nonce() -> [u8; NONCE_LEN] {
    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);
    nonce
}

/// Derives a 32-byte key from a passphrase and salt using Argon2id.
pub fn derive_key(passphrase: &str, salt: &[u8], argon2_config: &Argon2Params) -> CryptoResult<[u8; KEY_LEN]> {
    let params = argon2::Params::new(argon2_config.m_cost, argon2_config.t_cost, argon2_config.p_cost, Some(KEY_LEN))
        .map_err(|e| {
            let msg = format!("Argon2 params error for key derivation: {}", e);
            log::error!("derive_key: {}", msg);
            CryptoError::Argon2(msg)
        })?;
    let argon2 = Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params);

    let mut key_bytes = [0u8; KEY_LEN];
    argon2.hash_password_into(passphrase.as_bytes(), salt, &mut key_bytes)
        .map_err(|e| {
            let msg = format!("Key derivation failed: {}", e);
            log::error!("derive_key: {}", msg);
            CryptoError::Argon2(msg)
        })?;

    Ok(key_bytes)
}
