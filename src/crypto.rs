use aes_gcm::aead::{rand_core::RngCore, Aead, OsRng};
use aes_gcm::{Aes256Gcm, KeyInit, Nonce};
use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use pbkdf2::pbkdf2_hmac;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::error::StorageError;

pub const DEFAULT_PBKDF2_ITERATIONS: u32 = 200_000;
const ENVELOPE_VERSION: u8 = 1;
const TAG_LEN: usize = 16;
const IV_LEN: usize = 12;
const SALT_LEN: usize = 16;

/// Sealed value as it sits on disk. Tag and ciphertext are kept apart so the
/// layout matches what WebCrypto-style readers expect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CryptoEnvelope {
    pub v: u8,
    pub salt: String,
    pub iv: String,
    pub tag: String,
    pub data: String,
    #[serde(default = "default_pbkdf2_iterations")]
    pub iterations: u32,
}

fn default_pbkdf2_iterations() -> u32 {
    DEFAULT_PBKDF2_ITERATIONS
}

pub fn fresh_salt() -> Vec<u8> {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    salt.to_vec()
}

pub fn derive_key(passphrase: &str, salt: &[u8], iterations: u32) -> [u8; 32] {
    let mut key = [0u8; 32];
    pbkdf2_hmac::<Sha256>(passphrase.as_bytes(), salt, iterations.max(1), &mut key);
    key
}

pub fn seal(
    text: &str,
    salt: &[u8],
    key: &[u8; 32],
    iterations: u32,
) -> Result<CryptoEnvelope, StorageError> {
    let mut iv = [0u8; IV_LEN];
    OsRng.fill_bytes(&mut iv);
    let cipher = Aes256Gcm::new_from_slice(key.as_slice())
        .map_err(|err| StorageError::Crypto(err.to_string()))?;
    let nonce = Nonce::from_slice(&iv);
    let encrypted = cipher
        .encrypt(nonce, text.as_bytes())
        .map_err(|err| StorageError::Crypto(err.to_string()))?;

    if encrypted.len() < TAG_LEN {
        return Err(StorageError::Crypto("encryption output too short".to_string()));
    }
    let (data, tag) = encrypted.split_at(encrypted.len() - TAG_LEN);

    Ok(CryptoEnvelope {
        v: ENVELOPE_VERSION,
        salt: encode_b64(salt),
        iv: encode_b64(&iv),
        tag: encode_b64(tag),
        data: encode_b64(data),
        iterations: iterations.max(1),
    })
}

pub fn open(envelope: &CryptoEnvelope, key: &[u8; 32]) -> Result<String, StorageError> {
    let iv = decode_b64(envelope.iv.as_str())?;
    let tag = decode_b64(envelope.tag.as_str())?;
    let data = decode_b64(envelope.data.as_str())?;
    if iv.len() != IV_LEN || tag.len() != TAG_LEN {
        return Err(StorageError::Decrypt);
    }

    let cipher = Aes256Gcm::new_from_slice(key.as_slice())
        .map_err(|err| StorageError::Crypto(err.to_string()))?;
    let nonce = Nonce::from_slice(iv.as_slice());
    let mut combined = Vec::with_capacity(data.len() + tag.len());
    combined.extend_from_slice(data.as_slice());
    combined.extend_from_slice(tag.as_slice());

    let decrypted = cipher
        .decrypt(nonce, combined.as_slice())
        .map_err(|_| StorageError::Decrypt)?;
    String::from_utf8(decrypted).map_err(|_| StorageError::Decrypt)
}

pub fn envelope_salt(envelope: &CryptoEnvelope) -> Result<Vec<u8>, StorageError> {
    let salt = decode_b64(envelope.salt.as_str())?;
    if salt.is_empty() {
        return Err(StorageError::Decrypt);
    }
    Ok(salt)
}

fn decode_b64(value: &str) -> Result<Vec<u8>, StorageError> {
    B64.decode(value).map_err(|_| StorageError::Decrypt)
}

fn encode_b64(bytes: &[u8]) -> String {
    B64.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FAST: u32 = 1_000;

    #[test]
    fn sealed_text_opens_with_the_same_key() {
        let salt = fresh_salt();
        let key = derive_key("hunter2", &salt, FAST);
        let envelope = seal("[]", &salt, &key, FAST).unwrap();
        assert_eq!(envelope.v, 1);
        assert_eq!(envelope.iterations, FAST);
        assert_eq!(envelope_salt(&envelope).unwrap(), salt);
        assert_eq!(open(&envelope, &key).unwrap(), "[]");
    }

    #[test]
    fn wrong_passphrase_fails_to_open() {
        let salt = fresh_salt();
        let key = derive_key("hunter2", &salt, FAST);
        let envelope = seal("secret", &salt, &key, FAST).unwrap();
        let wrong = derive_key("hunter3", &salt, FAST);
        assert!(matches!(open(&envelope, &wrong), Err(StorageError::Decrypt)));
    }

    #[test]
    fn tampered_data_fails_to_open() {
        let salt = fresh_salt();
        let key = derive_key("pw", &salt, FAST);
        let mut envelope = seal("some longer secret text", &salt, &key, FAST).unwrap();
        envelope.data = encode_b64(b"not the ciphertext at all");
        assert!(matches!(open(&envelope, &key), Err(StorageError::Decrypt)));
    }

    #[test]
    fn envelope_without_iterations_uses_default() {
        let raw = r#"{"v":1,"salt":"AA==","iv":"AA==","tag":"AA==","data":"AA=="}"#;
        let envelope: CryptoEnvelope = serde_json::from_str(raw).unwrap();
        assert_eq!(envelope.iterations, DEFAULT_PBKDF2_ITERATIONS);
    }
}
