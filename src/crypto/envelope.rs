//! Password-sealed item envelope.
//!
//! A `PasswordEnvelope` is what a password-gated item looks like at rest:
//! the Argon2id salt and parameters, plus the AES-256-GCM blob.  It
//! serializes to JSON with base64 byte fields so text-only backends (the
//! OS keyring) can hold it.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use super::encryption::{decrypt, encrypt};
use super::kdf::{derive_password_key, generate_salt, Argon2Params};
use crate::errors::{Result, VaultError};

/// Current envelope format version.
pub const ENVELOPE_VERSION: u8 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordEnvelope {
    pub version: u8,

    #[serde(serialize_with = "base64_encode", deserialize_with = "base64_decode")]
    pub salt: Vec<u8>,

    pub kdf: Argon2Params,

    #[serde(serialize_with = "base64_encode", deserialize_with = "base64_decode")]
    pub ciphertext: Vec<u8>,
}

impl PasswordEnvelope {
    /// Seal `payload` under a fresh salt and a key derived from `password`.
    pub fn seal(password: &[u8], payload: &[u8], aad: &[u8], params: &Argon2Params) -> Result<Self> {
        let salt = generate_salt();
        let key = derive_password_key(password, &salt, params)?;
        let ciphertext = encrypt(&key[..], payload, aad)?;

        Ok(Self {
            version: ENVELOPE_VERSION,
            salt: salt.to_vec(),
            kdf: *params,
            ciphertext,
        })
    }

    /// Open the envelope.  A wrong password surfaces as `DecryptionFailed`.
    pub fn open(&self, password: &[u8], aad: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        if self.version != ENVELOPE_VERSION {
            return Err(VaultError::SerializationError(format!(
                "unsupported envelope version {}",
                self.version
            )));
        }
        let key = derive_password_key(password, &self.salt, &self.kdf)?;
        decrypt(&key[..], &self.ciphertext, aad)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| VaultError::SerializationError(e.to_string()))
    }

    pub fn from_json(s: &str) -> Result<Self> {
        serde_json::from_str(s).map_err(|e| VaultError::SerializationError(e.to_string()))
    }
}

/// Associated data binding a sealed blob to its item address.
pub fn item_aad(service: &str, account: &str) -> Vec<u8> {
    format!("{service}:{account}").into_bytes()
}

// ---------------------------------------------------------------------------
// Serde helpers for base64-encoded Vec<u8> fields
// ---------------------------------------------------------------------------

fn base64_encode<S>(data: &[u8], serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&BASE64.encode(data))
}

fn base64_decode<'de, D>(deserializer: D) -> std::result::Result<Vec<u8>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    BASE64.decode(&s).map_err(serde::de::Error::custom)
}
