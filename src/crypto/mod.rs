//! Cryptographic primitives for the vault.
//!
//! This module provides:
//! - AES-256-GCM sealing of items at rest (`encryption`)
//! - Argon2id password-based key derivation (`kdf`)
//! - HKDF per-item keys and the X9.63 KDF (`keys`)
//! - The password-sealed item envelope (`envelope`)
//! - P-256 public keys and ECIES (`public_key`, `ecies`)

pub mod ecies;
pub mod encryption;
pub mod envelope;
pub mod kdf;
pub mod keys;
pub mod public_key;

pub use ecies::seal;
pub use encryption::{decrypt, encrypt};
pub use envelope::PasswordEnvelope;
pub use kdf::{derive_password_key, generate_salt, Argon2Params};
pub use keys::{derive_item_key, x963_kdf, WrappingKey};
pub use public_key::{PublicKeyBytes, PUBLIC_KEY_LEN};
