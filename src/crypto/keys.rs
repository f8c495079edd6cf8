//! Key derivation helpers.
//!
//! - HKDF-SHA256 derives a unique **per-item** key from an enrollment
//!   wrapping key, so every biometric item is sealed independently.
//! - ANSI X9.63 KDF (SHA-256) turns an ECDH shared secret into the
//!   symmetric key and IV used by ECIES.

use hkdf::Hkdf;
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, Zeroizing};

use crate::errors::{Result, VaultError};

/// Length of derived item keys (256 bits).
pub const KEY_LEN: usize = 32;

/// Derive a per-item encryption key from a wrapping key.
///
/// `info` is set to `"secure-vault-item:<service>:<account>"` to bind the
/// derived key to one item address.
pub fn derive_item_key(wrapping_key: &[u8], service: &str, account: &str) -> Result<Zeroizing<[u8; KEY_LEN]>> {
    let info = format!("secure-vault-item:{service}:{account}");
    let hk = Hkdf::<Sha256>::new(None, wrapping_key);

    let mut okm = Zeroizing::new([0u8; KEY_LEN]);
    hk.expand(info.as_bytes(), &mut okm[..])
        .map_err(|e| VaultError::KeyDerivationFailed(format!("HKDF expand failed: {e}")))?;

    Ok(okm)
}

/// ANSI X9.63 key derivation with SHA-256.
///
/// `K = Hash(Z || counter || shared_info)` for counter = 1, 2, ...
/// (32-bit big-endian), concatenated and truncated to `out.len()`.
pub fn x963_kdf(shared_secret: &[u8], shared_info: &[u8], out: &mut [u8]) {
    let mut counter: u32 = 1;
    for chunk in out.chunks_mut(32) {
        let mut hasher = Sha256::new();
        hasher.update(shared_secret);
        hasher.update(counter.to_be_bytes());
        hasher.update(shared_info);
        let mut block = hasher.finalize();
        chunk.copy_from_slice(&block[..chunk.len()]);
        block.as_mut_slice().zeroize();
        counter += 1;
    }
}

/// A 32-byte wrapping key that zeroes its memory when dropped.
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct WrappingKey {
    bytes: [u8; KEY_LEN],
}

impl WrappingKey {
    /// Fill a new key from the thread-local CSPRNG.
    pub fn random() -> Self {
        use rand::RngCore;
        let mut bytes = [0u8; KEY_LEN];
        rand::rng().fill_bytes(&mut bytes);
        Self { bytes }
    }

    /// Derive the sealing key for one item address.
    pub fn derive_item_key(&self, service: &str, account: &str) -> Result<Zeroizing<[u8; KEY_LEN]>> {
        derive_item_key(&self.bytes, service, account)
    }
}

impl std::fmt::Debug for WrappingKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("WrappingKey([REDACTED])")
    }
}
