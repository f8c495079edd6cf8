//! Exported public half of a secure-element key pair.

use p256::elliptic_curve::sec1::ToEncodedPoint;
use p256::PublicKey;

use crate::errors::{Result, VaultError};

/// Length of an uncompressed SEC1 P-256 point: `0x04 || X || Y`.
pub const PUBLIC_KEY_LEN: usize = 65;

/// A P-256 public key in uncompressed SEC1 encoding.
///
/// The bytes are always a valid curve point; construction validates them.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct PublicKeyBytes([u8; PUBLIC_KEY_LEN]);

impl PublicKeyBytes {
    /// Parse and validate an uncompressed SEC1 point.
    pub fn from_sec1(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != PUBLIC_KEY_LEN || bytes[0] != 0x04 {
            return Err(VaultError::InvalidPublicKey(format!(
                "expected {PUBLIC_KEY_LEN}-byte uncompressed point, got {} bytes",
                bytes.len()
            )));
        }
        PublicKey::from_sec1_bytes(bytes)
            .map_err(|e| VaultError::InvalidPublicKey(format!("not a P-256 point: {e}")))?;

        let mut out = [0u8; PUBLIC_KEY_LEN];
        out.copy_from_slice(bytes);
        Ok(Self(out))
    }

    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_LEN] {
        &self.0
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.0.to_vec()
    }

    pub(crate) fn to_public_key(&self) -> Result<PublicKey> {
        PublicKey::from_sec1_bytes(&self.0)
            .map_err(|e| VaultError::InvalidPublicKey(format!("not a P-256 point: {e}")))
    }
}

impl From<&PublicKey> for PublicKeyBytes {
    fn from(key: &PublicKey) -> Self {
        let point = key.to_encoded_point(false);
        let mut out = [0u8; PUBLIC_KEY_LEN];
        out.copy_from_slice(point.as_bytes());
        Self(out)
    }
}

impl AsRef<[u8]> for PublicKeyBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Debug for PublicKeyBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PublicKeyBytes(")?;
        for b in &self.0[..8] {
            write!(f, "{b:02x}")?;
        }
        write!(f, "..)")
    }
}
