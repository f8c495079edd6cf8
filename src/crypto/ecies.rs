//! ECIES over P-256 for secure-element keys.
//!
//! Construction (cofactor ECDH, variable IV, X9.63 KDF with SHA-256,
//! AES-GCM):
//!
//! 1. Generate an ephemeral P-256 key pair and compute the ECDH shared
//!    secret `Z` with the recipient's public key.
//! 2. Run X9.63-KDF(SHA-256) over `Z` with the ephemeral public point as
//!    shared info, producing 32 bytes: a 16-byte AES-128 key followed by
//!    a 16-byte GCM IV.
//! 3. Encrypt with AES-128-GCM (no associated data).
//!
//! Output layout:
//!   [ 65-byte ephemeral point | ciphertext | 16-byte tag ]
//!
//! Anyone holding the exported public key can `seal`; only the authority
//! holding the private half can `open`.

use aes_gcm::aead::consts::U16;
use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::aes::Aes128;
use aes_gcm::{AesGcm, Nonce};
use p256::ecdh::EphemeralSecret;
use p256::{PublicKey, SecretKey};
use zeroize::Zeroizing;

use super::keys::x963_kdf;
use super::public_key::{PublicKeyBytes, PUBLIC_KEY_LEN};
use crate::errors::{Result, VaultError};

type EciesCipher = AesGcm<Aes128, U16>;

const AES_KEY_LEN: usize = 16;
const IV_LEN: usize = 16;
const TAG_LEN: usize = 16;

/// Encrypt `plaintext` to the holder of `recipient`'s private key.
pub fn seal(recipient: &PublicKeyBytes, plaintext: &[u8]) -> Result<Vec<u8>> {
    let recipient = recipient.to_public_key()?;

    let ephemeral = EphemeralSecret::random(&mut OsRng);
    let ephemeral_point = PublicKeyBytes::from(&ephemeral.public_key());
    let shared = ephemeral.diffie_hellman(&recipient);

    let ciphertext = aead_seal(
        shared.raw_secret_bytes().as_slice(),
        ephemeral_point.as_bytes(),
        plaintext,
    )?;

    let mut out = Vec::with_capacity(PUBLIC_KEY_LEN + ciphertext.len());
    out.extend_from_slice(ephemeral_point.as_bytes());
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Decrypt a `seal` output with the recipient's private key.
pub(crate) fn open(recipient: &SecretKey, sealed: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
    if sealed.len() < PUBLIC_KEY_LEN + TAG_LEN {
        return Err(VaultError::DecryptionFailed);
    }
    let (point, ciphertext) = sealed.split_at(PUBLIC_KEY_LEN);
    let ephemeral = PublicKey::from_sec1_bytes(point).map_err(|_| VaultError::DecryptionFailed)?;

    let shared = p256::ecdh::diffie_hellman(recipient.to_nonzero_scalar(), ephemeral.as_affine());
    aead_open(shared.raw_secret_bytes().as_slice(), point, ciphertext)
}

fn derive_key_iv(shared_secret: &[u8], shared_info: &[u8]) -> Zeroizing<[u8; AES_KEY_LEN + IV_LEN]> {
    let mut material = Zeroizing::new([0u8; AES_KEY_LEN + IV_LEN]);
    x963_kdf(shared_secret, shared_info, &mut material[..]);
    material
}

fn aead_seal(shared_secret: &[u8], shared_info: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
    let material = derive_key_iv(shared_secret, shared_info);
    let (key, iv) = material.split_at(AES_KEY_LEN);

    let cipher = EciesCipher::new_from_slice(key)
        .map_err(|e| VaultError::EncryptionFailed(format!("invalid key length: {e}")))?;
    cipher
        .encrypt(Nonce::<U16>::from_slice(iv), plaintext)
        .map_err(|e| VaultError::EncryptionFailed(format!("encryption error: {e}")))
}

fn aead_open(shared_secret: &[u8], shared_info: &[u8], ciphertext: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
    let material = derive_key_iv(shared_secret, shared_info);
    let (key, iv) = material.split_at(AES_KEY_LEN);

    let cipher = EciesCipher::new_from_slice(key).map_err(|_| VaultError::DecryptionFailed)?;
    let plaintext = cipher
        .decrypt(Nonce::<U16>::from_slice(iv), ciphertext)
        .map_err(|_| VaultError::DecryptionFailed)?;

    Ok(Zeroizing::new(plaintext))
}
