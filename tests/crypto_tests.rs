//! Integration tests for the secure-vault crypto module.

use aes_gcm::aead::consts::U16;
use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::aes::Aes128;
use aes_gcm::{AesGcm, Nonce};
use p256::SecretKey;

use secure_vault::crypto::envelope::item_aad;
use secure_vault::crypto::{
    decrypt, derive_password_key, encrypt, generate_salt, seal, x963_kdf, Argon2Params,
    PasswordEnvelope, PublicKeyBytes, WrappingKey, PUBLIC_KEY_LEN,
};
use secure_vault::VaultError;

// ---------------------------------------------------------------------------
// Item encryption
// ---------------------------------------------------------------------------

#[test]
fn encrypt_decrypt_roundtrip() {
    let key = [0xABu8; 32];
    let plaintext = b"DATABASE_URL=postgres://localhost/mydb";

    let ciphertext = encrypt(&key, plaintext, b"svc:acct").expect("encrypt should succeed");

    // 12-byte nonce + 16-byte tag.
    assert_eq!(ciphertext.len(), plaintext.len() + 28);

    let recovered = decrypt(&key, &ciphertext, b"svc:acct").expect("decrypt should succeed");
    assert_eq!(recovered.as_slice(), plaintext);
}

#[test]
fn ciphertext_is_bound_to_its_address() {
    let key = [0x11u8; 32];
    let ciphertext = encrypt(&key, b"TOP_SECRET=42", b"svc:a").expect("encrypt");
    assert!(decrypt(&key, &ciphertext, b"svc:b").is_err());
}

#[test]
fn decrypt_with_truncated_data_fails() {
    let key = [0xAAu8; 32];
    assert!(decrypt(&key, &[0u8; 5], b"").is_err());
}

// ---------------------------------------------------------------------------
// Password derivation and envelopes
// ---------------------------------------------------------------------------

#[test]
fn password_key_depends_on_password_and_salt() {
    let params = Argon2Params::minimum();
    let salt = generate_salt();

    let a = derive_password_key(b"pw1", &salt, &params).unwrap();
    let b = derive_password_key(b"pw2", &salt, &params).unwrap();
    let c = derive_password_key(b"pw1", &generate_salt(), &params).unwrap();
    assert_ne!(*a, *b);
    assert_ne!(*a, *c);
}

#[test]
fn weak_params_are_refused() {
    let params = Argon2Params {
        memory_kib: 1_024,
        ..Argon2Params::minimum()
    };
    let result = derive_password_key(b"pw", &generate_salt(), &params);
    assert!(matches!(result, Err(VaultError::KeyDerivationFailed(_))));
}

#[test]
fn envelope_survives_json_storage() {
    let aad = item_aad("secure-vault.password", "token");
    let envelope =
        PasswordEnvelope::seal(b"pw1", b"secret-bytes", &aad, &Argon2Params::minimum()).unwrap();

    let json = envelope.to_json().unwrap();
    let restored = PasswordEnvelope::from_json(&json).unwrap();

    assert_eq!(restored.open(b"pw1", &aad).unwrap().as_slice(), b"secret-bytes");
    assert!(matches!(
        restored.open(b"pw2", &aad),
        Err(VaultError::DecryptionFailed)
    ));
}

#[test]
fn item_keys_are_stable_per_wrapping_key() {
    let wrapping = WrappingKey::random();
    let a = wrapping.derive_item_key("svc", "acct").unwrap();
    let b = wrapping.derive_item_key("svc", "acct").unwrap();
    assert_eq!(*a, *b);
}

// ---------------------------------------------------------------------------
// ECIES
// ---------------------------------------------------------------------------

/// Open a sealed message from first principles, following the wire
/// layout: ephemeral point, then AES-128-GCM ciphertext and tag, with
/// key and IV from X9.63-KDF(SHA-256) over the shared secret.
fn open_independently(recipient: &SecretKey, sealed: &[u8]) -> Vec<u8> {
    let (point, ciphertext) = sealed.split_at(PUBLIC_KEY_LEN);
    let ephemeral = p256::PublicKey::from_sec1_bytes(point).unwrap();
    let shared = p256::ecdh::diffie_hellman(recipient.to_nonzero_scalar(), ephemeral.as_affine());

    let mut material = [0u8; 32];
    x963_kdf(shared.raw_secret_bytes().as_slice(), point, &mut material);
    let (key, iv) = material.split_at(16);

    let cipher = AesGcm::<Aes128, U16>::new_from_slice(key).unwrap();
    cipher
        .decrypt(Nonce::<U16>::from_slice(iv), ciphertext)
        .unwrap()
}

#[test]
fn sealed_message_follows_the_standard_layout() {
    let recipient = SecretKey::random(&mut OsRng);
    let public = PublicKeyBytes::from(&recipient.public_key());

    let sealed = seal(&public, b"hello secure element").unwrap();
    assert_eq!(sealed.len(), PUBLIC_KEY_LEN + b"hello secure element".len() + 16);
    assert_eq!(sealed[0], 0x04);

    assert_eq!(open_independently(&recipient, &sealed), b"hello secure element");
}

#[test]
fn public_key_parsing_rejects_invalid_points() {
    assert!(PublicKeyBytes::from_sec1(&[0x04; PUBLIC_KEY_LEN]).is_err());
    assert!(PublicKeyBytes::from_sec1(&[0x02; 33]).is_err());
}
