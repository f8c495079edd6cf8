//! Integration tests for secure-element key pairs.

mod common;

use std::sync::Arc;
use std::thread;

use common::{enrolled_fixture, fixture, fixture_with, reenrolling_fixture, test_settings};
use secure_vault::authority::BiometricResponse;
use secure_vault::crypto::{seal, PublicKeyBytes, PUBLIC_KEY_LEN};
use secure_vault::{
    AuthenticationContext, AuthorityError, IdentifierLocks, KeyGenerationError, Settings, Vault,
    VaultError,
};

// ---------------------------------------------------------------------------
// Generate / load / export
// ---------------------------------------------------------------------------

#[test]
fn load_and_export_match_generate() {
    let f = fixture();
    let keys = f.vault.keys();

    let generated = keys.generate("signing", false).unwrap();
    assert!(!generated.requires_biometry());
    assert_eq!(generated.identifier(), "signing");

    let loaded = keys.load("signing").expect("key was just generated");
    assert_eq!(keys.export_public_key(&loaded), keys.export_public_key(&generated));

    let exported = keys.export_public_key(&generated);
    assert_eq!(exported.as_bytes().len(), PUBLIC_KEY_LEN);
    assert_eq!(exported.as_bytes()[0], 0x04);
    assert!(PublicKeyBytes::from_sec1(exported.as_bytes()).is_ok());
}

#[test]
fn regenerating_supersedes_the_old_key() {
    let f = fixture();
    let keys = f.vault.keys();

    let first = keys.generate("k", false).unwrap();
    let second = keys.generate("k", false).unwrap();
    assert_ne!(first.public_key(), second.public_key());

    let loaded = keys.load("k").unwrap();
    assert_eq!(loaded.public_key(), second.public_key());

    let sealed = seal(first.public_key(), b"for the old key").unwrap();
    let err = keys.decrypt(&first, &sealed, None, None).unwrap_err();
    assert!(matches!(err, VaultError::Authority(AuthorityError::NotFound)));
}

#[test]
fn remove_of_missing_key_is_silent() {
    let f = fixture();
    f.vault.keys().remove("never-generated");
    assert!(f.vault.keys().load("never-generated").is_none());

    let _ = f.vault.keys().generate("k", false).unwrap();
    f.vault.keys().remove("k");
    assert!(f.vault.keys().load("k").is_none());
}

// ---------------------------------------------------------------------------
// Private key use
// ---------------------------------------------------------------------------

#[test]
fn sealed_message_opens_inside_the_authority() {
    let f = fixture();
    let handle = f.vault.keys().generate("transport", false).unwrap();
    let public = f.vault.keys().export_public_key(&handle);

    let sealed = seal(&public, b"session key material").unwrap();
    let plain = f.vault.keys().decrypt(&handle, &sealed, None, None).unwrap();
    assert_eq!(plain.as_slice(), b"session key material");
    assert_eq!(f.ui.prompts(), 0);
}

#[test]
fn tampered_message_is_a_crypto_error() {
    let f = fixture();
    let handle = f.vault.keys().generate("transport", false).unwrap();

    let mut sealed = seal(handle.public_key(), b"payload").unwrap();
    let last = sealed.len() - 1;
    sealed[last] ^= 0x01;

    let err = f.vault.keys().decrypt(&handle, &sealed, None, None).unwrap_err();
    assert!(matches!(err, VaultError::Authority(AuthorityError::Crypto(_))));
}

#[test]
fn biometry_bound_key_requires_a_match() {
    let f = enrolled_fixture();
    let keys = f.vault.keys();
    let handle = keys.generate("wallet", true).unwrap();
    assert!(handle.requires_biometry());
    let sealed = seal(handle.public_key(), b"secret").unwrap();

    f.ui.answer_biometry(BiometricResponse::Matched);
    let plain = keys.decrypt(&handle, &sealed, None, Some("Sign in")).unwrap();
    assert_eq!(plain.as_slice(), b"secret");
    assert_eq!(f.ui.last_prompt().as_deref(), Some("Sign in"));

    let empty = AuthenticationContext::new();
    let err = keys.decrypt(&handle, &sealed, Some(&empty), None).unwrap_err();
    assert!(matches!(
        err,
        VaultError::Authority(AuthorityError::InteractionNotAllowed)
    ));
    assert_eq!(f.ui.biometric_prompts(), 1);
}

#[test]
fn enrollment_change_invalidates_biometry_bound_keys_only() {
    let f = enrolled_fixture();
    let keys = f.vault.keys();
    let _ = keys.generate("bound", true).unwrap();
    let _ = keys.generate("plain", false).unwrap();

    f.authority.enroll_biometry();
    assert!(keys.load("bound").is_none());
    assert!(keys.load("plain").is_some());
}

#[test]
fn enrollment_change_during_prompt_keeps_key_sealed() {
    let (_authority, vault) = reenrolling_fixture();
    let handle = vault.keys().generate("wallet", true).unwrap();
    let sealed = seal(handle.public_key(), b"secret").unwrap();

    let err = vault.keys().decrypt(&handle, &sealed, None, Some("Sign in")).unwrap_err();
    assert!(matches!(err, VaultError::Authority(AuthorityError::AuthFailed)));
    assert!(vault.keys().load("wallet").is_none());
}

// ---------------------------------------------------------------------------
// Generation failures
// ---------------------------------------------------------------------------

#[test]
fn biometry_bound_key_needs_enrollment() {
    let f = fixture();
    assert_eq!(
        f.vault.keys().generate("wallet", true),
        Err(KeyGenerationError::BiometryUnavailable)
    );
}

#[test]
fn missing_secure_element_is_reported() {
    let f = fixture_with(|auth| auth.with_secure_hardware(false));
    assert_eq!(
        f.vault.keys().generate("k", false),
        Err(KeyGenerationError::HardwareUnavailable)
    );
    assert!(f.vault.keys().load("k").is_none());
}

#[test]
fn empty_identifier_is_invalid() {
    let f = fixture();
    assert!(matches!(
        f.vault.keys().generate("", false),
        Err(KeyGenerationError::InvalidParameters(_))
    ));
    assert!(f.vault.keys().load("").is_none());
    f.vault.keys().remove("");
}

// ---------------------------------------------------------------------------
// Namespacing and concurrency
// ---------------------------------------------------------------------------

#[test]
fn namespaces_isolate_keys_on_one_authority() {
    let f = fixture();
    let other_settings = Settings {
        service_namespace: "another-app".to_string(),
        ..test_settings()
    };
    let other = Vault::new(f.authority.clone(), &other_settings);

    let _ = f.vault.keys().generate("k", false).unwrap();
    assert!(other.keys().load("k").is_none());

    let _ = other.keys().generate("k", false).unwrap();
    assert_ne!(
        f.vault.keys().load("k").unwrap().public_key(),
        other.keys().load("k").unwrap().public_key()
    );
}

#[test]
fn locked_regeneration_leaves_one_loadable_key() {
    let f = fixture();
    let vault = Arc::new(f.vault);
    let locks = Arc::new(IdentifierLocks::new());

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let vault = Arc::clone(&vault);
            let locks = Arc::clone(&locks);
            thread::spawn(move || locks.with("shared", || vault.keys().generate("shared", false)))
        })
        .collect();
    for h in handles {
        assert!(h.join().unwrap().is_ok());
    }

    let loaded = vault.keys().load("shared").unwrap();
    let sealed = seal(loaded.public_key(), b"still works").unwrap();
    assert!(vault.keys().decrypt(&loaded, &sealed, None, None).is_ok());
}
