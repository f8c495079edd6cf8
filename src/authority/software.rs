//! In-process secure storage authority.
//!
//! Stands in for an OS keystore plus secure element on a single device:
//!
//! - Password-gated items are sealed at rest in a `PasswordEnvelope`
//!   (Argon2id + AES-256-GCM); the password is the only way back in.
//! - Biometric-gated items are sealed under a per-item key derived from
//!   the current enrollment's wrapping key.  Changing the enrollment set
//!   rotates that key, and items bound to the old set are dropped the
//!   next time anyone touches them.
//! - Private keys are `p256::SecretKey` values that never leave this
//!   struct; callers only ever see `PrivateKeyRef` tokens.
//!
//! The device lock, biometric enrollment and lockout, and the presence of
//! a secure element are all switchable so callers can exercise every
//! policy path.  State sits behind one `Mutex`, which is never held while
//! a prompt is showing or a password is being stretched.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use aes_gcm::aead::OsRng;
use p256::SecretKey;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use super::{
    AccessRequest, EcCurve, Interaction, ItemQuery, KeyGenParams, KeyRecord, KeyToken, NewItem,
    PrivateKeyRef, SecureStorageAuthority,
};
use crate::config::Settings;
use crate::context::{AuthenticationContext, BiometricMatch};
use crate::crypto::envelope::item_aad;
use crate::crypto::{ecies, encryption, Argon2Params, PasswordEnvelope, PublicKeyBytes, WrappingKey};
use crate::errors::{AuthorityError, VaultError};
use crate::policy::{AccessControlPolicy, KeyAccessPolicy};

/// Consecutive failed biometric matches before biometry locks out.
pub const MAX_BIOMETRIC_FAILURES: u32 = 5;

// ------------------------------------------------------------------
// Interaction
// ------------------------------------------------------------------

/// Answer to a password prompt.
pub enum PasswordResponse {
    Provided(Zeroizing<String>),
    Cancelled,
}

/// Answer to a biometric prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BiometricResponse {
    Matched,
    NoMatch,
    Cancelled,
}

/// The user-facing side of the authority: shows prompts and blocks until
/// the user answers.
pub trait InteractionHandler: Send + Sync {
    fn request_password(&self, prompt: Option<&str>) -> PasswordResponse;
    fn request_biometry(&self, prompt: Option<&str>) -> BiometricResponse;
}

/// A handler with no UI: every prompt is cancelled.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoInteraction;

impl InteractionHandler for NoInteraction {
    fn request_password(&self, _prompt: Option<&str>) -> PasswordResponse {
        PasswordResponse::Cancelled
    }

    fn request_biometry(&self, _prompt: Option<&str>) -> BiometricResponse {
        BiometricResponse::Cancelled
    }
}

// ------------------------------------------------------------------
// Stored state
// ------------------------------------------------------------------

#[derive(Clone)]
enum Sealed {
    Password(PasswordEnvelope),
    Biometric {
        enrollment_generation: u64,
        ciphertext: Vec<u8>,
    },
}

#[derive(Clone)]
struct StoredItem {
    policy: AccessControlPolicy,
    sealed: Sealed,
}

struct StoredKey {
    serial: u64,
    secret: SecretKey,
    public: PublicKeyBytes,
    policy: KeyAccessPolicy,
    enrollment_generation: u64,
}

impl StoredKey {
    fn record(&self, tag: &str) -> KeyRecord {
        KeyRecord {
            private_key: PrivateKeyRef::new(tag, self.serial),
            public_key: self.public.clone(),
            policy: self.policy,
        }
    }
}

struct Biometry {
    enrolled: bool,
    generation: u64,
    wrapping_key: WrappingKey,
    failures: u32,
    locked_out: bool,
}

impl Biometry {
    fn rotate(&mut self, enrolled: bool) {
        self.enrolled = enrolled;
        self.generation += 1;
        self.wrapping_key = WrappingKey::random();
        self.failures = 0;
        self.locked_out = false;
    }
}

#[derive(Debug, Clone, Copy)]
struct BiometrySnapshot {
    enrolled: bool,
    generation: u64,
    locked_out: bool,
}

struct State {
    items: HashMap<(String, String), StoredItem>,
    keys: HashMap<String, StoredKey>,
    device_locked: bool,
    biometry: Biometry,
    next_serial: u64,
}

impl State {
    fn biometry_snapshot(&self) -> BiometrySnapshot {
        BiometrySnapshot {
            enrolled: self.biometry.enrolled,
            generation: self.biometry.generation,
            locked_out: self.biometry.locked_out,
        }
    }
}

// ------------------------------------------------------------------
// Authority
// ------------------------------------------------------------------

pub struct SoftwareAuthority {
    state: Mutex<State>,
    kdf: Argon2Params,
    secure_hardware: bool,
    interaction: Arc<dyn InteractionHandler>,
}

impl SoftwareAuthority {
    /// An unlocked device with a secure element, no biometric enrollment,
    /// and no UI.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                items: HashMap::new(),
                keys: HashMap::new(),
                device_locked: false,
                biometry: Biometry {
                    enrolled: false,
                    generation: 0,
                    wrapping_key: WrappingKey::random(),
                    failures: 0,
                    locked_out: false,
                },
                next_serial: 0,
            }),
            kdf: Argon2Params::default(),
            secure_hardware: true,
            interaction: Arc::new(NoInteraction),
        }
    }

    /// Take KDF parameters and secure-element availability from `settings`.
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new()
            .with_kdf_params(settings.argon2_params())
            .with_secure_hardware(settings.secure_hardware)
    }

    pub fn with_kdf_params(mut self, params: Argon2Params) -> Self {
        self.kdf = params;
        self
    }

    pub fn with_secure_hardware(mut self, available: bool) -> Self {
        self.secure_hardware = available;
        self
    }

    pub fn with_interaction(mut self, handler: Arc<dyn InteractionHandler>) -> Self {
        self.interaction = handler;
        self
    }

    // ------------------------------------------------------------------
    // Device simulation
    // ------------------------------------------------------------------

    pub fn set_device_locked(&self, locked: bool) {
        self.state().device_locked = locked;
        debug!(locked, "device lock state changed");
    }

    /// Replace the biometric enrollment set.  Everything bound to the
    /// previous set becomes unreadable.
    pub fn enroll_biometry(&self) {
        let mut st = self.state();
        st.biometry.rotate(true);
        info!(generation = st.biometry.generation, "biometric enrollment changed");
    }

    /// Remove every enrolled biometric factor.
    pub fn clear_biometry(&self) {
        let mut st = self.state();
        st.biometry.rotate(false);
        info!(generation = st.biometry.generation, "biometric enrollment cleared");
    }

    pub fn set_biometry_locked_out(&self, locked_out: bool) {
        let mut st = self.state();
        st.biometry.locked_out = locked_out;
        if !locked_out {
            st.biometry.failures = 0;
        }
    }

    pub fn is_biometry_locked_out(&self) -> bool {
        self.state().biometry.locked_out
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn device_locked(&self) -> bool {
        self.state().device_locked
    }

    /// The password for a password-gated access: from the context if it
    /// carries one, otherwise from a prompt if prompting is allowed.
    fn resolve_password(&self, access: &AccessRequest<'_>) -> Result<Zeroizing<Vec<u8>>, AuthorityError> {
        if let Some(pw) = access.context.and_then(AuthenticationContext::password) {
            return Ok(Zeroizing::new(pw.to_vec()));
        }
        if access.interaction == Interaction::Suppressed {
            return Err(AuthorityError::InteractionNotAllowed);
        }
        match self.interaction.request_password(access.operation_prompt) {
            PasswordResponse::Provided(pw) => Ok(Zeroizing::new(pw.as_bytes().to_vec())),
            PasswordResponse::Cancelled => Err(AuthorityError::UserCanceled),
        }
    }

    /// Evaluate a `BiometryCurrentSet` rule for one access.
    fn verify_biometry(
        &self,
        snapshot: BiometrySnapshot,
        access: &AccessRequest<'_>,
    ) -> Result<(), AuthorityError> {
        if snapshot.locked_out || !snapshot.enrolled {
            return Err(AuthorityError::AuthFailed);
        }
        if let Some(m) = access.context.and_then(AuthenticationContext::biometric_match) {
            return if m.enrollment_generation() == snapshot.generation {
                Ok(())
            } else {
                Err(AuthorityError::AuthFailed)
            };
        }
        if access.interaction == Interaction::Suppressed {
            return Err(AuthorityError::InteractionNotAllowed);
        }
        let generation = self.prompt_biometry(access.operation_prompt)?;
        if generation != snapshot.generation {
            debug!(
                expected = snapshot.generation,
                matched = generation,
                "enrollment changed during biometric prompt"
            );
            return Err(AuthorityError::AuthFailed);
        }
        Ok(())
    }

    /// Show a biometric prompt; returns the enrollment generation matched.
    fn prompt_biometry(&self, prompt: Option<&str>) -> Result<u64, AuthorityError> {
        match self.interaction.request_biometry(prompt) {
            BiometricResponse::Matched => {
                let mut st = self.state();
                st.biometry.failures = 0;
                Ok(st.biometry.generation)
            }
            BiometricResponse::NoMatch => {
                let mut st = self.state();
                st.biometry.failures += 1;
                if st.biometry.failures >= MAX_BIOMETRIC_FAILURES {
                    st.biometry.locked_out = true;
                    warn!(failures = st.biometry.failures, "biometry locked out");
                }
                Err(AuthorityError::AuthFailed)
            }
            BiometricResponse::Cancelled => Err(AuthorityError::UserCanceled),
        }
    }
}

impl Default for SoftwareAuthority {
    fn default() -> Self {
        Self::new()
    }
}

fn check_cancelled(context: Option<&AuthenticationContext>) -> Result<(), AuthorityError> {
    if context.is_some_and(AuthenticationContext::is_cancelled) {
        return Err(AuthorityError::UserCanceled);
    }
    Ok(())
}

fn crypto_err(e: VaultError) -> AuthorityError {
    AuthorityError::Crypto(e.to_string())
}

fn address(service: &str, account: &str) -> Result<(String, String), AuthorityError> {
    if account.is_empty() {
        return Err(AuthorityError::InvalidParameters("account must not be empty".into()));
    }
    Ok((service.to_string(), account.to_string()))
}

impl SecureStorageAuthority for SoftwareAuthority {
    fn add_item(&self, item: &NewItem<'_>) -> Result<(), AuthorityError> {
        let address = address(item.service, item.account)?;
        check_cancelled(item.context)?;
        if self.device_locked() {
            return Err(AuthorityError::InteractionNotAllowed);
        }

        let aad = item_aad(item.service, item.account);
        let sealed = match item.policy {
            AccessControlPolicy::PasswordGated { .. } => {
                let password = item
                    .context
                    .and_then(AuthenticationContext::password)
                    .ok_or_else(|| {
                        AuthorityError::InvalidParameters(
                            "password-gated item needs an application password in its context"
                                .into(),
                        )
                    })?;
                let envelope =
                    PasswordEnvelope::seal(password, item.payload, &aad, &self.kdf).map_err(crypto_err)?;
                Sealed::Password(envelope)
            }
            AccessControlPolicy::BiometricGated { .. } => {
                let (generation, wrapping_key) = {
                    let st = self.state();
                    if !st.biometry.enrolled {
                        return Err(AuthorityError::BiometryUnavailable);
                    }
                    (st.biometry.generation, st.biometry.wrapping_key.clone())
                };
                let key = wrapping_key
                    .derive_item_key(item.service, item.account)
                    .map_err(crypto_err)?;
                let ciphertext =
                    encryption::encrypt(&key[..], item.payload, &aad).map_err(crypto_err)?;
                Sealed::Biometric {
                    enrollment_generation: generation,
                    ciphertext,
                }
            }
        };

        let mut st = self.state();
        if st.items.contains_key(&address) {
            return Err(AuthorityError::DuplicateItem);
        }
        st.items.insert(
            address,
            StoredItem {
                policy: *item.policy,
                sealed,
            },
        );
        Ok(())
    }

    fn copy_matching(&self, query: &ItemQuery<'_>) -> Result<Zeroizing<Vec<u8>>, AuthorityError> {
        let address = address(query.service, query.account)?;

        let (item, snapshot, wrapping_key) = {
            let mut st = self.state();
            let item = st.items.get(&address).cloned().ok_or(AuthorityError::NotFound)?;

            if query.policy.is_some_and(|p| p.mode() != item.policy.mode()) {
                return Err(AuthorityError::NotFound);
            }
            if let Sealed::Biometric {
                enrollment_generation,
                ..
            } = &item.sealed
            {
                if *enrollment_generation != st.biometry.generation {
                    st.items.remove(&address);
                    debug!(account = query.account, "item invalidated by enrollment change");
                    return Err(AuthorityError::NotFound);
                }
            }
            if st.device_locked {
                return Err(AuthorityError::InteractionNotAllowed);
            }
            (item, st.biometry_snapshot(), st.biometry.wrapping_key.clone())
        };

        check_cancelled(query.access.context)?;
        let aad = item_aad(query.service, query.account);

        match &item.sealed {
            Sealed::Password(envelope) => {
                let password = self.resolve_password(&query.access)?;
                envelope.open(&password, &aad).map_err(|e| match e {
                    VaultError::DecryptionFailed => AuthorityError::AuthFailed,
                    other => crypto_err(other),
                })
            }
            Sealed::Biometric { ciphertext, .. } => {
                self.verify_biometry(snapshot, &query.access)?;
                let key = wrapping_key
                    .derive_item_key(query.service, query.account)
                    .map_err(crypto_err)?;
                encryption::decrypt(&key[..], ciphertext, &aad).map_err(crypto_err)
            }
        }
    }

    fn delete_item(&self, service: &str, account: &str) -> Result<(), AuthorityError> {
        let address = address(service, account)?;
        match self.state().items.remove(&address) {
            Some(_) => Ok(()),
            None => Err(AuthorityError::NotFound),
        }
    }

    fn generate_key(&self, tag: &str, params: &KeyGenParams) -> Result<KeyRecord, AuthorityError> {
        if tag.is_empty() {
            return Err(AuthorityError::InvalidParameters("key tag must not be empty".into()));
        }
        match (params.curve, params.size_bits) {
            (EcCurve::P256, 256) => {}
            (curve, bits) => {
                return Err(AuthorityError::InvalidParameters(format!(
                    "{bits}-bit keys are not supported on {curve:?}"
                )))
            }
        }
        if params.token == KeyToken::SecureElement && !self.secure_hardware {
            return Err(AuthorityError::HardwareUnavailable);
        }

        let mut st = self.state();
        if params.policy.require_biometry && !st.biometry.enrolled {
            return Err(AuthorityError::BiometryUnavailable);
        }
        if st.keys.contains_key(tag) {
            return Err(AuthorityError::DuplicateItem);
        }

        st.next_serial += 1;
        let secret = SecretKey::random(&mut OsRng);
        let stored = StoredKey {
            serial: st.next_serial,
            public: PublicKeyBytes::from(&secret.public_key()),
            secret,
            policy: params.policy,
            enrollment_generation: st.biometry.generation,
        };
        let record = stored.record(tag);
        st.keys.insert(tag.to_string(), stored);

        info!(tag, serial = record.private_key.serial(), "generated secure-element key");
        Ok(record)
    }

    fn copy_key(&self, tag: &str) -> Result<KeyRecord, AuthorityError> {
        let mut st = self.state();
        let current_generation = st.biometry.generation;
        let (record, invalidated) = {
            let stored = st.keys.get(tag).ok_or(AuthorityError::NotFound)?;
            let invalidated = stored.policy.require_biometry
                && stored.enrollment_generation != current_generation;
            (stored.record(tag), invalidated)
        };
        if invalidated {
            st.keys.remove(tag);
            debug!(tag, "key invalidated by enrollment change");
            return Err(AuthorityError::NotFound);
        }
        Ok(record)
    }

    fn delete_key(&self, tag: &str) -> Result<(), AuthorityError> {
        match self.state().keys.remove(tag) {
            Some(_) => Ok(()),
            None => Err(AuthorityError::NotFound),
        }
    }

    fn decrypt_with_key(
        &self,
        key: &PrivateKeyRef,
        ciphertext: &[u8],
        access: &AccessRequest<'_>,
    ) -> Result<Zeroizing<Vec<u8>>, AuthorityError> {
        let (secret, policy, snapshot) = {
            let mut st = self.state();
            let current_generation = st.biometry.generation;
            let (secret, policy, invalidated) = {
                let stored = st.keys.get(key.tag()).ok_or(AuthorityError::NotFound)?;
                if stored.serial != key.serial() {
                    return Err(AuthorityError::NotFound);
                }
                let invalidated = stored.policy.require_biometry
                    && stored.enrollment_generation != current_generation;
                (stored.secret.clone(), stored.policy, invalidated)
            };
            if invalidated {
                st.keys.remove(key.tag());
                return Err(AuthorityError::NotFound);
            }
            if st.device_locked {
                return Err(AuthorityError::InteractionNotAllowed);
            }
            (secret, policy, st.biometry_snapshot())
        };

        check_cancelled(access.context)?;
        if policy.require_biometry {
            self.verify_biometry(snapshot, access)?;
        }

        ecies::open(&secret, ciphertext).map_err(crypto_err)
    }

    fn evaluate_biometry(
        &self,
        context: &mut AuthenticationContext,
        reason: &str,
    ) -> Result<(), AuthorityError> {
        check_cancelled(Some(&*context))?;
        let snapshot = self.state().biometry_snapshot();
        if !snapshot.enrolled {
            return Err(AuthorityError::BiometryUnavailable);
        }
        if snapshot.locked_out {
            return Err(AuthorityError::AuthFailed);
        }
        let generation = self.prompt_biometry(Some(reason))?;
        context.set_biometric_match(BiometricMatch::new(generation));
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "software"
    }
}
