//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock, Weak};

use secure_vault::authority::{BiometricResponse, InteractionHandler, PasswordResponse};
use secure_vault::{Settings, SoftwareAuthority, Vault};
use zeroize::Zeroizing;

/// An `InteractionHandler` that answers prompts from queued responses and
/// counts how often it was asked.  An empty queue cancels.
#[derive(Default)]
pub struct ScriptedInteraction {
    passwords: Mutex<VecDeque<Option<String>>>,
    biometry: Mutex<VecDeque<BiometricResponse>>,
    password_prompts: AtomicUsize,
    biometric_prompts: AtomicUsize,
    last_prompt: Mutex<Option<String>>,
}

impl ScriptedInteraction {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn answer_password(&self, password: &str) {
        self.passwords.lock().unwrap().push_back(Some(password.to_string()));
    }

    pub fn cancel_password(&self) {
        self.passwords.lock().unwrap().push_back(None);
    }

    pub fn answer_biometry(&self, response: BiometricResponse) {
        self.biometry.lock().unwrap().push_back(response);
    }

    pub fn password_prompts(&self) -> usize {
        self.password_prompts.load(Ordering::SeqCst)
    }

    pub fn biometric_prompts(&self) -> usize {
        self.biometric_prompts.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> usize {
        self.password_prompts() + self.biometric_prompts()
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.last_prompt.lock().unwrap().clone()
    }

    fn record(&self, prompt: Option<&str>) {
        *self.last_prompt.lock().unwrap() = prompt.map(str::to_string);
    }
}

impl InteractionHandler for ScriptedInteraction {
    fn request_password(&self, prompt: Option<&str>) -> PasswordResponse {
        self.password_prompts.fetch_add(1, Ordering::SeqCst);
        self.record(prompt);
        match self.passwords.lock().unwrap().pop_front() {
            Some(Some(pw)) => PasswordResponse::Provided(Zeroizing::new(pw)),
            _ => PasswordResponse::Cancelled,
        }
    }

    fn request_biometry(&self, prompt: Option<&str>) -> BiometricResponse {
        self.biometric_prompts.fetch_add(1, Ordering::SeqCst);
        self.record(prompt);
        self.biometry
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(BiometricResponse::Cancelled)
    }
}

/// A handler that replaces the enrollment set while its biometric prompt
/// is showing, then reports a match against the new set.
#[derive(Default)]
pub struct ReenrollingInteraction {
    authority: OnceLock<Weak<SoftwareAuthority>>,
}

impl ReenrollingInteraction {
    pub fn attach(&self, authority: &Arc<SoftwareAuthority>) {
        let _ = self.authority.set(Arc::downgrade(authority));
    }
}

impl InteractionHandler for ReenrollingInteraction {
    fn request_password(&self, _prompt: Option<&str>) -> PasswordResponse {
        PasswordResponse::Cancelled
    }

    fn request_biometry(&self, _prompt: Option<&str>) -> BiometricResponse {
        if let Some(authority) = self.authority.get().and_then(Weak::upgrade) {
            authority.enroll_biometry();
        }
        BiometricResponse::Matched
    }
}

/// A vault whose UI re-enrolls biometry during every biometric prompt.
/// Biometry is enrolled once up front.
pub fn reenrolling_fixture() -> (Arc<SoftwareAuthority>, Vault) {
    let settings = test_settings();
    let ui = Arc::new(ReenrollingInteraction::default());
    let authority = Arc::new(SoftwareAuthority::from_settings(&settings).with_interaction(ui.clone()));
    ui.attach(&authority);
    authority.enroll_biometry();
    let vault = Vault::new(authority.clone(), &settings);
    (authority, vault)
}

/// Settings with the cheapest Argon2 parameters the KDF accepts.
pub fn test_settings() -> Settings {
    Settings {
        service_namespace: "secure-vault-test".to_string(),
        argon2_memory_kib: 8_192,
        argon2_iterations: 1,
        argon2_parallelism: 1,
        ..Settings::default()
    }
}

pub struct Fixture {
    pub authority: Arc<SoftwareAuthority>,
    pub ui: Arc<ScriptedInteraction>,
    pub vault: Vault,
}

/// A vault over a fresh software authority wired to a scripted UI.
pub fn fixture() -> Fixture {
    fixture_with(|auth| auth)
}

pub fn fixture_with(configure: impl FnOnce(SoftwareAuthority) -> SoftwareAuthority) -> Fixture {
    let settings = test_settings();
    let ui = ScriptedInteraction::new();
    let authority = Arc::new(configure(
        SoftwareAuthority::from_settings(&settings).with_interaction(ui.clone()),
    ));
    let vault = Vault::new(authority.clone(), &settings);
    Fixture { authority, ui, vault }
}

/// Like `fixture`, with one biometric enrollment in place.
pub fn enrolled_fixture() -> Fixture {
    let f = fixture();
    f.authority.enroll_biometry();
    f
}
