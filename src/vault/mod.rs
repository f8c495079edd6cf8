//! Vault module: the application-facing stores.
//!
//! This module provides:
//! - `PasswordStore` for password-gated secrets (`password`)
//! - `BiometricStore` for biometric-gated secrets (`biometric`)
//! - `KeyManager` for secure-element key pairs (`keys`)
//! - `IdentifierLocks` for callers that race on one identifier (`locks`)
//!
//! None of these hold secret state.  Every call goes to the authority,
//! which evaluates the item's policy afresh.

mod entry;
pub mod biometric;
pub mod keys;
pub mod locks;
pub mod password;

// Re-export the most commonly used items.
pub use biometric::BiometricStore;
pub use keys::{KeyManager, KeyPairHandle};
pub use locks::IdentifierLocks;
pub use password::PasswordStore;

use std::sync::Arc;

use tracing::debug;

use crate::authority::SecureStorageAuthority;
use crate::config::Settings;
use crate::context::AuthenticationContext;
use crate::errors::Result;

/// All three stores over one authority.
#[derive(Clone)]
pub struct Vault {
    authority: Arc<dyn SecureStorageAuthority>,
    passwords: PasswordStore,
    biometrics: BiometricStore,
    keys: KeyManager,
}

impl Vault {
    pub fn new(authority: Arc<dyn SecureStorageAuthority>, settings: &Settings) -> Self {
        debug!(
            backend = authority.backend_name(),
            namespace = %settings.service_namespace,
            "opening vault"
        );
        Self {
            passwords: PasswordStore::new(Arc::clone(&authority), settings),
            biometrics: BiometricStore::new(Arc::clone(&authority), settings),
            keys: KeyManager::new(Arc::clone(&authority), settings),
            authority,
        }
    }

    pub fn passwords(&self) -> &PasswordStore {
        &self.passwords
    }

    pub fn biometrics(&self) -> &BiometricStore {
        &self.biometrics
    }

    pub fn keys(&self) -> &KeyManager {
        &self.keys
    }

    /// Run one biometric check up front and return a context carrying
    /// the match, for use with several reads that should not each prompt.
    pub fn authenticate_biometry(&self, reason: &str) -> Result<AuthenticationContext> {
        let mut context = AuthenticationContext::new();
        self.authority.evaluate_biometry(&mut context, reason)?;
        Ok(context)
    }
}
