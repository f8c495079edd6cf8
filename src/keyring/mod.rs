//! OS keyring authority for password-gated items.
//!
//! Stores each item as a JSON `PasswordEnvelope` in the operating
//! system's credential store:
//! - macOS: Keychain
//! - Windows: Credential Manager
//! - Linux: Secret Service (GNOME Keyring / KDE Wallet)
//!
//! The keyring only ever sees ciphertext; the application password is
//! still required on every read.  There is no biometric hardware or
//! secure element behind this backend.

use std::sync::Arc;

use tracing::debug;
use zeroize::Zeroizing;

use crate::authority::{
    AccessRequest, Interaction, InteractionHandler, ItemQuery, KeyGenParams, KeyRecord,
    NewItem, NoInteraction, PasswordResponse, PrivateKeyRef, SecureStorageAuthority,
};
use crate::config::Settings;
use crate::context::AuthenticationContext;
use crate::crypto::envelope::item_aad;
use crate::crypto::{Argon2Params, PasswordEnvelope};
use crate::errors::{AuthorityError, VaultError};
use crate::policy::ProtectionMode;

pub struct KeyringAuthority {
    kdf: Argon2Params,
    interaction: Arc<dyn InteractionHandler>,
}

impl KeyringAuthority {
    pub fn new(kdf: Argon2Params) -> Self {
        Self {
            kdf,
            interaction: Arc::new(NoInteraction),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.argon2_params())
    }

    pub fn with_interaction(mut self, handler: Arc<dyn InteractionHandler>) -> Self {
        self.interaction = handler;
        self
    }

    fn resolve_password(
        &self,
        access: &AccessRequest<'_>,
    ) -> Result<Zeroizing<Vec<u8>>, AuthorityError> {
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
}

fn entry(service: &str, account: &str) -> Result<keyring::Entry, AuthorityError> {
    if account.is_empty() {
        return Err(AuthorityError::InvalidParameters("account must not be empty".into()));
    }
    keyring::Entry::new(service, account)
        .map_err(|e| AuthorityError::Backend(format!("failed to create keyring entry: {e}")))
}

/// Read the raw envelope stored at an address, if any.
fn read_envelope(entry: &keyring::Entry) -> Result<PasswordEnvelope, AuthorityError> {
    let json = match entry.get_password() {
        Ok(json) => json,
        Err(keyring::Error::NoEntry) => return Err(AuthorityError::NotFound),
        Err(e) => {
            return Err(AuthorityError::Backend(format!(
                "failed to read from keyring: {e}"
            )))
        }
    };
    PasswordEnvelope::from_json(&json).map_err(|e| AuthorityError::Crypto(e.to_string()))
}

impl SecureStorageAuthority for KeyringAuthority {
    fn add_item(&self, item: &NewItem<'_>) -> Result<(), AuthorityError> {
        if item.policy.mode() != ProtectionMode::PasswordGated {
            return Err(AuthorityError::BiometryUnavailable);
        }
        if item.context.is_some_and(AuthenticationContext::is_cancelled) {
            return Err(AuthorityError::UserCanceled);
        }
        let entry = entry(item.service, item.account)?;
        let password = item
            .context
            .and_then(AuthenticationContext::password)
            .ok_or_else(|| {
                AuthorityError::InvalidParameters(
                    "password-gated item needs an application password in its context".into(),
                )
            })?;

        match read_envelope(&entry) {
            Err(AuthorityError::NotFound) => {}
            Ok(_) => return Err(AuthorityError::DuplicateItem),
            Err(e) => return Err(e),
        }

        let aad = item_aad(item.service, item.account);
        let json = PasswordEnvelope::seal(password, item.payload, &aad, &self.kdf)
            .and_then(|envelope| envelope.to_json())
            .map_err(|e| AuthorityError::Crypto(e.to_string()))?;

        entry.set_password(&json).map_err(|e| {
            AuthorityError::Backend(format!("failed to store item in keyring: {e}"))
        })?;
        debug!(service = item.service, account = item.account, "stored item in keyring");
        Ok(())
    }

    fn copy_matching(&self, query: &ItemQuery<'_>) -> Result<Zeroizing<Vec<u8>>, AuthorityError> {
        if query
            .policy
            .is_some_and(|p| p.mode() != ProtectionMode::PasswordGated)
        {
            return Err(AuthorityError::NotFound);
        }
        let entry = entry(query.service, query.account)?;
        let envelope = read_envelope(&entry)?;

        if query
            .access
            .context
            .is_some_and(AuthenticationContext::is_cancelled)
        {
            return Err(AuthorityError::UserCanceled);
        }
        let password = self.resolve_password(&query.access)?;

        let aad = item_aad(query.service, query.account);
        envelope.open(&password, &aad).map_err(|e| match e {
            VaultError::DecryptionFailed => AuthorityError::AuthFailed,
            other => AuthorityError::Crypto(other.to_string()),
        })
    }

    fn delete_item(&self, service: &str, account: &str) -> Result<(), AuthorityError> {
        let entry = entry(service, account)?;
        match entry.delete_credential() {
            Ok(()) => Ok(()),
            Err(keyring::Error::NoEntry) => Err(AuthorityError::NotFound),
            Err(e) => Err(AuthorityError::Backend(format!(
                "failed to delete from keyring: {e}"
            ))),
        }
    }

    fn generate_key(&self, _tag: &str, _params: &KeyGenParams) -> Result<KeyRecord, AuthorityError> {
        Err(AuthorityError::HardwareUnavailable)
    }

    fn copy_key(&self, _tag: &str) -> Result<KeyRecord, AuthorityError> {
        Err(AuthorityError::NotFound)
    }

    fn delete_key(&self, _tag: &str) -> Result<(), AuthorityError> {
        Err(AuthorityError::NotFound)
    }

    fn decrypt_with_key(
        &self,
        _key: &PrivateKeyRef,
        _ciphertext: &[u8],
        _access: &AccessRequest<'_>,
    ) -> Result<Zeroizing<Vec<u8>>, AuthorityError> {
        Err(AuthorityError::HardwareUnavailable)
    }

    fn backend_name(&self) -> &'static str {
        "os-keyring"
    }
}
