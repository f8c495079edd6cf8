//! Secure-element key pairs.
//!
//! The manager hands out `KeyPairHandle`s: an opaque private-key
//! reference plus the exported public key.  Private key operations are
//! delegated to the authority, which evaluates the key's policy first.

use std::sync::Arc;

use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::authority::{AccessRequest, Interaction, KeyGenParams, KeyRecord, PrivateKeyRef, SecureStorageAuthority};
use crate::config::Settings;
use crate::context::AuthenticationContext;
use crate::crypto::PublicKeyBytes;
use crate::errors::{AuthorityError, KeyGenerationError, Result};
use crate::policy::KeyAccessPolicy;

/// A generated key pair as seen by the application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPairHandle {
    identifier: String,
    private_key: PrivateKeyRef,
    public_key: PublicKeyBytes,
    requires_biometry: bool,
}

impl KeyPairHandle {
    fn from_record(identifier: &str, record: KeyRecord) -> Self {
        Self {
            identifier: identifier.to_string(),
            private_key: record.private_key,
            public_key: record.public_key,
            requires_biometry: record.policy.require_biometry,
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn private_key(&self) -> &PrivateKeyRef {
        &self.private_key
    }

    pub fn public_key(&self) -> &PublicKeyBytes {
        &self.public_key
    }

    pub fn requires_biometry(&self) -> bool {
        self.requires_biometry
    }
}

#[derive(Clone)]
pub struct KeyManager {
    authority: Arc<dyn SecureStorageAuthority>,
    settings: Settings,
}

impl KeyManager {
    pub fn new(authority: Arc<dyn SecureStorageAuthority>, settings: &Settings) -> Self {
        Self {
            authority,
            settings: settings.clone(),
        }
    }

    /// Generate a P-256 key pair in the secure element under `identifier`.
    ///
    /// Any key already stored under `identifier` is deleted first, and
    /// handles to it stop working.  The delete and the generation are
    /// separate authority calls; wrap concurrent callers in
    /// [`IdentifierLocks`](super::IdentifierLocks) if they can collide.
    pub fn generate(
        &self,
        identifier: &str,
        require_biometry: bool,
    ) -> std::result::Result<KeyPairHandle, KeyGenerationError> {
        if identifier.is_empty() {
            return Err(KeyGenerationError::InvalidParameters(
                "key identifier must not be empty".into(),
            ));
        }
        let tag = self.settings.key_tag(identifier);
        self.delete_tag(&tag);

        let params = KeyGenParams::secure_element_p256(KeyAccessPolicy::private_key_usage(
            require_biometry,
        ));
        let record = self.authority.generate_key(&tag, &params).map_err(|e| {
            warn!(identifier, error = %e, "key generation failed");
            KeyGenerationError::from(e)
        })?;

        info!(
            identifier,
            require_biometry,
            backend = self.authority.backend_name(),
            "generated key pair"
        );
        Ok(KeyPairHandle::from_record(identifier, record))
    }

    pub fn load(&self, identifier: &str) -> Option<KeyPairHandle> {
        if identifier.is_empty() {
            return None;
        }
        match self.authority.copy_key(&self.settings.key_tag(identifier)) {
            Ok(record) => Some(KeyPairHandle::from_record(identifier, record)),
            Err(e) => {
                debug!(identifier, error = %e, "no usable key");
                None
            }
        }
    }

    /// Best-effort delete.  A missing key is not an error.
    pub fn remove(&self, identifier: &str) {
        if identifier.is_empty() {
            return;
        }
        self.delete_tag(&self.settings.key_tag(identifier));
    }

    /// The 65-byte SEC1 uncompressed public key of `handle`.
    pub fn export_public_key(&self, handle: &KeyPairHandle) -> PublicKeyBytes {
        handle.public_key.clone()
    }

    /// Open a message sealed to `handle`'s public key with
    /// [`crypto::seal`](crate::crypto::seal).
    ///
    /// The private key operation runs inside the authority and is gated
    /// by the key's policy.  As with the stores, a `context` suppresses
    /// prompting and `prompt` is shown only without one.
    pub fn decrypt(
        &self,
        handle: &KeyPairHandle,
        ciphertext: &[u8],
        context: Option<&AuthenticationContext>,
        prompt: Option<&str>,
    ) -> Result<Zeroizing<Vec<u8>>> {
        let access = match context {
            Some(ctx) => AccessRequest {
                context: Some(ctx),
                ..AccessRequest::non_interactive()
            },
            None => AccessRequest {
                context: None,
                interaction: Interaction::Allowed,
                operation_prompt: prompt,
            },
        };
        let plaintext = self
            .authority
            .decrypt_with_key(&handle.private_key, ciphertext, &access)?;
        debug!(identifier = %handle.identifier, "decrypted with key pair");
        Ok(plaintext)
    }

    fn delete_tag(&self, tag: &str) {
        match self.authority.delete_key(tag) {
            Ok(()) | Err(AuthorityError::NotFound) => {}
            Err(e) => warn!(tag, error = %e, "key delete failed"),
        }
    }
}
