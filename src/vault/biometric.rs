use std::sync::Arc;

use zeroize::Zeroizing;

use super::entry::EntryStore;
use crate::authority::{AccessRequest, Interaction, SecureStorageAuthority};
use crate::config::Settings;
use crate::context::AuthenticationContext;
use crate::errors::Status;
use crate::policy::AccessControlPolicy;

/// Secrets gated by a live biometric match against the current
/// enrollment set.
///
/// Entries do not survive an enrollment change: once a biometric factor
/// is added or removed they read as absent.
#[derive(Clone)]
pub struct BiometricStore {
    entries: EntryStore,
}

impl BiometricStore {
    pub fn new(authority: Arc<dyn SecureStorageAuthority>, settings: &Settings) -> Self {
        Self {
            entries: EntryStore::new(authority, settings, AccessControlPolicy::biometric_current_set()),
        }
    }

    pub fn service(&self) -> &str {
        self.entries.service()
    }

    pub fn upsert(&self, key: &str, payload: &[u8]) -> Status {
        self.entries.upsert(key, payload, None)
    }

    /// Read the payload under `key`.
    ///
    /// `prompt` is shown only when no `context` is given.  A context must
    /// already carry a biometric match; otherwise the read fails rather
    /// than prompting.
    pub fn fetch(
        &self,
        key: &str,
        context: Option<&AuthenticationContext>,
        prompt: Option<&str>,
    ) -> Option<Zeroizing<Vec<u8>>> {
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
        self.entries.fetch(key, access)
    }

    pub fn remove(&self, key: &str) {
        self.entries.remove(key);
    }

    pub fn probe(&self, key: &str) -> bool {
        self.entries.probe(key)
    }
}
