use std::sync::Arc;

use zeroize::Zeroizing;

use super::entry::EntryStore;
use crate::authority::{AccessRequest, SecureStorageAuthority};
use crate::config::Settings;
use crate::context::AuthenticationContext;
use crate::errors::Status;
use crate::policy::AccessControlPolicy;

/// Secrets gated by an application password.
///
/// Each read is authorized by the password the entry was stored with,
/// either through a caller-supplied context or an authority prompt.
#[derive(Clone)]
pub struct PasswordStore {
    entries: EntryStore,
}

impl PasswordStore {
    pub fn new(authority: Arc<dyn SecureStorageAuthority>, settings: &Settings) -> Self {
        Self {
            entries: EntryStore::new(authority, settings, AccessControlPolicy::password()),
        }
    }

    /// Service name the entries live under.
    pub fn service(&self) -> &str {
        self.entries.service()
    }

    /// Replace any entry under `key` with `payload`, sealed to `password`.
    pub fn upsert(&self, key: &str, payload: &[u8], password: &str) -> Status {
        let context = AuthenticationContext::with_password(password);
        self.entries.upsert(key, payload, Some(&context))
    }

    /// Read the payload under `key`.
    ///
    /// With a `context` the read is scoped to it and never prompts; a
    /// wrong or missing credential yields `None`.  Without one the
    /// authority may prompt for the password.
    pub fn fetch(
        &self,
        key: &str,
        context: Option<&AuthenticationContext>,
    ) -> Option<Zeroizing<Vec<u8>>> {
        let access = match context {
            Some(ctx) => AccessRequest {
                context: Some(ctx),
                ..AccessRequest::non_interactive()
            },
            None => AccessRequest::default(),
        };
        self.entries.fetch(key, access)
    }

    pub fn remove(&self, key: &str) {
        self.entries.remove(key);
    }

    /// Whether an entry exists under `key`.  Never prompts.
    pub fn probe(&self, key: &str) -> bool {
        self.entries.probe(key)
    }
}
