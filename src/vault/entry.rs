//! Item plumbing shared by the password and biometric stores.

use std::sync::Arc;

use tracing::{debug, warn};
use zeroize::Zeroizing;

use crate::authority::{AccessRequest, ItemQuery, NewItem, SecureStorageAuthority};
use crate::config::Settings;
use crate::context::AuthenticationContext;
use crate::errors::{AuthorityError, Status};
use crate::policy::AccessControlPolicy;

/// One protection class of items under one service name.
#[derive(Clone)]
pub(crate) struct EntryStore {
    authority: Arc<dyn SecureStorageAuthority>,
    service: String,
    policy: AccessControlPolicy,
}

impl EntryStore {
    pub(crate) fn new(
        authority: Arc<dyn SecureStorageAuthority>,
        settings: &Settings,
        policy: AccessControlPolicy,
    ) -> Self {
        Self {
            authority,
            service: settings.service_for(policy.mode()),
            policy,
        }
    }

    pub(crate) fn service(&self) -> &str {
        &self.service
    }

    /// Delete whatever is stored under `key`, then add the new item.
    ///
    /// The two steps are not atomic: a concurrent upsert of the same key
    /// can slip in between them.
    pub(crate) fn upsert(
        &self,
        key: &str,
        payload: &[u8],
        context: Option<&AuthenticationContext>,
    ) -> Status {
        if key.is_empty() {
            warn!(service = %self.service, "refusing to store an item under an empty key");
            return Status::StorageError;
        }
        self.remove(key);

        let item = NewItem {
            service: &self.service,
            account: key,
            payload,
            policy: &self.policy,
            context,
        };
        let status = Status::from(self.authority.add_item(&item));
        debug!(service = %self.service, key, ?status, "upsert");
        status
    }

    pub(crate) fn fetch(&self, key: &str, access: AccessRequest<'_>) -> Option<Zeroizing<Vec<u8>>> {
        if key.is_empty() {
            return None;
        }
        let query = ItemQuery {
            service: &self.service,
            account: key,
            policy: Some(&self.policy),
            access,
        };
        match self.authority.copy_matching(&query) {
            Ok(payload) => Some(payload),
            Err(e) => {
                debug!(service = %self.service, key, status = ?Status::from(&e), "fetch denied");
                None
            }
        }
    }

    /// Best-effort delete.  A missing item is not an error.
    pub(crate) fn remove(&self, key: &str) {
        if key.is_empty() {
            return;
        }
        match self.authority.delete_item(&self.service, key) {
            Ok(()) | Err(AuthorityError::NotFound) => {}
            Err(e) => warn!(service = %self.service, key, error = %e, "remove failed"),
        }
    }

    /// Non-interactive existence check.
    ///
    /// An item the authority refuses to open without a prompt, or refuses
    /// because the credential is locked out, still exists.
    pub(crate) fn probe(&self, key: &str) -> bool {
        if key.is_empty() {
            return false;
        }
        let query = ItemQuery::new(&self.service, key)
            .with_policy(&self.policy)
            .suppress_interaction();
        matches!(
            Status::from(self.authority.copy_matching(&query)),
            Status::Success | Status::InteractionSuppressed | Status::AuthenticationFailed
        )
    }
}
