use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Per-identifier mutual exclusion for delete-then-create sequences.
///
/// `upsert` and `generate` delete and then create in two authority calls.
/// Callers that may race on one identifier can run those calls inside
/// [`IdentifierLocks::with`]; the stores do not lock on their own.
#[derive(Debug, Default)]
pub struct IdentifierLocks {
    slots: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl IdentifierLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` while holding the lock for `identifier`.
    pub fn with<T>(&self, identifier: &str, f: impl FnOnce() -> T) -> T {
        let slot = self.slots().entry(identifier.to_string()).or_default().clone();

        let result = {
            let _guard = slot.lock().unwrap_or_else(PoisonError::into_inner);
            f()
        };

        // Only the map and this call still reference the slot.
        let mut slots = self.slots();
        if Arc::strong_count(&slot) == 2 {
            slots.remove(identifier);
        }
        result
    }

    /// Number of identifiers currently locked or waited on.
    pub fn active(&self) -> usize {
        self.slots().len()
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<String, Arc<Mutex<()>>>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
