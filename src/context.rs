//! Caller-owned authentication contexts.
//!
//! An `AuthenticationContext` carries at most one pre-established
//! credential presentation.  The caller builds it, lends it to a single
//! query, and drops it; the vault never stores one.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use zeroize::Zeroizing;

/// Proof of a successful biometric evaluation.
///
/// Bound to the enrollment generation that was current when the match
/// happened; it stops authorizing anything once enrollment changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BiometricMatch {
    enrollment_generation: u64,
}

impl BiometricMatch {
    /// Record a match against `enrollment_generation`.  Authorities call
    /// this after their own biometric check succeeds.
    pub fn new(enrollment_generation: u64) -> Self {
        Self {
            enrollment_generation,
        }
    }

    pub fn enrollment_generation(&self) -> u64 {
        self.enrollment_generation
    }
}

/// A credential presented through a context.
#[derive(Clone)]
pub enum Credential {
    Password(Zeroizing<Vec<u8>>),
    Biometry(BiometricMatch),
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credential::Password(_) => f.write_str("Password([REDACTED])"),
            Credential::Biometry(m) => f.debug_tuple("Biometry").field(m).finish(),
        }
    }
}

/// Cancels every query that uses the originating context.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Default)]
pub struct AuthenticationContext {
    credential: Option<Credential>,
    cancel: CancelHandle,
}

impl AuthenticationContext {
    /// An empty context: no credential, so a query scoped to it cannot
    /// succeed without prompting.
    pub fn new() -> Self {
        Self::default()
    }

    /// A context seeded with an application password.
    pub fn with_password(password: impl AsRef<[u8]>) -> Self {
        let mut ctx = Self::new();
        ctx.set_password(password);
        ctx
    }

    pub fn set_password(&mut self, password: impl AsRef<[u8]>) {
        self.credential = Some(Credential::Password(Zeroizing::new(
            password.as_ref().to_vec(),
        )));
    }

    pub fn set_biometric_match(&mut self, m: BiometricMatch) {
        self.credential = Some(Credential::Biometry(m));
    }

    pub fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }

    pub fn password(&self) -> Option<&[u8]> {
        match &self.credential {
            Some(Credential::Password(pw)) => Some(pw.as_slice()),
            _ => None,
        }
    }

    pub fn biometric_match(&self) -> Option<BiometricMatch> {
        match &self.credential {
            Some(Credential::Biometry(m)) => Some(*m),
            _ => None,
        }
    }

    /// A handle that cancels this context from another thread.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Cancel this context and forget its credential.
    pub fn invalidate(&mut self) {
        self.cancel.cancel();
        self.credential = None;
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}
