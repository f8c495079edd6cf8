//! The secure storage authority: the trusted subsystem the vault adapts.
//!
//! An authority persists items and keys, evaluates access-control
//! policies on every read, and performs private-key operations without
//! ever handing private material back.  The vault only speaks this query
//! protocol; backends decide how policies are enforced.
//!
//! Backends:
//! - [`SoftwareAuthority`]: in-process keystore and secure element
//! - `KeyringAuthority` (feature `keyring-store`): OS keyring, password
//!   items only

pub mod software;

pub use software::{BiometricResponse, InteractionHandler, NoInteraction, PasswordResponse, SoftwareAuthority};

use zeroize::Zeroizing;

use crate::context::AuthenticationContext;
use crate::crypto::PublicKeyBytes;
use crate::errors::AuthorityError;
use crate::policy::{AccessControlPolicy, KeyAccessPolicy};

/// Whether the authority may show a user-facing prompt for this query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interaction {
    #[default]
    Allowed,
    /// Fail with `InteractionNotAllowed` instead of prompting.
    Suppressed,
}

/// How a single gated access presents itself to the authority.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessRequest<'a> {
    pub context: Option<&'a AuthenticationContext>,
    pub interaction: Interaction,
    /// Justification shown if the authority prompts.
    pub operation_prompt: Option<&'a str>,
}

impl<'a> AccessRequest<'a> {
    /// A request that must never prompt.
    pub fn non_interactive() -> Self {
        Self {
            interaction: Interaction::Suppressed,
            ..Self::default()
        }
    }
}

/// A read of one item, addressed by `(service, account)`.
#[derive(Debug, Clone, Copy)]
pub struct ItemQuery<'a> {
    pub service: &'a str,
    pub account: &'a str,
    /// Only match an item created under a policy of the same mode.
    pub policy: Option<&'a AccessControlPolicy>,
    pub access: AccessRequest<'a>,
}

impl<'a> ItemQuery<'a> {
    pub fn new(service: &'a str, account: &'a str) -> Self {
        Self {
            service,
            account,
            policy: None,
            access: AccessRequest::default(),
        }
    }

    pub fn with_policy(mut self, policy: &'a AccessControlPolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    pub fn with_context(mut self, context: &'a AuthenticationContext) -> Self {
        self.access.context = Some(context);
        self
    }

    pub fn suppress_interaction(mut self) -> Self {
        self.access.interaction = Interaction::Suppressed;
        self
    }
}

/// An item to add.  Password-gated items take their password from
/// `context`.
#[derive(Clone, Copy)]
pub struct NewItem<'a> {
    pub service: &'a str,
    pub account: &'a str,
    pub payload: &'a [u8],
    pub policy: &'a AccessControlPolicy,
    pub context: Option<&'a AuthenticationContext>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EcCurve {
    P256,
}

/// Where the private half of a generated key lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyToken {
    SecureElement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyGenParams {
    pub curve: EcCurve,
    pub size_bits: u32,
    pub token: KeyToken,
    pub policy: KeyAccessPolicy,
}

impl KeyGenParams {
    /// A permanent 256-bit P-256 key confined to the secure element.
    pub fn secure_element_p256(policy: KeyAccessPolicy) -> Self {
        Self {
            curve: EcCurve::P256,
            size_bits: 256,
            token: KeyToken::SecureElement,
            policy,
        }
    }
}

/// Opaque reference to a private key held by an authority.
///
/// Holds the key's tag and a serial token that changes every time a key
/// is generated under that tag, so a reference to a superseded key can
/// never reach the replacement.  It exposes no key bytes and implements
/// no serialization.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PrivateKeyRef {
    tag: String,
    serial: u64,
}

impl PrivateKeyRef {
    pub fn new(tag: impl Into<String>, serial: u64) -> Self {
        Self {
            tag: tag.into(),
            serial,
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn serial(&self) -> u64 {
        self.serial
    }
}

/// What an authority reports about a stored key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRecord {
    pub private_key: PrivateKeyRef,
    pub public_key: PublicKeyBytes,
    pub policy: KeyAccessPolicy,
}

/// The query protocol of a secure storage authority.
///
/// All calls block.  Any call that may evaluate a biometric or password
/// policy may wait on a human for an authority-defined time.
pub trait SecureStorageAuthority: Send + Sync {
    /// Persist a new item.  Fails with `DuplicateItem` if the address is
    /// taken.
    fn add_item(&self, item: &NewItem<'_>) -> Result<(), AuthorityError>;

    /// Evaluate the item's policy and return its payload on success.
    fn copy_matching(&self, query: &ItemQuery<'_>) -> Result<Zeroizing<Vec<u8>>, AuthorityError>;

    fn delete_item(&self, service: &str, account: &str) -> Result<(), AuthorityError>;

    /// Create a key pair under `tag`.  Fails with `DuplicateItem` if the
    /// tag is taken.
    fn generate_key(&self, tag: &str, params: &KeyGenParams) -> Result<KeyRecord, AuthorityError>;

    fn copy_key(&self, tag: &str) -> Result<KeyRecord, AuthorityError>;

    fn delete_key(&self, tag: &str) -> Result<(), AuthorityError>;

    /// Open an ECIES message with the referenced private key, evaluating
    /// the key's policy first.
    fn decrypt_with_key(
        &self,
        key: &PrivateKeyRef,
        ciphertext: &[u8],
        access: &AccessRequest<'_>,
    ) -> Result<Zeroizing<Vec<u8>>, AuthorityError>;

    /// Run a biometric check and, on success, record the match in
    /// `context` so later queries can be authorized without a prompt.
    fn evaluate_biometry(
        &self,
        _context: &mut AuthenticationContext,
        _reason: &str,
    ) -> Result<(), AuthorityError> {
        Err(AuthorityError::BiometryUnavailable)
    }

    /// Human-readable name for logs.
    fn backend_name(&self) -> &'static str;
}
