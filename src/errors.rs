use thiserror::Error;

/// All errors that can occur in the vault crate.
#[derive(Debug, Error)]
pub enum VaultError {
    // --- Crypto errors ---
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Decryption failed: wrong credential or corrupted data")]
    DecryptionFailed,

    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),

    // --- Authority errors ---
    #[error("Secure storage authority: {0}")]
    Authority(#[from] AuthorityError),

    // --- Config errors ---
    #[error("Config file error: {0}")]
    ConfigError(String),

    // --- IO errors ---
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // --- Serialization errors ---
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// Convenience type alias for vault results.
pub type Result<T> = std::result::Result<T, VaultError>;

/// Status codes reported by a secure storage authority.
///
/// These mirror the result codes of an OS keystore query protocol. The
/// stores translate them into [`Status`] before anything reaches a caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthorityError {
    #[error("item not found")]
    NotFound,

    #[error("duplicate item")]
    DuplicateItem,

    #[error("authentication failed")]
    AuthFailed,

    #[error("user interaction is not allowed")]
    InteractionNotAllowed,

    #[error("user canceled the operation")]
    UserCanceled,

    #[error("biometry is not available or not enrolled")]
    BiometryUnavailable,

    #[error("secure hardware is not available")]
    HardwareUnavailable,

    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("crypto failure: {0}")]
    Crypto(String),

    #[error("backend failure: {0}")]
    Backend(String),
}

/// Result vocabulary returned to callers of the secret stores.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    NotFound,
    AuthenticationFailed,
    InteractionSuppressed,
    HardwareUnavailable,
    StorageError,
}

/// Transient outcome of one policy evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessOutcome {
    Granted,
    Denied,
    Error,
}

impl Status {
    pub fn is_success(self) -> bool {
        self == Status::Success
    }

    /// Classify this status as the outcome of a gated access.
    ///
    /// Credential rejection, cancellation and suppressed prompts are denials;
    /// everything else that is not a success is an error.
    pub fn outcome(self) -> AccessOutcome {
        match self {
            Status::Success => AccessOutcome::Granted,
            Status::AuthenticationFailed | Status::InteractionSuppressed => AccessOutcome::Denied,
            Status::NotFound | Status::HardwareUnavailable | Status::StorageError => {
                AccessOutcome::Error
            }
        }
    }
}

impl From<&AuthorityError> for Status {
    fn from(err: &AuthorityError) -> Self {
        match err {
            AuthorityError::NotFound => Status::NotFound,
            AuthorityError::AuthFailed | AuthorityError::UserCanceled => {
                Status::AuthenticationFailed
            }
            AuthorityError::InteractionNotAllowed => Status::InteractionSuppressed,
            AuthorityError::BiometryUnavailable | AuthorityError::HardwareUnavailable => {
                Status::HardwareUnavailable
            }
            // Every create path deletes first, so a duplicate is a storage fault.
            AuthorityError::DuplicateItem
            | AuthorityError::InvalidParameters(_)
            | AuthorityError::Crypto(_)
            | AuthorityError::Backend(_) => Status::StorageError,
        }
    }
}

impl<T> From<std::result::Result<T, AuthorityError>> for Status {
    fn from(result: std::result::Result<T, AuthorityError>) -> Self {
        match result {
            Ok(_) => Status::Success,
            Err(e) => Status::from(&e),
        }
    }
}

/// Failure to create a secure-element key pair.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyGenerationError {
    #[error("secure hardware is unavailable")]
    HardwareUnavailable,

    #[error("biometry is required by the key policy but not available")]
    BiometryUnavailable,

    #[error("invalid key parameters: {0}")]
    InvalidParameters(String),

    #[error("key storage failed: {0}")]
    Storage(String),
}

impl From<AuthorityError> for KeyGenerationError {
    fn from(err: AuthorityError) -> Self {
        match err {
            AuthorityError::HardwareUnavailable => KeyGenerationError::HardwareUnavailable,
            AuthorityError::BiometryUnavailable => KeyGenerationError::BiometryUnavailable,
            AuthorityError::InvalidParameters(msg) => KeyGenerationError::InvalidParameters(msg),
            other => KeyGenerationError::Storage(other.to_string()),
        }
    }
}
