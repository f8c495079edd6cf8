//! Password- and biometric-gated secret storage with secure-element key
//! pairs, on top of a pluggable secure storage authority.
//!
//! ```no_run
//! use std::sync::Arc;
//! use secure_vault::{AuthenticationContext, Settings, SoftwareAuthority, Vault};
//!
//! let settings = Settings::default();
//! let vault = Vault::new(Arc::new(SoftwareAuthority::from_settings(&settings)), &settings);
//!
//! let _ = vault.passwords().upsert("token", b"secret-bytes", "pw1");
//! let ctx = AuthenticationContext::with_password("pw1");
//! assert!(vault.passwords().fetch("token", Some(&ctx)).is_some());
//! ```

pub mod authority;
pub mod config;
pub mod context;
pub mod crypto;
pub mod errors;
pub mod policy;
pub mod vault;

#[cfg(feature = "keyring-store")]
pub mod keyring;

pub use authority::{SecureStorageAuthority, SoftwareAuthority};
pub use config::Settings;
pub use context::{AuthenticationContext, CancelHandle};
pub use errors::{AccessOutcome, AuthorityError, KeyGenerationError, Result, Status, VaultError};
pub use policy::{AccessControlPolicy, KeyAccessPolicy, ProtectionMode};
pub use vault::{BiometricStore, IdentifierLocks, KeyManager, KeyPairHandle, PasswordStore, Vault};
