use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::crypto::kdf::Argon2Params;
use crate::errors::{Result, VaultError};
use crate::policy::ProtectionMode;

/// Vault configuration, loaded from `.secure-vault.toml`.
///
/// Every field has a default, so the vault works without any config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Prefix for every service name and key tag the vault creates.
    #[serde(default = "default_service_namespace")]
    pub service_namespace: String,

    /// Argon2 memory cost in KiB (default: 64 MB).
    #[serde(default = "default_argon2_memory_kib")]
    pub argon2_memory_kib: u32,

    /// Argon2 iteration count (default: 3).
    #[serde(default = "default_argon2_iterations")]
    pub argon2_iterations: u32,

    /// Argon2 parallelism degree (default: 4).
    #[serde(default = "default_argon2_parallelism")]
    pub argon2_parallelism: u32,

    /// Whether a secure element is available for key generation.
    #[serde(default = "default_secure_hardware")]
    pub secure_hardware: bool,
}

// ── Serde default helpers ────────────────────────────────────────────

fn default_service_namespace() -> String {
    "secure-vault".to_string()
}

fn default_argon2_memory_kib() -> u32 {
    65_536 // 64 MB
}

fn default_argon2_iterations() -> u32 {
    3
}

fn default_argon2_parallelism() -> u32 {
    4
}

fn default_secure_hardware() -> bool {
    true
}

// ── Implementation ───────────────────────────────────────────────────

impl Default for Settings {
    fn default() -> Self {
        Self {
            service_namespace: default_service_namespace(),
            argon2_memory_kib: default_argon2_memory_kib(),
            argon2_iterations: default_argon2_iterations(),
            argon2_parallelism: default_argon2_parallelism(),
            secure_hardware: default_secure_hardware(),
        }
    }
}

impl Settings {
    /// Name of the config file looked up in a directory.
    pub const FILE_NAME: &'static str = ".secure-vault.toml";

    /// Load settings from `<dir>/.secure-vault.toml`.
    ///
    /// If the file does not exist, defaults are returned.
    /// If the file exists but cannot be parsed, an error is returned.
    pub fn load(dir: &Path) -> Result<Self> {
        let config_path = dir.join(Self::FILE_NAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path)?;

        let settings: Settings = toml::from_str(&contents).map_err(|e| {
            VaultError::ConfigError(format!("Failed to parse {}: {e}", config_path.display()))
        })?;

        if settings.service_namespace.is_empty() {
            return Err(VaultError::ConfigError(format!(
                "{}: service_namespace must not be empty",
                config_path.display()
            )));
        }

        Ok(settings)
    }

    /// Service name for items of the given protection class.
    ///
    /// Example: `secure-vault.password`
    pub fn service_for(&self, mode: ProtectionMode) -> String {
        format!("{}.{}", self.service_namespace, mode.service_suffix())
    }

    /// Application tag for a key pair identifier.
    ///
    /// Example: `secure-vault.key.signing`
    pub fn key_tag(&self, identifier: &str) -> String {
        format!("{}.key.{identifier}", self.service_namespace)
    }

    /// Convert the Argon2 settings into crypto-layer params.
    pub fn argon2_params(&self) -> Argon2Params {
        Argon2Params {
            memory_kib: self.argon2_memory_kib,
            iterations: self.argon2_iterations,
            parallelism: self.argon2_parallelism,
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────
