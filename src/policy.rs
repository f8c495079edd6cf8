//! Access-control policies attached to items and keys at creation time.
//!
//! Policies are plain data.  The authority evaluates them on every read;
//! nothing in the vault ever caches an "unlocked" state.

/// When an item may be read at all, independent of any credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Accessibility {
    /// Readable only while the device is unlocked; never synchronized or
    /// migrated off this device.
    #[default]
    WhenUnlockedThisDeviceOnly,
}

/// Which biometric enrollment a policy is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EnrollmentBinding {
    /// The enrollment set at creation time.  Adding or removing a
    /// biometric factor invalidates the item.
    #[default]
    CurrentSet,
}

/// The protection class of a stored secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProtectionMode {
    PasswordGated,
    BiometricGated,
}

impl ProtectionMode {
    /// Suffix appended to the configured namespace to form the service
    /// name for this protection class.
    pub fn service_suffix(self) -> &'static str {
        match self {
            ProtectionMode::PasswordGated => "password",
            ProtectionMode::BiometricGated => "biometric",
        }
    }
}

/// Rule evaluated by the authority on every protected read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessControlPolicy {
    /// Requires a matching application password.
    PasswordGated { accessibility: Accessibility },
    /// Requires a live biometric match against the bound enrollment.
    BiometricGated {
        accessibility: Accessibility,
        enrollment: EnrollmentBinding,
    },
}

impl AccessControlPolicy {
    pub fn password() -> Self {
        AccessControlPolicy::PasswordGated {
            accessibility: Accessibility::WhenUnlockedThisDeviceOnly,
        }
    }

    pub fn biometric_current_set() -> Self {
        AccessControlPolicy::BiometricGated {
            accessibility: Accessibility::WhenUnlockedThisDeviceOnly,
            enrollment: EnrollmentBinding::CurrentSet,
        }
    }

    pub fn mode(&self) -> ProtectionMode {
        match self {
            AccessControlPolicy::PasswordGated { .. } => ProtectionMode::PasswordGated,
            AccessControlPolicy::BiometricGated { .. } => ProtectionMode::BiometricGated,
        }
    }

    pub fn accessibility(&self) -> Accessibility {
        match self {
            AccessControlPolicy::PasswordGated { accessibility }
            | AccessControlPolicy::BiometricGated { accessibility, .. } => *accessibility,
        }
    }
}

/// Policy attached to a secure-element private key.
///
/// Every private-key operation requires `PrivateKeyUsage`; when
/// `require_biometry` is set it additionally requires a biometric match
/// against the current enrollment set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct KeyAccessPolicy {
    pub accessibility: Accessibility,
    pub require_biometry: bool,
}

impl KeyAccessPolicy {
    pub fn private_key_usage(require_biometry: bool) -> Self {
        Self {
            accessibility: Accessibility::WhenUnlockedThisDeviceOnly,
            require_biometry,
        }
    }

    /// The enrollment binding, if this key is biometry-gated.
    pub fn enrollment(&self) -> Option<EnrollmentBinding> {
        self.require_biometry.then_some(EnrollmentBinding::CurrentSet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_pick_the_matching_mode() {
        assert_eq!(AccessControlPolicy::password().mode(), ProtectionMode::PasswordGated);
        assert_eq!(
            AccessControlPolicy::biometric_current_set().mode(),
            ProtectionMode::BiometricGated
        );
    }

    #[test]
    fn both_modes_are_device_only() {
        for policy in [
            AccessControlPolicy::password(),
            AccessControlPolicy::biometric_current_set(),
        ] {
            assert_eq!(policy.accessibility(), Accessibility::WhenUnlockedThisDeviceOnly);
        }
    }

    #[test]
    fn biometry_flag_controls_enrollment_binding() {
        assert_eq!(KeyAccessPolicy::private_key_usage(false).enrollment(), None);
        assert_eq!(
            KeyAccessPolicy::private_key_usage(true).enrollment(),
            Some(EnrollmentBinding::CurrentSet)
        );
    }

    #[test]
    fn service_suffixes_differ() {
        assert_ne!(
            ProtectionMode::PasswordGated.service_suffix(),
            ProtectionMode::BiometricGated.service_suffix()
        );
    }
}
