//! Core adapter trait implemented by every secrets backend.

use std::fmt;
use std::str::FromStr;

use super::container::SecretContainer;
use super::error::{Result, VaultError};

/// Built-in adapter implementations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdapterKind {
    /// Local JSON/YAML file, for development and testing.
    FileSecrets,
    /// Remote encrypted vault service.
    RobocorpVault,
}

impl AdapterKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FileSecrets => "FileSecrets",
            Self::RobocorpVault => "RobocorpVault",
        }
    }
}

impl FromStr for AdapterKind {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "FileSecrets" => Ok(Self::FileSecrets),
            "RobocorpVault" => Ok(Self::RobocorpVault),
            _ => Err(VaultError::config(format!("Unknown built-in adapter: {}", s))),
        }
    }
}

impl fmt::Display for AdapterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trait for secrets backends.
///
/// Implementations MUST NOT log field values, and MUST fail with
/// [`VaultError::SecretNotFound`] for secrets they cannot locate rather than
/// returning an empty container.
///
/// Calls block the current thread. Implementations are not required to make
/// read-modify-write cycles safe across concurrent callers.
///
/// # Example Implementation
///
/// ```rust,ignore
/// use robocorp_vault::secrets::{SecretContainer, SecretManager, Result, VaultError};
///
/// #[derive(Debug)]
/// struct StaticSecrets;
///
/// impl SecretManager for StaticSecrets {
///     fn get_secret(&self, name: &str) -> Result<SecretContainer> {
///         Err(VaultError::not_found(name))
///     }
///
///     fn set_secret(&self, _secret: &SecretContainer) -> Result<()> {
///         Err(VaultError::unsupported("set_secret on StaticSecrets"))
///     }
/// }
/// ```
pub trait SecretManager: Send + Sync + fmt::Debug {
    /// Retrieve a secret by name.
    ///
    /// # Errors
    ///
    /// - [`VaultError::SecretNotFound`] if the secret doesn't exist
    /// - [`VaultError::Config`] if the adapter is missing configuration
    /// - [`VaultError::VaultAccess`] if a remote backend fails
    fn get_secret(&self, name: &str) -> Result<SecretContainer>;

    /// Store the fields of `secret` under its name, creating or replacing it.
    ///
    /// # Errors
    ///
    /// - [`VaultError::Unsupported`] if the backend is read-only
    fn set_secret(&self, secret: &SecretContainer) -> Result<()>;

    /// Short identifier used in log records.
    fn kind(&self) -> &str {
        "custom"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adapter_kind_roundtrip() {
        for kind in [AdapterKind::FileSecrets, AdapterKind::RobocorpVault] {
            let parsed: AdapterKind = kind.as_str().parse().unwrap();
            assert_eq!(kind, parsed);
            assert_eq!(kind.to_string(), kind.as_str());
        }
    }

    #[test]
    fn test_adapter_kind_unknown() {
        let err = "Keyring".parse::<AdapterKind>().unwrap_err();
        assert!(matches!(err, VaultError::Config { .. }));
    }
}
