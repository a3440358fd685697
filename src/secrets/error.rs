//! Error types for vault operations.

use thiserror::Error;

/// Result type for vault operations.
pub type Result<T> = std::result::Result<T, VaultError>;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while reading or writing secrets.
///
/// Messages carry secret names and metadata only. Field values, tokens and
/// key material never appear in any variant.
#[derive(Error, Debug)]
pub enum VaultError {
    /// Invalid or incomplete configuration (unknown adapter selector,
    /// unsupported file extension, missing remote credentials).
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Secret not found in the backing store.
    #[error("Secret not found: {name}")]
    SecretNotFound { name: String },

    /// Field not present in a secret container.
    #[error("Secret field not found: {field}")]
    FieldNotFound { field: String },

    /// Secret name is not an identifier-safe string.
    #[error("Invalid secret name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    /// Failure while talking to, or decrypting data from, the remote vault.
    #[error("Vault access failed: {message}")]
    VaultAccess {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// Operation not supported by the active adapter.
    #[error("Operation not supported: {operation}")]
    Unsupported { operation: String },

    /// Malformed local secrets document.
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl VaultError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config { message: message.into() }
    }

    /// Create a secret not found error.
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::SecretNotFound { name: name.into() }
    }

    /// Create a field not found error.
    pub fn field_not_found(field: impl Into<String>) -> Self {
        Self::FieldNotFound { field: field.into() }
    }

    /// Create an invalid name error.
    pub fn invalid_name(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidName { name: name.into(), reason: reason.into() }
    }

    /// Create a vault access error without an underlying cause.
    pub fn vault_access(message: impl Into<String>) -> Self {
        Self::VaultAccess { message: message.into(), source: None }
    }

    /// Create a vault access error wrapping the underlying cause.
    pub fn vault_access_with<E>(message: impl Into<String>, source: E) -> Self
    where
        E: Into<BoxError>,
    {
        Self::VaultAccess { message: message.into(), source: Some(source.into()) }
    }

    /// Create an unsupported operation error.
    pub fn unsupported(operation: impl Into<String>) -> Self {
        Self::Unsupported { operation: operation.into() }
    }

    /// Create a serialization error.
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization { message: message.into() }
    }

    /// True for both secret-level and field-level not found errors.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::SecretNotFound { .. } | Self::FieldNotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_error_constructors() {
        let err = VaultError::not_found("windows");
        assert!(matches!(err, VaultError::SecretNotFound { .. }));
        assert_eq!(err.to_string(), "Secret not found: windows");

        let err = VaultError::field_not_found("password");
        assert!(matches!(err, VaultError::FieldNotFound { .. }));
        assert!(err.is_not_found());

        let err = VaultError::config("RC_API_SECRET_TOKEN is not set");
        assert!(matches!(err, VaultError::Config { .. }));
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_vault_access_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = VaultError::vault_access_with("Failed to fetch secret 'db'", io);

        assert!(err.to_string().contains("Failed to fetch secret 'db'"));
        assert!(err.source().is_some());
        assert!(VaultError::vault_access("tag mismatch").source().is_none());
    }

    #[test]
    fn test_error_display() {
        let err = VaultError::invalid_name("../etc", "contains '..'");
        assert!(err.to_string().contains("../etc"));

        let err = VaultError::unsupported("set_secret on RobocorpVault");
        assert!(err.to_string().contains("set_secret"));
    }
}
