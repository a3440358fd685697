//! Secrets adapters and the types they exchange.
//!
//! Every backend implements the [`SecretManager`] trait, which provides a
//! backend-agnostic interface for secret operations:
//! - **get_secret**: Retrieve a named secret as a [`SecretContainer`]
//! - **set_secret**: Persist a container back to the backend
//!
//! # Built-in Adapters
//!
//! - **FileSecrets**: Local JSON or YAML document, for development and tests
//! - **RobocorpVault**: Hosted vault service; values travel encrypted with a
//!   per-instance transit keypair (see [`transit`])
//!
//! Adapters are selected through the [`AdapterRegistry`], which also accepts
//! caller-supplied adapters.
//!
//! # Example
//!
//! ```rust,ignore
//! use robocorp_vault::secrets::{FileSecrets, SecretManager};
//!
//! let adapter = FileSecrets::new("secrets.yaml")?;
//!
//! let mut secret = adapter.get_secret("credentials")?;
//! secret.set("password", "rotated");
//! adapter.set_secret(&secret)?;
//! ```
//!
//! # Security Considerations
//!
//! - Field values are never logged and never appear in `Display`/`Debug`
//! - Transit key material is zeroized after use
//! - The remote vault is read-only from this client

pub mod client;
pub mod container;
pub mod error;
pub mod file;
pub mod registry;
pub mod remote;
pub mod transit;
pub mod token;

// Re-export main types
pub use client::{AdapterKind, SecretManager};
pub use container::{coerce_field_value, validate_secret_name, SecretContainer};
pub use error::{Result, VaultError};
pub use file::{FileFormat, FileSecrets};
pub use registry::{
    adapter_factory, canonical_adapter_name, AdapterArgs, AdapterFactory, AdapterRegistry,
};
pub use remote::{RemoteVaultConfig, RobocorpVault};
pub use transit::{EncryptionInfo, SecretPayload, TransitKeypair, ENCRYPTION_SCHEME};
pub use token::ApiToken;
