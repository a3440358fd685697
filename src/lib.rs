//! # Robocorp Vault
//!
//! Client-side access to named secrets for automation tasks. A secret is a
//! named mapping of fields (for example `username` and `password`) held by a
//! pluggable backend:
//!
//! - **FileSecrets**: a local JSON or YAML document, for development
//! - **RobocorpVault**: the hosted vault service, with values encrypted in
//!   transit to a keypair owned by the client
//!
//! ## Architecture
//!
//! ```text
//! task code → Vault facade → AdapterRegistry → SecretManager adapter
//!                 ↓                                   ↓
//!           VaultSettings (env)             file document / HTTPS service
//! ```
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use robocorp_vault::{Vault, VaultSettings};
//!
//! fn main() -> robocorp_vault::Result<()> {
//!     let vault = Vault::with_settings(VaultSettings::from_env());
//!
//!     let mut secret = vault.get_secret("credentials")?;
//!     println!("{}", secret);
//!
//!     secret.set("password", "rotated");
//!     vault.set_secret(&secret)
//! }
//! ```

pub mod cli;
pub mod config;
pub mod observability;
pub mod secrets;
pub mod vault;

// Re-export commonly used types and traits
pub use config::{LoggingConfig, VaultSettings};
pub use observability::init_logging;
pub use secrets::{Result, SecretContainer, SecretManager, VaultError};
pub use vault::{Vault, VaultBuilder};

/// Library version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
