//! # Observability
//!
//! Structured logging setup for binaries using the vault. The library itself
//! only emits `tracing` events; nothing is printed unless a subscriber is
//! installed, either here or by the embedding application.

use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::config::LoggingConfig;
use crate::secrets::{Result, VaultError};

/// Install a global fmt subscriber filtered by `config.filter`.
///
/// # Errors
///
/// - [`VaultError::Config`] if the filter directive is invalid or a global
///   subscriber has already been installed
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_new(&config.filter).map_err(|e| {
        VaultError::config(format!("Invalid log filter '{}': {}", config.filter, e))
    })?;

    // stderr keeps stdout free for command output
    let builder = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    let installed = if config.json {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    };

    installed.map_err(|e| VaultError::config(format!("Logging already initialized: {}", e)))?;

    tracing::debug!(filter = %config.filter, json = config.json, "Logging initialized");
    Ok(())
}
