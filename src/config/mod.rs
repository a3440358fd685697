//! # Configuration
//!
//! Resolves vault configuration from environment variables into a single
//! normalized [`VaultSettings`] struct consumed by adapter constructors.
//!
//! Older deployments used `RPA_*` variable names. Those are still honoured
//! through [`legacy_env_alias`]; when both are set the current name wins.

use std::env;
use std::path::PathBuf;

use tracing::debug;

use crate::secrets::ApiToken;

/// Adapter selector (built-in alias or fully-qualified adapter name).
pub const ENV_SECRET_MANAGER: &str = "RC_VAULT_SECRET_MANAGER";
/// Path of the local secrets file used by `FileSecrets`.
pub const ENV_SECRETS_FILE: &str = "RC_VAULT_SECRETS_FILE";
/// Base URL of the remote vault service.
pub const ENV_API_HOST: &str = "RC_API_SECRET_HOST";
/// Bearer token for the remote vault service.
pub const ENV_API_TOKEN: &str = "RC_API_SECRET_TOKEN";
/// Workspace holding the remote secrets.
pub const ENV_WORKSPACE_ID: &str = "RC_WORKSPACE_ID";
/// Log filter directive, falls back to `RUST_LOG`.
pub const ENV_LOG: &str = "RC_VAULT_LOG";
/// Log output format, `text` or `json`.
pub const ENV_LOG_FORMAT: &str = "RC_VAULT_LOG_FORMAT";

/// Returns the legacy variable name that maps onto `name`, if any.
pub fn legacy_env_alias(name: &str) -> Option<&'static str> {
    match name {
        ENV_SECRET_MANAGER => Some("RPA_SECRET_MANAGER"),
        ENV_SECRETS_FILE => Some("RPA_SECRET_FILE"),
        _ => None,
    }
}

/// Reads `name` through `lookup`, falling back to its legacy alias.
/// Empty values count as unset.
fn read_var<F>(lookup: &F, name: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |value: String| if value.is_empty() { None } else { Some(value) };

    if let Some(value) = lookup(name).and_then(non_empty) {
        return Some(value);
    }

    let legacy = legacy_env_alias(name)?;
    let value = lookup(legacy).and_then(non_empty)?;
    debug!(variable = legacy, replacement = name, "Using legacy environment variable");
    Some(value)
}

/// Normalized vault configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VaultSettings {
    /// Adapter selector; `None` selects the caller's default adapter or the
    /// remote vault.
    pub secret_manager: Option<String>,

    /// Local secrets document for `FileSecrets`.
    pub secrets_file: Option<PathBuf>,

    /// Remote vault base URL.
    pub api_host: Option<String>,

    /// Remote vault bearer token (redacted in logs).
    pub api_token: Option<ApiToken>,

    /// Remote vault workspace identifier.
    pub workspace_id: Option<String>,
}

impl VaultSettings {
    /// Load settings from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load settings through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            secret_manager: read_var(&lookup, ENV_SECRET_MANAGER),
            secrets_file: read_var(&lookup, ENV_SECRETS_FILE).map(PathBuf::from),
            api_host: read_var(&lookup, ENV_API_HOST),
            api_token: read_var(&lookup, ENV_API_TOKEN).map(ApiToken::new),
            workspace_id: read_var(&lookup, ENV_WORKSPACE_ID),
        }
    }
}

/// Logging configuration for binaries embedding the vault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `info` or `robocorp_vault=debug`.
    pub filter: String,

    /// Emit JSON records instead of human readable text.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { filter: "info".to_string(), json: false }
    }
}

impl LoggingConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|value| !value.is_empty());
        let filter = non_empty(ENV_LOG)
            .or_else(|| non_empty("RUST_LOG"))
            .unwrap_or_else(|| Self::default().filter);

        let json = lookup(ENV_LOG_FORMAT).is_some_and(|value| value.eq_ignore_ascii_case("json"));

        Self { filter, json }
    }
}
