//! Adapter registry
//!
//! Maps adapter selector strings to factories. The two built-in adapters are
//! always registered; callers can register more by name or hand a factory
//! directly to the [`crate::Vault`] facade. Unknown selectors are rejected
//! with a configuration error at resolution time, before any adapter is
//! constructed or any I/O happens.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

use super::client::{AdapterKind, SecretManager};
use super::error::{Result, VaultError};
use super::file::FileSecrets;
use super::remote::{RemoteVaultConfig, RobocorpVault};
use super::token::ApiToken;
use crate::config::VaultSettings;

/// Module paths under which the built-in adapters have been published.
const MODULE_PREFIXES: &[&str] =
    &["robocorp.vault._vault.", "robocorp.vault.", "RPA.Robocorp.Vault.", "RPA.Robocloud.Secrets."];

/// Maps a selector (short name, fully-qualified name or legacy name) to a
/// built-in adapter.
///
/// ```rust,ignore
/// assert_eq!(canonical_adapter_name("RPA.Robocloud.Secrets.RobocloudVault"),
///            Some(AdapterKind::RobocorpVault));
/// ```
pub fn canonical_adapter_name(selector: &str) -> Option<AdapterKind> {
    let selector = selector.trim();
    let short = MODULE_PREFIXES
        .iter()
        .find_map(|prefix| selector.strip_prefix(prefix))
        .unwrap_or(selector);

    match short {
        "FileSecrets" | "file" => Some(AdapterKind::FileSecrets),
        "RobocorpVault" | "RobocloudVault" | "remote" => Some(AdapterKind::RobocorpVault),
        _ => None,
    }
}

/// Construction arguments forwarded verbatim to whichever adapter is resolved.
#[derive(Clone, Default, PartialEq)]
pub struct AdapterArgs {
    positional: Vec<String>,
    keyword: BTreeMap<String, String>,
}

// Argument values may be credentials; only their shape is printed.
impl fmt::Debug for AdapterArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdapterArgs")
            .field("positional", &self.positional.len())
            .field("keyword", &self.keyword.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl AdapterArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a positional argument.
    pub fn arg(mut self, value: impl Into<String>) -> Self {
        self.positional.push(value.into());
        self
    }

    /// Set a keyword argument.
    pub fn kwarg(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.keyword.insert(name.into(), value.into());
        self
    }

    pub fn positional(&self) -> &[String] {
        &self.positional
    }

    pub fn keyword(&self, name: &str) -> Option<&str> {
        self.keyword.get(name).map(String::as_str)
    }

    pub fn keywords(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.keyword.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.keyword.is_empty()
    }

    /// Rejects arguments an adapter does not understand.
    fn check(&self, adapter: &str, max_positional: usize, allowed: &[&str]) -> Result<()> {
        if self.positional.len() > max_positional {
            return Err(VaultError::config(format!(
                "{} accepts at most {} positional argument(s), got {}",
                adapter,
                max_positional,
                self.positional.len()
            )));
        }

        if let Some(unknown) = self.keyword.keys().find(|k| !allowed.contains(&k.as_str())) {
            return Err(VaultError::config(format!(
                "{} does not accept argument '{}'",
                adapter, unknown
            )));
        }

        Ok(())
    }
}

/// Constructs an adapter from forwarded arguments and resolved settings.
pub type AdapterFactory =
    Arc<dyn Fn(&AdapterArgs, &VaultSettings) -> Result<Box<dyn SecretManager>> + Send + Sync>;

/// Wraps a closure as an [`AdapterFactory`].
pub fn adapter_factory<F>(factory: F) -> AdapterFactory
where
    F: Fn(&AdapterArgs, &VaultSettings) -> Result<Box<dyn SecretManager>> + Send + Sync + 'static,
{
    Arc::new(factory)
}

fn file_secrets_factory(args: &AdapterArgs, settings: &VaultSettings) -> Result<Box<dyn SecretManager>> {
    args.check(AdapterKind::FileSecrets.as_str(), 1, &["secret_file"])?;

    let path = args
        .positional()
        .first()
        .map(String::as_str)
        .or_else(|| args.keyword("secret_file"))
        .map(PathBuf::from);

    let adapter = match path {
        Some(path) => FileSecrets::new(path)?,
        None => FileSecrets::from_settings(settings)?,
    };

    Ok(Box::new(adapter))
}

fn robocorp_vault_factory(
    args: &AdapterArgs,
    settings: &VaultSettings,
) -> Result<Box<dyn SecretManager>> {
    args.check(AdapterKind::RobocorpVault.as_str(), 0, &["api_host", "api_token", "workspace_id"])?;

    let mut config = RemoteVaultConfig::from_settings(settings);
    if let Some(host) = args.keyword("api_host") {
        config.api_host = Some(host.to_string());
    }
    if let Some(token) = args.keyword("api_token") {
        config.api_token = Some(ApiToken::new(token));
    }
    if let Some(workspace) = args.keyword("workspace_id") {
        config.workspace_id = Some(workspace.to_string());
    }

    Ok(Box::new(RobocorpVault::new(config)?))
}

/// Registry of adapter factories keyed by selector name.
#[derive(Clone)]
pub struct AdapterRegistry {
    factories: HashMap<String, AdapterFactory>,
}

impl fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdapterRegistry")
            .field("adapters", &self.registered_adapters())
            .finish()
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl AdapterRegistry {
    /// Create a registry holding the built-in adapters.
    pub fn new() -> Self {
        let mut registry = Self { factories: HashMap::new() };
        registry.register(AdapterKind::FileSecrets.as_str(), Self::builtin(AdapterKind::FileSecrets));
        registry
            .register(AdapterKind::RobocorpVault.as_str(), Self::builtin(AdapterKind::RobocorpVault));
        registry
    }

    /// Factory for a built-in adapter.
    pub fn builtin(kind: AdapterKind) -> AdapterFactory {
        match kind {
            AdapterKind::FileSecrets => adapter_factory(file_secrets_factory),
            AdapterKind::RobocorpVault => adapter_factory(robocorp_vault_factory),
        }
    }

    /// Register a factory under `name`, replacing any previous one.
    pub fn register(&mut self, name: impl Into<String>, factory: AdapterFactory) {
        let name = name.into();
        debug!(adapter = %name, "Registering secrets adapter");
        self.factories.insert(name, factory);
    }

    pub fn has_adapter(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    /// Registered adapter names, sorted.
    pub fn registered_adapters(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    fn lookup(&self, selector: &str) -> Option<&AdapterFactory> {
        self.factories
            .get(selector)
            .or_else(|| canonical_adapter_name(selector).and_then(|k| self.factories.get(k.as_str())))
    }

    /// Resolve the factory to use.
    ///
    /// 1. A caller-supplied default adapter wins when no selector is set.
    /// 2. Otherwise a configured selector must name a registered adapter.
    /// 3. Otherwise the remote vault is used.
    ///
    /// # Errors
    ///
    /// - [`VaultError::Config`] if the selector names no registered adapter
    pub fn resolve(
        &self,
        selector: Option<&str>,
        default_adapter: Option<&AdapterFactory>,
    ) -> Result<AdapterFactory> {
        match (selector, default_adapter) {
            (None, Some(factory)) => {
                info!("Using caller-supplied secrets adapter");
                Ok(Arc::clone(factory))
            }
            (Some(selector), _) => {
                let factory = self.lookup(selector).ok_or_else(|| {
                    VaultError::config(format!(
                        "Unknown secrets adapter '{}' (registered: {})",
                        selector,
                        self.registered_adapters().join(", ")
                    ))
                })?;
                info!(adapter = %selector, "Using configured secrets adapter");
                Ok(Arc::clone(factory))
            }
            (None, None) => {
                info!(adapter = %AdapterKind::RobocorpVault, "Using default secrets adapter");
                self.lookup(AdapterKind::RobocorpVault.as_str()).cloned().ok_or_else(|| {
                    VaultError::config("Default remote vault adapter is not registered")
                })
            }
        }
    }
}
