//! # Vault facade
//!
//! [`Vault`] is the entry point task code uses. It resolves which adapter to
//! use from configuration, builds it on first use, and delegates every call
//! to that single instance for the rest of its lifetime.
//!
//! ```rust,ignore
//! use robocorp_vault::Vault;
//!
//! let vault = Vault::from_env();
//! let mut secret = vault.get_secret("credentials")?;
//! secret.set("password", "rotated");
//! vault.set_secret(&secret)?;
//! ```

use once_cell::sync::OnceCell;
use std::fmt;
use tracing::{info, instrument};

use crate::config::VaultSettings;
use crate::secrets::{
    AdapterArgs, AdapterFactory, AdapterRegistry, Result, SecretContainer, SecretManager,
    VaultError,
};

/// Facade over a lazily constructed secrets adapter.
///
/// Nothing is resolved or constructed until [`Vault::ensure_adapter`] is
/// first called, directly or through `get_secret`/`set_secret`. A failed
/// construction is not cached and is attempted again on the next call.
pub struct Vault {
    settings: VaultSettings,
    registry: AdapterRegistry,
    args: AdapterArgs,
    default_adapter: Option<AdapterFactory>,
    adapter: OnceCell<Box<dyn SecretManager>>,
}

impl fmt::Debug for Vault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Vault")
            .field("settings", &self.settings)
            .field("args", &self.args)
            .field("default_adapter", &self.default_adapter.is_some())
            .field("adapter", &self.adapter.get())
            .finish()
    }
}

impl Default for Vault {
    fn default() -> Self {
        Self::from_env()
    }
}

impl Vault {
    /// Facade configured from the process environment.
    pub fn from_env() -> Self {
        Self::builder().build()
    }

    /// Facade configured from explicit settings.
    pub fn with_settings(settings: VaultSettings) -> Self {
        Self::builder().settings(settings).build()
    }

    pub fn builder() -> VaultBuilder {
        VaultBuilder::default()
    }

    pub fn settings(&self) -> &VaultSettings {
        &self.settings
    }

    /// Whether the adapter has been constructed yet.
    pub fn is_initialized(&self) -> bool {
        self.adapter.get().is_some()
    }

    /// Returns the adapter, resolving and constructing it on first call.
    ///
    /// # Errors
    ///
    /// - [`VaultError::Config`] if the selector is unknown or the adapter is
    ///   missing configuration it needs at construction
    pub fn ensure_adapter(&self) -> Result<&dyn SecretManager> {
        let adapter = self.adapter.get_or_try_init(|| {
            let factory = self
                .registry
                .resolve(self.settings.secret_manager.as_deref(), self.default_adapter.as_ref())?;
            let adapter = factory(&self.args, &self.settings)?;

            info!(adapter = adapter.kind(), "Secrets adapter ready");
            Ok::<_, VaultError>(adapter)
        })?;

        Ok(&**adapter)
    }

    #[instrument(skip(self))]
    pub fn get_secret(&self, name: &str) -> Result<SecretContainer> {
        self.ensure_adapter()?.get_secret(name)
    }

    #[instrument(skip(self, secret), fields(secret = secret.name()))]
    pub fn set_secret(&self, secret: &SecretContainer) -> Result<()> {
        self.ensure_adapter()?.set_secret(secret)
    }
}

/// Builder for [`Vault`].
#[derive(Default)]
pub struct VaultBuilder {
    settings: Option<VaultSettings>,
    registry: Option<AdapterRegistry>,
    args: AdapterArgs,
    default_adapter: Option<AdapterFactory>,
}

impl VaultBuilder {
    /// Use these settings instead of reading the environment.
    pub fn settings(mut self, settings: VaultSettings) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Resolve selectors against a custom registry.
    pub fn registry(mut self, registry: AdapterRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Positional argument forwarded to the adapter constructor.
    pub fn arg(mut self, value: impl Into<String>) -> Self {
        self.args = self.args.arg(value);
        self
    }

    /// Keyword argument forwarded to the adapter constructor.
    pub fn kwarg(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.args = self.args.kwarg(name, value);
        self
    }

    pub fn args(mut self, args: AdapterArgs) -> Self {
        self.args = args;
        self
    }

    /// Adapter used when no selector is configured.
    pub fn default_adapter(mut self, factory: AdapterFactory) -> Self {
        self.default_adapter = Some(factory);
        self
    }

    pub fn build(self) -> Vault {
        Vault {
            settings: self.settings.unwrap_or_else(VaultSettings::from_env),
            registry: self.registry.unwrap_or_default(),
            args: self.args,
            default_adapter: self.default_adapter,
            adapter: OnceCell::new(),
        }
    }
}
