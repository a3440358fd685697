//! Remote vault secrets backend.
//!
//! Fetches secrets from the hosted secret storage service over HTTPS. Values
//! travel encrypted with the transit scheme described in
//! [`super::transit`]; only this adapter instance can decrypt them.
//!
//! # Configuration
//!
//! - `RC_API_SECRET_HOST`: service base URL
//! - `RC_API_SECRET_TOKEN`: bearer token
//! - `RC_WORKSPACE_ID`: workspace holding the secrets
//!
//! Missing values do not fail construction. They are reported as a
//! configuration error naming the variable when the first request is made.
//!
//! # Example
//!
//! ```rust,ignore
//! use robocorp_vault::secrets::{RobocorpVault, SecretManager};
//! use robocorp_vault::VaultSettings;
//!
//! let adapter = RobocorpVault::from_settings(&VaultSettings::from_env())?;
//! let secret = adapter.get_secret("credentials")?;
//! ```

use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use super::client::{AdapterKind, SecretManager};
use super::container::{coerce_fields, validate_secret_name, SecretContainer};
use super::error::{Result, VaultError};
use super::transit::{SecretPayload, TransitKeypair, ENCRYPTION_SCHEME};
use super::token::ApiToken;
use crate::config::{VaultSettings, ENV_API_HOST, ENV_API_TOKEN, ENV_WORKSPACE_ID};

/// Connection settings for the remote vault.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RemoteVaultConfig {
    /// Service base URL (e.g. "https://api.eu1.robocorp.com")
    pub api_host: Option<String>,

    /// Bearer token (redacted in logs)
    pub api_token: Option<ApiToken>,

    /// Workspace identifier
    pub workspace_id: Option<String>,
}

impl RemoteVaultConfig {
    pub fn from_settings(settings: &VaultSettings) -> Self {
        Self {
            api_host: settings.api_host.clone(),
            api_token: settings.api_token.clone(),
            workspace_id: settings.workspace_id.clone(),
        }
    }

    /// Returns (host, token, workspace) or a configuration error naming the
    /// first missing variable.
    fn require(&self) -> Result<(&str, &ApiToken, &str)> {
        fn missing(variable: &str) -> VaultError {
            VaultError::config(format!("{} environment variable not set", variable))
        }

        let host = self.api_host.as_deref().ok_or_else(|| missing(ENV_API_HOST))?;
        let token = self.api_token.as_ref().ok_or_else(|| missing(ENV_API_TOKEN))?;
        let workspace = self.workspace_id.as_deref().ok_or_else(|| missing(ENV_WORKSPACE_ID))?;

        Ok((host, token, workspace))
    }
}

/// Remote vault adapter.
///
/// Each instance owns a transit keypair generated at construction and used
/// for every request it makes. Key material is never shared between
/// instances.
pub struct RobocorpVault {
    config: RemoteVaultConfig,
    client: Client,
    keypair: TransitKeypair,
}

impl fmt::Debug for RobocorpVault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RobocorpVault")
            .field("api_host", &self.config.api_host)
            .field("workspace_id", &self.config.workspace_id)
            .field("api_token", &self.config.api_token)
            .field("keypair", &self.keypair)
            .finish()
    }
}

impl RobocorpVault {
    /// Creates the adapter and generates its transit keypair.
    ///
    /// # Errors
    ///
    /// - [`VaultError::VaultAccess`] if key generation or HTTP client setup
    ///   fails
    pub fn new(config: RemoteVaultConfig) -> Result<Self> {
        let keypair = TransitKeypair::generate()?;

        // No intrinsic timeout; callers wanting one wrap calls externally.
        let client = Client::builder()
            .user_agent(concat!("robocorp-vault/", env!("CARGO_PKG_VERSION")))
            .timeout(None::<Duration>)
            .build()
            .map_err(|e| VaultError::vault_access_with("Failed to create HTTP client", e))?;

        info!(
            api_host = ?config.api_host,
            workspace_id = ?config.workspace_id,
            "Initialized remote vault adapter"
        );

        Ok(Self { config, client, keypair })
    }

    pub fn from_settings(settings: &VaultSettings) -> Result<Self> {
        Self::new(RemoteVaultConfig::from_settings(settings))
    }

    pub fn config(&self) -> &RemoteVaultConfig {
        &self.config
    }

    /// Base64 SPKI DER public key sent with every request.
    pub fn public_key_base64(&self) -> &str {
        self.keypair.public_key_base64()
    }

    fn secret_url(host: &str, workspace: &str, name: &str) -> String {
        format!(
            "{}/secrets-v1/workspaces/{}/secrets/{}",
            host.trim_end_matches('/'),
            workspace,
            name
        )
    }

    fn fetch_payload(&self, name: &str) -> Result<SecretPayload> {
        let (host, token, workspace) = self.config.require()?;
        let url = Self::secret_url(host, workspace, name);

        debug!(secret = name, workspace_id = workspace, "Requesting secret from remote vault");

        let response = self
            .client
            .get(&url)
            .bearer_auth(token.expose())
            .query(&[
                ("encryptionScheme", ENCRYPTION_SCHEME),
                ("publicKey", self.keypair.public_key_base64()),
            ])
            .send()
            .map_err(|e| {
                warn!(secret = name, error = %e, "Remote vault request failed");
                VaultError::vault_access_with(format!("Failed to fetch secret '{}'", name), e)
            })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(VaultError::not_found(name));
        }
        if !status.is_success() {
            warn!(secret = name, status = %status, "Remote vault returned an error status");
            return Err(VaultError::vault_access(format!(
                "Remote vault returned HTTP {} for secret '{}'",
                status, name
            )));
        }

        response.json::<SecretPayload>().map_err(|e| {
            VaultError::vault_access_with(
                format!("Invalid response body for secret '{}'", name),
                e,
            )
        })
    }

    /// Decrypts a service response into a container.
    ///
    /// # Errors
    ///
    /// - [`VaultError::VaultAccess`] if decryption fails or the plaintext is
    ///   not a JSON object
    pub fn decrypt_payload(&self, payload: &SecretPayload) -> Result<SecretContainer> {
        let plaintext = self.keypair.decrypt(payload)?;

        let fields = match serde_json::from_slice::<Value>(&plaintext) {
            Ok(Value::Object(fields)) => fields,
            Ok(_) => {
                return Err(VaultError::vault_access(format!(
                    "Decrypted secret '{}' is not a JSON object",
                    payload.name
                )))
            }
            Err(e) => {
                return Err(VaultError::vault_access_with(
                    format!("Decrypted secret '{}' is not valid JSON", payload.name),
                    e,
                ))
            }
        };

        SecretContainer::new(
            payload.name.clone(),
            payload.description.clone().unwrap_or_default(),
            coerce_fields(fields),
        )
    }
}

impl SecretManager for RobocorpVault {
    #[instrument(skip(self))]
    fn get_secret(&self, name: &str) -> Result<SecretContainer> {
        validate_secret_name(name)?;

        let payload = self.fetch_payload(name)?;
        let secret = self.decrypt_payload(&payload)?;

        debug!(secret = name, fields = secret.len(), "Fetched secret from remote vault");
        Ok(secret)
    }

    fn set_secret(&self, secret: &SecretContainer) -> Result<()> {
        Err(VaultError::unsupported(format!(
            "set_secret on RobocorpVault (secret '{}'); the remote vault is read-only",
            secret.name()
        )))
    }

    fn kind(&self) -> &str {
        AdapterKind::RobocorpVault.as_str()
    }
}
