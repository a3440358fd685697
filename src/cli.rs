//! # Command Line Interface
//!
//! Reads and updates secrets through the same adapter resolution as the
//! library. Field values are only printed when a single field is asked for.

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::io::Write;
use std::path::PathBuf;

use crate::config::{LoggingConfig, VaultSettings};
use crate::observability::init_logging;
use crate::secrets::{AdapterKind, SecretContainer};
use crate::vault::Vault;

#[derive(Parser, Debug)]
#[command(name = "robocorp-vault")]
#[command(about = "Read and update secrets in a file or remote vault")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Adapter selector override (e.g. FileSecrets, RobocorpVault)
    #[arg(long, global = true)]
    pub adapter: Option<String>,

    /// Local secrets file; selects FileSecrets unless --adapter is given
    #[arg(long, global = true)]
    pub secrets_file: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show a secret's name, description and field names
    #[command(
        after_help = "EXAMPLES:\n    # Show field names only\n    robocorp-vault get credentials\n\n    # Print one field value\n    robocorp-vault get credentials --field password"
    )]
    Get {
        /// Secret name
        name: String,

        /// Print the value of this field instead
        #[arg(long)]
        field: Option<String>,
    },

    /// Create a secret or merge fields into an existing one
    #[command(
        after_help = "EXAMPLES:\n    robocorp-vault --secrets-file secrets.yaml set credentials username=robot password=hunter2"
    )]
    Set {
        /// Secret name
        name: String,

        /// Fields as KEY=VALUE pairs
        #[arg(required = true, value_parser = parse_key_value)]
        fields: Vec<(String, String)>,
    },
}

fn parse_key_value(value: &str) -> Result<(String, String), String> {
    match value.split_once('=') {
        Some((key, val)) if !key.is_empty() => Ok((key.to_string(), val.to_string())),
        _ => Err(format!("Invalid field '{}': expected KEY=VALUE", value)),
    }
}

/// Run CLI commands
pub fn run_cli() -> Result<()> {
    // Load .env file if it exists; must happen before reading configuration
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Warning: Error loading .env file: {}", e);
        }
    }

    let cli = Cli::parse();
    initialise_logging(cli.verbose);

    let stdout = std::io::stdout();
    execute(cli, VaultSettings::from_env(), &mut stdout.lock())
}

fn initialise_logging(verbose: bool) {
    let mut config = LoggingConfig::from_env();
    if verbose {
        config.filter = "debug".to_string();
    }

    if let Err(e) = init_logging(&config) {
        eprintln!("Warning: {}", e);
    }
}

/// Apply command line overrides to `settings`.
pub fn apply_overrides(cli: &Cli, mut settings: VaultSettings) -> VaultSettings {
    if let Some(path) = &cli.secrets_file {
        settings.secrets_file = Some(path.clone());
        if cli.adapter.is_none() {
            settings.secret_manager = Some(AdapterKind::FileSecrets.to_string());
        }
    }
    if let Some(adapter) = &cli.adapter {
        settings.secret_manager = Some(adapter.clone());
    }
    settings
}

/// Execute a parsed command, writing output to `out`.
pub fn execute<W: Write>(cli: Cli, settings: VaultSettings, out: &mut W) -> Result<()> {
    let vault = Vault::with_settings(apply_overrides(&cli, settings));

    match cli.command {
        Commands::Get { name, field } => {
            let secret = vault
                .get_secret(&name)
                .with_context(|| format!("Failed to read secret '{}'", name))?;

            match field {
                Some(field) => {
                    let value = secret.get(&field)?;
                    writeln!(out, "{}", render_value(value)?)?;
                }
                None => writeln!(out, "{}", secret.render_safe())?,
            }
        }

        Commands::Set { name, fields } => {
            let mut secret = match vault.get_secret(&name) {
                Ok(secret) => secret,
                Err(e) if e.is_not_found() => SecretContainer::named(name.as_str())?,
                Err(e) => {
                    return Err(anyhow!(e).context(format!("Failed to read secret '{}'", name)))
                }
            };

            let count = fields.len();
            secret.update(fields);
            vault
                .set_secret(&secret)
                .with_context(|| format!("Failed to store secret '{}'", name))?;

            writeln!(out, "Updated {} field(s) in secret '{}'", count, name)?;
        }
    }

    Ok(())
}

fn render_value(value: &Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        other => serde_json::to_string_pretty(other).context("Failed to serialize field value"),
    }
}
