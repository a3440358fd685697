//! Local file secrets backend.
//!
//! Stores secrets in a single JSON or YAML document, standing in for a real
//! secret manager during local development and testing:
//!
//! ```yaml
//! windows:
//!   username: admin
//!   password: secret
//! credentials:
//!   sap:
//!     login: robot
//!     password: my-secret
//! ```
//!
//! The document is loaded fresh on every call; nothing is cached between
//! calls. Writes replace the whole file through a temporary file and rename.
//!
//! # Limitations
//!
//! `set_secret` is a read-modify-write cycle. Two writers (threads or
//! processes) updating the same file concurrently can lose updates; callers
//! needing multi-writer safety must serialize externally.

use serde_json::{Map, Value};
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

use super::client::{AdapterKind, SecretManager};
use super::container::{coerce_fields, SecretContainer};
use super::error::{Result, VaultError};
use crate::config::{VaultSettings, ENV_SECRETS_FILE};

/// Serialization format of the secrets document, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Json,
    Yaml,
}

impl FileFormat {
    /// Determine the format from the path's extension.
    ///
    /// # Errors
    ///
    /// - [`VaultError::Config`] for any extension other than `json`, `yaml`
    ///   or `yml`
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or_default();

        match extension.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "yaml" | "yml" => Ok(Self::Yaml),
            _ => Err(VaultError::config(format!(
                "Unsupported secrets file extension '{}' for {} (expected .json, .yaml or .yml)",
                extension,
                path.display()
            ))),
        }
    }

    fn parse(&self, content: &str) -> Result<Value> {
        match self {
            Self::Json => serde_json::from_str(content)
                .map_err(|e| VaultError::serialization(format!("Invalid JSON document: {}", e))),
            Self::Yaml => serde_yaml::from_str::<serde_yaml::Value>(content)
                .map_err(|e| VaultError::serialization(format!("Invalid YAML document: {}", e)))
                .and_then(yaml_to_json),
        }
    }

    fn render(&self, document: &Map<String, Value>) -> Result<String> {
        match self {
            Self::Json => serde_json::to_string_pretty(document)
                .map(|mut s| {
                    s.push('\n');
                    s
                })
                .map_err(|e| VaultError::serialization(format!("Failed to encode JSON: {}", e))),
            Self::Yaml => serde_yaml::to_string(document)
                .map_err(|e| VaultError::serialization(format!("Failed to encode YAML: {}", e))),
        }
    }
}

/// Converts a parsed YAML tree into the JSON model used for secrets.
///
/// YAML allows scalar mapping keys and non-finite floats, which JSON does
/// not. Number and boolean keys become their string form. Non-finite floats
/// keep their YAML spelling as strings. Null or collection keys are rejected.
fn yaml_to_json(value: serde_yaml::Value) -> Result<Value> {
    use serde_yaml::Value as Yaml;

    Ok(match value {
        Yaml::Null => Value::Null,
        Yaml::Bool(b) => Value::Bool(b),
        Yaml::Number(n) => yaml_number(&n),
        Yaml::String(s) => Value::String(s),
        Yaml::Sequence(items) => {
            Value::Array(items.into_iter().map(yaml_to_json).collect::<Result<_>>()?)
        }
        Yaml::Mapping(mapping) => {
            let mut object = Map::with_capacity(mapping.len());
            for (key, value) in mapping {
                object.insert(yaml_key(key)?, yaml_to_json(value)?);
            }
            Value::Object(object)
        }
        Yaml::Tagged(tagged) => yaml_to_json(tagged.value)?,
    })
}

fn yaml_key(key: serde_yaml::Value) -> Result<String> {
    use serde_yaml::Value as Yaml;

    match key {
        Yaml::String(s) => Ok(s),
        Yaml::Bool(b) => Ok(b.to_string()),
        Yaml::Number(n) => Ok(match yaml_number(&n) {
            Value::String(s) => s,
            other => other.to_string(),
        }),
        Yaml::Tagged(tagged) => yaml_key(tagged.value),
        other => Err(VaultError::serialization(format!(
            "Unsupported YAML mapping key: {:?}",
            other
        ))),
    }
}

fn yaml_number(n: &serde_yaml::Number) -> Value {
    if let Some(i) = n.as_i64() {
        return Value::from(i);
    }
    if let Some(u) = n.as_u64() {
        return Value::from(u);
    }

    let f = n.as_f64().unwrap_or(f64::NAN);
    match serde_json::Number::from_f64(f) {
        Some(number) => Value::Number(number),
        None if f.is_nan() => Value::String(".nan".to_string()),
        None if f.is_sign_negative() => Value::String("-.inf".to_string()),
        None => Value::String(".inf".to_string()),
    }
}

/// Secrets backend reading and writing a local JSON/YAML document.
pub struct FileSecrets {
    path: PathBuf,
    format: FileFormat,
}

impl fmt::Debug for FileSecrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileSecrets")
            .field("path", &self.path)
            .field("format", &self.format)
            .finish()
    }
}

impl FileSecrets {
    /// Creates a file adapter for `path`.
    ///
    /// The file does not need to exist yet. The extension is checked here so
    /// a bad configuration fails immediately rather than on first access.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let format = FileFormat::from_path(&path)?;

        info!(path = %path.display(), format = ?format, "Initialized file secrets adapter");

        Ok(Self { path, format })
    }

    /// Creates a file adapter from the configured secrets file.
    ///
    /// # Errors
    ///
    /// - [`VaultError::Config`] if no secrets file is configured
    pub fn from_settings(settings: &VaultSettings) -> Result<Self> {
        let path = settings.secrets_file.clone().ok_or_else(|| {
            VaultError::config(format!("{} environment variable not set", ENV_SECRETS_FILE))
        })?;

        Self::new(path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> FileFormat {
        self.format
    }

    /// Load the whole document. A missing file is an empty document.
    pub fn load(&self) -> Result<Map<String, Value>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "Secrets file does not exist, treating as empty");
                return Ok(Map::new());
            }
            Err(e) => return Err(e.into()),
        };

        if content.trim().is_empty() {
            return Ok(Map::new());
        }

        match self.format.parse(&content)? {
            Value::Object(document) => Ok(document),
            Value::Null => Ok(Map::new()),
            _ => Err(VaultError::serialization(format!(
                "Secrets file {} must contain a mapping of secret names",
                self.path.display()
            ))),
        }
    }

    /// Replace the whole document on disk.
    fn save(&self, document: &Map<String, Value>) -> Result<()> {
        let rendered = self.format.render(document)?;

        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent)?;

        let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
        tmp.write_all(rendered.as_bytes())?;
        tmp.flush()?;
        tmp.persist(&self.path).map_err(|e| VaultError::Io(e.error))?;

        Ok(())
    }
}

impl SecretManager for FileSecrets {
    #[instrument(skip(self), fields(path = %self.path.display()))]
    fn get_secret(&self, name: &str) -> Result<SecretContainer> {
        let mut document = self.load()?;

        let entry = document.remove(name).ok_or_else(|| VaultError::not_found(name))?;
        let Value::Object(fields) = entry else {
            return Err(VaultError::serialization(format!(
                "Secret '{}' in {} is not a mapping of fields",
                name,
                self.path.display()
            )));
        };

        debug!(secret = name, fields = fields.len(), "Loaded secret from file");

        SecretContainer::new(name, String::new(), coerce_fields(fields))
    }

    #[instrument(skip(self, secret), fields(path = %self.path.display(), secret = secret.name()))]
    fn set_secret(&self, secret: &SecretContainer) -> Result<()> {
        let mut document = self.load()?;
        document.insert(secret.name().to_string(), Value::Object(secret.fields().clone()));
        self.save(&document)?;

        info!(secret = secret.name(), fields = secret.len(), "Stored secret in file");
        Ok(())
    }

    fn kind(&self) -> &str {
        AdapterKind::FileSecrets.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(FileFormat::from_path(Path::new("a.json")).unwrap(), FileFormat::Json);
        assert_eq!(FileFormat::from_path(Path::new("a.yaml")).unwrap(), FileFormat::Yaml);
        assert_eq!(FileFormat::from_path(Path::new("a.YML")).unwrap(), FileFormat::Yaml);

        for bad in ["secrets.yamla", "secrets", "secrets.toml"] {
            let err = FileFormat::from_path(Path::new(bad)).unwrap_err();
            assert!(matches!(err, VaultError::Config { .. }), "{bad}");
        }
    }

    #[test]
    fn test_invalid_extension_fails_at_construction() {
        let err = FileSecrets::new("/nonexistent/secrets.yamla").unwrap_err();
        assert!(matches!(err, VaultError::Config { .. }));
    }

    #[test]
    fn test_missing_file_is_empty_document() {
        let dir = TempDir::new().unwrap();
        let adapter = FileSecrets::new(dir.path().join("not-a-file.json")).unwrap();

        assert!(adapter.load().unwrap().is_empty());
        let err = adapter.get_secret("windows").unwrap_err();
        assert!(matches!(err, VaultError::SecretNotFound { ref name } if name == "windows"));
    }

    #[test]
    fn test_from_settings_requires_path() {
        let err = FileSecrets::from_settings(&VaultSettings::default()).unwrap_err();
        assert!(err.to_string().contains(ENV_SECRETS_FILE));
    }

    #[test]
    fn test_scalars_are_coerced() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("secrets.yaml");
        fs::write(&path, "db:\n  port: 5432\n  tls: true\n  replicas:\n    - a\n").unwrap();

        let secret = FileSecrets::new(&path).unwrap().get_secret("db").unwrap();
        assert_eq!(secret.get("port").unwrap(), "5432");
        assert_eq!(secret.get("tls").unwrap(), "true");
        assert_eq!(secret.get("replicas").unwrap(), &json!(["a"]));
    }

    #[test]
    fn test_yaml_scalar_keys_and_special_floats() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("secrets.yaml");
        fs::write(
            &path,
            "pins:\n  1234: abc\n  true: yes\n  limit: .inf\n  floor: -.inf\n  ratio: .nan\n",
        )
        .unwrap();

        let secret = FileSecrets::new(&path).unwrap().get_secret("pins").unwrap();
        assert_eq!(secret.get("1234").unwrap(), "abc");
        assert_eq!(secret.get("true").unwrap(), "yes");
        assert_eq!(secret.get("limit").unwrap(), ".inf");
        assert_eq!(secret.get("floor").unwrap(), "-.inf");
        assert_eq!(secret.get("ratio").unwrap(), ".nan");
    }

    #[test]
    fn test_yaml_null_key_is_rejected() {
        let err = FileFormat::Yaml.parse("pins:\n  ~: abc\n").unwrap_err();
        assert!(matches!(err, VaultError::Serialization { .. }));
    }

    #[test]
    fn test_non_mapping_document_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("secrets.json");
        fs::write(&path, "[1, 2, 3]").unwrap();

        let err = FileSecrets::new(&path).unwrap().get_secret("x").unwrap_err();
        assert!(matches!(err, VaultError::Serialization { .. }));
    }

    #[test]
    fn test_set_secret_creates_file_and_parents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("secrets.json");
        let adapter = FileSecrets::new(&path).unwrap();

        let mut secret = SecretContainer::named("api").unwrap();
        secret.set("key", "abc");
        adapter.set_secret(&secret).unwrap();

        let written: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written, json!({"api": {"key": "abc"}}));
    }
}
