//! Secret container: a named, ordered bundle of field values.
//!
//! Containers are produced by adapters when a secret is fetched and by caller
//! code when preparing a secret to persist. Their textual forms (`Display` and
//! `Debug`) list the secret name, description and field names only, so a
//! container can be logged or printed without leaking values.

use serde_json::{Map, Value};
use std::fmt;

use super::error::{Result, VaultError};

const MAX_NAME_LEN: usize = 255;

/// Validates that `name` is a non-empty, identifier-safe secret name.
///
/// Allowed characters are ASCII alphanumerics, `_`, `-` and `.`. A name may
/// not start with `.` or contain `..`, so `.`, `..` and hidden-style names
/// never reach a URL path segment.
pub fn validate_secret_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(VaultError::invalid_name(name, "name cannot be empty"));
    }

    if name.len() > MAX_NAME_LEN {
        return Err(VaultError::invalid_name(
            name,
            format!("exceeds maximum length of {} characters", MAX_NAME_LEN),
        ));
    }

    if name.starts_with('.') {
        return Err(VaultError::invalid_name(name, "cannot start with '.'"));
    }

    if name.contains("..") {
        return Err(VaultError::invalid_name(name, "cannot contain '..'"));
    }

    if let Some(c) =
        name.chars().find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.')))
    {
        return Err(VaultError::invalid_name(name, format!("invalid character '{}'", c)));
    }

    Ok(())
}

/// Coerces a stored value so scalars are represented as strings.
///
/// Numbers and booleans become their textual form and `null` becomes the
/// empty string. Mappings and lists are kept as-is.
pub fn coerce_field_value(value: Value) -> Value {
    match value {
        Value::String(_) | Value::Object(_) | Value::Array(_) => value,
        Value::Null => Value::String(String::new()),
        Value::Bool(b) => Value::String(b.to_string()),
        Value::Number(n) => Value::String(n.to_string()),
    }
}

/// Applies [`coerce_field_value`] to every field of a mapping.
pub fn coerce_fields(fields: Map<String, Value>) -> Map<String, Value> {
    fields.into_iter().map(|(key, value)| (key, coerce_field_value(value))).collect()
}

/// A named secret holding an ordered mapping of field name to value.
///
/// `name` and `description` are fixed at construction; fields are mutable.
/// Equality compares fields only, which also allows comparing a container
/// directly against a plain JSON object or map.
#[derive(Clone)]
pub struct SecretContainer {
    name: String,
    description: String,
    fields: Map<String, Value>,
}

impl SecretContainer {
    /// Creates a container, validating the secret name.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        fields: Map<String, Value>,
    ) -> Result<Self> {
        let name = name.into();
        validate_secret_name(&name)?;

        Ok(Self { name, description: description.into(), fields })
    }

    /// Creates an empty container with no description.
    pub fn named(name: impl Into<String>) -> Result<Self> {
        Self::new(name, String::new(), Map::new())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn into_fields(self) -> Map<String, Value> {
        self.fields
    }

    /// Returns the value of `field`.
    ///
    /// # Errors
    ///
    /// - [`VaultError::FieldNotFound`] if the field doesn't exist
    pub fn get(&self, field: &str) -> Result<&Value> {
        self.fields.get(field).ok_or_else(|| VaultError::field_not_found(field))
    }

    /// Returns a mutable reference to the value of `field`, for nested edits.
    pub fn get_mut(&mut self, field: &str) -> Result<&mut Value> {
        self.fields.get_mut(field).ok_or_else(|| VaultError::field_not_found(field))
    }

    /// Inserts or overwrites a field. Overwriting keeps the field's position.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(field.into(), value.into());
    }

    /// Merges `fields` into the container.
    ///
    /// Existing keys are overwritten in place; new keys are appended in the
    /// order given.
    pub fn update<I, K, V>(&mut self, fields: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        for (key, value) in fields {
            self.set(key, value);
        }
    }

    /// Removes `field`, keeping the order of the remaining fields.
    pub fn remove(&mut self, field: &str) -> Result<Value> {
        self.fields.shift_remove(field).ok_or_else(|| VaultError::field_not_found(field))
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Field names in insertion order. Each call starts a fresh iteration.
    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.fields.keys().map(String::as_str)
    }

    /// (name, value) pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> + '_ {
        self.fields.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Textual form used by both `Display` and `Debug`. Never contains values.
    pub fn render_safe(&self) -> String {
        let keys: Vec<&str> = self.keys().collect();
        format!(
            "Secret(name={:?}, description={:?}, keys={:?})",
            self.name, self.description, keys
        )
    }
}

impl fmt::Display for SecretContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render_safe())
    }
}

impl fmt::Debug for SecretContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render_safe())
    }
}

impl PartialEq for SecretContainer {
    fn eq(&self, other: &Self) -> bool {
        self.fields == other.fields
    }
}

impl PartialEq<Map<String, Value>> for SecretContainer {
    fn eq(&self, other: &Map<String, Value>) -> bool {
        self.fields == *other
    }
}

impl PartialEq<Value> for SecretContainer {
    fn eq(&self, other: &Value) -> bool {
        match other {
            Value::Object(map) => self.fields == *map,
            _ => false,
        }
    }
}

impl<'a> IntoIterator for &'a SecretContainer {
    type Item = (&'a String, &'a Value);
    type IntoIter = serde_json::map::Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}
