use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::types::{Document, Operation, DEFAULT_ACCESS, OWNER_FIELD};
use crate::validation::{PayloadSchema, ValidationOptions};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid resource config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid resource config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Failed to read resource config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid resource config: {0}")]
    Invalid(String),
}

fn default_access() -> String {
    DEFAULT_ACCESS.to_string()
}

/// Resolved policy for one resource. Immutable once built; share it behind an `Arc`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ResourceConfig {
    /// Collection (or table) the handlers operate on
    pub collection: String,
    #[serde(default)]
    pub create: CreateConfig,
    #[serde(default)]
    pub read: ReadConfig,
    #[serde(default)]
    pub update: UpdateConfig,
    #[serde(default)]
    pub del: DeleteConfig,
    #[serde(default)]
    pub validation_opts: ValidationOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateConfig {
    #[serde(default = "default_access")]
    pub access: String,
    #[serde(default)]
    pub payload: Option<PayloadSchema>,
    /// Literal field defaults; a `uId` key turns on owner stamping
    #[serde(default)]
    pub defaults: Document,
    /// Field stamped with the insert time
    #[serde(default)]
    pub date: Option<String>,
    /// Field hashed before insert
    #[serde(default)]
    pub bcrypt: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReadConfig {
    #[serde(default = "default_access")]
    pub access: String,
    #[serde(default)]
    pub whitelist: Option<Vec<String>>,
    #[serde(default)]
    pub blacklist: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateConfig {
    #[serde(default = "default_access")]
    pub access: String,
    #[serde(default)]
    pub payload: Option<PayloadSchema>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub bcrypt: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeleteConfig {
    #[serde(default = "default_access")]
    pub access: String,
}

impl Default for CreateConfig {
    fn default() -> Self {
        Self {
            access: default_access(),
            payload: None,
            defaults: Document::new(),
            date: None,
            bcrypt: None,
        }
    }
}

impl Default for ReadConfig {
    fn default() -> Self {
        Self {
            access: default_access(),
            whitelist: None,
            blacklist: None,
        }
    }
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            access: default_access(),
            payload: None,
            date: None,
            bcrypt: None,
        }
    }
}

impl Default for DeleteConfig {
    fn default() -> Self {
        Self {
            access: default_access(),
        }
    }
}

impl CreateConfig {
    /// Owner stamping is on when the defaults declare the owner field, whatever its value
    pub fn stamps_owner(&self) -> bool {
        self.defaults.contains_key(OWNER_FIELD)
    }
}

impl ResourceConfig {
    /// Config with every option at its default
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            create: CreateConfig::default(),
            read: ReadConfig::default(),
            update: UpdateConfig::default(),
            del: DeleteConfig::default(),
            validation_opts: ValidationOptions::default(),
        }
    }

    /// Resolve a loosely-typed config document over the built-in defaults
    pub fn resolve(value: Value) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_value(value)?;
        config.validated()
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(text)?;
        config.validated()
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    /// Access label required by an operation
    pub fn access_for(&self, op: Operation) -> &str {
        match op {
            Operation::Create => &self.create.access,
            Operation::Read | Operation::Find => &self.read.access,
            Operation::Update => &self.update.access,
            Operation::Delete => &self.del.access,
        }
    }

    fn validated(self) -> Result<Self, ConfigError> {
        if self.collection.trim().is_empty() {
            return Err(ConfigError::Invalid("collection must not be empty".to_string()));
        }

        let labels = [
            ("create.access", &self.create.access),
            ("read.access", &self.read.access),
            ("update.access", &self.update.access),
            ("del.access", &self.del.access),
        ];
        for (key, label) in labels {
            if label.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("{} must not be empty", key)));
            }
        }

        let field_names = [
            ("create.date", &self.create.date),
            ("create.bcrypt", &self.create.bcrypt),
            ("update.date", &self.update.date),
            ("update.bcrypt", &self.update.bcrypt),
        ];
        for (key, name) in field_names {
            if matches!(name, Some(n) if n.trim().is_empty()) {
                return Err(ConfigError::Invalid(format!("{} must name a field", key)));
            }
        }

        if self.read.whitelist.is_some() && self.read.blacklist.is_some() {
            tracing::warn!(
                "Resource '{}' sets both read.whitelist and read.blacklist; only the whitelist applies",
                self.collection
            );
        }

        Ok(self)
    }
}
