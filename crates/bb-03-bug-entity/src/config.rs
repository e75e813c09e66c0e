//! Bug entity configuration.
//!
//! # Example
//!
//! ```ignore
//! use bb_03_bug_entity::BugConfig;
//!
//! let config = BugConfig::from_json(r#"{"defaults": {"severity": "normal"}}"#)?;
//! assert_eq!(config.comment_field, "comment");
//! ```

use bb_02_field_registry::FieldRegistry;
use serde::{Deserialize, Serialize};
use shared_types::FieldValue;
use std::collections::BTreeMap;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid configuration JSON: {0}")]
    Parse(String),

    #[error("{key} must not be empty")]
    EmptyName { key: &'static str },

    #[error("Default given for unknown field: {0}")]
    UnknownDefaultField(String),
}

/// Site configuration for bug entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BugConfig {
    /// Per-field values seeded into new drafts.
    pub defaults: BTreeMap<String, FieldValue>,
    /// Field sent as `{body: ...}` on update.
    pub comment_field: String,
    /// RPC namespace of the bug methods.
    pub namespace: String,
    pub create_method: String,
    pub update_method: String,
    pub get_method: String,
}

impl Default for BugConfig {
    fn default() -> Self {
        Self {
            defaults: BTreeMap::new(),
            comment_field: "comment".to_string(),
            namespace: "Bug".to_string(),
            create_method: "create".to_string(),
            update_method: "update".to_string(),
            get_method: "get".to_string(),
        }
    }
}

impl BugConfig {
    /// Parse and validate.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every name is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let names = [
            ("comment_field", &self.comment_field),
            ("namespace", &self.namespace),
            ("create_method", &self.create_method),
            ("update_method", &self.update_method),
            ("get_method", &self.get_method),
        ];
        for (key, value) in names {
            if value.trim().is_empty() {
                return Err(ConfigError::EmptyName { key });
            }
        }
        Ok(())
    }

    /// Check that every default names a field in `registry`.
    pub fn validate_against(&self, registry: &FieldRegistry) -> Result<(), ConfigError> {
        self.validate()?;
        match self.defaults.keys().find(|name| !registry.contains(name)) {
            Some(unknown) => Err(ConfigError::UnknownDefaultField(unknown.clone())),
            None => Ok(()),
        }
    }

    /// Builder-style method to add a default
    #[must_use]
    pub fn with_default(mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.defaults.insert(field.into(), value.into());
        self
    }

    /// Builder-style method to set the comment field
    #[must_use]
    pub fn with_comment_field(mut self, field: impl Into<String>) -> Self {
        self.comment_field = field.into();
        self
    }
}
