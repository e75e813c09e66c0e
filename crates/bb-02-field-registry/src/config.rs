//! Schema loading configuration.

use crate::domain::FieldType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Overrides applied on top of a non-custom field from the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuiltinField {
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub mandatory: bool,
    pub multivalue: bool,
}

impl BuiltinField {
    const fn of(field_type: FieldType) -> Self {
        Self {
            field_type,
            mandatory: false,
            multivalue: false,
        }
    }

    const fn required(mut self) -> Self {
        self.mandatory = true;
        self
    }

    const fn list(mut self) -> Self {
        self.multivalue = true;
        self
    }
}

/// Configuration for [`crate::RegistryLoader`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaConfig {
    /// Remote internal name → field name.
    pub aliases: BTreeMap<String, String>,
    /// Non-custom fields to keep, by field name.
    pub builtin: BTreeMap<String, BuiltinField>,
    /// Fetch the product list through `Product.get_enterable_products`.
    pub enterable_products: bool,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        let aliases = [
            ("rep_platform", "platform"),
            ("bug_severity", "severity"),
            ("bug_status", "status"),
            ("longdesc", "description"),
            ("short_desc", "summary"),
        ]
        .into_iter()
        .map(|(from, to)| (from.to_string(), to.to_string()))
        .collect();

        use FieldType as T;
        let builtin = [
            ("product", BuiltinField::of(T::Select).required()),
            ("component", BuiltinField::of(T::Select).required()),
            ("version", BuiltinField::of(T::Select).required()),
            ("summary", BuiltinField::of(T::String).required()),
            ("description", BuiltinField::of(T::Text)),
            ("op_sys", BuiltinField::of(T::Select)),
            ("platform", BuiltinField::of(T::Select)),
            ("priority", BuiltinField::of(T::Select)),
            ("severity", BuiltinField::of(T::Select)),
            ("alias", BuiltinField::of(T::String)),
            ("assigned_to", BuiltinField::of(T::User)),
            ("cc", BuiltinField::of(T::User).list()),
            ("qa_contact", BuiltinField::of(T::User)),
            ("status", BuiltinField::of(T::Select)),
            ("estimated_time", BuiltinField::of(T::String)),
            ("blocked", BuiltinField::of(T::BugId).list()),
            ("dependson", BuiltinField::of(T::BugId).list()),
        ]
        .into_iter()
        .map(|(name, field)| (name.to_string(), field))
        .collect();

        Self {
            aliases,
            builtin,
            enterable_products: true,
        }
    }
}

impl SchemaConfig {
    /// Parse from JSON; missing keys keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Field name for a remote internal name.
    #[must_use]
    pub fn alias<'a>(&'a self, internal_name: &'a str) -> &'a str {
        self.aliases
            .get(internal_name)
            .map_or(internal_name, String::as_str)
    }
}
