//! Derived dependency index.

use std::collections::HashMap;

/// Reverse dependency links plus the alias table, derived once per registry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyIndex {
    /// parent → fields whose choices depend on it, in registry order
    pub(crate) choice_dependents: HashMap<String, Vec<String>>,
    /// parent → fields whose visibility depends on it, in registry order
    pub(crate) visibility_dependents: HashMap<String, Vec<String>>,
    /// internal name → name
    pub(crate) aliases: HashMap<String, String>,
    /// every field, parents before dependents
    pub(crate) order: Vec<String>,
}

impl DependencyIndex {
    #[must_use]
    pub fn choice_dependents(&self, name: &str) -> &[String] {
        self.choice_dependents
            .get(name)
            .map_or(&[][..], Vec::as_slice)
    }

    #[must_use]
    pub fn visibility_dependents(&self, name: &str) -> &[String] {
        self.visibility_dependents
            .get(name)
            .map_or(&[][..], Vec::as_slice)
    }

    #[must_use]
    pub fn alias_target(&self, internal_name: &str) -> Option<&str> {
        self.aliases.get(internal_name).map(String::as_str)
    }

    /// Every field name, each after the fields it depends on.
    #[must_use]
    pub fn topological_order(&self) -> &[String] {
        &self.order
    }
}
