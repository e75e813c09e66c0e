//! # Core Entities
//!
//! Defines the value model shared by the registry and the bug entity.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;

/// Numeric identifier of a bug on the remote service.
pub type BugId = u64;

/// A raw record as returned by the remote service (field name → JSON value).
pub type Record = serde_json::Map<String, Value>;

/// A single field value.
///
/// Multivalue fields hold a `List`; the list has set semantics for equality
/// (see [`FieldValue::set_eq`]) but keeps insertion order for display.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// No value.
    #[default]
    Null,
    /// Boolean flag.
    Bool(bool),
    /// Integer (bug ids, counters).
    Int(i64),
    /// Floating point (time tracking).
    Float(f64),
    /// Free text or a select value name.
    Text(String),
    /// Ordered list with set semantics.
    List(Vec<FieldValue>),
}

impl FieldValue {
    /// Empty list value.
    #[must_use]
    pub fn empty_list() -> Self {
        Self::List(Vec::new())
    }

    /// Build a list value from anything convertible.
    pub fn list<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<FieldValue>,
    {
        Self::List(items.into_iter().map(Into::into).collect())
    }

    /// True for `Null`, the empty string and the empty list.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Text(s) => s.is_empty(),
            Self::List(items) => items.is_empty(),
            _ => false,
        }
    }

    /// True if this is a list value.
    #[must_use]
    pub fn is_list(&self) -> bool {
        matches!(self, Self::List(_))
    }

    /// Borrow the inner string of a `Text` value.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Integer view: `Int` directly, numeric `Text` parsed, integral `Float` truncated.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            Self::Text(s) => s.trim().parse().ok(),
            Self::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            _ => None,
        }
    }

    /// Elements of a list; a scalar is a one-element list and `Null` is empty.
    #[must_use]
    pub fn items(&self) -> Vec<FieldValue> {
        match self {
            Self::Null => Vec::new(),
            Self::List(items) => items.clone(),
            other => vec![other.clone()],
        }
    }

    /// Display form used for string comparison and for joining lists.
    #[must_use]
    pub fn to_text(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Bool(b) => b.to_string(),
            Self::Int(n) => n.to_string(),
            Self::Float(f) => f.to_string(),
            Self::Text(s) => s.clone(),
            Self::List(items) => items
                .iter()
                .map(FieldValue::to_text)
                .collect::<Vec<_>>()
                .join(", "),
        }
    }

    /// Display forms of every element (see [`FieldValue::items`]).
    #[must_use]
    pub fn texts(&self) -> Vec<String> {
        self.items().iter().map(FieldValue::to_text).collect()
    }

    /// True if `name` equals this value, or one of its elements for a list.
    #[must_use]
    pub fn contains_text(&self, name: &str) -> bool {
        match self {
            Self::List(items) => items.iter().any(|item| item.to_text() == name),
            Self::Null => false,
            other => other.to_text() == name,
        }
    }

    /// Equality used to decide whether an edit is a no-op.
    ///
    /// Lists compare as sets of their display forms, so neither order nor
    /// repeated elements matter. Two empty values are equal regardless of representation.
    /// Everything else uses structural equality.
    #[must_use]
    pub fn set_eq(&self, other: &FieldValue) -> bool {
        if self.is_empty() && other.is_empty() {
            return true;
        }
        match (self, other) {
            (Self::List(_), Self::List(_)) => {
                let left: BTreeSet<String> = self.texts().into_iter().collect();
                let right: BTreeSet<String> = other.texts().into_iter().collect();
                left == right
            }
            _ => self == other,
        }
    }

    /// Split a comma-joined string into trimmed, non-empty parts.
    #[must_use]
    pub fn split_csv(raw: &str) -> Vec<String> {
        raw.split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Convert to a JSON value for request params.
    #[must_use]
    pub fn to_json(&self) -> Value {
        Value::from(self)
    }

    /// Decode a JSON value from a remote record.
    ///
    /// Objects are not field values; they decode to `None`.
    #[must_use]
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(Self::Null),
            Value::Bool(b) => Some(Self::Bool(*b)),
            Value::Number(n) => n
                .as_i64()
                .map(Self::Int)
                .or_else(|| n.as_f64().map(Self::Float)),
            Value::String(s) => Some(Self::Text(s.clone())),
            Value::Array(items) => items
                .iter()
                .map(Self::from_json)
                .collect::<Option<Vec<_>>>()
                .map(Self::List),
            Value::Object(_) => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

impl From<&FieldValue> for Value {
    fn from(value: &FieldValue) -> Self {
        match value {
            FieldValue::Null => Value::Null,
            FieldValue::Bool(b) => Value::Bool(*b),
            FieldValue::Int(n) => Value::from(*n),
            FieldValue::Float(f) => Value::from(*f),
            FieldValue::Text(s) => Value::String(s.clone()),
            FieldValue::List(items) => Value::Array(items.iter().map(Value::from).collect()),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&String> for FieldValue {
    fn from(value: &String) -> Self {
        Self::Text(value.clone())
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<u64> for FieldValue {
    fn from(value: u64) -> Self {
        i64::try_from(value).map_or(Self::Float(value as f64), Self::Int)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl<T: Into<FieldValue>> From<Vec<T>> for FieldValue {
    fn from(value: Vec<T>) -> Self {
        Self::list(value)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}
