//! Field descriptors.

use serde::{Deserialize, Serialize};
use shared_types::FieldValue;
use std::fmt;

/// Field data types.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    #[default]
    String,
    Select,
    Multi,
    Text,
    Date,
    BugId,
    Url,
    Keywords,
    User,
    Boolean,
}

impl FieldType {
    /// Map the numeric type code used by the remote "list fields" call.
    #[must_use]
    pub fn from_wire_code(code: i64) -> Self {
        match code {
            2 => Self::Select,
            3 => Self::Multi,
            4 => Self::Text,
            5 => Self::Date,
            6 => Self::BugId,
            7 => Self::Url,
            8 => Self::Keywords,
            _ => Self::String,
        }
    }

    /// Types whose values are lists unless stated otherwise.
    #[must_use]
    pub fn is_list_type(self) -> bool {
        matches!(self, Self::Multi | Self::Keywords)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::String => "string",
            Self::Select => "select",
            Self::Multi => "multi",
            Self::Text => "text",
            Self::Date => "date",
            Self::BugId => "bug_id",
            Self::Url => "url",
            Self::Keywords => "keywords",
            Self::User => "user",
            Self::Boolean => "boolean",
        };
        f.write_str(name)
    }
}

/// One legal value of a field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldOption {
    pub name: String,
    pub sort_key: i64,
    pub is_default: bool,
    /// Values of the parent `value_field` under which this option is legal.
    pub visibility_values: Vec<String>,
    /// Workflow transitions allowed from this value. The option named `""`
    /// holds the transitions allowed for a bug without a value yet.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub can_change_to: Option<Vec<String>>,
}

impl FieldOption {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn sort_key(mut self, sort_key: i64) -> Self {
        self.sort_key = sort_key;
        self
    }

    #[must_use]
    pub fn as_default(mut self) -> Self {
        self.is_default = true;
        self
    }

    #[must_use]
    pub fn visible_for<I, S>(mut self, parents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.visibility_values = parents.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn can_change_to<I, S>(mut self, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.can_change_to = Some(targets.into_iter().map(Into::into).collect());
        self
    }
}

fn default_true() -> bool {
    true
}

/// Schema metadata for one bug field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// Stable identifier used by callers.
    pub name: String,
    /// Name used by the remote schema. Empty means same as `name`.
    #[serde(default)]
    pub internal_name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(rename = "type", default)]
    pub field_type: FieldType,
    #[serde(default)]
    pub multivalue: bool,
    /// Writes are silently ignored.
    #[serde(default)]
    pub immutable: bool,
    #[serde(default)]
    pub is_mandatory: bool,
    /// May be sent on create.
    #[serde(default = "default_true")]
    pub creatable: bool,
    /// Field whose value filters this field's choices.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_field: Option<String>,
    /// Field whose value decides whether this field is shown.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility_field: Option<String>,
    #[serde(default)]
    pub visibility_values: Vec<String>,
    #[serde(default)]
    pub values: Vec<FieldOption>,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        let name = name.into();
        Self {
            internal_name: name.clone(),
            display_name: name.clone(),
            name,
            field_type,
            multivalue: field_type.is_list_type(),
            immutable: false,
            is_mandatory: false,
            creatable: true,
            value_field: None,
            visibility_field: None,
            visibility_values: Vec::new(),
            values: Vec::new(),
        }
    }

    #[must_use]
    pub fn internal_name(mut self, internal_name: impl Into<String>) -> Self {
        self.internal_name = internal_name.into();
        self
    }

    #[must_use]
    pub fn display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }

    #[must_use]
    pub fn multivalue(mut self) -> Self {
        self.multivalue = true;
        self
    }

    #[must_use]
    pub fn immutable(mut self) -> Self {
        self.immutable = true;
        self
    }

    #[must_use]
    pub fn mandatory(mut self) -> Self {
        self.is_mandatory = true;
        self
    }

    #[must_use]
    pub fn not_creatable(mut self) -> Self {
        self.creatable = false;
        self
    }

    #[must_use]
    pub fn value_field(mut self, parent: impl Into<String>) -> Self {
        self.value_field = Some(parent.into());
        self
    }

    #[must_use]
    pub fn visibility_field<I, S>(mut self, parent: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.visibility_field = Some(parent.into());
        self.visibility_values = values.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn options<I>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = FieldOption>,
    {
        self.values = options.into_iter().collect();
        self
    }

    /// True if the field has a closed list of legal values.
    #[must_use]
    pub fn has_values(&self) -> bool {
        !self.values.is_empty()
    }

    /// True if any value carries workflow transitions.
    #[must_use]
    pub fn is_workflow(&self) -> bool {
        self.values.iter().any(|v| v.can_change_to.is_some())
    }

    #[must_use]
    pub fn option(&self, name: &str) -> Option<&FieldOption> {
        self.values.iter().find(|v| v.name == name)
    }

    /// The value of a field nobody has set: empty list or null.
    #[must_use]
    pub fn empty_value(&self) -> FieldValue {
        if self.multivalue {
            FieldValue::empty_list()
        } else {
            FieldValue::Null
        }
    }

    /// Fill in names left empty by deserialization.
    pub(crate) fn normalize_names(&mut self) {
        if self.internal_name.is_empty() {
            self.internal_name = self.name.clone();
        }
        if self.display_name.is_empty() {
            self.display_name = self.name.clone();
        }
    }
}
