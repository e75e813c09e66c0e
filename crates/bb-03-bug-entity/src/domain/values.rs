//! Value normalization on write.

use super::errors::BugError;
use bb_02_field_registry::{FieldDescriptor, FieldType};
use shared_types::FieldValue;
use std::collections::HashSet;

/// Coerce `value` into the shape `descriptor` stores.
///
/// Multivalue fields take a list, a comma-joined string, a single scalar or
/// null (empty list), and keep the first of any repeated elements. Bug-id
/// fields take integers or numeric strings.
pub fn normalize(descriptor: &FieldDescriptor, value: FieldValue) -> Result<FieldValue, BugError> {
    let value = if descriptor.multivalue {
        match value {
            FieldValue::Null => FieldValue::empty_list(),
            FieldValue::Text(raw) => FieldValue::list(FieldValue::split_csv(&raw)),
            FieldValue::List(items) => FieldValue::List(items),
            scalar => FieldValue::List(vec![scalar]),
        }
    } else {
        value
    };

    let value = if descriptor.field_type == FieldType::BugId {
        match value {
            FieldValue::List(items) => items
                .into_iter()
                .filter(|item| !item.is_empty())
                .map(|item| to_bug_id(&descriptor.name, item))
                .collect::<Result<Vec<_>, _>>()
                .map(FieldValue::List)?,
            scalar => to_bug_id(&descriptor.name, scalar)?,
        }
    } else {
        value
    };

    Ok(match value {
        FieldValue::List(items) => FieldValue::List(dedup(items)),
        other => other,
    })
}

fn dedup(items: Vec<FieldValue>) -> Vec<FieldValue> {
    let mut seen = HashSet::new();
    items.into_iter().filter(|item| seen.insert(item.to_text())).collect()
}

fn to_bug_id(field: &str, value: FieldValue) -> Result<FieldValue, BugError> {
    if value.is_empty() {
        return Ok(FieldValue::Null);
    }
    match value.as_i64() {
        Some(id) if id > 0 => Ok(FieldValue::Int(id)),
        _ => Err(BugError::invalid(field, value)),
    }
}
