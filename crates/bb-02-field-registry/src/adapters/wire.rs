//! Decoding of remote schema responses.
//!
//! `Bug.fields` reports every field the tracker knows, with numeric type
//! codes and internal names. Only fields that make sense on bug entry are
//! kept: custom fields flagged for bug entry, and non-custom fields listed in
//! [`SchemaConfig::builtin`].

use crate::config::SchemaConfig;
use crate::domain::{FieldDescriptor, FieldOption, FieldType, LoadError};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;
use tracing::{debug, warn};

const FIELDS_METHOD: &str = "Bug.fields";
const ENTERABLE_METHOD: &str = "Product.get_enterable_products";
const PRODUCTS_METHOD: &str = "Product.get";

#[derive(Debug, Deserialize)]
struct FieldsResponse {
    fields: Vec<WireField>,
}

#[derive(Debug, Deserialize)]
struct WireField {
    name: String,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(rename = "type", default)]
    type_code: i64,
    #[serde(default)]
    is_custom: bool,
    #[serde(default)]
    is_mandatory: bool,
    #[serde(default)]
    is_on_bug_entry: bool,
    #[serde(default)]
    value_field: Option<String>,
    #[serde(default)]
    visibility_field: Option<String>,
    #[serde(default)]
    visibility_values: Vec<String>,
    #[serde(default)]
    values: Vec<WireValue>,
}

#[derive(Debug, Deserialize)]
struct WireValue {
    #[serde(default)]
    name: String,
    #[serde(default)]
    sort_key: i64,
    #[serde(default)]
    is_default: bool,
    #[serde(default)]
    visibility_values: Vec<String>,
    #[serde(default)]
    can_change_to: Option<Vec<Transition>>,
}

/// `can_change_to` entries come as plain names or as `{name, ...}` objects.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Transition {
    Name(String),
    Object { name: String },
}

impl Transition {
    fn into_name(self) -> String {
        match self {
            Self::Name(name) | Self::Object { name } => name,
        }
    }
}

impl From<WireValue> for FieldOption {
    fn from(value: WireValue) -> Self {
        Self {
            name: value.name,
            sort_key: value.sort_key,
            is_default: value.is_default,
            visibility_values: value.visibility_values,
            can_change_to: value
                .can_change_to
                .map(|targets| targets.into_iter().map(Transition::into_name).collect()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct EnterableResponse {
    ids: Vec<u64>,
}

#[derive(Debug, Deserialize)]
struct ProductsResponse {
    products: Vec<WireProduct>,
}

#[derive(Debug, Deserialize)]
struct WireProduct {
    name: String,
}

/// Decode a `Bug.fields` result into descriptors.
///
/// Dependency links pointing at fields that were not kept are dropped so
/// the result always passes registry validation for references.
pub fn decode_fields(result: &Value, config: &SchemaConfig) -> Result<Vec<FieldDescriptor>, LoadError> {
    let response: FieldsResponse = serde_json::from_value(result.clone())
        .map_err(|e| LoadError::decode(FIELDS_METHOD, e))?;

    let mut descriptors = Vec::new();
    for wire in response.fields {
        let name = config.alias(&wire.name).to_string();
        let (field_type, mandatory, multivalue) = if wire.is_custom {
            if !wire.is_on_bug_entry {
                continue;
            }
            let field_type = FieldType::from_wire_code(wire.type_code);
            (field_type, wire.is_mandatory, field_type.is_list_type())
        } else {
            let Some(builtin) = config.builtin.get(&name) else {
                continue;
            };
            (builtin.field_type, builtin.mandatory, builtin.multivalue)
        };

        let mut descriptor = FieldDescriptor::new(name, field_type)
            .internal_name(wire.name.clone())
            .display_name(wire.display_name.unwrap_or_else(|| wire.name.clone()))
            .options(wire.values.into_iter().map(FieldOption::from));
        descriptor.multivalue = multivalue;
        descriptor.is_mandatory = mandatory;
        descriptor.value_field = wire
            .value_field
            .filter(|parent| !parent.is_empty())
            .map(|parent| config.alias(&parent).to_string());
        descriptor.visibility_field = wire
            .visibility_field
            .filter(|parent| !parent.is_empty())
            .map(|parent| config.alias(&parent).to_string());
        descriptor.visibility_values = wire.visibility_values;
        descriptors.push(descriptor);
    }

    let kept: HashSet<String> = descriptors.iter().map(|d| d.name.clone()).collect();
    for descriptor in &mut descriptors {
        for link in [&mut descriptor.value_field, &mut descriptor.visibility_field] {
            if link.as_ref().is_some_and(|parent| !kept.contains(parent)) {
                warn!(
                    field = %descriptor.name,
                    parent = ?link,
                    "Dropping dependency on a field not available on bug entry"
                );
                *link = None;
            }
        }
        if descriptor.visibility_field.is_none() {
            descriptor.visibility_values.clear();
        }
    }

    debug!(fields = descriptors.len(), "Decoded bug fields");
    Ok(descriptors)
}

/// Decode a `Product.get_enterable_products` result.
pub fn decode_product_ids(result: &Value) -> Result<Vec<u64>, LoadError> {
    serde_json::from_value::<EnterableResponse>(result.clone())
        .map(|response| response.ids)
        .map_err(|e| LoadError::decode(ENTERABLE_METHOD, e))
}

/// Replace the `product` field's values with the products in a
/// `Product.get` result. Products have no ordering and no parent.
pub fn merge_products(descriptors: &mut [FieldDescriptor], result: &Value) -> Result<(), LoadError> {
    let response: ProductsResponse = serde_json::from_value(result.clone())
        .map_err(|e| LoadError::decode(PRODUCTS_METHOD, e))?;
    let Some(product) = descriptors.iter_mut().find(|d| d.name == "product") else {
        warn!("Schema has no product field, ignoring product list");
        return Ok(());
    };
    product.values = response
        .products
        .into_iter()
        .map(|p| FieldOption::new(p.name).sort_key(0))
        .collect();
    debug!(products = product.values.len(), "Merged enterable products");
    Ok(())
}
