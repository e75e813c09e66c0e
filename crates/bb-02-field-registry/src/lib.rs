//! # BB-02 Field Registry
//!
//! Schema metadata for bug fields: types, legal values, and the two kinds of
//! cross-field dependency (choice set and visibility).
//!
//! ## Architecture
//!
//! - **Domain Layer** (`domain/`): descriptors, the validated registry and its
//!   dependency index
//! - **Ports Layer** (`ports/`): `EntityContext`, what the registry needs to
//!   know about an entity to answer `is_mandatory`
//! - **Adapters Layer** (`adapters/`): decoding of the remote "list fields"
//!   and product responses
//! - **Service Layer** (`service/`): `RegistryLoader`, the three-call schema
//!   fetch
//!
//! ## Validation
//!
//! `FieldRegistry::build` rejects duplicate names, aliases that collide with
//! another field, dangling or self references, and dependency cycles. A
//! registry that exists is acyclic, so propagation over it terminates.
//!
//! ## Usage Example
//!
//! ```ignore
//! use bb_02_field_registry::{FieldDescriptor, FieldOption, FieldRegistry, FieldType};
//!
//! let registry = FieldRegistry::build(vec![
//!     FieldDescriptor::new("product", FieldType::Select)
//!         .options([FieldOption::new("Core"), FieldOption::new("UI")]),
//!     FieldDescriptor::new("component", FieldType::Select).value_field("product"),
//! ])?;
//! assert_eq!(registry.choice_dependents("product"), ["component"]);
//! ```

#![deny(unsafe_code)]

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
pub mod service;

// Re-exports for convenience
pub use adapters::{decode_fields, decode_product_ids, merge_products};
pub use config::{BuiltinField, SchemaConfig};
pub use domain::{
    DependencyIndex, DependencyKind, FieldDescriptor, FieldOption, FieldRegistry, FieldType,
    LoadError, SchemaError, UnknownFieldError,
};
pub use ports::EntityContext;
pub use service::RegistryLoader;
