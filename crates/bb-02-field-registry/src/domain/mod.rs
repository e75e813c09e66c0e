//! Domain Layer - field descriptors and the validated registry
//!
//! RULES:
//! - No I/O operations
//! - No async code

pub mod descriptor;
pub mod errors;
pub mod index;
pub mod registry;

pub use descriptor::{FieldDescriptor, FieldOption, FieldType};
pub use errors::{DependencyKind, LoadError, SchemaError, UnknownFieldError};
pub use index::DependencyIndex;
pub use registry::FieldRegistry;
