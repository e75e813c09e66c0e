//! Service Layer

pub mod loader;

pub use loader::RegistryLoader;
