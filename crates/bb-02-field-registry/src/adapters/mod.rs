//! Adapters Layer
//!
//! Decoding of remote schema responses into field descriptors.

pub mod wire;

pub use wire::{decode_fields, decode_product_ids, merge_products};
