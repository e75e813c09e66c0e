//! Schema loader.
//!
//! Fetches the field list, then the enterable products, then their names,
//! and builds the registry. Done once per process; callers wrap the result
//! in an `Arc` and share it.

use crate::adapters::{decode_fields, decode_product_ids, merge_products};
use crate::config::SchemaConfig;
use crate::domain::{FieldRegistry, LoadError};
use bb_01_rpc_call::{RpcCall, RpcTransport};
use serde_json::{json, Value};
use shared_types::RpcRequest;
use std::sync::Arc;
use tracing::{debug, info};

/// Loads a [`FieldRegistry`] from the remote service.
pub struct RegistryLoader {
    transport: Arc<dyn RpcTransport>,
    config: SchemaConfig,
}

impl RegistryLoader {
    pub fn new(transport: Arc<dyn RpcTransport>, config: SchemaConfig) -> Self {
        Self { transport, config }
    }

    #[must_use]
    pub fn config(&self) -> &SchemaConfig {
        &self.config
    }

    /// Run the schema fetch and build the registry.
    pub async fn load(&self) -> Result<FieldRegistry, LoadError> {
        let fields = self.call("Bug", "fields", json!({})).await?;
        let mut descriptors = decode_fields(&fields, &self.config)?;

        if self.config.enterable_products {
            let enterable = self
                .call("Product", "get_enterable_products", json!({}))
                .await?;
            let ids = decode_product_ids(&enterable)?;
            debug!(products = ids.len(), "Fetching enterable products");
            let products = self.call("Product", "get", json!({ "ids": ids })).await?;
            merge_products(&mut descriptors, &products)?;
        }

        let registry = FieldRegistry::build(descriptors)?;
        info!(fields = registry.len(), "Field registry loaded");
        Ok(registry)
    }

    async fn call(&self, namespace: &str, method: &str, params: Value) -> Result<Value, LoadError> {
        let request = RpcRequest::new(namespace, method, params);
        let method = request.qualified_method();
        RpcCall::new(Arc::clone(&self.transport), request)
            .outcome()
            .await
            .map_err(|error| LoadError::Remote { method, error })
    }
}

impl std::fmt::Debug for RegistryLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryLoader")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
