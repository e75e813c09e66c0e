//! Everything a bug needs besides its own values.

use super::bug::Bug;
use crate::config::BugConfig;
use crate::domain::{BugError, BugState};
use bb_01_rpc_call::{RpcCall, RpcTransport};
use bb_02_field_registry::FieldRegistry;
use shared_bus::EventPublisher;
use shared_types::{BugId, FieldValue, GetResult, Record, RpcRequest};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Shared dependencies of bug entities: the registry, the transport, site
/// configuration and an optional event bus.
///
/// Cheap to clone; every bug created from a context holds a clone.
#[derive(Clone)]
pub struct BugContext {
    registry: Arc<FieldRegistry>,
    transport: Arc<dyn RpcTransport>,
    config: Arc<BugConfig>,
    bus: Option<Arc<dyn EventPublisher>>,
}

impl BugContext {
    /// Context with the default configuration and no event bus.
    pub fn new(registry: Arc<FieldRegistry>, transport: Arc<dyn RpcTransport>) -> Self {
        Self {
            registry,
            transport,
            config: Arc::new(BugConfig::default()),
            bus: None,
        }
    }

    /// Replace the configuration after checking it against the registry.
    pub fn with_config(mut self, config: BugConfig) -> Result<Self, BugError> {
        config.validate_against(&self.registry)?;
        self.config = Arc::new(config);
        Ok(self)
    }

    /// Mirror every entity event onto `bus`.
    #[must_use]
    pub fn with_event_bus(mut self, bus: Arc<dyn EventPublisher>) -> Self {
        self.bus = Some(bus);
        self
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<FieldRegistry> {
        &self.registry
    }

    #[must_use]
    pub fn transport(&self) -> &Arc<dyn RpcTransport> {
        &self.transport
    }

    #[must_use]
    pub fn config(&self) -> &BugConfig {
        &self.config
    }

    pub(crate) fn bus(&self) -> Option<&Arc<dyn EventPublisher>> {
        self.bus.as_ref()
    }

    /// A new, unsaved bug seeded with defaults.
    pub fn draft(&self) -> Result<Bug, BugError> {
        let state = BugState::draft(Arc::clone(&self.registry), &self.config.defaults)?;
        debug!(fields = self.registry.len(), "Created draft bug");
        Ok(Bug::new(self.clone(), state))
    }

    /// A draft with `initial` values written in order, after defaults.
    pub fn draft_with<I, K, V>(&self, initial: I) -> Result<Bug, BugError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<FieldValue>,
    {
        let bug = self.draft()?;
        for (field, value) in initial {
            bug.set(field.as_ref(), value)?;
        }
        Ok(bug)
    }

    /// A bug from a record the caller already holds.
    #[must_use]
    pub fn from_record(&self, record: &Record) -> Bug {
        Bug::new(self.clone(), BugState::from_record(Arc::clone(&self.registry), record))
    }

    /// Load bug `id` from the service.
    pub async fn fetch(&self, id: BugId) -> Result<Bug, BugError> {
        let request = self.get_request(id);
        let method = request.qualified_method();
        let result = RpcCall::new(Arc::clone(&self.transport), request)
            .outcome()
            .await
            .map_err(|error| BugError::Remote {
                method: method.clone(),
                error,
            })?;
        let record = find_record(result, id).map_err(|reason| BugError::Decode { method, reason })?;
        info!(bug_id = id, "Fetched bug");
        Ok(self.from_record(&record))
    }

    pub(crate) fn get_request(&self, id: BugId) -> RpcRequest {
        RpcRequest::new(
            self.config.namespace.clone(),
            self.config.get_method.clone(),
            serde_json::json!({ "ids": [id] }),
        )
    }
}

/// The record of bug `id` in a `get` result.
pub(crate) fn find_record(result: serde_json::Value, id: BugId) -> Result<Record, String> {
    let result: GetResult = serde_json::from_value(result).map_err(|e| e.to_string())?;
    result
        .bugs
        .into_iter()
        .find(|record| record.get("id").and_then(serde_json::Value::as_u64) == Some(id))
        .ok_or_else(|| format!("bug {id} missing from response"))
}

impl fmt::Debug for BugContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BugContext")
            .field("fields", &self.registry.len())
            .field("config", &self.config)
            .field("bus", &self.bus.is_some())
            .finish_non_exhaustive()
    }
}
