//! # Fake Tracker
//!
//! Answers `Bug.fields`, the product methods and `Bug.create/update/get`
//! from memory, so flows run end to end without a network.

use bb_01_rpc_call::InMemoryTransport;
use parking_lot::Mutex;
use serde_json::{json, Map, Value};
use shared_types::{BugId, FieldValue, Record, RpcRequest, TransportFailure, TransportReply};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Error code the tracker uses for rejected input.
pub const INVALID_FIELD: i64 = 51;

/// In-memory bug store with a fixed schema.
pub struct FakeTracker {
    next_id: AtomicU64,
    bugs: Mutex<BTreeMap<BugId, Record>>,
}

impl Default for FakeTracker {
    fn default() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            bugs: Mutex::new(BTreeMap::new()),
        }
    }
}

impl FakeTracker {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// A transport whose every request is answered by this tracker.
    pub fn transport(self: &Arc<Self>) -> InMemoryTransport {
        let tracker = Arc::clone(self);
        InMemoryTransport::with_handler(move |request| Some(tracker.handle(request)))
    }

    /// Store `record` as bug `id`.
    pub fn insert(&self, id: BugId, record: Value) {
        let mut record = match record {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        record.insert("id".into(), json!(id));
        self.bugs.lock().insert(id, record);
        self.next_id.fetch_max(id + 1, Ordering::SeqCst);
    }

    /// Current server copy of bug `id`.
    pub fn bug(&self, id: BugId) -> Option<Record> {
        self.bugs.lock().get(&id).cloned()
    }

    pub fn handle(&self, request: &RpcRequest) -> TransportReply {
        debug!(method = %request.qualified_method(), "Fake tracker request");
        match request.qualified_method().as_str() {
            "Bug.fields" => Ok(schema()),
            "Product.get_enterable_products" => Ok(json!({"ids": [1, 2]})),
            "Product.get" => Ok(json!({"products": [{"name": "Core"}, {"name": "UI"}]})),
            "Bug.create" => self.create(&request.params),
            "Bug.update" => self.update(&request.params),
            "Bug.get" => Ok(self.get(&request.params)),
            other => Err(reject(-32601, &format!("Unknown method {other}"))),
        }
    }

    fn create(&self, params: &Value) -> TransportReply {
        let Some(params) = params.as_object() else {
            return Err(reject(-32602, "params must be an object"));
        };
        if params.get("summary").map_or(true, |s| s.as_str().map_or(true, str::is_empty)) {
            return Err(reject(INVALID_FIELD, "You must enter a summary"));
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let mut record = params.clone();
        record.entry("status").or_insert_with(|| json!("NEW"));
        record.insert("id".into(), json!(id));
        self.bugs.lock().insert(id, record);
        info!(bug_id = id, "Fake tracker created bug");
        Ok(json!({ "id": id }))
    }

    fn update(&self, params: &Value) -> TransportReply {
        let ids: Vec<BugId> = params["ids"]
            .as_array()
            .map(|ids| ids.iter().filter_map(Value::as_u64).collect())
            .unwrap_or_default();
        let mut bugs = self.bugs.lock();
        let mut reports = Vec::new();
        for id in ids {
            let Some(record) = bugs.get_mut(&id) else {
                return Err(reject(101, &format!("Bug #{id} does not exist")));
            };
            let mut changes = Map::new();
            for (field, change) in params.as_object().into_iter().flatten() {
                if field == "ids" || change.get("body").is_some() {
                    continue;
                }
                let before = record.get(field).cloned().unwrap_or(Value::Null);
                let after = match (change.get("add"), change.get("remove")) {
                    (Some(add), Some(remove)) => apply_list_delta(&before, add, remove),
                    _ => change.clone(),
                };
                let (added, removed) = describe(&before, &after);
                if added.is_empty() && removed.is_empty() {
                    continue;
                }
                record.insert(field.clone(), after);
                changes.insert(field.clone(), json!({"added": added, "removed": removed}));
            }
            info!(bug_id = id, changed = changes.len(), "Fake tracker updated bug");
            reports.push(json!({"id": id, "changes": changes}));
        }
        Ok(json!({ "bugs": reports }))
    }

    fn get(&self, params: &Value) -> Value {
        let bugs = self.bugs.lock();
        let records: Vec<Value> = params["ids"]
            .as_array()
            .into_iter()
            .flatten()
            .filter_map(Value::as_u64)
            .filter_map(|id| bugs.get(&id).cloned().map(Value::Object))
            .collect();
        json!({ "bugs": records })
    }
}

fn reject(code: i64, message: &str) -> TransportFailure {
    TransportFailure::Structured(json!({"code": code, "message": message}))
}

fn texts(value: &Value) -> Vec<String> {
    FieldValue::from_json(value).map(|v| v.texts()).unwrap_or_default()
}

fn apply_list_delta(before: &Value, add: &Value, remove: &Value) -> Value {
    let removing = texts(remove);
    let mut items: Vec<Value> = before
        .as_array()
        .into_iter()
        .flatten()
        .filter(|item| !removing.contains(&texts(item).join("")))
        .cloned()
        .collect();
    for item in add.as_array().into_iter().flatten() {
        if !items.contains(item) {
            items.push(item.clone());
        }
    }
    Value::Array(items)
}

/// Comma-joined `added`/`removed` strings, as the tracker reports them.
fn describe(before: &Value, after: &Value) -> (String, String) {
    let old = texts(before);
    let new = texts(after);
    let added: Vec<String> = new.iter().filter(|t| !old.contains(t)).cloned().collect();
    let removed: Vec<String> = old.iter().filter(|t| !new.contains(t)).cloned().collect();
    (added.join(", "), removed.join(", "))
}

/// The tracker's `Bug.fields` result.
pub fn schema() -> Value {
    json!({
        "fields": [
            {"name": "product", "display_name": "Product", "type": 2, "is_custom": false},
            {"name": "component", "display_name": "Component", "type": 2, "is_custom": false,
             "value_field": "product",
             "values": [
                {"name": "Engine", "sort_key": 20, "visibility_values": ["Core"]},
                {"name": "Build", "sort_key": 10, "visibility_values": ["Core"]},
                {"name": "Widgets", "sort_key": 10, "visibility_values": ["UI"]},
                {"name": "Themes", "sort_key": 10, "visibility_values": ["UI"]}
             ]},
            {"name": "short_desc", "display_name": "Summary", "type": 1, "is_custom": false},
            {"name": "bug_status", "display_name": "Status", "type": 2, "is_custom": false,
             "values": [
                {"name": "", "can_change_to": [{"name": "NEW"}, {"name": "ASSIGNED"}]},
                {"name": "NEW", "can_change_to": [{"name": "ASSIGNED"}, {"name": "RESOLVED"}]},
                {"name": "ASSIGNED", "can_change_to": [{"name": "RESOLVED"}]},
                {"name": "RESOLVED", "can_change_to": [{"name": "REOPENED"}, {"name": "VERIFIED"}]}
             ]},
            {"name": "bug_severity", "display_name": "Severity", "type": 2, "is_custom": false,
             "values": [
                {"name": "major", "sort_key": 1},
                {"name": "normal", "sort_key": 2, "is_default": true},
                {"name": "minor", "sort_key": 3}
             ]},
            {"name": "cc", "display_name": "CC", "type": 0, "is_custom": false},
            {"name": "blocked", "display_name": "Blocks", "type": 0, "is_custom": false},
            {"name": "creation_ts", "display_name": "Opened", "type": 5, "is_custom": false},
            {"name": "cf_fixed_in", "display_name": "Fixed In", "type": 2, "is_custom": true,
             "is_on_bug_entry": true, "visibility_field": "bug_status",
             "visibility_values": ["RESOLVED", "VERIFIED"],
             "values": [{"name": "1.0", "sort_key": 1}, {"name": "1.1", "sort_key": 2}]},
            {"name": "cf_internal", "display_name": "Internal", "type": 1, "is_custom": true,
             "is_on_bug_entry": false}
        ]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_reports_list_delta() {
        let tracker = FakeTracker::new();
        tracker.insert(3, json!({"cc": ["a", "b"]}));
        let reply = tracker
            .handle(&RpcRequest::new(
                "Bug",
                "update",
                json!({"ids": [3], "cc": {"add": ["c"], "remove": ["a"]}}),
            ))
            .unwrap();
        assert_eq!(reply["bugs"][0]["changes"]["cc"], json!({"added": "c", "removed": "a"}));
        assert_eq!(tracker.bug(3).unwrap()["cc"], json!(["b", "c"]));
    }

    #[test]
    fn test_create_requires_summary() {
        let tracker = FakeTracker::new();
        let reply = tracker.handle(&RpcRequest::new("Bug", "create", json!({"product": "Core"})));
        assert!(matches!(reply, Err(TransportFailure::Structured(_))));
    }
}
