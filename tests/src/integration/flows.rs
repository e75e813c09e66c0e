//! # Integration Test Flows
//!
//! The three crates working together over the fake tracker:
//!
//! 1. **Loader → Registry**: `Bug.fields` and the product list become a
//!    validated registry.
//! 2. **Registry → Bug**: drafts seeded with defaults, dependency propagation
//!    on real schema data.
//! 3. **Bug → RpcCall → Tracker**: create, update and fetch round trips,
//!    with events mirrored on the shared bus.

#[cfg(test)]
mod tests {
    use crate::fake::{FakeTracker, INVALID_FIELD};
    use bb_01_rpc_call::{RpcTransport, TrackedTransport};
    use bb_02_field_registry::{FieldRegistry, RegistryLoader, SchemaConfig};
    use bb_03_bug_entity::{BugConfig, BugContext, BugError, PersistKind};
    use serde_json::json;
    use shared_bus::{BugEvent, EventFilter, EventTopic, InMemoryEventBus};
    use shared_types::FieldValue;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::timeout;

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    async fn load_registry(transport: Arc<dyn RpcTransport>) -> Arc<FieldRegistry> {
        crate::init_test_logging();
        let loader = RegistryLoader::new(transport, SchemaConfig::default());
        Arc::new(loader.load().await.unwrap())
    }

    async fn context_for(tracker: &Arc<FakeTracker>) -> BugContext {
        let transport: Arc<dyn RpcTransport> = Arc::new(tracker.transport());
        let registry = load_registry(Arc::clone(&transport)).await;
        BugContext::new(registry, transport)
    }

    // =============================================================================
    // SCHEMA
    // =============================================================================

    #[tokio::test]
    async fn test_loaded_registry_keeps_entry_fields_only() {
        let tracker = FakeTracker::new();
        let registry = load_registry(Arc::new(tracker.transport())).await;

        assert!(registry.contains("summary"));
        assert!(registry.contains("short_desc"));
        assert!(registry.contains("cf_fixed_in"));
        assert!(!registry.contains("creation_ts"));
        assert!(!registry.contains("cf_internal"));
        assert_eq!(registry.choice_dependents("product"), ["component"]);
        assert_eq!(registry.visibility_dependents("bug_status"), ["cf_fixed_in"]);

        let product = registry.resolve("product").unwrap();
        let names: Vec<&str> = product.values.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["Core", "UI"]);
    }

    // =============================================================================
    // CREATE → FETCH
    // =============================================================================

    #[tokio::test]
    async fn test_draft_create_and_fetch_back() {
        let tracker = FakeTracker::new();
        let context = context_for(&tracker)
            .await
            .with_config(BugConfig::default().with_default("product", "Core"))
            .unwrap();

        let draft = context.draft().unwrap();
        assert_eq!(draft.value("severity").unwrap(), FieldValue::from("normal"));
        assert_eq!(draft.choices("component").unwrap(), vec!["Build", "Engine"]);
        assert!(draft.is_mandatory("summary").unwrap());

        draft.set("summary", "Engine stalls on load").unwrap();
        draft.set("component", "Engine").unwrap();
        draft.add("cc", "dev@example.com").unwrap();
        draft.save().wait().await.unwrap();

        let id = draft.id().unwrap();
        assert!(!draft.is_dirty());
        let stored = tracker.bug(id).unwrap();
        assert_eq!(stored["product"], json!("Core"));
        assert_eq!(stored["severity"], json!("normal"));
        assert_eq!(stored["cc"], json!(["dev@example.com"]));

        let fetched = context.fetch(id).await.unwrap();
        assert_eq!(fetched.value("summary").unwrap(), FieldValue::from("Engine stalls on load"));
        assert_eq!(fetched.value("status").unwrap(), FieldValue::from("NEW"));
        assert_eq!(fetched.choices("status").unwrap(), vec!["NEW", "ASSIGNED", "RESOLVED"]);
    }

    #[tokio::test]
    async fn test_rejected_create_keeps_draft() {
        let tracker = FakeTracker::new();
        let context = context_for(&tracker).await;
        let draft = context.draft().unwrap();
        draft.set("product", "UI").unwrap();

        let err = draft.save().wait().await.unwrap_err();
        assert_eq!(err.bug_id, None);
        assert_eq!(err.error.code, INVALID_FIELD);
        assert!(draft.is_new());
        assert!(draft.pending_fields().contains(&"product".to_string()));
    }

    // =============================================================================
    // UPDATE
    // =============================================================================

    #[tokio::test]
    async fn test_update_round_trip() {
        let tracker = FakeTracker::new();
        tracker.insert(
            5,
            json!({"summary": "Old", "product": "Core", "component": "Build",
                   "status": "NEW", "cc": ["a", "b"], "blocked": [2]}),
        );
        let context = context_for(&tracker).await;
        let bug = context.fetch(5).await.unwrap();

        bug.set("cc", "b, c").unwrap();
        bug.add("blocked", "9").unwrap();
        bug.set("status", "RESOLVED").unwrap();
        assert!(bug.is_visible("cf_fixed_in").unwrap());
        bug.set("cf_fixed_in", "1.1").unwrap();

        let persist = bug.save();
        assert_eq!(persist.kind(), PersistKind::Update);
        persist.wait().await.unwrap();

        assert!(!bug.is_dirty());
        let stored = tracker.bug(5).unwrap();
        assert_eq!(stored["cc"], json!(["b", "c"]));
        assert_eq!(stored["blocked"], json!([2, 9]));
        assert_eq!(stored["status"], json!("RESOLVED"));
        assert_eq!(stored["cf_fixed_in"], json!("1.1"));
        assert_eq!(bug.confirmed("blocked").unwrap(), FieldValue::list([2_i64, 9]));
        assert_eq!(bug.choices("status").unwrap(), vec!["RESOLVED", "REOPENED", "VERIFIED"]);
    }

    #[tokio::test]
    async fn test_product_switch_resets_component_before_save() {
        let tracker = FakeTracker::new();
        tracker.insert(6, json!({"summary": "x", "product": "Core", "component": "Engine"}));
        let context = context_for(&tracker).await;
        let bug = context.fetch(6).await.unwrap();

        bug.set("product", "UI").unwrap();
        assert_eq!(bug.value("component").unwrap(), FieldValue::from("Themes"));
        bug.save().wait().await.unwrap();

        let stored = tracker.bug(6).unwrap();
        assert_eq!(stored["product"], json!("UI"));
        assert_eq!(stored["component"], json!("Themes"));
    }

    #[tokio::test]
    async fn test_clean_bug_save_sends_nothing() {
        let tracker = FakeTracker::new();
        tracker.insert(7, json!({"summary": "x"}));
        let transport = Arc::new(TrackedTransport::new(tracker.transport()));
        let registry = load_registry(transport.clone()).await;
        let context = BugContext::new(registry, transport.clone());
        let bug = context.fetch(7).await.unwrap();
        let calls_before = transport.activity().snapshot().calls_total;

        let persist = bug.save();
        assert_eq!(persist.kind(), PersistKind::Noop);
        persist.wait().await.unwrap();
        assert_eq!(transport.activity().snapshot().calls_total, calls_before);
        assert!(!transport.activity().is_busy());
    }

    #[tokio::test]
    async fn test_fetch_unknown_bug_is_decode_error() {
        let tracker = FakeTracker::new();
        let context = context_for(&tracker).await;
        assert!(matches!(context.fetch(404).await, Err(BugError::Decode { .. })));
    }

    // =============================================================================
    // EVENT BUS
    // =============================================================================

    #[tokio::test]
    async fn test_events_mirrored_on_bus() {
        let tracker = FakeTracker::new();
        tracker.insert(8, json!({"summary": "x", "product": "Core", "component": "Build"}));
        let bus = Arc::new(InMemoryEventBus::new());
        let context = context_for(&tracker).await.with_event_bus(bus.clone());
        let bug = context.fetch(8).await.unwrap();

        let mut persistence = bus.subscribe(EventFilter::topics(vec![EventTopic::Persistence]));
        let mut choices = bus.subscribe(EventFilter::topics(vec![EventTopic::ChoicesUpdated]));

        bug.set("product", "UI").unwrap();
        bug.save().wait().await.unwrap();

        let event = timeout(Duration::from_secs(1), choices.recv()).await.unwrap().unwrap();
        assert!(matches!(
            event,
            BugEvent::ChoicesUpdated { ref field, .. } if field == "component"
        ));
        let event = timeout(Duration::from_secs(1), persistence.recv()).await.unwrap().unwrap();
        assert_eq!(event, BugEvent::Saved { bug_id: 8 });
    }

    // =============================================================================
    // CONCURRENCY
    // =============================================================================

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_edits_from_tasks() {
        let tracker = FakeTracker::new();
        tracker.insert(9, json!({"summary": "x", "cc": []}));
        let context = context_for(&tracker).await;
        let bug = context.fetch(9).await.unwrap();

        let tasks: Vec<_> = (0..8)
            .map(|i| {
                let bug = bug.clone();
                tokio::spawn(async move {
                    bug.add("cc", format!("user{i}@example.com")).unwrap();
                    bug.save().wait().await.unwrap();
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }
        bug.save().wait().await.unwrap();

        assert!(!bug.is_dirty());
        let stored = tracker.bug(9).unwrap();
        assert_eq!(stored["cc"].as_array().unwrap().len(), 8);
    }
}
