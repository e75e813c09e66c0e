//! Shared test schema.

use bb_02_field_registry::{FieldDescriptor, FieldOption, FieldRegistry, FieldType};
use shared_types::Record;
use std::sync::Arc;

/// A small bug schema with every kind of dependency.
///
/// ```text
/// product ──value──▶ component, keywords
/// status  ──visibility──▶ resolution
/// ```
pub(crate) fn registry() -> Arc<FieldRegistry> {
    let descriptors = vec![
        FieldDescriptor::new("summary", FieldType::String).mandatory(),
        FieldDescriptor::new("product", FieldType::Select)
            .mandatory()
            .options([FieldOption::new("Core"), FieldOption::new("UI")]),
        FieldDescriptor::new("component", FieldType::Select)
            .mandatory()
            .value_field("product")
            .options([
                FieldOption::new("Engine").sort_key(20).visible_for(["Core"]),
                FieldOption::new("Build").sort_key(10).visible_for(["Core"]),
                FieldOption::new("Widgets").sort_key(10).visible_for(["UI"]),
                FieldOption::new("Themes").sort_key(10).visible_for(["UI"]),
            ]),
        FieldDescriptor::new("keywords", FieldType::Keywords)
            .value_field("product")
            .options([
                FieldOption::new("crash").visible_for(["Core", "UI"]),
                FieldOption::new("ui-glitch").sort_key(1).visible_for(["UI"]),
                FieldOption::new("perf").sort_key(1).visible_for(["Core"]),
            ]),
        FieldDescriptor::new("status", FieldType::Select).options([
            FieldOption::new("").can_change_to(["NEW", "ASSIGNED"]),
            FieldOption::new("NEW").can_change_to(["ASSIGNED", "RESOLVED"]),
            FieldOption::new("ASSIGNED").can_change_to(["RESOLVED"]),
            FieldOption::new("RESOLVED").can_change_to(["REOPENED", "VERIFIED"]),
            FieldOption::new("REOPENED").can_change_to(["ASSIGNED", "RESOLVED"]),
            FieldOption::new("VERIFIED").can_change_to(["REOPENED"]),
        ]),
        FieldDescriptor::new("resolution", FieldType::Select)
            .visibility_field("status", ["RESOLVED", "VERIFIED"])
            .options([FieldOption::new("FIXED"), FieldOption::new("WONTFIX")]),
        FieldDescriptor::new("severity", FieldType::Select)
            .internal_name("bug_severity")
            .options([
                FieldOption::new("blocker").sort_key(1),
                FieldOption::new("normal").sort_key(3).as_default(),
                FieldOption::new("minor").sort_key(4),
            ]),
        FieldDescriptor::new("op_sys", FieldType::Select)
            .mandatory()
            .options([FieldOption::new("Linux")]),
        FieldDescriptor::new("cc", FieldType::User).multivalue(),
        FieldDescriptor::new("blocked", FieldType::BugId).multivalue(),
        FieldDescriptor::new("creation_ts", FieldType::Date)
            .immutable()
            .not_creatable(),
        FieldDescriptor::new("whiteboard", FieldType::String).not_creatable(),
        FieldDescriptor::new("comment", FieldType::Text),
    ];
    match FieldRegistry::build(descriptors) {
        Ok(registry) => Arc::new(registry),
        Err(e) => panic!("fixture schema is invalid: {e}"),
    }
}

/// A server record from a JSON object literal.
pub(crate) fn record(value: serde_json::Value) -> Record {
    match value {
        serde_json::Value::Object(map) => map,
        other => panic!("record fixture must be an object, got {other}"),
    }
}
