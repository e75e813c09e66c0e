//! Request params from pending edits, and merging of the service's answer.

use super::errors::BugError;
use super::state::BugState;
use super::values::normalize;
use shared_bus::BugEvent;
use shared_types::{BugId, FieldValue, Record, UpdateResult};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::debug;

/// Params of a create call and the values they carry.
#[derive(Debug, Clone, PartialEq)]
pub struct CreatePlan {
    pub params: Record,
    /// Field name → value sent, used to merge the reply.
    pub sent: BTreeMap<String, FieldValue>,
}

/// Params of an update call and the values they carry.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdatePlan {
    pub id: BugId,
    pub params: Record,
    pub sent: BTreeMap<String, FieldValue>,
}

impl CreatePlan {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sent.is_empty()
    }
}

impl UpdatePlan {
    /// True if there is nothing to update besides the id.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sent.is_empty()
    }
}

impl BugState {
    /// Params for creating this draft.
    ///
    /// Carries every pending or seeded field that is creatable, visible and
    /// non-empty, in registry order.
    #[must_use]
    pub fn create_plan(&self) -> CreatePlan {
        let mut params = Record::new();
        let mut sent = BTreeMap::new();
        for descriptor in self.registry.fields() {
            let name = &descriptor.name;
            if !self.pending.contains_key(name) && !self.seeded.contains(name) {
                continue;
            }
            if !descriptor.creatable || !self.is_visible_of(descriptor) {
                continue;
            }
            let value = self.value_of(descriptor);
            if value.is_empty() {
                continue;
            }
            params.insert(name.clone(), value.to_json());
            sent.insert(name.clone(), value);
        }
        CreatePlan { params, sent }
    }

    /// Params for sending pending edits of an existing bug.
    ///
    /// Multivalue fields are sent as `{add, remove}` against the confirmed
    /// list; `comment_field` is sent as `{body}`. Hidden fields and list
    /// edits with no net delta are left out.
    pub fn update_plan(&self, comment_field: &str) -> Result<UpdatePlan, BugError> {
        let id = self.id.ok_or(BugError::NotCreated)?;
        Ok(self.plan_update(id, comment_field))
    }

    pub(crate) fn plan_update(&self, id: BugId, comment_field: &str) -> UpdatePlan {
        let comment = self.registry.canonical_name(comment_field).unwrap_or(comment_field);

        let mut params = Record::new();
        params.insert("ids".to_string(), serde_json::json!([id]));
        let mut sent = BTreeMap::new();

        for descriptor in self.registry.fields() {
            let Some(value) = self.pending.get(&descriptor.name) else {
                continue;
            };
            if !self.is_visible_of(descriptor) {
                continue;
            }
            let param = if descriptor.name == comment {
                serde_json::json!({ "body": value.to_text() })
            } else if descriptor.multivalue {
                let confirmed = self.confirmed_of(descriptor);
                let (add, remove) = list_delta(&confirmed, value);
                if add.is_empty() && remove.is_empty() {
                    continue;
                }
                serde_json::json!({ "add": add, "remove": remove })
            } else {
                value.to_json()
            };
            params.insert(descriptor.name.clone(), param);
            sent.insert(descriptor.name.clone(), value.clone());
        }
        UpdatePlan { id, params, sent }
    }

    /// Merge a successful create: the bug takes `id` and the sent values
    /// become confirmed.
    pub fn apply_created(&mut self, id: BugId, sent: &BTreeMap<String, FieldValue>) -> Vec<BugEvent> {
        let before = self.effective_values();
        let visible_before = self.visibility();
        self.id = Some(id);
        for name in std::mem::take(&mut self.seeded) {
            if !sent.contains_key(&name) {
                self.confirmed.remove(&name);
            }
        }
        for (name, value) in sent {
            self.confirmed.insert(name.clone(), value.clone());
        }
        self.clear_sent(sent);
        self.settle();
        let visibility = self.reconcile_visibility(&visible_before);

        let mut events = self.changes_since(&before);
        events.extend(visibility);
        events.push(BugEvent::Created { bug_id: id });
        events
    }

    /// Merge a successful update.
    ///
    /// Fields listed in the reply's change report take the reported result;
    /// other sent fields are taken as sent. The comment is never confirmed.
    /// Edits made while the request was in flight stay pending.
    pub fn apply_updated(
        &mut self,
        result: &UpdateResult,
        sent: &BTreeMap<String, FieldValue>,
        comment_field: &str,
    ) -> Vec<BugEvent> {
        let registry = Arc::clone(&self.registry);
        let comment = registry.canonical_name(comment_field).unwrap_or(comment_field);
        let before = self.effective_values();
        let visible_before = self.visibility();

        let changes = result
            .bugs
            .iter()
            .find(|bug| bug.id.is_none() || bug.id == self.id)
            .map(|bug| &bug.changes);

        let mut reported = BTreeSet::new();
        for (field, delta) in changes.into_iter().flatten() {
            let Some(descriptor) = registry.get(field) else {
                debug!(bug_id = ?self.id, field = %field, "Ignoring change report for unknown field");
                continue;
            };
            reported.insert(descriptor.name.clone());
            if descriptor.name == comment {
                continue;
            }
            let value = if descriptor.multivalue {
                let removed = delta.removed_items();
                let mut items: Vec<FieldValue> = self
                    .confirmed_of(descriptor)
                    .items()
                    .into_iter()
                    .filter(|item| !removed.contains(&item.to_text()))
                    .collect();
                for added in delta.added_items() {
                    if !items.iter().any(|item| item.to_text() == added) {
                        items.push(FieldValue::Text(added));
                    }
                }
                FieldValue::List(items)
            } else if delta.added.is_empty() {
                FieldValue::Null
            } else {
                FieldValue::Text(delta.added.clone())
            };
            let value = normalize(descriptor, value.clone()).unwrap_or(value);
            self.confirmed.insert(descriptor.name.clone(), value);
        }

        for (name, value) in sent {
            if name != comment && !reported.contains(name) {
                self.confirmed.insert(name.clone(), value.clone());
            }
        }
        if let Some(comment) = registry.get(comment) {
            if sent.contains_key(&comment.name) {
                self.confirmed.remove(&comment.name);
            }
        }
        self.clear_sent(sent);
        self.settle();
        let visibility = self.reconcile_visibility(&visible_before);

        let mut events = self.changes_since(&before);
        events.extend(visibility);
        if let Some(bug_id) = self.id {
            events.push(BugEvent::Saved { bug_id });
        }
        events
    }

    /// Drop pending entries still equal to what was sent.
    fn clear_sent(&mut self, sent: &BTreeMap<String, FieldValue>) {
        self.pending
            .retain(|name, value| sent.get(name).map_or(true, |sent| !sent.set_eq(value)));
    }
}

/// Elements to add to and remove from `confirmed` to reach `target`, compared
/// by display form.
fn list_delta(confirmed: &FieldValue, target: &FieldValue) -> (Vec<serde_json::Value>, Vec<serde_json::Value>) {
    let before = confirmed.texts();
    let after = target.texts();
    let add = target
        .items()
        .iter()
        .filter(|item| !before.contains(&item.to_text()))
        .map(FieldValue::to_json)
        .collect();
    let remove = confirmed
        .items()
        .iter()
        .filter(|item| !after.contains(&item.to_text()))
        .map(FieldValue::to_json)
        .collect();
    (add, remove)
}
