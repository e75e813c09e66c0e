//! # Bug State
//!
//! Confirmed server values plus the pending overlay of local edits, and the
//! dependency propagation that runs after every write.
//!
//! ## Invariants
//!
//! - A pending value never equals (set-equality for lists) its confirmed
//!   value; such entries are dropped on write.
//! - After a parent changes, every constrained choice dependent holds a value
//!   inside its recomputed choice set, or is empty when none is legal.
//! - A hidden field has no pending value.
//!
//! Operations never call subscribers. They return the [`BugEvent`]s they
//! produced, in order, and the caller publishes them.

use super::errors::BugError;
use super::values::normalize;
use bb_02_field_registry::{EntityContext, FieldDescriptor, FieldOption, FieldRegistry, UnknownFieldError};
use shared_bus::BugEvent;
use shared_types::{BugId, FieldValue, Record};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

/// Values of one bug.
#[derive(Clone)]
pub struct BugState {
    pub(super) registry: Arc<FieldRegistry>,
    pub(super) id: Option<BugId>,
    pub(super) confirmed: BTreeMap<String, FieldValue>,
    pub(super) pending: BTreeMap<String, FieldValue>,
    /// Draft fields whose confirmed value came from a default.
    pub(super) seeded: BTreeSet<String>,
}

impl BugState {
    /// A draft with nothing confirmed.
    pub fn new(registry: Arc<FieldRegistry>) -> Self {
        Self {
            registry,
            id: None,
            confirmed: BTreeMap::new(),
            pending: BTreeMap::new(),
            seeded: BTreeSet::new(),
        }
    }

    /// A draft whose confirmed values are seeded from defaults.
    ///
    /// Fields are visited parents first. Each takes the site default from
    /// `defaults` if present, else the field's own default given the values
    /// seeded so far.
    pub fn draft(
        registry: Arc<FieldRegistry>,
        defaults: &BTreeMap<String, FieldValue>,
    ) -> Result<Self, BugError> {
        let mut site_defaults = BTreeMap::new();
        for (name, value) in defaults {
            let descriptor = registry.resolve(name)?;
            site_defaults.insert(descriptor.name.clone(), normalize(descriptor, value.clone())?);
        }

        let mut state = Self::new(Arc::clone(&registry));
        for name in registry.topological_order() {
            let descriptor = registry.resolve(name)?;
            let seed = match site_defaults.remove(name) {
                Some(value) => Some(value),
                None => state.default_of(descriptor),
            };
            if let Some(value) = seed.filter(|v| !v.is_empty()) {
                trace!(field = %name, value = %value, "Seeding draft default");
                state.confirmed.insert(name.clone(), value);
                state.seeded.insert(name.clone());
            }
        }
        Ok(state)
    }

    /// A bug as reported by the service. Keys that are not fields are
    /// ignored; `id` becomes the bug id.
    pub fn from_record(registry: Arc<FieldRegistry>, record: &Record) -> Self {
        let mut state = Self::new(registry);
        state.replace_confirmed(record);
        state
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<FieldRegistry> {
        &self.registry
    }

    #[must_use]
    pub fn id(&self) -> Option<BugId> {
        self.id
    }

    /// True until the bug was created remotely.
    #[must_use]
    pub fn is_new(&self) -> bool {
        self.id.is_none()
    }

    /// True if there are unsaved edits.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Names of fields with unsaved edits.
    #[must_use]
    pub fn pending_fields(&self) -> Vec<String> {
        self.pending.keys().cloned().collect()
    }

    /// The pending edit of `field`, if any.
    pub fn pending(&self, field: &str) -> Result<Option<&FieldValue>, UnknownFieldError> {
        let descriptor = self.registry.resolve(field)?;
        Ok(self.pending.get(&descriptor.name))
    }

    /// Last server-confirmed value of `field`.
    pub fn confirmed(&self, field: &str) -> Result<FieldValue, UnknownFieldError> {
        let descriptor = self.registry.resolve(field)?;
        Ok(self.confirmed_of(descriptor))
    }

    /// Effective value: the pending edit, else the confirmed value, else empty.
    pub fn value(&self, field: &str) -> Result<FieldValue, UnknownFieldError> {
        let descriptor = self.registry.resolve(field)?;
        Ok(self.value_of(descriptor))
    }

    /// Legal values of `field` given the current values of its parents.
    pub fn choices(&self, field: &str) -> Result<Vec<String>, UnknownFieldError> {
        let descriptor = self.registry.resolve(field)?;
        Ok(self.choices_of(descriptor))
    }

    pub fn is_visible(&self, field: &str) -> Result<bool, UnknownFieldError> {
        let descriptor = self.registry.resolve(field)?;
        Ok(self.is_visible_of(descriptor))
    }

    /// The default of `field`: its `is_default` value if that is a legal
    /// choice, else the only choice of a mandatory field.
    pub fn default_value(&self, field: &str) -> Result<Option<FieldValue>, UnknownFieldError> {
        let descriptor = self.registry.resolve(field)?;
        Ok(self.default_of(descriptor))
    }

    pub fn is_mandatory(&self, field: &str) -> Result<bool, UnknownFieldError> {
        let registry = Arc::clone(&self.registry);
        registry.is_mandatory(field, self)
    }

    /// Write `value` to `field` and propagate to its dependents.
    pub fn set(&mut self, field: &str, value: FieldValue) -> Result<Vec<BugEvent>, BugError> {
        let registry = Arc::clone(&self.registry);
        let descriptor = registry.resolve(field)?;
        let mut events = Vec::new();
        self.apply_set(descriptor, value, &mut events)?;
        Ok(events)
    }

    /// Add `value` to a multivalue field; `set` for single-valued fields.
    pub fn add(&mut self, field: &str, value: FieldValue) -> Result<Vec<BugEvent>, BugError> {
        let registry = Arc::clone(&self.registry);
        let descriptor = registry.resolve(field)?;
        if !descriptor.multivalue {
            return self.set(field, value);
        }
        let mut items = self.value_of(descriptor).items();
        for item in normalize(descriptor, value)?.items() {
            let text = item.to_text();
            if !items.iter().any(|existing| existing.to_text() == text) {
                items.push(item);
            }
        }
        self.set(field, FieldValue::List(items))
    }

    /// Remove `value` from a multivalue field. A single-valued field is
    /// cleared only if it currently holds `value`.
    pub fn remove(&mut self, field: &str, value: FieldValue) -> Result<Vec<BugEvent>, BugError> {
        let registry = Arc::clone(&self.registry);
        let descriptor = registry.resolve(field)?;
        let current = self.value_of(descriptor);
        if !descriptor.multivalue {
            let value = normalize(descriptor, value)?;
            if current.is_empty() || current.to_text() != value.to_text() {
                return Ok(Vec::new());
            }
            return self.set(field, FieldValue::Null);
        }
        let removing = normalize(descriptor, value)?.texts();
        let mut items = current.items();
        items.retain(|item| !removing.contains(&item.to_text()));
        self.set(field, FieldValue::List(items))
    }

    /// Replace confirmed values with a fresh server record and drop pending
    /// edits that now match. Returns the resulting change events.
    pub fn apply_fetched(&mut self, record: &Record) -> Vec<BugEvent> {
        let before = self.effective_values();
        let visible_before = self.visibility();
        self.replace_confirmed(record);
        self.settle();
        let visibility = self.reconcile_visibility(&visible_before);
        let mut events = self.changes_since(&before);
        events.extend(visibility);
        if let Some(bug_id) = self.id {
            events.push(BugEvent::Fetched { bug_id });
        }
        events
    }

    // =========================================================================
    // INTERNALS
    // =========================================================================

    pub(super) fn value_of(&self, descriptor: &FieldDescriptor) -> FieldValue {
        self.pending
            .get(&descriptor.name)
            .or_else(|| self.confirmed.get(&descriptor.name))
            .cloned()
            .unwrap_or_else(|| descriptor.empty_value())
    }

    pub(super) fn confirmed_of(&self, descriptor: &FieldDescriptor) -> FieldValue {
        self.confirmed
            .get(&descriptor.name)
            .cloned()
            .unwrap_or_else(|| descriptor.empty_value())
    }

    pub(super) fn is_visible_of(&self, descriptor: &FieldDescriptor) -> bool {
        let Some(parent) = &descriptor.visibility_field else {
            return true;
        };
        self.registry.get(parent).is_some_and(|parent| {
            self.value_of(parent)
                .texts()
                .iter()
                .any(|text| descriptor.visibility_values.contains(text))
        })
    }

    fn choices_of(&self, descriptor: &FieldDescriptor) -> Vec<String> {
        if descriptor.is_workflow() {
            return self.workflow_choices(descriptor);
        }

        let parent_texts = descriptor
            .value_field
            .as_deref()
            .and_then(|parent| self.registry.get(parent))
            .map(|parent| self.value_of(parent))
            .filter(|value| !value.is_empty())
            .map(|value| value.texts());

        let mut candidates: Vec<&FieldOption> = descriptor
            .values
            .iter()
            .filter(|option| !option.name.is_empty())
            .filter(|option| match &parent_texts {
                Some(texts) => texts.iter().any(|t| option.visibility_values.contains(t)),
                None => true,
            })
            .collect();
        candidates.sort_by(|a, b| a.sort_key.cmp(&b.sort_key).then_with(|| a.name.cmp(&b.name)));
        candidates.into_iter().map(|option| option.name.clone()).collect()
    }

    /// Confirmed value first, then the transitions allowed from it.
    fn workflow_choices(&self, descriptor: &FieldDescriptor) -> Vec<String> {
        let confirmed = self.confirmed_of(descriptor).to_text();
        let mut choices = Vec::new();
        if !confirmed.is_empty() {
            choices.push(confirmed.clone());
        }
        let transitions = descriptor
            .option(&confirmed)
            .and_then(|option| option.can_change_to.as_deref())
            .unwrap_or_default();
        for target in transitions {
            if !choices.contains(target) {
                choices.push(target.clone());
            }
        }
        choices
    }

    fn default_of(&self, descriptor: &FieldDescriptor) -> Option<FieldValue> {
        let choices = self.choices_of(descriptor);
        let name = descriptor
            .values
            .iter()
            .find(|option| option.is_default && choices.contains(&option.name))
            .map(|option| option.name.clone())
            .or_else(|| (descriptor.is_mandatory && choices.len() == 1).then(|| choices[0].clone()))?;
        Some(if descriptor.multivalue {
            FieldValue::list([name])
        } else {
            FieldValue::Text(name)
        })
    }

    fn apply_set(
        &mut self,
        descriptor: &FieldDescriptor,
        value: FieldValue,
        events: &mut Vec<BugEvent>,
    ) -> Result<(), BugError> {
        if descriptor.immutable {
            debug!(field = %descriptor.name, "Ignoring write to immutable field");
            return Ok(());
        }
        let value = normalize(descriptor, value)?;
        if !self.is_visible_of(descriptor) {
            debug!(bug_id = ?self.id, field = %descriptor.name, "Ignoring write to hidden field");
            return Ok(());
        }
        let confirmed = self.confirmed_of(descriptor);

        if value.set_eq(&confirmed) {
            if self.pending.remove(&descriptor.name).is_some() {
                events.push(self.changed(descriptor, confirmed));
            }
        } else {
            let previous = self.pending.insert(descriptor.name.clone(), value.clone());
            if previous.map_or(true, |previous| !previous.set_eq(&value)) {
                events.push(self.changed(descriptor, value));
            }
        }

        self.propagate(&descriptor.name, events)
    }

    fn propagate(&mut self, source: &str, events: &mut Vec<BugEvent>) -> Result<(), BugError> {
        let registry = Arc::clone(&self.registry);

        for dependent in registry.choice_dependents(source) {
            let descriptor = registry.resolve(dependent)?;
            let choices = self.choices_of(descriptor);
            if descriptor.has_values() && !descriptor.is_workflow() {
                if let Some(reset) = reset_value(descriptor, &self.value_of(descriptor), &choices) {
                    debug!(
                        bug_id = ?self.id,
                        field = %descriptor.name,
                        source,
                        value = %reset,
                        "Value outside the new choice set, resetting"
                    );
                    self.apply_set(descriptor, reset, events)?;
                }
            }
            events.push(BugEvent::ChoicesUpdated {
                bug_id: self.id,
                source: source.to_string(),
                field: descriptor.name.clone(),
                choices,
            });
        }

        for dependent in registry.visibility_dependents(source) {
            let descriptor = registry.resolve(dependent)?;
            let visible = self.is_visible_of(descriptor);
            events.push(BugEvent::VisibilityUpdated {
                bug_id: self.id,
                source: source.to_string(),
                field: descriptor.name.clone(),
                visible,
            });
            if visible {
                continue;
            }
            if let Some(cleared) = self.pending.remove(&descriptor.name) {
                let now = self.value_of(descriptor);
                if !cleared.set_eq(&now) {
                    events.push(self.changed(descriptor, now));
                    self.propagate(&descriptor.name, events)?;
                }
            }
        }
        Ok(())
    }

    fn changed(&self, descriptor: &FieldDescriptor, value: FieldValue) -> BugEvent {
        BugEvent::Changed {
            bug_id: self.id,
            field: descriptor.name.clone(),
            value,
        }
    }

    pub(super) fn replace_confirmed(&mut self, record: &Record) {
        if let Some(id) = record.get("id").and_then(serde_json::Value::as_u64) {
            self.id = Some(id);
        }
        let mut confirmed = BTreeMap::new();
        for (key, raw) in record {
            let Some(descriptor) = self.registry.get(key) else {
                continue;
            };
            let Some(value) = FieldValue::from_json(raw) else {
                trace!(field = %key, "Skipping structured value in record");
                continue;
            };
            let value = normalize(descriptor, value.clone()).unwrap_or(value);
            confirmed.insert(descriptor.name.clone(), value);
        }
        self.confirmed = confirmed;
        self.seeded.clear();
    }

    /// Drop pending entries equal to their confirmed value.
    pub(super) fn settle(&mut self) {
        let confirmed = &self.confirmed;
        self.pending.retain(|name, value| {
            confirmed
                .get(name)
                .map_or(!value.is_empty(), |confirmed| !confirmed.set_eq(value))
        });
    }

    /// Visibility of every field that has a visibility parent.
    pub(super) fn visibility(&self) -> BTreeMap<String, bool> {
        self.registry
            .fields()
            .iter()
            .filter(|descriptor| descriptor.visibility_field.is_some())
            .map(|descriptor| (descriptor.name.clone(), self.is_visible_of(descriptor)))
            .collect()
    }

    /// Drop pending edits of fields hidden after confirmed values were
    /// replaced, parents first, and report visibility that differs from
    /// `before`.
    pub(super) fn reconcile_visibility(&mut self, before: &BTreeMap<String, bool>) -> Vec<BugEvent> {
        let registry = Arc::clone(&self.registry);
        let mut events = Vec::new();
        for name in registry.topological_order() {
            let Some(descriptor) = registry.get(name) else {
                continue;
            };
            let Some(source) = &descriptor.visibility_field else {
                continue;
            };
            let visible = self.is_visible_of(descriptor);
            if !visible && self.pending.remove(&descriptor.name).is_some() {
                debug!(bug_id = ?self.id, field = %descriptor.name, "Dropping edit of a field now hidden");
            }
            if before.get(&descriptor.name) != Some(&visible) {
                events.push(BugEvent::VisibilityUpdated {
                    bug_id: self.id,
                    source: source.clone(),
                    field: descriptor.name.clone(),
                    visible,
                });
            }
        }
        events
    }

    pub(super) fn effective_values(&self) -> BTreeMap<String, FieldValue> {
        self.registry
            .fields()
            .iter()
            .map(|descriptor| (descriptor.name.clone(), self.value_of(descriptor)))
            .collect()
    }

    /// `Changed` events for every field whose effective value differs from `before`.
    pub(super) fn changes_since(&self, before: &BTreeMap<String, FieldValue>) -> Vec<BugEvent> {
        self.registry
            .fields()
            .iter()
            .filter_map(|descriptor| {
                let now = self.value_of(descriptor);
                let unchanged = before
                    .get(&descriptor.name)
                    .is_some_and(|previous| previous.set_eq(&now));
                (!unchanged).then(|| self.changed(descriptor, now))
            })
            .collect()
    }
}

/// The value a constrained field takes when its choice set changed, or
/// `None` if the current value is still legal.
fn reset_value(
    descriptor: &FieldDescriptor,
    current: &FieldValue,
    choices: &[String],
) -> Option<FieldValue> {
    if descriptor.multivalue {
        let items = current.items();
        let kept: Vec<FieldValue> = items
            .iter()
            .filter(|item| choices.contains(&item.to_text()))
            .cloned()
            .collect();
        return (kept.len() != items.len()).then_some(FieldValue::List(kept));
    }
    if !current.is_empty() && choices.contains(&current.to_text()) {
        return None;
    }
    match choices.first() {
        Some(first) => Some(FieldValue::Text(first.clone())),
        None => (!current.is_empty()).then_some(FieldValue::Null),
    }
}

impl EntityContext for BugState {
    fn is_visible(&self, field: &str) -> Result<bool, UnknownFieldError> {
        BugState::is_visible(self, field)
    }

    fn choices(&self, field: &str) -> Result<Vec<String>, UnknownFieldError> {
        BugState::choices(self, field)
    }
}

impl fmt::Debug for BugState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BugState")
            .field("id", &self.id)
            .field("confirmed", &self.confirmed)
            .field("pending", &self.pending)
            .finish_non_exhaustive()
    }
}
