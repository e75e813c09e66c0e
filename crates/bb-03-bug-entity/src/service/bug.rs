//! # Bug Entity
//!
//! A shareable handle over [`BugState`] that adds subscribers and the
//! save/fetch round trips.
//!
//! ## Locking
//!
//! Two `parking_lot` mutexes: `in_flight` (outstanding save/fetch handles)
//! and `state`. When both are needed `in_flight` is taken first. Subscribers
//! always run with neither held, so they may call back into the bug.

use super::context::{find_record, BugContext};
use super::notices::{FieldChanged, FieldChoicesUpdated, FieldVisibilityUpdated};
use super::persist::{Persist, PersistKind, Rejection};
use crate::domain::{BugError, BugState};
use bb_01_rpc_call::RpcCall;
use parking_lot::Mutex;
use serde_json::Value;
use shared_bus::{BugEvent, CallbackId, CallbackList};
use shared_types::{codes, BugId, CreateResult, FieldValue, RemoteError, RpcRequest, UpdateResult};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Weak};
use tracing::{debug, error, info, warn};

/// A bug: confirmed values, pending edits and subscribers.
///
/// Clones are handles to the same bug.
#[derive(Clone)]
pub struct Bug {
    shared: Arc<BugShared>,
}

struct BugShared {
    context: BugContext,
    state: Mutex<BugState>,
    in_flight: Mutex<InFlight>,
    changed: CallbackList<FieldChanged>,
    choices_updated: CallbackList<FieldChoicesUpdated>,
    visibility_updated: CallbackList<FieldVisibilityUpdated>,
}

#[derive(Default)]
struct InFlight {
    save: Option<Persist>,
    fetch: Option<Persist>,
}

impl Bug {
    pub(crate) fn new(context: BugContext, state: BugState) -> Self {
        Self {
            shared: Arc::new(BugShared {
                context,
                state: Mutex::new(state),
                in_flight: Mutex::new(InFlight::default()),
                changed: CallbackList::new("bug.changed"),
                choices_updated: CallbackList::new("bug.choices_updated"),
                visibility_updated: CallbackList::new("bug.visibility_updated"),
            }),
        }
    }

    // =========================================================================
    // READS
    // =========================================================================

    #[must_use]
    pub fn id(&self) -> Option<BugId> {
        self.shared.state.lock().id()
    }

    #[must_use]
    pub fn is_new(&self) -> bool {
        self.shared.state.lock().is_new()
    }

    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.shared.state.lock().is_dirty()
    }

    #[must_use]
    pub fn pending_fields(&self) -> Vec<String> {
        self.shared.state.lock().pending_fields()
    }

    pub fn value(&self, field: &str) -> Result<FieldValue, BugError> {
        Ok(self.shared.state.lock().value(field)?)
    }

    pub fn confirmed(&self, field: &str) -> Result<FieldValue, BugError> {
        Ok(self.shared.state.lock().confirmed(field)?)
    }

    pub fn choices(&self, field: &str) -> Result<Vec<String>, BugError> {
        Ok(self.shared.state.lock().choices(field)?)
    }

    pub fn is_visible(&self, field: &str) -> Result<bool, BugError> {
        Ok(self.shared.state.lock().is_visible(field)?)
    }

    pub fn is_mandatory(&self, field: &str) -> Result<bool, BugError> {
        Ok(self.shared.state.lock().is_mandatory(field)?)
    }

    pub fn default_value(&self, field: &str) -> Result<Option<FieldValue>, BugError> {
        Ok(self.shared.state.lock().default_value(field)?)
    }

    /// A copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> BugState {
        self.shared.state.lock().clone()
    }

    #[must_use]
    pub fn context(&self) -> &BugContext {
        &self.shared.context
    }

    /// True if both handles refer to the same bug.
    #[must_use]
    pub fn same_bug(&self, other: &Bug) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    // =========================================================================
    // WRITES
    // =========================================================================

    pub fn set(&self, field: &str, value: impl Into<FieldValue>) -> Result<(), BugError> {
        let events = self.shared.state.lock().set(field, value.into())?;
        self.dispatch(events);
        Ok(())
    }

    pub fn add(&self, field: &str, value: impl Into<FieldValue>) -> Result<(), BugError> {
        let events = self.shared.state.lock().add(field, value.into())?;
        self.dispatch(events);
        Ok(())
    }

    pub fn remove(&self, field: &str, value: impl Into<FieldValue>) -> Result<(), BugError> {
        let events = self.shared.state.lock().remove(field, value.into())?;
        self.dispatch(events);
        Ok(())
    }

    // =========================================================================
    // SUBSCRIPTIONS
    // =========================================================================

    pub fn on_changed<F>(&self, callback: F) -> CallbackId
    where
        F: Fn(&FieldChanged) + Send + Sync + 'static,
    {
        self.shared.changed.add(callback)
    }

    pub fn on_choices_updated<F>(&self, callback: F) -> CallbackId
    where
        F: Fn(&FieldChoicesUpdated) + Send + Sync + 'static,
    {
        self.shared.choices_updated.add(callback)
    }

    pub fn on_visibility_updated<F>(&self, callback: F) -> CallbackId
    where
        F: Fn(&FieldVisibilityUpdated) + Send + Sync + 'static,
    {
        self.shared.visibility_updated.add(callback)
    }

    pub fn off_changed(&self, id: CallbackId) -> bool {
        self.shared.changed.remove(id)
    }

    pub fn off_choices_updated(&self, id: CallbackId) -> bool {
        self.shared.choices_updated.remove(id)
    }

    pub fn off_visibility_updated(&self, id: CallbackId) -> bool {
        self.shared.visibility_updated.remove(id)
    }

    // =========================================================================
    // PERSISTENCE
    // =========================================================================

    /// Send pending edits: create for a draft, update otherwise.
    ///
    /// While a save is outstanding, further calls return the same handle.
    /// With nothing pending the handle is already resolved and no request
    /// is sent. Failure leaves pending edits untouched.
    pub fn save(&self) -> Persist {
        let mut in_flight = self.shared.in_flight.lock();
        if let Some(save) = &in_flight.save {
            debug!(bug_id = ?save.bug_id(), call_id = %save.call().id(), "Save already in flight");
            return save.clone();
        }

        let config = self.shared.context.config();
        let (request, kind, bug_id, sent) = {
            let state = self.shared.state.lock();
            match state.id() {
                _ if !state.is_dirty() => {
                    let request = RpcRequest::without_params(config.namespace.clone(), config.update_method.clone());
                    let call = RpcCall::resolved(request, Value::Null);
                    debug!(bug_id = ?state.id(), "Nothing to save");
                    return Persist::new(call, PersistKind::Noop, state.id());
                }
                None => {
                    let plan = state.create_plan();
                    let request = RpcRequest::new(
                        config.namespace.clone(),
                        config.create_method.clone(),
                        Value::Object(plan.params),
                    );
                    (request, PersistKind::Create, None, plan.sent)
                }
                Some(id) => {
                    let plan = state.plan_update(id, &config.comment_field);
                    let request = RpcRequest::new(
                        config.namespace.clone(),
                        config.update_method.clone(),
                        Value::Object(plan.params),
                    );
                    (request, PersistKind::Update, Some(id), plan.sent)
                }
            }
        };

        debug!(bug_id = ?bug_id, %kind, fields = sent.len(), "Saving bug");
        let call = RpcCall::deferred(Arc::clone(self.shared.context.transport()), request);
        let persist = Persist::new(call.clone(), kind, bug_id);
        let rejection = persist.rejection();
        let weak = Arc::downgrade(&self.shared);
        call.complete(move |call| {
            if let Some(bug) = upgrade(&weak) {
                bug.finish_save(call, kind, &sent, &rejection);
            }
        });
        in_flight.save = Some(persist.clone());
        drop(in_flight);

        call.start();
        persist
    }

    /// Refresh confirmed values from the service.
    ///
    /// Pending edits that now match are dropped; the rest are kept. While a
    /// fetch is outstanding, further calls return the same handle.
    pub fn update(&self) -> Result<Persist, BugError> {
        let mut in_flight = self.shared.in_flight.lock();
        if let Some(fetch) = &in_flight.fetch {
            return Ok(fetch.clone());
        }
        let id = self.shared.state.lock().id().ok_or(BugError::NotCreated)?;

        let request = self.shared.context.get_request(id);
        let call = RpcCall::deferred(Arc::clone(self.shared.context.transport()), request);
        let weak = Arc::downgrade(&self.shared);
        call.complete(move |call| {
            if let Some(bug) = upgrade(&weak) {
                bug.finish_fetch(call, id);
            }
        });
        let persist = Persist::new(call.clone(), PersistKind::Fetch, Some(id));
        in_flight.fetch = Some(persist.clone());
        drop(in_flight);

        call.start();
        Ok(persist)
    }

    fn finish_save(
        &self,
        call: &RpcCall,
        kind: PersistKind,
        sent: &BTreeMap<String, FieldValue>,
        rejection: &Rejection,
    ) {
        let Some(outcome) = call.result() else {
            return;
        };
        let events = {
            let mut state = self.shared.state.lock();
            match outcome {
                Ok(result) => match kind {
                    PersistKind::Create => match serde_json::from_value::<CreateResult>(result) {
                        Ok(created) => {
                            info!(bug_id = created.id, "Created bug");
                            state.apply_created(created.id, sent)
                        }
                        Err(e) => {
                            error!(call_id = %call.id(), error = %e, "Malformed create response");
                            let error =
                                RemoteError::new(codes::INTERNAL_ERROR, format!("Malformed create response: {e}"));
                            rejection.reject(error.clone());
                            vec![BugEvent::SaveFailed { bug_id: None, error }]
                        }
                    },
                    _ => {
                        let result = serde_json::from_value::<UpdateResult>(result).unwrap_or_else(|e| {
                            warn!(call_id = %call.id(), error = %e, "Unreadable change report, taking sent values");
                            UpdateResult::default()
                        });
                        info!(bug_id = ?state.id(), fields = sent.len(), "Saved bug");
                        state.apply_updated(&result, sent, &self.shared.context.config().comment_field)
                    }
                },
                Err(error) => {
                    error!(bug_id = ?state.id(), %error, "Saving bug failed");
                    vec![BugEvent::SaveFailed {
                        bug_id: state.id(),
                        error,
                    }]
                }
            }
        };
        {
            let mut in_flight = self.shared.in_flight.lock();
            if in_flight.save.as_ref().is_some_and(|save| save.call().same_call(call)) {
                in_flight.save = None;
            }
        }
        self.dispatch(events);
    }

    fn finish_fetch(&self, call: &RpcCall, id: BugId) {
        let Some(outcome) = call.result() else {
            return;
        };
        let events = match outcome.and_then(|result| {
            find_record(result, id).map_err(|reason| RemoteError::new(codes::INTERNAL_ERROR, reason))
        }) {
            Ok(record) => self.shared.state.lock().apply_fetched(&record),
            Err(error) => {
                error!(bug_id = id, %error, "Fetching bug failed");
                vec![BugEvent::FetchFailed { bug_id: id, error }]
            }
        };
        {
            let mut in_flight = self.shared.in_flight.lock();
            if in_flight.fetch.as_ref().is_some_and(|fetch| fetch.call().same_call(call)) {
                in_flight.fetch = None;
            }
        }
        self.dispatch(events);
    }

    /// Deliver events to subscribers, then to the bus. No lock is held.
    fn dispatch(&self, events: Vec<BugEvent>) {
        for event in events {
            match &event {
                BugEvent::Changed { field, value, .. } => {
                    self.shared.changed.fire(&FieldChanged {
                        bug: self.clone(),
                        field: field.clone(),
                        value: value.clone(),
                    });
                }
                BugEvent::ChoicesUpdated {
                    source,
                    field,
                    choices,
                    ..
                } => {
                    self.shared.choices_updated.fire(&FieldChoicesUpdated {
                        bug: self.clone(),
                        source: source.clone(),
                        field: field.clone(),
                        choices: choices.clone(),
                    });
                }
                BugEvent::VisibilityUpdated {
                    source,
                    field,
                    visible,
                    ..
                } => {
                    self.shared.visibility_updated.fire(&FieldVisibilityUpdated {
                        bug: self.clone(),
                        source: source.clone(),
                        field: field.clone(),
                        visible: *visible,
                    });
                }
                _ => {}
            }
            if let Some(bus) = self.shared.context.bus() {
                bus.publish(event);
            }
        }
    }
}

fn upgrade(weak: &Weak<BugShared>) -> Option<Bug> {
    weak.upgrade().map(|shared| Bug { shared })
}

impl fmt::Debug for Bug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("Bug")
            .field("id", &state.id())
            .field("pending", &state.pending_fields())
            .finish()
    }
}
