//! In-flight accounting around any transport.
//!
//! A page shows a busy indicator while at least one call is outstanding;
//! `RpcActivity` tracks that count and notifies on idle/busy transitions.

use crate::ports::{ReplySink, RpcTransport};
use serde::Serialize;
use shared_bus::{CallbackId, CallbackList};
use shared_types::RpcRequest;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Counters for calls passing through a [`TrackedTransport`].
#[derive(Debug)]
pub struct RpcActivity {
    active: AtomicU64,
    calls_total: AtomicU64,
    calls_succeeded: AtomicU64,
    calls_failed: AtomicU64,
    busy_changed: CallbackList<bool>,
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ActivitySnapshot {
    pub active: u64,
    pub calls_total: u64,
    pub calls_succeeded: u64,
    pub calls_failed: u64,
}

impl RpcActivity {
    #[must_use]
    pub fn new() -> Self {
        Self {
            active: AtomicU64::new(0),
            calls_total: AtomicU64::new(0),
            calls_succeeded: AtomicU64::new(0),
            calls_failed: AtomicU64::new(0),
            busy_changed: CallbackList::new("rpc.busy_changed"),
        }
    }

    /// Subscribe to idle/busy transitions. Receives `true` when the first
    /// call starts and `false` when the last one finishes.
    pub fn on_busy_changed<F>(&self, callback: F) -> CallbackId
    where
        F: Fn(&bool) + Send + Sync + 'static,
    {
        self.busy_changed.add(callback)
    }

    pub fn remove_listener(&self, id: CallbackId) -> bool {
        self.busy_changed.remove(id)
    }

    #[must_use]
    pub fn active(&self) -> u64 {
        self.active.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.active() > 0
    }

    #[must_use]
    pub fn snapshot(&self) -> ActivitySnapshot {
        ActivitySnapshot {
            active: self.active(),
            calls_total: self.calls_total.load(Ordering::Relaxed),
            calls_succeeded: self.calls_succeeded.load(Ordering::Relaxed),
            calls_failed: self.calls_failed.load(Ordering::Relaxed),
        }
    }

    /// Export as JSON
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self.snapshot()).unwrap_or_default()
    }

    fn record_start(&self) {
        self.calls_total.fetch_add(1, Ordering::Relaxed);
        if self.active.fetch_add(1, Ordering::SeqCst) == 0 {
            debug!("RPC activity: busy");
            self.busy_changed.fire(&true);
        }
    }

    fn record_finish(&self, success: bool) {
        if success {
            self.calls_succeeded.fetch_add(1, Ordering::Relaxed);
        } else {
            self.calls_failed.fetch_add(1, Ordering::Relaxed);
        }
        let previous = self
            .active
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if previous == Ok(1) {
            debug!("RPC activity: idle");
            self.busy_changed.fire(&false);
        }
    }
}

impl Default for RpcActivity {
    fn default() -> Self {
        Self::new()
    }
}

/// Wraps a transport and keeps an [`RpcActivity`] current.
#[derive(Debug)]
pub struct TrackedTransport<T> {
    inner: T,
    activity: Arc<RpcActivity>,
}

impl<T: RpcTransport> TrackedTransport<T> {
    pub fn new(inner: T) -> Self {
        Self::with_activity(inner, Arc::new(RpcActivity::new()))
    }

    /// Share one activity tracker across several transports.
    pub fn with_activity(inner: T, activity: Arc<RpcActivity>) -> Self {
        Self { inner, activity }
    }

    #[must_use]
    pub fn activity(&self) -> &Arc<RpcActivity> {
        &self.activity
    }

    #[must_use]
    pub fn inner(&self) -> &T {
        &self.inner
    }
}

impl<T: RpcTransport> RpcTransport for TrackedTransport<T> {
    fn dispatch(&self, request: RpcRequest, reply: ReplySink) {
        self.activity.record_start();
        let activity = Arc::clone(&self.activity);
        self.inner.dispatch(
            request,
            Box::new(move |outcome| {
                activity.record_finish(outcome.is_ok());
                reply(outcome);
            }),
        );
    }
}
