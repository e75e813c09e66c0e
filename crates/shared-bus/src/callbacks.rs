//! # Callback Lists
//!
//! Ordered subscriber lists with per-subscriber panic isolation.

use parking_lot::Mutex;
use std::any::Any;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::error;

/// A registered subscriber.
pub type Callback<A> = Arc<dyn Fn(&A) + Send + Sync>;

/// Handle returned by [`CallbackList::add`], used to remove the subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallbackId(u64);

/// Subscribers for one event category, fired in registration order.
///
/// The list lock is never held while a subscriber runs, so subscribers may
/// add or remove entries (taking effect on the next `fire`).
pub struct CallbackList<A: ?Sized> {
    name: &'static str,
    next_id: AtomicU64,
    entries: Mutex<Vec<(CallbackId, Callback<A>)>>,
}

impl<A: ?Sized> CallbackList<A> {
    /// Create an empty list; `name` identifies it in logs.
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            next_id: AtomicU64::new(1),
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Register a subscriber.
    pub fn add<F>(&self, callback: F) -> CallbackId
    where
        F: Fn(&A) + Send + Sync + 'static,
    {
        self.add_shared(Arc::new(callback))
    }

    /// Register an already shared subscriber.
    pub fn add_shared(&self, callback: Callback<A>) -> CallbackId {
        let id = CallbackId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.entries.lock().push((id, callback));
        id
    }

    /// Remove a subscriber. Returns false if it was not registered.
    pub fn remove(&self, id: CallbackId) -> bool {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|(entry_id, _)| *entry_id != id);
        entries.len() != before
    }

    /// Number of registered subscribers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// True if nobody is subscribed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Subscribers in registration order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Callback<A>> {
        self.entries.lock().iter().map(|(_, cb)| cb.clone()).collect()
    }

    /// Invoke every subscriber with `arg`.
    ///
    /// Returns the number of subscribers that panicked.
    pub fn fire(&self, arg: &A) -> usize {
        let mut panicked = 0;
        for callback in self.snapshot() {
            if !invoke_isolated(self.name, &*callback, arg) {
                panicked += 1;
            }
        }
        panicked
    }
}

impl<A: ?Sized> fmt::Debug for CallbackList<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackList")
            .field("name", &self.name)
            .field("len", &self.len())
            .finish()
    }
}

/// Run one subscriber, logging a panic instead of unwinding into the caller.
///
/// Returns false if the subscriber panicked.
pub fn invoke_isolated<A: ?Sized>(
    list: &'static str,
    callback: &(dyn Fn(&A) + Send + Sync),
    arg: &A,
) -> bool {
    match catch_unwind(AssertUnwindSafe(|| callback(arg))) {
        Ok(()) => true,
        Err(payload) => {
            error!(
                callbacks = list,
                panic = %panic_message(payload.as_ref()),
                "Subscriber panicked"
            );
            false
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
