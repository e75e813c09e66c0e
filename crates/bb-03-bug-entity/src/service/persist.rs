//! Handle to an in-flight save or fetch.

use crate::domain::PersistError;
use bb_01_rpc_call::RpcCall;
use parking_lot::Mutex;
use shared_types::{BugId, RemoteError};
use std::fmt;
use std::sync::Arc;

/// What a [`Persist`] handle is doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistKind {
    Create,
    Update,
    Fetch,
    /// Nothing to send; resolved without a remote call.
    Noop,
}

impl fmt::Display for PersistKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Fetch => "fetch",
            Self::Noop => "noop",
        };
        f.write_str(name)
    }
}

/// Failure found while merging a reply the call itself reported as a
/// success, such as a create reply without an id.
#[derive(Debug, Clone, Default)]
pub(crate) struct Rejection(Arc<Mutex<Option<RemoteError>>>);

impl Rejection {
    pub(crate) fn reject(&self, error: RemoteError) {
        *self.0.lock() = Some(error);
    }

    fn get(&self) -> Option<RemoteError> {
        self.0.lock().clone()
    }
}

/// A save or fetch round trip.
///
/// Clones share the underlying call. The entity's state is merged before
/// any subscriber registered through this handle runs.
#[derive(Debug, Clone)]
pub struct Persist {
    call: RpcCall,
    kind: PersistKind,
    bug_id: Option<BugId>,
    rejection: Rejection,
}

impl Persist {
    pub(crate) fn new(call: RpcCall, kind: PersistKind, bug_id: Option<BugId>) -> Self {
        Self {
            call,
            kind,
            bug_id,
            rejection: Rejection::default(),
        }
    }

    pub(crate) fn rejection(&self) -> Rejection {
        self.rejection.clone()
    }

    /// The underlying call, for `done`/`fail`/`complete` subscriptions.
    #[must_use]
    pub fn call(&self) -> &RpcCall {
        &self.call
    }

    #[must_use]
    pub fn kind(&self) -> PersistKind {
        self.kind
    }

    /// Id of the bug at the time the round trip started.
    #[must_use]
    pub fn bug_id(&self) -> Option<BugId> {
        self.bug_id
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.call.state().is_terminal()
    }

    /// True if both handles refer to the same round trip.
    #[must_use]
    pub fn same_as(&self, other: &Persist) -> bool {
        self.call.same_call(&other.call)
    }

    /// Why the round trip failed, once it has: the remote error, or the
    /// reason a successful reply could not be merged.
    #[must_use]
    pub fn error(&self) -> Option<RemoteError> {
        self.call.error().or_else(|| self.rejection.get())
    }

    /// Wait for the round trip to finish.
    ///
    /// A reply that arrived but could not be merged is an error too.
    pub async fn wait(&self) -> Result<(), PersistError> {
        let outcome = self.call.outcome().await.and_then(|_| match self.rejection.get() {
            Some(error) => Err(error),
            None => Ok(()),
        });
        outcome.map_err(|error| PersistError {
            bug_id: self.bug_id,
            error,
        })
    }
}
