//! In-memory transport.
//!
//! Records every request. A request is answered synchronously when the
//! handler returns a reply, otherwise it is parked until the owner calls
//! [`InMemoryTransport::reply_next`].

use crate::ports::{ReplySink, RpcTransport};
use parking_lot::{Mutex, RwLock};
use shared_types::{RpcRequest, TransportReply};
use std::collections::VecDeque;
use std::fmt;
use tracing::trace;

type Handler = Box<dyn Fn(&RpcRequest) -> Option<TransportReply> + Send + Sync>;

struct Parked {
    request: RpcRequest,
    sink: ReplySink,
}

/// Transport that never leaves the process.
pub struct InMemoryTransport {
    handler: RwLock<Option<Handler>>,
    parked: Mutex<VecDeque<Parked>>,
    log: Mutex<Vec<RpcRequest>>,
}

impl InMemoryTransport {
    /// A transport that parks every request.
    #[must_use]
    pub fn new() -> Self {
        Self {
            handler: RwLock::new(None),
            parked: Mutex::new(VecDeque::new()),
            log: Mutex::new(Vec::new()),
        }
    }

    /// A transport that asks `handler` first and parks on `None`.
    pub fn with_handler<F>(handler: F) -> Self
    where
        F: Fn(&RpcRequest) -> Option<TransportReply> + Send + Sync + 'static,
    {
        let transport = Self::new();
        transport.set_handler(handler);
        transport
    }

    /// Replace the handler.
    pub fn set_handler<F>(&self, handler: F)
    where
        F: Fn(&RpcRequest) -> Option<TransportReply> + Send + Sync + 'static,
    {
        *self.handler.write() = Some(Box::new(handler));
    }

    /// Every request seen so far, in dispatch order.
    #[must_use]
    pub fn requests(&self) -> Vec<RpcRequest> {
        self.log.lock().clone()
    }

    /// Requests for one qualified method such as `Bug.update`.
    #[must_use]
    pub fn requests_for(&self, qualified_method: &str) -> Vec<RpcRequest> {
        self.log
            .lock()
            .iter()
            .filter(|r| r.qualified_method() == qualified_method)
            .cloned()
            .collect()
    }

    /// Number of requests dispatched so far.
    #[must_use]
    pub fn dispatched(&self) -> usize {
        self.log.lock().len()
    }

    /// Number of parked requests waiting for a reply.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.parked.lock().len()
    }

    /// Parked requests, oldest first.
    #[must_use]
    pub fn pending_requests(&self) -> Vec<RpcRequest> {
        self.parked.lock().iter().map(|p| p.request.clone()).collect()
    }

    /// Answer the oldest parked request. Returns that request, or `None`
    /// if nothing was parked.
    pub fn reply_next(&self, reply: TransportReply) -> Option<RpcRequest> {
        let parked = self.parked.lock().pop_front()?;
        trace!(method = %parked.request.qualified_method(), "Replying to parked request");
        (parked.sink)(reply);
        Some(parked.request)
    }
}

impl Default for InMemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for InMemoryTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryTransport")
            .field("dispatched", &self.dispatched())
            .field("pending", &self.pending())
            .finish()
    }
}

impl RpcTransport for InMemoryTransport {
    fn dispatch(&self, request: RpcRequest, reply: ReplySink) {
        self.log.lock().push(request.clone());
        let answer = self
            .handler
            .read()
            .as_ref()
            .and_then(|handler| handler(&request));
        match answer {
            Some(answer) => reply(answer),
            None => self.parked.lock().push_back(Parked {
                request,
                sink: reply,
            }),
        }
    }
}
