//! # RpcCall
//!
//! One remote invocation and its subscriber lists.
//!
//! ## Ordering
//!
//! - `started` subscribers run after the state moves to `started` and before
//!   the request reaches the transport.
//! - On success: all `done` subscribers, then all `complete` subscribers.
//! - On failure: all `fail` subscribers, then all `complete` subscribers.
//! - Within one list, subscribers run in registration order.
//!
//! A subscriber registered after the matching transition ran is invoked at
//! once with the recorded outcome. A panicking subscriber is logged and the
//! remaining subscribers still run.

use crate::domain::{normalize_reply, CallId, CallState};
use crate::ports::RpcTransport;
use parking_lot::Mutex;
use serde_json::Value;
use shared_bus::callbacks::invoke_isolated;
use shared_bus::CallbackList;
use shared_types::{RemoteError, RpcRequest, TransportReply};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// Handle to one RPC call. Clones share the same call.
#[derive(Clone)]
pub struct RpcCall {
    inner: Arc<CallInner>,
}

struct CallInner {
    id: CallId,
    request: RpcRequest,
    transport: Option<Arc<dyn RpcTransport>>,
    record: Mutex<CallRecord>,
    started: CallbackList<RpcCall>,
    done: CallbackList<Value>,
    fail: CallbackList<RemoteError>,
    complete: CallbackList<RpcCall>,
}

#[derive(Debug)]
struct CallRecord {
    state: CallState,
    outcome: Option<Result<Value, RemoteError>>,
    started_at: Option<Instant>,
    elapsed: Option<Duration>,
}

impl RpcCall {
    /// Create a call and start it immediately.
    pub fn new(transport: Arc<dyn RpcTransport>, request: RpcRequest) -> Self {
        let call = Self::deferred(transport, request);
        call.start();
        call
    }

    /// Create a call that waits for [`RpcCall::start`].
    pub fn deferred(transport: Arc<dyn RpcTransport>, request: RpcRequest) -> Self {
        Self::build(Some(transport), request, CallState::Created, None)
    }

    /// A call that already succeeded with `result` without touching any
    /// transport. Subscribers see the same contract as for a real call.
    pub fn resolved(request: RpcRequest, result: Value) -> Self {
        Self::build(None, request, CallState::Succeeded, Some(Ok(result)))
    }

    fn build(
        transport: Option<Arc<dyn RpcTransport>>,
        request: RpcRequest,
        state: CallState,
        outcome: Option<Result<Value, RemoteError>>,
    ) -> Self {
        Self {
            inner: Arc::new(CallInner {
                id: CallId::new(),
                request,
                transport,
                record: Mutex::new(CallRecord {
                    state,
                    outcome,
                    started_at: None,
                    elapsed: None,
                }),
                started: CallbackList::new("rpc.started"),
                done: CallbackList::new("rpc.done"),
                fail: CallbackList::new("rpc.fail"),
                complete: CallbackList::new("rpc.complete"),
            }),
        }
    }

    /// Hand the request to the transport. Only the first call has an effect.
    pub fn start(&self) -> &Self {
        let Some(transport) = self.inner.transport.clone() else {
            debug!(call_id = %self.inner.id, "Call has no transport, nothing to start");
            return self;
        };
        {
            let mut record = self.inner.record.lock();
            if record.state != CallState::Created {
                warn!(
                    call_id = %self.inner.id,
                    state = %record.state,
                    "Ignoring start of a call that already left the created state"
                );
                return self;
            }
            record.state = CallState::Started;
            record.started_at = Some(Instant::now());
        }

        debug!(
            call_id = %self.inner.id,
            method = %self.inner.request.qualified_method(),
            "RPC call started"
        );
        self.inner.started.fire(self);

        let call = self.clone();
        transport.dispatch(
            self.inner.request.clone(),
            Box::new(move |reply| call.finish(reply)),
        );
        self
    }

    fn finish(&self, reply: TransportReply) {
        let outcome = normalize_reply(reply);
        let elapsed = {
            let mut record = self.inner.record.lock();
            if record.state.is_terminal() {
                warn!(call_id = %self.inner.id, "Ignoring reply for a finished call");
                return;
            }
            record.state = if outcome.is_ok() {
                CallState::Succeeded
            } else {
                CallState::Failed
            };
            record.elapsed = record.started_at.map(|at| at.elapsed());
            record.outcome = Some(outcome.clone());
            record.elapsed
        };
        let elapsed_ms = elapsed.map_or(0, |d| d.as_millis());

        match &outcome {
            Ok(result) => {
                debug!(
                    call_id = %self.inner.id,
                    method = %self.inner.request.qualified_method(),
                    elapsed_ms,
                    "RPC call succeeded"
                );
                self.inner.done.fire(result);
            }
            Err(error) => {
                warn!(
                    call_id = %self.inner.id,
                    method = %self.inner.request.qualified_method(),
                    code = error.code,
                    message = %error.message,
                    elapsed_ms,
                    "RPC call failed"
                );
                self.inner.fail.fire(error);
            }
        }
        self.inner.complete.fire(self);
    }

    /// Subscribe to the start of the call.
    pub fn started<F>(&self, callback: F) -> &Self
    where
        F: Fn(&RpcCall) + Send + Sync + 'static,
    {
        {
            let record = self.inner.record.lock();
            if record.state == CallState::Created {
                self.inner.started.add(callback);
                return self;
            }
        }
        invoke_isolated::<RpcCall>("rpc.started", &callback, self);
        self
    }

    /// Subscribe to success. Receives the result payload.
    pub fn done<F>(&self, callback: F) -> &Self
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        let replay = {
            let record = self.inner.record.lock();
            match &record.outcome {
                Some(Ok(result)) => result.clone(),
                Some(Err(_)) => return self,
                None => {
                    self.inner.done.add(callback);
                    return self;
                }
            }
        };
        invoke_isolated::<Value>("rpc.done", &callback, &replay);
        self
    }

    /// Subscribe to failure. Receives the normalized error.
    pub fn fail<F>(&self, callback: F) -> &Self
    where
        F: Fn(&RemoteError) + Send + Sync + 'static,
    {
        let replay = {
            let record = self.inner.record.lock();
            match &record.outcome {
                Some(Err(error)) => error.clone(),
                Some(Ok(_)) => return self,
                None => {
                    self.inner.fail.add(callback);
                    return self;
                }
            }
        };
        invoke_isolated::<RemoteError>("rpc.fail", &callback, &replay);
        self
    }

    /// Subscribe to completion, whichever way the call ended.
    pub fn complete<F>(&self, callback: F) -> &Self
    where
        F: Fn(&RpcCall) + Send + Sync + 'static,
    {
        {
            let record = self.inner.record.lock();
            if !record.state.is_terminal() {
                self.inner.complete.add(callback);
                return self;
            }
        }
        invoke_isolated::<RpcCall>("rpc.complete", &callback, self);
        self
    }

    /// Wait for the call to finish.
    ///
    /// Stays pending until the transport replies; a deferred call must be
    /// started by someone for this to resolve.
    pub async fn outcome(&self) -> Result<Value, RemoteError> {
        let (tx, rx) = oneshot::channel();
        let slot = Mutex::new(Some(tx));
        self.complete(move |call| {
            if let (Some(tx), Some(result)) = (slot.lock().take(), call.result()) {
                let _ = tx.send(result);
            }
        });
        rx.await.unwrap_or_else(|_| Err(RemoteError::network()))
    }

    /// Identifier used in log lines for this call.
    #[must_use]
    pub fn id(&self) -> CallId {
        self.inner.id
    }

    /// The request this call carries.
    #[must_use]
    pub fn request(&self) -> &RpcRequest {
        &self.inner.request
    }

    #[must_use]
    pub fn state(&self) -> CallState {
        self.inner.record.lock().state
    }

    /// Result payload, once succeeded.
    #[must_use]
    pub fn response(&self) -> Option<Value> {
        match &self.inner.record.lock().outcome {
            Some(Ok(result)) => Some(result.clone()),
            _ => None,
        }
    }

    /// Normalized error, once failed.
    #[must_use]
    pub fn error(&self) -> Option<RemoteError> {
        match &self.inner.record.lock().outcome {
            Some(Err(error)) => Some(error.clone()),
            _ => None,
        }
    }

    /// Recorded outcome, once terminal.
    #[must_use]
    pub fn result(&self) -> Option<Result<Value, RemoteError>> {
        self.inner.record.lock().outcome.clone()
    }

    /// Time between start and reply.
    #[must_use]
    pub fn elapsed(&self) -> Option<Duration> {
        self.inner.record.lock().elapsed
    }

    /// True if both handles refer to the same call.
    #[must_use]
    pub fn same_call(&self, other: &RpcCall) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for RpcCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RpcCall")
            .field("id", &self.inner.id)
            .field("method", &self.inner.request.qualified_method())
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryTransport;
    use serde_json::json;
    use shared_types::{codes, TransportFailure};

    type Log = Arc<Mutex<Vec<String>>>;

    fn log() -> Log {
        Arc::new(Mutex::new(Vec::new()))
    }

    fn record(log: &Log, entry: impl Into<String>) {
        log.lock().push(entry.into());
    }

    fn subscribe_all(call: &RpcCall, log: &Log) {
        let (a, b, c, d) = (log.clone(), log.clone(), log.clone(), log.clone());
        call.started(move |_| record(&a, "started"))
            .done(move |v| record(&b, format!("done:{v}")))
            .fail(move |e| record(&c, format!("fail:{}", e.code)))
            .complete(move |call| record(&d, format!("complete:{}", call.state())));
    }

    fn request() -> RpcRequest {
        RpcRequest::new("Bug", "get", json!({"ids": [1]}))
    }

    #[test]
    fn test_success_fires_done_then_complete() {
        let transport = Arc::new(InMemoryTransport::new());
        let call = RpcCall::deferred(transport.clone(), request());
        let events = log();
        subscribe_all(&call, &events);

        call.start();
        assert_eq!(call.state(), CallState::Started);
        assert_eq!(*events.lock(), vec!["started"]);

        transport.reply_next(Ok(json!({"bugs": []})));
        assert_eq!(
            *events.lock(),
            vec!["started", r#"done:{"bugs":[]}"#, "complete:succeeded"]
        );
        assert_eq!(call.response(), Some(json!({"bugs": []})));
        assert!(call.error().is_none());
        assert!(call.elapsed().is_some());
    }

    #[test]
    fn test_structured_failure_fires_fail_then_complete() {
        let transport = Arc::new(InMemoryTransport::new());
        let call = RpcCall::deferred(transport.clone(), request());
        let events = log();
        subscribe_all(&call, &events);
        call.start();

        transport.reply_next(Err(TransportFailure::Structured(json!({
            "code": 101,
            "message": "Bug #1 does not exist."
        }))));
        assert_eq!(*events.lock(), vec!["started", "fail:101", "complete:failed"]);
        assert_eq!(call.error().map(|e| e.message), Some("Bug #1 does not exist.".to_string()));
    }

    #[test]
    fn test_unstructured_failure_is_network_error() {
        let transport = Arc::new(InMemoryTransport::new());
        let call = RpcCall::new(transport.clone(), request());
        transport.reply_next(Err(TransportFailure::Unstructured("connection reset".into())));

        let error = call.error().expect("failed");
        assert_eq!(error.code, codes::INTERNAL_ERROR);
        assert!(error.is_network());
    }

    #[test]
    fn test_late_subscribers_get_replay() {
        let transport = Arc::new(InMemoryTransport::with_handler(|_| Some(Ok(json!(7)))));
        let call = RpcCall::new(transport, request());
        assert_eq!(call.state(), CallState::Succeeded);

        let events = log();
        subscribe_all(&call, &events);
        assert_eq!(*events.lock(), vec!["started", "done:7", "complete:succeeded"]);
    }

    #[test]
    fn test_deferred_call_waits_for_start() {
        let transport = Arc::new(InMemoryTransport::new());
        let call = RpcCall::deferred(transport.clone(), request());
        assert_eq!(call.state(), CallState::Created);
        assert_eq!(transport.dispatched(), 0);

        call.start();
        call.start();
        assert_eq!(transport.dispatched(), 1);
    }

    #[test]
    fn test_started_runs_before_dispatch() {
        let transport = Arc::new(InMemoryTransport::new());
        let call = RpcCall::deferred(transport.clone(), request());
        let seen = Arc::new(Mutex::new(None));
        let (seen_in, transport_in) = (seen.clone(), transport.clone());
        call.started(move |_| *seen_in.lock() = Some(transport_in.dispatched()));
        call.start();
        assert_eq!(*seen.lock(), Some(0));
    }

    #[test]
    fn test_panicking_subscriber_does_not_stop_others() {
        let transport = Arc::new(InMemoryTransport::new());
        let call = RpcCall::deferred(transport.clone(), request());
        let events = log();
        let sink = events.clone();
        call.done(|_| panic!("subscriber bug"));
        call.done(move |_| record(&sink, "second"));
        call.start();
        transport.reply_next(Ok(json!(null)));
        assert_eq!(*events.lock(), vec!["second"]);
    }

    #[test]
    fn test_resolved_call_skips_transport() {
        let call = RpcCall::resolved(request(), json!({}));
        assert_eq!(call.state(), CallState::Succeeded);
        let events = log();
        subscribe_all(&call, &events);
        assert_eq!(*events.lock(), vec!["started", "done:{}", "complete:succeeded"]);
        call.start();
        assert_eq!(call.state(), CallState::Succeeded);
    }

    #[test]
    fn test_clones_share_state() {
        let transport = Arc::new(InMemoryTransport::new());
        let call = RpcCall::new(transport.clone(), request());
        let other = call.clone();
        assert!(call.same_call(&other));
        transport.reply_next(Ok(json!(1)));
        assert_eq!(other.state(), CallState::Succeeded);
    }

    #[tokio::test]
    async fn test_outcome_resolves_from_another_task() {
        let transport = Arc::new(InMemoryTransport::new());
        let call = RpcCall::new(transport.clone(), request());

        let replier = tokio::spawn(async move {
            while transport.pending() == 0 {
                tokio::task::yield_now().await;
            }
            transport.reply_next(Ok(json!({"ok": true})));
        });

        assert_eq!(call.outcome().await, Ok(json!({"ok": true})));
        replier.await.unwrap();
    }

    #[tokio::test]
    async fn test_outcome_after_failure() {
        let transport = Arc::new(InMemoryTransport::with_handler(|_| {
            Some(Err(TransportFailure::Unstructured("offline".into())))
        }));
        let call = RpcCall::new(transport, request());
        assert_eq!(call.outcome().await, Err(RemoteError::network()));
    }
}
