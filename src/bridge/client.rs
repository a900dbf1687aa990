//! Widget-side bridge client
//!
//! `BridgeClient` turns calls into request envelopes, correlates responses
//! back to the waiting caller through its own pending-call table, and
//! dispatches notifications to registered handlers. Inbound messages from any
//! context other than the designated parent are ignored.

use std::{
    collections::HashMap,
    future::Future,
    pin::Pin,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
    task::{Context, Poll},
};

use serde::Serialize;
use serde_json::{json, Value};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::bridge::{
    channel::{ContextId, InboundMessage, MessagePort},
    envelope::{Envelope, Notification, Request},
    BridgeError,
};

pub const INITIALIZE_METHOD: &str = "ui/initialize";
pub const INITIALIZED_NOTIFICATION: &str = "ui/notifications/initialized";
pub const BRIDGE_PROTOCOL_VERSION: &str = "2026-01-26";

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AppInfo {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    pub app_info: AppInfo,
    pub app_capabilities: Value,
    pub protocol_version: String,
}

impl InitializeParams {
    pub fn new(app_info: AppInfo) -> Self {
        Self {
            app_info,
            app_capabilities: json!({}),
            protocol_version: BRIDGE_PROTOCOL_VERSION.to_string(),
        }
    }
}

pub type NotificationHandler = Arc<dyn Fn(Option<Value>) + Send + Sync>;

type CallOutcome = Result<Value, Value>;

/// What happened to one inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    Foreign,
    Malformed,
    Resolved { id: u64 },
    Stale { id: u64 },
    Notified { method: String },
    Unhandled { method: String },
}

#[derive(Default)]
struct PendingCalls {
    last_id: u64,
    entries: HashMap<u64, oneshot::Sender<CallOutcome>>,
}

impl PendingCalls {
    fn register(&mut self) -> (u64, oneshot::Receiver<CallOutcome>) {
        self.last_id += 1;
        let (tx, rx) = oneshot::channel();
        self.entries.insert(self.last_id, tx);
        (self.last_id, rx)
    }

    fn resolve(&mut self, id: u64, outcome: CallOutcome) -> bool {
        match self.entries.remove(&id) {
            Some(tx) => {
                // The caller may have stopped waiting; the entry is gone either way.
                let _ = tx.send(outcome);
                true
            }
            None => false,
        }
    }

    fn discard(&mut self, id: u64) {
        self.entries.remove(&id);
    }
}

#[derive(Default)]
struct ClientState {
    pending: PendingCalls,
    handlers: HashMap<String, NotificationHandler>,
}

#[derive(Clone)]
pub struct BridgeClient {
    parent: ContextId,
    port: MessagePort,
    state: Arc<Mutex<ClientState>>,
    ready: Arc<AtomicBool>,
}

/// Settles when the matching response arrives. There is no timeout.
#[derive(Debug)]
pub struct PendingCall {
    id: u64,
    receiver: oneshot::Receiver<CallOutcome>,
}

impl PendingCall {
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Future for PendingCall {
    type Output = Result<Value, BridgeError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.receiver).poll(cx) {
            Poll::Ready(Ok(Ok(value))) => Poll::Ready(Ok(value)),
            Poll::Ready(Ok(Err(error))) => Poll::Ready(Err(BridgeError::Rejected(error))),
            Poll::Ready(Err(_)) => Poll::Ready(Err(BridgeError::Closed)),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl BridgeClient {
    /// `parent` is the only context whose messages are processed; `port`
    /// posts to it.
    pub fn new(parent: ContextId, port: MessagePort) -> Self {
        Self {
            parent,
            port,
            state: Arc::new(Mutex::new(ClientState::default())),
            ready: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    pub fn pending_count(&self) -> usize {
        self.lock_state().pending.entries.len()
    }

    pub fn on_notification<F>(&self, method: impl Into<String>, handler: F)
    where
        F: Fn(Option<Value>) + Send + Sync + 'static,
    {
        self.lock_state()
            .handlers
            .insert(method.into(), Arc::new(handler));
    }

    pub fn call(&self, method: &str, params: Option<Value>) -> Result<PendingCall, BridgeError> {
        let (id, receiver) = self.lock_state().pending.register();
        let envelope = Envelope::Request(Request {
            id,
            method: method.to_string(),
            params,
        });

        if let Err(err) = self.port.post_message(envelope.into_value()) {
            self.lock_state().pending.discard(id);
            return Err(err);
        }

        Ok(PendingCall { id, receiver })
    }

    pub fn notify(&self, method: &str, params: Option<Value>) -> Result<(), BridgeError> {
        let envelope = Envelope::Notification(Notification {
            method: method.to_string(),
            params,
        });
        self.port.post_message(envelope.into_value())
    }

    /// Runs the handshake: one `ui/initialize` call, then the `initialized`
    /// notification, then the client is ready.
    pub async fn initialize(&self, params: InitializeParams) -> Result<Value, BridgeError> {
        if self.is_ready() {
            return Err(BridgeError::AlreadyInitialized);
        }

        let params = serde_json::to_value(&params)?;
        let result = self.call(INITIALIZE_METHOD, Some(params))?.await?;

        self.notify(INITIALIZED_NOTIFICATION, Some(json!({})))?;
        self.ready.store(true, Ordering::Release);
        info!("bridge initialized");

        Ok(result)
    }

    pub fn handle_message(&self, message: InboundMessage) -> Dispatch {
        if message.source != self.parent {
            debug!(source = message.source.0, "ignoring message from foreign context");
            return Dispatch::Foreign;
        }

        let Some(envelope) = Envelope::parse(&message.data) else {
            debug!("ignoring message that is not a bridge envelope");
            return Dispatch::Malformed;
        };

        // Any integer id settles a pending call, even when a method is present.
        let (id, outcome) = match envelope {
            Envelope::Response(response) => (response.id, response.outcome.into_result()),
            Envelope::Request(request) => (request.id, Ok(Value::Null)),
            Envelope::Notification(notification) => {
                let handler = self
                    .lock_state()
                    .handlers
                    .get(&notification.method)
                    .cloned();
                return match handler {
                    Some(handler) => {
                        handler(notification.params);
                        Dispatch::Notified {
                            method: notification.method,
                        }
                    }
                    None => Dispatch::Unhandled {
                        method: notification.method,
                    },
                };
            }
        };

        if self.lock_state().pending.resolve(id, outcome) {
            Dispatch::Resolved { id }
        } else {
            debug!(id, "dropping response without a pending call");
            Dispatch::Stale { id }
        }
    }

    /// Processes the inbox in arrival order until the channel closes, then
    /// tears down the pending-call table.
    pub async fn run(self, mut inbox: mpsc::UnboundedReceiver<InboundMessage>) {
        while let Some(message) = inbox.recv().await {
            self.handle_message(message);
        }

        self.teardown();
    }

    /// Drops every outstanding call; waiters observe `BridgeError::Closed`.
    /// The host is not told.
    pub fn teardown(&self) {
        let mut state = self.lock_state();
        let abandoned = state.pending.entries.len();
        state.pending.entries.clear();
        if abandoned > 0 {
            debug!(abandoned, "bridge torn down with outstanding calls");
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, ClientState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use serde_json::json;

    use super::*;
    use crate::bridge::channel::{connect, Endpoint};

    const WIDGET: ContextId = ContextId(1);
    const HOST: ContextId = ContextId(2);

    fn client() -> (BridgeClient, Endpoint, Endpoint) {
        let (widget, host) = connect(WIDGET, HOST);
        (BridgeClient::new(HOST, widget.port.clone()), widget, host)
    }

    fn from_host(data: Value) -> InboundMessage {
        InboundMessage { source: HOST, data }
    }

    #[tokio::test]
    async fn ids_start_at_one_and_increase() {
        let (client, _widget, mut host) = client();

        let first = client.call("a", None).expect("call");
        let second = client.call("b", None).expect("call");
        let third = client.call("c", None).expect("call");
        assert_eq!((first.id(), second.id(), third.id()), (1, 2, 3));

        let sent = host.inbox.recv().await.expect("sent");
        assert_eq!(sent.source, WIDGET);
        assert_eq!(sent.data, json!({ "jsonrpc": "2.0", "id": 1, "method": "a" }));
        assert_eq!(client.pending_count(), 3);
    }

    #[tokio::test]
    async fn ids_are_not_reused_after_resolution() {
        let (client, _widget, _host) = client();

        let first = client.call("a", None).expect("call");
        client.handle_message(from_host(json!({ "jsonrpc": "2.0", "id": 1, "result": {} })));
        first.await.expect("resolved");

        let second = client.call("b", None).expect("call");
        assert_eq!(second.id(), 2);
    }

    #[tokio::test]
    async fn out_of_order_responses_pair_by_id() {
        let (client, _widget, _host) = client();

        let first = client.call("first", None).expect("call");
        let second = client.call("second", None).expect("call");

        assert_eq!(
            client.handle_message(from_host(json!({ "jsonrpc": "2.0", "id": 2, "result": "two" }))),
            Dispatch::Resolved { id: 2 }
        );
        assert_eq!(
            client.handle_message(from_host(json!({ "jsonrpc": "2.0", "id": 1, "result": "one" }))),
            Dispatch::Resolved { id: 1 }
        );

        assert_eq!(second.await.expect("second"), json!("two"));
        assert_eq!(first.await.expect("first"), json!("one"));
        assert_eq!(client.pending_count(), 0);
    }

    #[tokio::test]
    async fn error_response_rejects_with_host_payload() {
        let (client, _widget, _host) = client();
        let call = client.call("fails", None).expect("call");

        client.handle_message(from_host(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": { "code": -32000, "message": "nope" }
        })));

        match call.await {
            Err(BridgeError::Rejected(error)) => {
                assert_eq!(error, json!({ "code": -32000, "message": "nope" }))
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn duplicate_response_settles_only_once() {
        let (client, _widget, _host) = client();
        let call = client.call("once", None).expect("call");

        let response = json!({ "jsonrpc": "2.0", "id": 1, "result": 1 });
        assert_eq!(
            client.handle_message(from_host(response.clone())),
            Dispatch::Resolved { id: 1 }
        );
        assert_eq!(
            client.handle_message(from_host(json!({ "jsonrpc": "2.0", "id": 1, "error": {} }))),
            Dispatch::Stale { id: 1 }
        );
        assert_eq!(call.await.expect("first outcome wins"), json!(1));
    }

    #[tokio::test]
    async fn id_with_method_and_no_result_settles_call_with_null() {
        let (client, _widget, _host) = client();
        let call = client.call("ui/open-link", None).expect("call");

        let dispatch = client.handle_message(from_host(
            json!({ "jsonrpc": "2.0", "id": 1, "method": "x" }),
        ));

        assert_eq!(dispatch, Dispatch::Resolved { id: 1 });
        assert_eq!(client.pending_count(), 0);
        assert_eq!(call.await.expect("resolved"), Value::Null);
    }

    #[test]
    fn unmatched_response_has_no_effect() {
        let (client, _widget, _host) = client();
        let invoked = Arc::new(AtomicUsize::new(0));
        let counter = invoked.clone();
        client.on_notification("anything", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let dispatch =
            client.handle_message(from_host(json!({ "jsonrpc": "2.0", "id": 42, "result": {} })));

        assert_eq!(dispatch, Dispatch::Stale { id: 42 });
        assert_eq!(invoked.load(Ordering::SeqCst), 0);
        assert_eq!(client.pending_count(), 0);
    }

    #[test]
    fn foreign_and_malformed_messages_are_ignored() {
        let (client, _widget, _host) = client();
        let _call = client.call("waiting", None).expect("call");

        let foreign = client.handle_message(InboundMessage {
            source: ContextId(99),
            data: json!({ "jsonrpc": "2.0", "id": 1, "result": {} }),
        });
        let malformed = client.handle_message(from_host(json!({ "id": 1, "result": {} })));

        assert_eq!(foreign, Dispatch::Foreign);
        assert_eq!(malformed, Dispatch::Malformed);
        assert_eq!(client.pending_count(), 1);
    }

    #[test]
    fn notifications_reach_registered_handler_only() {
        let (client, _widget, _host) = client();
        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = received.clone();
        client.on_notification("ui/notifications/tool-result", move |params| {
            sink.lock().expect("sink").push(params);
        });

        let handled = client.handle_message(from_host(json!({
            "jsonrpc": "2.0",
            "method": "ui/notifications/tool-result",
            "params": { "structuredContent": { "name": "Ada" } }
        })));
        let unhandled = client.handle_message(from_host(json!({
            "jsonrpc": "2.0",
            "method": "ui/notifications/host-context-changed"
        })));

        assert!(matches!(handled, Dispatch::Notified { .. }));
        assert!(matches!(unhandled, Dispatch::Unhandled { .. }));
        assert_eq!(
            received.lock().expect("received").as_slice(),
            &[Some(json!({ "structuredContent": { "name": "Ada" } }))]
        );
    }

    #[tokio::test]
    async fn handshake_sends_one_initialized_notification() {
        let (client, _widget, mut host) = client();
        let params = InitializeParams::new(AppInfo {
            name: "w".to_string(),
            version: "1".to_string(),
        });

        let handshake = tokio::spawn({
            let client = client.clone();
            async move { client.initialize(params).await }
        });

        let request = host.inbox.recv().await.expect("initialize request");
        assert_eq!(
            request.data,
            json!({
                "jsonrpc": "2.0",
                "id": 1,
                "method": "ui/initialize",
                "params": {
                    "appInfo": { "name": "w", "version": "1" },
                    "appCapabilities": {},
                    "protocolVersion": "2026-01-26"
                }
            })
        );
        assert!(!client.is_ready());

        client.handle_message(from_host(json!({ "jsonrpc": "2.0", "id": 1, "result": {} })));
        handshake
            .await
            .expect("join")
            .expect("handshake succeeds");

        let initialized = host.inbox.recv().await.expect("initialized notification");
        assert_eq!(
            initialized.data,
            json!({ "jsonrpc": "2.0", "method": "ui/notifications/initialized", "params": {} })
        );
        assert!(host.inbox.try_recv().is_err());
        assert!(client.is_ready());
    }

    #[tokio::test]
    async fn rejected_handshake_leaves_client_not_ready() {
        let (client, _widget, mut host) = client();
        let handshake = tokio::spawn({
            let client = client.clone();
            async move {
                client
                    .initialize(InitializeParams::new(AppInfo {
                        name: "w".to_string(),
                        version: "1".to_string(),
                    }))
                    .await
            }
        });

        host.inbox.recv().await.expect("initialize request");
        client.handle_message(from_host(json!({ "jsonrpc": "2.0", "id": 1, "error": "denied" })));

        assert!(handshake.await.expect("join").is_err());
        assert!(!client.is_ready());
        assert!(host.inbox.try_recv().is_err());
    }

    #[tokio::test]
    async fn teardown_abandons_outstanding_calls() {
        let (client, widget, _host) = client();
        let call = client.call("never-answered", None).expect("call");

        drop(widget.inbox);
        client.teardown();

        assert!(matches!(call.await, Err(BridgeError::Closed)));
        assert_eq!(client.pending_count(), 0);
    }

    #[tokio::test]
    async fn run_processes_inbox_in_order() {
        let (client, widget, host) = client();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        client.on_notification("tick", move |params| {
            sink.lock().expect("sink").push(params.unwrap_or_default());
        });

        for n in 0..3 {
            host.port
                .post_message(json!({ "jsonrpc": "2.0", "method": "tick", "params": n }))
                .expect("post");
        }
        drop(host);

        client.clone().run(widget.inbox).await;
        assert_eq!(
            seen.lock().expect("seen").as_slice(),
            &[json!(0), json!(1), json!(2)]
        );
    }
}
