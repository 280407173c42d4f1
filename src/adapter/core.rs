//! Connection adapter implementation.
//!
//! The adapter wraps one socket and turns its raw frames into typed
//! `{type, data}` messages routed to registered handlers.
//!
//! # State
//!
//! ```text
//! Unconnected ──(open event / first accepted peer)──► Connected
//! ```
//!
//! `Connected` is terminal. Disconnects are the transport's business.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::future::Future;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::oneshot;
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::protocol::{Direction, Envelope, Observer};
use crate::transport::{EventKind, Listener, Socket, SocketEvent};

use super::builder::AdapterBuilder;
use super::registry::HandlerRegistry;
use super::role::{ConnectionRole, Environment};

// ============================================================================
// ConnectedState
// ============================================================================

/// Connected flag plus callers waiting for it.
#[derive(Default)]
struct ConnectedState {
    connected: bool,
    waiters: Vec<oneshot::Sender<()>>,
}

// ============================================================================
// Inner
// ============================================================================

/// State shared between adapter handles and socket listeners.
///
/// Listeners hold a [`Weak`] reference, so the socket never keeps the
/// adapter alive.
struct Inner {
    socket: Arc<dyn Socket>,
    role: ConnectionRole,
    handlers: Mutex<HandlerRegistry>,
    /// Peer that `emit` writes to.
    sender: Mutex<Option<Arc<dyn Socket>>>,
    /// Accepted peers still open. The adapter owns them, so dropping it
    /// closes every peer it accepted.
    peers: Mutex<Vec<Arc<dyn Socket>>>,
    state: Mutex<ConnectedState>,
    observer: Arc<dyn Observer>,
}

impl Inner {
    /// Attaches the role's message and connected-trigger listeners.
    fn attach_listeners(self: &Arc<Self>) {
        let socket = self.socket.as_ref();

        match self.role {
            ConnectionRole::Server => {
                let weak = Arc::downgrade(self);
                self.role.subscribe(
                    socket,
                    EventKind::Connection,
                    Arc::new(move |event: &SocketEvent| {
                        if let SocketEvent::Connection(peer) = event
                            && let Some(inner) = weak.upgrade()
                        {
                            inner.accept_peer(peer);
                        }
                    }),
                );
            }

            ConnectionRole::ClientBrowser | ConnectionRole::ClientNonBrowser => {
                self.role
                    .subscribe(socket, EventKind::Message, self.message_listener());

                let weak = Arc::downgrade(self);
                self.role.subscribe(
                    socket,
                    EventKind::Open,
                    Arc::new(move |_: &SocketEvent| {
                        if let Some(inner) = weak.upgrade() {
                            inner.bind_sender(Arc::clone(&inner.socket));
                            inner.mark_connected();
                        }
                    }),
                );
            }
        }
    }

    /// Builds a listener that feeds message events into [`Inner::handle_frame`].
    fn message_listener(self: &Arc<Self>) -> Listener {
        let weak: Weak<Self> = Arc::downgrade(self);
        Arc::new(move |event: &SocketEvent| {
            if let SocketEvent::Message(incoming) = event
                && let Some(inner) = weak.upgrade()
            {
                inner.handle_frame(incoming.frame());
            }
        })
    }

    /// Binds the sender to a newly accepted peer and listens to it.
    fn accept_peer(self: &Arc<Self>, peer: &Arc<dyn Socket>) {
        debug!(peer = ?peer.url(), "Peer accepted");

        {
            let mut peers = self.peers.lock();
            peers.retain(|p| !p.is_closed());
            peers.push(Arc::clone(peer));
        }

        self.bind_sender(Arc::clone(peer));
        self.role
            .subscribe(peer.as_ref(), EventKind::Message, self.message_listener());
        self.mark_connected();
    }

    /// Points `emit` at `peer`, replacing any previous binding.
    fn bind_sender(&self, peer: Arc<dyn Socket>) {
        if self.sender.lock().replace(peer).is_some() {
            debug!(role = %self.role, "Sender rebound to most recent peer");
        }
    }

    /// Flips the connected flag and releases every waiter.
    fn mark_connected(&self) {
        let waiters = {
            let mut state = self.state.lock();
            if state.connected {
                return;
            }
            state.connected = true;
            std::mem::take(&mut state.waiters)
        };

        debug!(role = %self.role, waiters = waiters.len(), "Connected");

        for waiter in waiters {
            let _ = waiter.send(());
        }
    }

    /// Decodes a frame and runs the handlers for its type.
    fn handle_frame(&self, raw: &str) {
        let envelope = Envelope::decode(raw);
        self.observer.record(Direction::Inbound, &envelope);

        let handlers = self.handlers.lock().handlers_for(&envelope.kind);
        if handlers.is_empty() {
            trace!(kind = %envelope.kind, "No handler for message type");
            return;
        }

        for handler in handlers {
            handler(envelope.data.as_ref());
        }
    }

    /// Writes an envelope to the bound peer.
    fn send(&self, envelope: Envelope) -> Result<()> {
        let Some(sender) = self.sender.lock().clone() else {
            return Err(Error::NotConnected);
        };

        let frame = envelope.encode()?;
        self.observer.record(Direction::Outbound, &envelope);

        sender.send(&frame)
    }
}

// ============================================================================
// ConnectionAdapter
// ============================================================================

/// Typed publish/subscribe interface over one socket.
///
/// The adapter is single-peer: in the server role `emit` writes to the most
/// recently accepted peer, while messages from every accepted peer are
/// dispatched. Use one adapter per peer when each client needs its own
/// replies.
///
/// Cloning yields another handle to the same adapter.
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use typed_socket::{ConnectionAdapter, transport::WsConnection};
///
/// let socket = WsConnection::connect("ws://127.0.0.1:9000")?;
/// let adapter = ConnectionAdapter::new(Arc::new(socket));
///
/// adapter.on("pong", |data| println!("pong: {data:?}"));
/// adapter.wait_connection().await?;
/// adapter.emit("ping", &serde_json::json!({ "n": 1 }))?;
/// ```
#[derive(Clone)]
pub struct ConnectionAdapter {
    inner: Arc<Inner>,
}

// ============================================================================
// ConnectionAdapter - Constructors
// ============================================================================

impl ConnectionAdapter {
    /// Wraps `socket` with default options.
    #[must_use]
    pub fn new(socket: Arc<dyn Socket>) -> Self {
        AdapterBuilder::new().build(socket)
    }

    /// Creates a builder for custom options.
    #[inline]
    #[must_use]
    pub fn builder() -> AdapterBuilder {
        AdapterBuilder::new()
    }

    /// Detects the role and attaches listeners.
    pub(crate) fn with_options(
        socket: Arc<dyn Socket>,
        environment: Environment,
        observer: Arc<dyn Observer>,
    ) -> Self {
        let role = ConnectionRole::detect(socket.as_ref(), environment);

        let inner = Arc::new(Inner {
            socket,
            role,
            handlers: Mutex::new(HandlerRegistry::new()),
            sender: Mutex::new(None),
            peers: Mutex::new(Vec::new()),
            state: Mutex::new(ConnectedState::default()),
            observer,
        });

        inner.attach_listeners();

        debug!(%role, "Adapter attached");

        Self { inner }
    }
}

// ============================================================================
// ConnectionAdapter - Accessors
// ============================================================================

impl ConnectionAdapter {
    /// Returns the role chosen at construction.
    #[inline]
    #[must_use]
    pub fn role(&self) -> ConnectionRole {
        self.inner.role
    }

    /// Returns `true` once the connected trigger has fired.
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.inner.state.lock().connected
    }
}

// ============================================================================
// ConnectionAdapter - Messaging
// ============================================================================

impl ConnectionAdapter {
    /// Registers a handler for messages of type `kind`.
    ///
    /// `"open"` and `"connection"` are reserved: they subscribe directly to
    /// the socket's own event. An `open` handler receives `None`; a
    /// `connection` handler receives the peer URL as a JSON string when the
    /// peer has one.
    pub fn on<F>(&self, kind: &str, handler: F)
    where
        F: Fn(Option<&Value>) + Send + Sync + 'static,
    {
        if let Some(event) = EventKind::reserved(kind) {
            let listener: Listener = Arc::new(move |socket_event: &SocketEvent| {
                match socket_event {
                    SocketEvent::Connection(peer) => {
                        let url = peer.url().map(Value::String);
                        handler(url.as_ref());
                    }
                    _ => handler(None),
                }
            });

            self.inner
                .role
                .subscribe(self.inner.socket.as_ref(), event, listener);
            return;
        }

        self.inner.handlers.lock().register(kind, Arc::new(handler));
    }

    /// Registers a handler that receives `data` deserialized as `T`.
    ///
    /// Absent data deserializes from `null`. Messages whose data does not
    /// fit `T` are logged and skipped.
    pub fn on_typed<T, F>(&self, kind: &str, handler: F)
    where
        T: DeserializeOwned + 'static,
        F: Fn(T) + Send + Sync + 'static,
    {
        let route = kind.to_owned();
        self.on(kind, move |data| {
            match serde_json::from_value::<T>(data.cloned().unwrap_or(Value::Null)) {
                Ok(value) => handler(value),
                Err(e) => warn!(
                    kind = %route,
                    error = %e,
                    "Message data does not match handler type"
                ),
            }
        });
    }

    /// Sends a message of type `kind` carrying `data`.
    ///
    /// # Errors
    ///
    /// - [`Error::NotConnected`] if no peer is bound yet
    /// - [`Error::Json`] if `data` cannot be serialized
    /// - any error returned by the peer's `send`
    pub fn emit<T>(&self, kind: &str, data: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        let data = serde_json::to_value(data)?;
        self.inner.send(Envelope::new(kind, Some(data)))
    }

    /// Sends a message of type `kind` without data.
    ///
    /// # Errors
    ///
    /// Same as [`ConnectionAdapter::emit`].
    pub fn emit_empty(&self, kind: &str) -> Result<()> {
        self.inner.send(Envelope::bare(kind))
    }

    /// Waits until the adapter is connected.
    ///
    /// The waiter is registered when this method is called, not when the
    /// future is first polled. Resolves immediately if already connected.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] if the adapter is dropped before
    /// connecting.
    pub fn wait_connection(&self) -> impl Future<Output = Result<()>> + Send + use<> {
        let receiver = {
            let mut state = self.inner.state.lock();
            if state.connected {
                None
            } else {
                let (tx, rx) = oneshot::channel();
                state.waiters.push(tx);
                Some(rx)
            }
        };

        async move {
            match receiver {
                None => Ok(()),
                Some(rx) => rx.await.map_err(|_| Error::ConnectionClosed),
            }
        }
    }
}

impl fmt::Debug for ConnectionAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionAdapter")
            .field("role", &self.inner.role)
            .field("connected", &self.is_connected())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::net::{IpAddr, Ipv4Addr};
    use std::time::Duration;

    use serde::Deserialize;
    use serde_json::json;
    use tokio::sync::mpsc;
    use tokio::time::timeout;
    use tokio_test::task::spawn;
    use tokio_test::{assert_pending, assert_ready_ok};

    use crate::protocol::NoopObserver;
    use crate::transport::mock::{MockSocket, Style, wait_until_closed};
    use crate::transport::{WsConnection, WsServer};

    const WAIT: Duration = Duration::from_secs(5);

    type Calls = Arc<Mutex<Vec<(String, Option<Value>)>>>;

    /// Handler that records `(tag, data)` into `calls`.
    fn recorder(calls: &Calls, tag: &str) -> impl Fn(Option<&Value>) + Send + Sync + use<> {
        let calls = Arc::clone(calls);
        let tag = tag.to_string();
        move |data: Option<&Value>| calls.lock().push((tag.clone(), data.cloned()))
    }

    fn native(socket: Arc<MockSocket>) -> ConnectionAdapter {
        ConnectionAdapter::builder()
            .environment(Environment::Native)
            .observer(NoopObserver)
            .build(socket)
    }

    #[derive(Default)]
    struct RecordingObserver {
        records: Mutex<Vec<(Direction, String)>>,
    }

    impl Observer for RecordingObserver {
        fn record(&self, direction: Direction, envelope: &Envelope) {
            self.records.lock().push((direction, envelope.kind.clone()));
        }
    }

    #[test]
    fn test_client_routes_ping_to_handler() {
        let socket = MockSocket::client();
        let adapter = native(Arc::clone(&socket));
        let calls = Calls::default();

        adapter.on("ping", recorder(&calls, "h"));
        socket.receive(r#"{"type":"ping","data":{"n":1}}"#);

        assert_eq!(
            *calls.lock(),
            vec![("h".to_string(), Some(json!({ "n": 1 })))]
        );
    }

    #[test]
    fn test_handlers_run_in_registration_order() {
        let socket = MockSocket::client();
        let adapter = native(Arc::clone(&socket));
        let calls = Calls::default();

        adapter.on("foo", recorder(&calls, "h1"));
        adapter.on("foo", recorder(&calls, "h2"));
        socket.receive(r#"{"type":"foo","data":[1,2]}"#);

        assert_eq!(
            *calls.lock(),
            vec![
                ("h1".to_string(), Some(json!([1, 2]))),
                ("h2".to_string(), Some(json!([1, 2]))),
            ]
        );
    }

    #[test]
    fn test_unrouted_type_is_ignored() {
        let socket = MockSocket::client();
        let adapter = native(Arc::clone(&socket));
        let calls = Calls::default();

        adapter.on("foo", recorder(&calls, "h"));
        socket.receive(r#"{"type":"bar"}"#);
        socket.receive("not json at all");

        assert!(calls.lock().is_empty());
    }

    #[test]
    fn test_non_json_frame_routes_by_literal() {
        let socket = MockSocket::client();
        let adapter = native(Arc::clone(&socket));
        let calls = Calls::default();

        adapter.on("heartbeat", recorder(&calls, "h"));
        socket.receive("heartbeat");

        assert_eq!(*calls.lock(), vec![("h".to_string(), None)]);
    }

    #[test]
    fn test_emit_before_connection_fails() {
        let socket = MockSocket::client();
        let adapter = native(Arc::clone(&socket));

        let err = adapter
            .emit("greet", &json!({ "msg": "hi" }))
            .expect_err("no peer bound");

        assert!(err.is_not_connected());
        assert!(socket.sent().is_empty());
    }

    #[test]
    fn test_emit_after_open_writes_envelope() {
        let socket = MockSocket::client();
        let adapter = native(Arc::clone(&socket));

        socket.open();
        adapter
            .emit("greet", &json!({ "msg": "hi" }))
            .expect("emit");
        adapter.emit_empty("ready").expect("emit");

        assert_eq!(
            socket.sent(),
            vec![
                r#"{"type":"greet","data":{"msg":"hi"}}"#.to_string(),
                r#"{"type":"ready"}"#.to_string(),
            ]
        );
    }

    #[test]
    fn test_emit_propagates_send_failure() {
        let socket = MockSocket::broken();
        let adapter = native(Arc::clone(&socket));

        socket.open();
        let err = adapter.emit("x", &1).expect_err("send fails");

        assert!(matches!(err, Error::ConnectionClosed));
    }

    #[test]
    fn test_pending_waiters_resolve_on_trigger() {
        let socket = MockSocket::client();
        let adapter = native(Arc::clone(&socket));

        let mut first = spawn(adapter.wait_connection());
        let mut second = spawn(adapter.wait_connection());
        assert_pending!(first.poll());
        assert_pending!(second.poll());
        assert!(!adapter.is_connected());

        socket.open();

        assert!(first.is_woken());
        assert!(second.is_woken());
        assert_ready_ok!(first.poll());
        assert_ready_ok!(second.poll());
        assert!(adapter.is_connected());
    }

    #[test]
    fn test_waiter_registered_before_first_poll() {
        let socket = MockSocket::client();
        let adapter = native(Arc::clone(&socket));

        let waiter = adapter.wait_connection();
        socket.open();

        assert_ready_ok!(spawn(waiter).poll());
    }

    #[test]
    fn test_wait_after_trigger_is_immediate() {
        let socket = MockSocket::client();
        let adapter = native(Arc::clone(&socket));

        socket.open();
        socket.open();

        assert_ready_ok!(spawn(adapter.wait_connection()).poll());
    }

    #[test]
    fn test_server_emits_to_most_recent_peer() {
        let server = MockSocket::server();
        let adapter = native(Arc::clone(&server));
        assert_eq!(adapter.role(), ConnectionRole::Server);

        let first = MockSocket::client();
        let second = MockSocket::client();
        server.accept(Arc::clone(&first));
        server.accept(Arc::clone(&second));

        adapter.emit("news", &"latest").expect("emit");

        assert!(first.sent().is_empty());
        assert_eq!(second.sent(), vec![r#"{"type":"news","data":"latest"}"#]);
    }

    #[test]
    fn test_server_dispatches_from_every_peer() {
        let server = MockSocket::server();
        let adapter = native(Arc::clone(&server));
        let calls = Calls::default();
        adapter.on("chat", recorder(&calls, "h"));

        let first = MockSocket::client();
        let second = MockSocket::client();
        server.accept(Arc::clone(&first));
        server.accept(Arc::clone(&second));

        first.receive(r#"{"type":"chat","data":1}"#);
        second.receive(r#"{"type":"chat","data":2}"#);

        assert_eq!(
            *calls.lock(),
            vec![
                ("h".to_string(), Some(json!(1))),
                ("h".to_string(), Some(json!(2))),
            ]
        );
    }

    #[test]
    fn test_server_connects_on_first_peer() {
        let server = MockSocket::server();
        let adapter = native(Arc::clone(&server));
        let mut waiter = spawn(adapter.wait_connection());

        server.open();
        assert_pending!(waiter.poll());

        server.accept(MockSocket::client());
        assert_ready_ok!(waiter.poll());
    }

    #[test]
    fn test_server_releases_closed_peers() {
        let server = MockSocket::server();
        let adapter = native(Arc::clone(&server));

        let first = MockSocket::client();
        server.accept(Arc::clone(&first));
        first.close();
        server.accept(MockSocket::client());

        assert_eq!(adapter.inner.peers.lock().len(), 1);
        assert_eq!(Arc::strong_count(&first), 1);
    }

    #[test]
    fn test_browser_role_uses_event_target_listeners() {
        let socket = MockSocket::client();
        let adapter = ConnectionAdapter::builder()
            .environment(Environment::Browser)
            .observer(NoopObserver)
            .build(Arc::clone(&socket) as Arc<dyn Socket>);
        let calls = Calls::default();

        assert_eq!(adapter.role(), ConnectionRole::ClientBrowser);
        assert_eq!(socket.styles(EventKind::Message), vec![Style::EventTarget]);
        assert_eq!(socket.styles(EventKind::Open), vec![Style::EventTarget]);

        adapter.on("ping", recorder(&calls, "h"));
        socket.receive_event(r#"{"type":"ping","data":true}"#);

        assert_eq!(*calls.lock(), vec![("h".to_string(), Some(json!(true)))]);
    }

    #[test]
    fn test_reserved_open_forwards_to_socket() {
        let socket = MockSocket::client();
        let adapter = native(Arc::clone(&socket));
        let calls = Calls::default();

        adapter.on("open", recorder(&calls, "open"));
        assert_eq!(adapter.inner.handlers.lock().count("open"), 0);
        assert_eq!(
            socket.styles(EventKind::Open),
            vec![Style::Emitter, Style::Emitter]
        );

        socket.receive(r#"{"type":"open"}"#);
        assert!(calls.lock().is_empty());

        socket.open();
        assert_eq!(*calls.lock(), vec![("open".to_string(), None)]);
    }

    #[test]
    fn test_reserved_connection_receives_peer_url() {
        let server = MockSocket::server();
        let adapter = native(Arc::clone(&server));
        let calls = Calls::default();

        adapter.on("connection", recorder(&calls, "conn"));
        server.accept(MockSocket::client());

        assert_eq!(
            *calls.lock(),
            vec![("conn".to_string(), Some(json!("ws://mock.test/")))]
        );
    }

    #[test]
    fn test_typed_handler() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct Move {
            x: i32,
            y: i32,
        }

        let socket = MockSocket::client();
        let adapter = native(Arc::clone(&socket));
        let moves = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&moves);
        adapter.on_typed("move", move |m: Move| sink.lock().push(m));

        socket.receive(r#"{"type":"move","data":{"x":1,"y":2}}"#);
        socket.receive(r#"{"type":"move","data":"sideways"}"#);

        assert_eq!(*moves.lock(), vec![Move { x: 1, y: 2 }]);
    }

    #[test]
    fn test_handler_can_emit_reentrantly() {
        let socket = MockSocket::client();
        let adapter = native(Arc::clone(&socket));
        socket.open();

        let echo = adapter.clone();
        adapter.on("ping", move |data| {
            echo.emit("pong", &data.cloned()).expect("emit from handler");
        });
        socket.receive(r#"{"type":"ping","data":7}"#);

        assert_eq!(socket.sent(), vec![r#"{"type":"pong","data":7}"#]);
    }

    #[test]
    fn test_observer_sees_both_directions() {
        let socket = MockSocket::client();
        let observer = Arc::new(RecordingObserver::default());
        let adapter = ConnectionAdapter::builder()
            .environment(Environment::Native)
            .shared_observer(Arc::clone(&observer) as Arc<dyn Observer>)
            .build(Arc::clone(&socket) as Arc<dyn Socket>);

        socket.open();
        socket.receive("hello");
        adapter.emit_empty("bye").expect("emit");

        assert_eq!(
            *observer.records.lock(),
            vec![
                (Direction::Inbound, "hello".to_string()),
                (Direction::Outbound, "bye".to_string()),
            ]
        );
    }

    #[test]
    fn test_dropped_adapter_ignores_events() {
        let socket = MockSocket::client();
        let calls = Calls::default();
        {
            let adapter = native(Arc::clone(&socket));
            adapter.on("ping", recorder(&calls, "h"));
        }

        socket.open();
        socket.receive(r#"{"type":"ping"}"#);

        assert!(calls.lock().is_empty());
    }

    #[tokio::test]
    async fn test_end_to_end_over_websocket() {
        let server_socket = WsServer::bind(IpAddr::V4(Ipv4Addr::LOCALHOST), 0)
            .await
            .expect("bind");
        let url = server_socket.ws_url();
        let server = ConnectionAdapter::new(Arc::new(server_socket));

        let (ping_tx, mut ping_rx) = mpsc::unbounded_channel();
        server.on("ping", move |data| {
            let _ = ping_tx.send(data.cloned());
        });

        let client =
            ConnectionAdapter::new(Arc::new(WsConnection::connect(&url).expect("connect")));
        assert_eq!(client.role(), ConnectionRole::ClientNonBrowser);

        let (pong_tx, mut pong_rx) = mpsc::unbounded_channel();
        client.on("pong", move |data| {
            let _ = pong_tx.send(data.cloned());
        });

        timeout(WAIT, client.wait_connection())
            .await
            .expect("client connect timeout")
            .expect("client connected");
        timeout(WAIT, server.wait_connection())
            .await
            .expect("server connect timeout")
            .expect("server connected");

        client.emit("ping", &json!({ "n": 1 })).expect("client emit");
        let received = timeout(WAIT, ping_rx.recv())
            .await
            .expect("ping timeout")
            .expect("ping");
        assert_eq!(received, Some(json!({ "n": 1 })));

        server.emit_empty("pong").expect("server emit");
        let received = timeout(WAIT, pong_rx.recv())
            .await
            .expect("pong timeout")
            .expect("pong");
        assert_eq!(received, None);
    }

    #[tokio::test]
    async fn test_established_client_is_connected_on_attach() {
        let server_socket = WsServer::bind(IpAddr::V4(Ipv4Addr::LOCALHOST), 0)
            .await
            .expect("bind");
        let url = server_socket.ws_url();
        let server = ConnectionAdapter::new(Arc::new(server_socket));

        let socket = WsConnection::establish(&url).await.expect("establish");
        let client = ConnectionAdapter::new(Arc::new(socket));

        assert!(client.is_connected());
        timeout(WAIT, server.wait_connection())
            .await
            .expect("server connect timeout")
            .expect("server connected");
    }

    #[tokio::test]
    async fn test_dropping_server_adapter_closes_its_peers() {
        let server_socket = WsServer::bind(IpAddr::V4(Ipv4Addr::LOCALHOST), 0)
            .await
            .expect("bind");
        let url = server_socket.ws_url();
        let server = ConnectionAdapter::new(Arc::new(server_socket));

        let client = WsConnection::establish(&url).await.expect("establish");
        let watcher = client.clone();
        timeout(WAIT, server.wait_connection())
            .await
            .expect("server connect timeout")
            .expect("server connected");

        drop(server);
        drop(client);

        wait_until_closed(&watcher).await;
        assert!(!watcher.is_open());
        assert!(WsConnection::establish(&url).await.is_err());
    }
}
