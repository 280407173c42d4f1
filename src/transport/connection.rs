//! WebSocket peer connection and event loop.
//!
//! A [`WsConnection`] is one end of a WebSocket: either an outbound client
//! created with [`WsConnection::connect`], or a peer accepted by
//! [`WsServer`](super::WsServer).
//!
//! # Event Loop
//!
//! Each open connection runs a tokio task that handles:
//!
//! - Incoming text frames, delivered to `Message` listeners
//! - Outgoing frames queued by [`Socket::send`]
//! - Shutdown requests from [`WsConnection::close`]
//!
//! The loop holds only a weak reference to the connection state. Dropping
//! the last handle drops the command channel, and the loop closes the
//! WebSocket.

// ============================================================================
// Imports
// ============================================================================

use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, Weak};

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{WebSocketStream, connect_async};
use tracing::{debug, error, trace, warn};
use url::Url;

use crate::error::{Error, Result};

use super::{EventKind, Incoming, Listener, Socket, SocketEvent};

// ============================================================================
// ConnectionCommand
// ============================================================================

/// Internal commands for the event loop.
enum ConnectionCommand {
    /// Write a text frame.
    Send(String),
    /// Close the connection.
    Shutdown,
}

// ============================================================================
// Link
// ============================================================================

/// Lifecycle of the underlying WebSocket.
enum Link {
    /// Handshake in progress.
    Connecting,
    /// Event loop running.
    Open(mpsc::UnboundedSender<ConnectionCommand>),
    /// Closed or failed.
    Closed,
}

/// Mutable connection state.
struct State {
    link: Link,
    open_listeners: Vec<Listener>,
    message_listeners: Vec<Listener>,
}

/// State shared between handles and the event loop.
struct Shared {
    url: Option<String>,
    remote_addr: Option<SocketAddr>,
    state: Mutex<State>,
}

impl Shared {
    fn new(url: Option<String>, remote_addr: Option<SocketAddr>, link: Link) -> Self {
        Self {
            url,
            remote_addr,
            state: Mutex::new(State {
                link,
                open_listeners: Vec::new(),
                message_listeners: Vec::new(),
            }),
        }
    }

    /// Marks the link open and notifies open listeners.
    fn mark_open(&self, command_tx: mpsc::UnboundedSender<ConnectionCommand>) {
        let listeners = {
            let mut state = self.state.lock();
            state.link = Link::Open(command_tx);
            state.open_listeners.clone()
        };

        for listener in listeners {
            listener(&SocketEvent::Open);
        }
    }

    fn mark_closed(&self) {
        self.state.lock().link = Link::Closed;
    }

    /// Delivers an inbound frame to message listeners.
    fn dispatch(&self, incoming: Incoming) {
        let listeners = self.state.lock().message_listeners.clone();
        if listeners.is_empty() {
            trace!("Frame dropped, no message listeners");
            return;
        }

        let event = SocketEvent::Message(incoming);
        for listener in listeners {
            listener(&event);
        }
    }
}

// ============================================================================
// WsConnection
// ============================================================================

/// A WebSocket peer.
///
/// Cloning yields another handle to the same connection.
///
/// # Example
///
/// ```ignore
/// use std::sync::{Arc, Weak};
/// use typed_socket::{ConnectionAdapter, transport::WsConnection};
///
/// let socket = WsConnection::connect("ws://127.0.0.1:9000")?;
/// let adapter = ConnectionAdapter::new(Arc::new(socket));
/// adapter.wait_connection().await?;
/// ```
#[derive(Clone)]
pub struct WsConnection {
    shared: Arc<Shared>,
}

impl WsConnection {
    /// Starts connecting to a WebSocket server.
    ///
    /// Returns immediately in the connecting state; the handshake runs on
    /// the current tokio runtime and fires `Open` listeners on success.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the URL is invalid or not `ws`/`wss`
    /// - [`Error::Config`] if called outside a tokio runtime
    pub fn connect(url: &str) -> Result<Self> {
        let parsed = parse_url(url)?;

        let runtime = Handle::try_current()
            .map_err(|e| Error::config(format!("No tokio runtime available: {e}")))?;

        let connection = Self {
            shared: Arc::new(Shared::new(
                Some(parsed.to_string()),
                None,
                Link::Connecting,
            )),
        };

        let weak = Arc::downgrade(&connection.shared);
        runtime.spawn(async move {
            match connect_async(parsed.as_str()).await {
                Ok((mut ws_stream, _response)) => {
                    debug!(url = %parsed, "WebSocket connected");

                    let Some(shared) = weak.upgrade() else {
                        debug!(url = %parsed, "All handles dropped during handshake");
                        let _ = ws_stream.close(None).await;
                        return;
                    };

                    let (command_tx, command_rx) = mpsc::unbounded_channel();
                    shared.mark_open(command_tx);
                    drop(shared);

                    Self::run_event_loop(ws_stream, command_rx, weak).await;
                }
                Err(e) => {
                    error!(url = %parsed, error = %e, "WebSocket connect failed");
                    if let Some(shared) = weak.upgrade() {
                        shared.mark_closed();
                    }
                }
            }
        });

        Ok(connection)
    }

    /// Connects to a WebSocket server and waits for the handshake.
    ///
    /// The returned connection is already open, so an adapter wrapping it
    /// is connected as soon as it attaches. Frames the server sends before
    /// a message listener is attached are dropped.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the URL is invalid or not `ws`/`wss`
    /// - [`Error::WebSocket`] if the handshake fails
    pub async fn establish(url: &str) -> Result<Self> {
        let parsed = parse_url(url)?;
        let (ws_stream, _response) = connect_async(parsed.as_str()).await?;

        debug!(url = %parsed, "WebSocket connected");

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let connection = Self {
            shared: Arc::new(Shared::new(
                Some(parsed.to_string()),
                None,
                Link::Open(command_tx),
            )),
        };

        tokio::spawn(Self::run_event_loop(
            ws_stream,
            command_rx,
            Arc::downgrade(&connection.shared),
        ));

        Ok(connection)
    }

    /// Wraps a stream accepted by a server.
    ///
    /// The returned future is the event loop. The caller spawns it once
    /// listeners are attached, so no frame arrives before anyone listens.
    /// The caller must keep a handle alive, or the loop closes at once.
    pub(crate) fn accepted<S>(
        ws_stream: WebSocketStream<S>,
        remote_addr: SocketAddr,
    ) -> (Self, impl Future<Output = ()> + Send + 'static)
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let connection = Self {
            shared: Arc::new(Shared::new(
                Some(format!("ws://{remote_addr}")),
                Some(remote_addr),
                Link::Open(command_tx),
            )),
        };

        let shared = Arc::downgrade(&connection.shared);
        (
            connection,
            Self::run_event_loop(ws_stream, command_rx, shared),
        )
    }

    /// Returns the remote address for accepted peers.
    #[inline]
    #[must_use]
    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.shared.remote_addr
    }

    /// Returns `true` while the event loop is running.
    #[inline]
    #[must_use]
    pub fn is_open(&self) -> bool {
        matches!(self.shared.state.lock().link, Link::Open(_))
    }

    /// Closes the connection gracefully.
    pub fn close(&self) {
        if let Link::Open(ref command_tx) = self.shared.state.lock().link {
            let _ = command_tx.send(ConnectionCommand::Shutdown);
        }
    }

    /// Event loop that handles WebSocket I/O.
    ///
    /// Runs until the peer closes, a handle calls `close`, or every handle
    /// is dropped.
    async fn run_event_loop<S>(
        ws_stream: WebSocketStream<S>,
        mut command_rx: mpsc::UnboundedReceiver<ConnectionCommand>,
        shared: Weak<Shared>,
    ) where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (mut ws_write, mut ws_read) = ws_stream.split();

        loop {
            tokio::select! {
                // Incoming frames from the peer
                message = ws_read.next() => {
                    match message {
                        Some(Ok(Message::Text(text))) => {
                            trace!(len = text.len(), "Frame received");
                            if let Some(shared) = shared.upgrade() {
                                shared.dispatch(Incoming::Payload(text.as_str().to_owned()));
                            }
                        }

                        Some(Ok(Message::Close(_))) => {
                            debug!("WebSocket closed by remote");
                            break;
                        }

                        Some(Err(e)) => {
                            error!(error = %e, "WebSocket error");
                            break;
                        }

                        None => {
                            debug!("WebSocket stream ended");
                            break;
                        }

                        // Ignore Binary, Ping, Pong
                        _ => {}
                    }
                }

                // Frames queued by send()
                command = command_rx.recv() => {
                    match command {
                        Some(ConnectionCommand::Send(frame)) => {
                            if let Err(e) = ws_write.send(Message::Text(frame.into())).await {
                                warn!(error = %e, "Failed to write frame");
                                break;
                            }
                            trace!("Frame sent");
                        }

                        Some(ConnectionCommand::Shutdown) => {
                            debug!("Shutdown command received");
                            let _ = ws_write.close().await;
                            break;
                        }

                        None => {
                            debug!("All handles dropped, closing");
                            let _ = ws_write.close().await;
                            break;
                        }
                    }
                }
            }
        }

        if let Some(shared) = shared.upgrade() {
            shared.mark_closed();
        }

        debug!("Event loop terminated");
    }
}

// ============================================================================
// URL Validation
// ============================================================================

/// Parses a WebSocket URL, accepting only `ws` and `wss`.
fn parse_url(url: &str) -> Result<Url> {
    let parsed = Url::parse(url).map_err(|e| Error::config(format!("Invalid URL {url}: {e}")))?;

    match parsed.scheme() {
        "ws" | "wss" => Ok(parsed),
        other => Err(Error::config(format!(
            "Unsupported WebSocket scheme: {other}"
        ))),
    }
}

// ============================================================================
// Socket Implementation
// ============================================================================

impl Socket for WsConnection {
    fn url(&self) -> Option<String> {
        self.shared.url.clone()
    }

    fn send(&self, frame: &str) -> Result<()> {
        match self.shared.state.lock().link {
            Link::Connecting => Err(Error::NotConnected),
            Link::Open(ref command_tx) => command_tx
                .send(ConnectionCommand::Send(frame.to_owned()))
                .map_err(|_| Error::ConnectionClosed),
            Link::Closed => Err(Error::ConnectionClosed),
        }
    }

    fn is_closed(&self) -> bool {
        matches!(self.shared.state.lock().link, Link::Closed)
    }

    /// Subscribes a listener.
    ///
    /// `Open` is latched: subscribing to an already open connection fires
    /// the listener immediately.
    fn on(&self, kind: EventKind, listener: Listener) {
        match kind {
            EventKind::Open => {
                let fire_now = {
                    let mut state = self.shared.state.lock();
                    if matches!(state.link, Link::Open(_)) {
                        true
                    } else {
                        state.open_listeners.push(Arc::clone(&listener));
                        false
                    }
                };

                if fire_now {
                    listener(&SocketEvent::Open);
                }
            }

            EventKind::Message => {
                self.shared.state.lock().message_listeners.push(listener);
            }

            EventKind::Connection => {
                trace!("Peer connections never accept peers; listener ignored");
            }
        }
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

    use tokio::time::timeout;

    use crate::transport::WsServer;
    use crate::transport::mock::wait_until_closed;

    #[test]
    fn test_connect_rejects_http_scheme() {
        let result = WsConnection::connect("http://127.0.0.1:9000");
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[test]
    fn test_connect_rejects_invalid_url() {
        let result = WsConnection::connect("not a url");
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[test]
    fn test_connect_requires_runtime() {
        let result = WsConnection::connect("ws://127.0.0.1:9000");
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[tokio::test]
    async fn test_establish_fails_without_server() {
        let result = WsConnection::establish("ws://127.0.0.1:1").await;
        assert!(matches!(result, Err(Error::WebSocket(_))));
    }

    #[tokio::test]
    async fn test_establish_rejects_scheme() {
        let result = WsConnection::establish("ftp://127.0.0.1:1").await;
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[tokio::test]
    async fn test_connect_reports_url() {
        let connection = WsConnection::connect("ws://127.0.0.1:1").expect("connect");

        assert_eq!(connection.url().as_deref(), Some("ws://127.0.0.1:1/"));
        assert!(connection.remote_addr().is_none());
    }

    #[tokio::test]
    async fn test_send_before_open_fails() {
        let connection = WsConnection::connect("ws://127.0.0.1:1").expect("connect");

        let err = connection.send("frame").expect_err("not open yet");
        assert!(err.is_connection_error());
        assert!(!connection.is_open());
    }

    #[tokio::test]
    async fn test_dropping_all_handles_closes_connection() {
        let server = WsServer::bind(IpAddr::V4(Ipv4Addr::LOCALHOST), 0)
            .await
            .expect("bind");
        let (peer_tx, mut peer_rx) = mpsc::unbounded_channel();
        server.on(
            EventKind::Connection,
            Arc::new(move |event: &SocketEvent| {
                if let SocketEvent::Connection(peer) = event {
                    let _ = peer_tx.send(Arc::clone(peer));
                }
            }),
        );

        let client = WsConnection::establish(&server.ws_url())
            .await
            .expect("establish");
        let second_handle = client.clone();
        let peer = timeout(Duration::from_secs(5), peer_rx.recv())
            .await
            .expect("peer accepted")
            .expect("peer");
        assert!(!peer.is_closed());

        drop(client);
        drop(second_handle);

        wait_until_closed(peer.as_ref()).await;
    }
}
