//! WebSocket listener for inbound peers.
//!
//! A [`WsServer`] is the listening side of the transport. It has no peer
//! URL of its own, so an adapter wrapping it takes the server role.
//!
//! # Connection Flow
//!
//! 1. `WsServer::bind` binds to `ip:port` (port 0 for random)
//! 2. The first `Connection` subscription starts the accept loop
//! 3. Each TCP connection is upgraded to WebSocket in its own task
//! 4. The new [`WsConnection`] is announced to `Connection` listeners
//! 5. Its event loop starts after every listener has run
//!
//! A listener that wants to talk to a peer keeps its `Arc`. A peer no
//! listener kept is closed as soon as its event loop starts.

// ============================================================================
// Imports
// ============================================================================

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::net::{TcpListener, TcpStream};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

use crate::error::{Error, Result};

use super::{EventKind, Listener, Socket, SocketEvent, WsConnection};

// ============================================================================
// Types
// ============================================================================

/// Connection listeners shared with the accept loop.
type ListenerList = Arc<Mutex<Vec<Listener>>>;

/// Pause after a failed `accept`, e.g. when file descriptors run out.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

// ============================================================================
// WsServer
// ============================================================================

/// A bound WebSocket server.
///
/// Dropping the server stops the accept loop and releases the port.
/// Peers accepted earlier keep running while a handle to them exists.
///
/// # Example
///
/// ```ignore
/// use std::net::{IpAddr, Ipv4Addr};
/// use std::sync::Arc;
/// use std::time::Duration;
/// use typed_socket::{ConnectionAdapter, transport::WsServer};
///
/// let server = WsServer::bind(IpAddr::V4(Ipv4Addr::LOCALHOST), 0).await?;
/// println!("listening on {}", server.ws_url());
///
/// let adapter = ConnectionAdapter::new(Arc::new(server));
/// adapter.wait_connection().await?;
/// ```
pub struct WsServer {
    /// Address the listener is bound to.
    local_addr: SocketAddr,
    /// Listener, taken when the accept loop starts.
    listener: Mutex<Option<TcpListener>>,
    /// Connection listeners.
    connection_listeners: ListenerList,
    /// Accept loop task.
    accept_task: Mutex<Option<JoinHandle<()>>>,
}

impl WsServer {
    /// Binds a WebSocket server to the specified address and port.
    ///
    /// Use port 0 to let the OS assign a random available port.
    ///
    /// # Arguments
    ///
    /// * `ip` - IP address to bind to
    /// * `port` - Port to bind to (0 for random)
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if binding fails.
    pub async fn bind(ip: IpAddr, port: u16) -> Result<Self> {
        let listener = TcpListener::bind(SocketAddr::new(ip, port)).await?;
        let local_addr = listener.local_addr()?;

        debug!(%local_addr, "WebSocket server bound");

        Ok(Self {
            local_addr,
            listener: Mutex::new(Some(listener)),
            connection_listeners: Arc::new(Mutex::new(Vec::new())),
            accept_task: Mutex::new(None),
        })
    }

    /// Returns the port the server is bound to.
    #[inline]
    #[must_use]
    pub fn port(&self) -> u16 {
        self.local_addr.port()
    }

    /// Returns the local socket address.
    #[inline]
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Returns the WebSocket URL clients connect to.
    ///
    /// Format: `ws://{ip}:{port}`
    #[inline]
    #[must_use]
    pub fn ws_url(&self) -> String {
        format!("ws://{}", self.local_addr)
    }

    /// Stops accepting new peers.
    ///
    /// Peers that are already connected keep running.
    pub fn shutdown(&self) {
        if let Some(task) = self.accept_task.lock().take() {
            task.abort();
            info!(port = self.port(), "WebSocket server stopped accepting");
        }
    }

    /// Starts the accept loop if it is not running yet.
    fn start_accepting(&self) {
        let Some(listener) = self.listener.lock().take() else {
            return;
        };

        let runtime = match Handle::try_current() {
            Ok(runtime) => runtime,
            Err(e) => {
                error!(error = %e, "No tokio runtime, accept loop not started");
                *self.listener.lock() = Some(listener);
                return;
            }
        };

        let listeners = Arc::clone(&self.connection_listeners);
        let task = runtime.spawn(Self::run_accept_loop(listener, listeners));
        *self.accept_task.lock() = Some(task);

        info!(port = self.port(), "WebSocket server accepting connections");
    }

    /// Accepts TCP connections until the task is aborted.
    async fn run_accept_loop(listener: TcpListener, listeners: ListenerList) {
        loop {
            match listener.accept().await {
                Ok((stream, addr)) => {
                    debug!(?addr, "TCP connection accepted");
                    tokio::spawn(Self::upgrade(stream, addr, Arc::clone(&listeners)));
                }
                Err(e) => {
                    error!(error = %e, "Accept failed");
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                }
            }
        }
    }

    /// Upgrades one TCP connection and announces the peer.
    async fn upgrade(stream: TcpStream, addr: SocketAddr, listeners: ListenerList) {
        let ws_stream = match tokio_tungstenite::accept_async(stream).await {
            Ok(ws_stream) => ws_stream,
            Err(e) => {
                warn!(?addr, error = %e, "WebSocket upgrade failed");
                return;
            }
        };

        let (connection, event_loop) = WsConnection::accepted(ws_stream, addr);
        let peer: Arc<dyn Socket> = Arc::new(connection);

        let snapshot = listeners.lock().clone();
        let event = SocketEvent::Connection(peer);
        for listener in snapshot {
            listener(&event);
        }
        drop(event);

        info!(?addr, "WebSocket peer connected");

        event_loop.await;
    }
}

impl Drop for WsServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ============================================================================
// Socket Implementation
// ============================================================================

impl Socket for WsServer {
    /// Always `None`: a listener has no single peer.
    fn url(&self) -> Option<String> {
        None
    }

    fn send(&self, _frame: &str) -> Result<()> {
        Err(Error::protocol(
            "A listening server has no peer; send through an accepted connection",
        ))
    }

    /// Subscribes a listener.
    ///
    /// `Open` fires immediately since the server is listening once bound.
    /// The first `Connection` subscription starts the accept loop.
    fn on(&self, kind: EventKind, listener: Listener) {
        match kind {
            EventKind::Open => listener(&SocketEvent::Open),

            EventKind::Connection => {
                self.connection_listeners.lock().push(listener);
                self.start_accepting();
            }

            EventKind::Message => {
                trace!("Listening servers receive no frames; listener ignored");
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
