//! Socket transport layer.
//!
//! The adapter talks to its transport only through the [`Socket`] trait.
//! This module defines that trait plus a WebSocket implementation built on
//! `tokio-tungstenite`.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────┐                         ┌─────────────────────┐
//! │  ConnectionAdapter  │                         │  ConnectionAdapter  │
//! │  (client role)      │        WebSocket        │  (server role)      │
//! │                     │◄───────────────────────►│                     │
//! │  WsConnection       │      ws://host:PORT     │  WsServer           │
//! │                     │                         │  → WsConnection     │
//! └─────────────────────┘                         └─────────────────────┘
//! ```
//!
//! # Events
//!
//! | Event | Fired by | Payload |
//! |-------|----------|---------|
//! | `Open` | client sockets, listening servers | none |
//! | `Message` | open peers | [`Incoming`] frame |
//! | `Connection` | listening servers | accepted peer |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `connection` | WebSocket peer and event loop |
//! | `server` | WebSocket listener and accept loop |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use crate::error::Result;

// ============================================================================
// Submodules
// ============================================================================

/// WebSocket peer connection and event loop.
pub mod connection;

/// WebSocket listener for inbound peers.
pub mod server;

#[cfg(test)]
pub(crate) mod mock;

// ============================================================================
// Re-exports
// ============================================================================

pub use connection::WsConnection;
pub use server::WsServer;

// ============================================================================
// Types
// ============================================================================

/// Socket event listener.
pub type Listener = Arc<dyn Fn(&SocketEvent) + Send + Sync>;

/// Events a socket can deliver to its listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// The socket finished opening.
    Open,
    /// A text frame arrived.
    Message,
    /// A listening socket accepted a peer.
    Connection,
}

impl EventKind {
    /// Returns the event name used on the adapter's `on` surface.
    #[inline]
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Message => "message",
            Self::Connection => "connection",
        }
    }

    /// Maps a reserved adapter type name to the socket event it forwards to.
    ///
    /// Only `open` and `connection` are reserved.
    #[inline]
    #[must_use]
    pub fn reserved(name: &str) -> Option<Self> {
        match name {
            "open" => Some(Self::Open),
            "connection" => Some(Self::Connection),
            _ => None,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Message event object delivered by event-target style sockets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageEvent {
    /// Frame text.
    pub data: String,
}

/// An inbound frame, in whichever shape the socket delivers it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Incoming {
    /// Event object carrying the frame in `data`.
    Event(MessageEvent),
    /// The frame text itself.
    Payload(String),
}

impl Incoming {
    /// Returns the frame text.
    #[inline]
    #[must_use]
    pub fn frame(&self) -> &str {
        match self {
            Self::Event(event) => &event.data,
            Self::Payload(text) => text,
        }
    }
}

/// An event delivered to socket listeners.
#[derive(Clone)]
pub enum SocketEvent {
    /// The socket is open.
    Open,
    /// A frame arrived.
    Message(Incoming),
    /// A peer was accepted.
    Connection(Arc<dyn Socket>),
}

impl SocketEvent {
    /// Returns the kind of this event.
    #[inline]
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Open => EventKind::Open,
            Self::Message(_) => EventKind::Message,
            Self::Connection(_) => EventKind::Connection,
        }
    }
}

impl fmt::Debug for SocketEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => f.write_str("Open"),
            Self::Message(incoming) => f.debug_tuple("Message").field(incoming).finish(),
            Self::Connection(peer) => f
                .debug_tuple("Connection")
                .field(&peer.url())
                .finish(),
        }
    }
}

// ============================================================================
// Socket
// ============================================================================

/// A socket handle the adapter can wrap.
///
/// Implementations deliver events to listeners from whatever task they run
/// on, and must not hold internal locks while invoking a listener.
pub trait Socket: Send + Sync + 'static {
    /// Returns the peer URL.
    ///
    /// `None` marks a listening handle that announces peers through
    /// [`EventKind::Connection`] instead of talking to one itself.
    fn url(&self) -> Option<String>;

    /// Writes one text frame.
    ///
    /// # Errors
    ///
    /// Implementation-specific; typically
    /// [`Error::NotConnected`](crate::Error::NotConnected) or
    /// [`Error::ConnectionClosed`](crate::Error::ConnectionClosed).
    fn send(&self, frame: &str) -> Result<()>;

    /// Subscribes an emitter-style listener.
    fn on(&self, kind: EventKind, listener: Listener);

    /// Subscribes an event-target style listener.
    ///
    /// Sockets that only expose one mechanism keep the default, which
    /// forwards to [`Socket::on`].
    fn add_event_listener(&self, kind: EventKind, listener: Listener) {
        self.on(kind, listener);
    }

    /// Returns `true` once the socket can no longer carry frames.
    ///
    /// Sockets without a lifecycle of their own keep the default.
    fn is_closed(&self) -> bool {
        false
    }
}

// ============================================================================
// Tests
// ============================================================================
