//! typed-socket - Typed publish/subscribe messaging over sockets.
//!
//! This library wraps a socket in a [`ConnectionAdapter`] that speaks a
//! small JSON envelope protocol:
//!
//! ```json
//! { "type": "chat.message", "data": { "text": "hi" } }
//! ```
//!
//! # Architecture
//!
//! The same adapter serves three roles, chosen once at construction:
//!
//! - **Server**: wraps a listening socket; binds to each accepted peer
//! - **Browser client**: subscribes with event-target style listeners
//! - **Non-browser client**: subscribes with emitter style listeners
//!
//! Key design principles:
//!
//! - Inbound frames are decoded leniently: non-JSON frames route by their text
//! - Handlers are keyed by message type and run in registration order
//! - `emit` before a peer is bound is an explicit [`Error::NotConnected`]
//! - Diagnostics go through a pluggable [`Observer`]
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use serde_json::json;
//! use typed_socket::{ConnectionAdapter, Result, transport::WsConnection};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let socket = WsConnection::connect("ws://127.0.0.1:8080")?;
//!     let adapter = ConnectionAdapter::new(Arc::new(socket));
//!
//!     adapter.on("pong", |data| println!("pong: {data:?}"));
//!
//!     adapter.wait_connection().await?;
//!     adapter.emit("ping", &json!({ "n": 1 }))?;
//!
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapter`] | [`ConnectionAdapter`], builder, roles, handler registry |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`protocol`] | [`Envelope`] codec and diagnostics |
//! | [`transport`] | [`Socket`] trait and WebSocket implementation |

// ============================================================================
// Modules
// ============================================================================

/// Connection adapter: roles, handlers, emit and connection waiting.
pub mod adapter;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Envelope codec and message diagnostics.
pub mod protocol;

/// Socket abstraction and WebSocket transport.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Adapter types
pub use adapter::{
    AdapterBuilder, ConnectionAdapter, ConnectionRole, Environment, Handler, HandlerRegistry,
};

// Error types
pub use error::{Error, Result};

// Protocol types
pub use protocol::{ConsoleObserver, Direction, Envelope, NoopObserver, Observer, TracingObserver};

// Transport types
pub use transport::{EventKind, Incoming, Listener, MessageEvent, Socket, SocketEvent};
