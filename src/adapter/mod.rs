//! Connection adapter module.
//!
//! This module provides the main entry point: a typed publish/subscribe
//! interface over one socket.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`ConnectionAdapter`] | Routes envelopes, emits, waits for connection |
//! | [`AdapterBuilder`] | Fluent configuration builder |
//! | [`ConnectionRole`] | Server / browser client / non-browser client |
//! | [`Environment`] | Host environment used for role detection |
//! | [`HandlerRegistry`] | Type-keyed handler lists |
//!
//! # Example
//!
//! ```ignore
//! use std::net::{IpAddr, Ipv4Addr};
//! use std::sync::Arc;
//! use typed_socket::{ConnectionAdapter, transport::WsServer};
//!
//! let server = WsServer::bind(IpAddr::V4(Ipv4Addr::LOCALHOST), 8080).await?;
//! let adapter = ConnectionAdapter::new(Arc::new(server));
//!
//! let replies = adapter.clone();
//! adapter.on("ping", move |data| {
//!     let _ = replies.emit("pong", &data.cloned());
//! });
//!
//! adapter.wait_connection().await?;
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Fluent builder for adapter configuration.
pub mod builder;

/// Core adapter implementation.
pub mod core;

/// Type-keyed handler registry.
pub mod registry;

/// Connection roles and environment detection.
pub mod role;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::AdapterBuilder;
pub use core::ConnectionAdapter;
pub use registry::{Handler, HandlerRegistry};
pub use role::{ConnectionRole, Environment};
