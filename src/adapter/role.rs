//! Connection roles and execution environment.
//!
//! The role is chosen once, from the shape of the wrapped socket and the
//! environment, and decides how the adapter subscribes and when it binds
//! its sender.
//!
//! | Role | Detected when | Subscription | Sender bound |
//! |------|---------------|--------------|--------------|
//! | `Server` | socket has no URL | `on` | each accepted peer |
//! | `ClientBrowser` | browser environment | `add_event_listener` | open event |
//! | `ClientNonBrowser` | otherwise | `on` | open event |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use crate::transport::{EventKind, Listener, Socket};

// ============================================================================
// Environment
// ============================================================================

/// Execution environment the adapter runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Environment {
    /// A browser host (wasm32).
    Browser,
    /// Any other host.
    Native,
}

impl Environment {
    /// Detects the environment from the compilation target.
    #[inline]
    #[must_use]
    pub const fn detect() -> Self {
        if cfg!(target_arch = "wasm32") {
            Self::Browser
        } else {
            Self::Native
        }
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::detect()
    }
}

// ============================================================================
// ConnectionRole
// ============================================================================

/// How the adapter relates to its socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionRole {
    /// Listening socket that announces peers.
    Server,
    /// Client socket in a browser host.
    ClientBrowser,
    /// Client socket anywhere else.
    ClientNonBrowser,
}

impl ConnectionRole {
    /// Determines the role for `socket` in `environment`.
    ///
    /// A socket without a peer URL is a server regardless of environment.
    #[must_use]
    pub fn detect(socket: &dyn Socket, environment: Environment) -> Self {
        match (socket.url(), environment) {
            (None, _) => Self::Server,
            (Some(_), Environment::Browser) => Self::ClientBrowser,
            (Some(_), Environment::Native) => Self::ClientNonBrowser,
        }
    }

    /// Returns `true` for the server role.
    #[inline]
    #[must_use]
    pub const fn is_server(self) -> bool {
        matches!(self, Self::Server)
    }

    /// Returns the socket event that marks the adapter connected.
    #[inline]
    #[must_use]
    pub const fn connected_trigger(self) -> EventKind {
        match self {
            Self::Server => EventKind::Connection,
            Self::ClientBrowser | Self::ClientNonBrowser => EventKind::Open,
        }
    }

    /// Subscribes `listener` using the mechanism this role uses.
    pub fn subscribe(self, socket: &dyn Socket, kind: EventKind, listener: Listener) {
        match self {
            Self::ClientBrowser => socket.add_event_listener(kind, listener),
            Self::Server | Self::ClientNonBrowser => socket.on(kind, listener),
        }
    }
}

impl fmt::Display for ConnectionRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Server => f.write_str("server"),
            Self::ClientBrowser => f.write_str("client-browser"),
            Self::ClientNonBrowser => f.write_str("client"),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
