//! Builder pattern for adapter configuration.
//!
//! Provides a fluent API for configuring and creating
//! [`ConnectionAdapter`] instances.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use typed_socket::{ConnectionAdapter, ConsoleObserver, Environment};
//!
//! let adapter = ConnectionAdapter::builder()
//!     .environment(Environment::Native)
//!     .observer(ConsoleObserver)
//!     .build(Arc::new(socket));
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use crate::protocol::{Observer, TracingObserver};
use crate::transport::Socket;

use super::core::ConnectionAdapter;
use super::role::Environment;

// ============================================================================
// AdapterBuilder
// ============================================================================

/// Builder for configuring a [`ConnectionAdapter`].
///
/// Use [`ConnectionAdapter::builder()`] to create a new builder.
#[derive(Clone)]
pub struct AdapterBuilder {
    /// Environment used for role detection.
    environment: Environment,
    /// Diagnostics sink.
    observer: Arc<dyn Observer>,
}

impl Default for AdapterBuilder {
    fn default() -> Self {
        Self {
            environment: Environment::detect(),
            observer: Arc::new(TracingObserver),
        }
    }
}

// ============================================================================
// AdapterBuilder Implementation
// ============================================================================

impl AdapterBuilder {
    /// Creates a builder with the detected environment and a tracing observer.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the detected environment.
    ///
    /// Only affects client sockets; a socket without a URL is always a
    /// server.
    #[inline]
    #[must_use]
    pub fn environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    /// Sets the diagnostics observer.
    #[inline]
    #[must_use]
    pub fn observer(mut self, observer: impl Observer) -> Self {
        self.observer = Arc::new(observer);
        self
    }

    /// Sets an observer shared with other adapters.
    #[inline]
    #[must_use]
    pub fn shared_observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observer = observer;
        self
    }

    /// Wraps `socket` and attaches the adapter's listeners.
    #[must_use]
    pub fn build(self, socket: Arc<dyn Socket>) -> ConnectionAdapter {
        ConnectionAdapter::with_options(socket, self.environment, self.observer)
    }
}

impl fmt::Debug for AdapterBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdapterBuilder")
            .field("environment", &self.environment)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================
