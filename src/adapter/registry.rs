//! Type-keyed handler registry.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use rustc_hash::FxHashMap;
use serde_json::Value;

// ============================================================================
// Types
// ============================================================================

/// Message handler callback.
///
/// Receives the envelope data, or `None` when the message carried none.
pub type Handler = Arc<dyn Fn(Option<&Value>) + Send + Sync>;

// ============================================================================
// HandlerRegistry
// ============================================================================

/// Maps a message type to its handlers in registration order.
///
/// Registering the same handler twice makes it run twice per message.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: FxHashMap<String, Vec<Handler>>,
}

impl HandlerRegistry {
    /// Creates an empty registry.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a handler for `kind`.
    pub fn register(&mut self, kind: impl Into<String>, handler: Handler) {
        self.handlers.entry(kind.into()).or_default().push(handler);
    }

    /// Returns the handlers for `kind`, in registration order.
    ///
    /// The list is a snapshot, so callers can invoke handlers without
    /// holding the registry.
    #[must_use]
    pub fn handlers_for(&self, kind: &str) -> Vec<Handler> {
        self.handlers.get(kind).cloned().unwrap_or_default()
    }

    /// Returns the number of handlers registered for `kind`.
    #[inline]
    #[must_use]
    pub fn count(&self, kind: &str) -> usize {
        self.handlers.get(kind).map_or(0, Vec::len)
    }

    /// Returns `true` if no handler is registered.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================
