//! Wire message types.
//!
//! This module defines the envelope exchanged between peers and the
//! diagnostics hook that observes it.
//!
//! # Protocol Overview
//!
//! | Item | Direction | Purpose |
//! |------|-----------|---------|
//! | `Envelope` | Both | `{type, data}` application message |
//! | `Observer` | Local | Records every sent and received envelope |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `diagnostics` | Observer trait and stock observers |
//! | `envelope` | Envelope type and frame codec |

// ============================================================================
// Submodules
// ============================================================================

/// Message diagnostics.
pub mod diagnostics;

/// Envelope type and frame codec.
pub mod envelope;

// ============================================================================
// Re-exports
// ============================================================================

pub use diagnostics::{ConsoleObserver, Direction, NoopObserver, Observer, TracingObserver};
pub use envelope::Envelope;
