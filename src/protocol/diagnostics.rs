//! Message diagnostics.
//!
//! Every frame written or dispatched by the adapter is reported to an
//! [`Observer`]. Observers are for visibility only and never influence
//! routing.
//!
//! | Observer | Output |
//! |----------|--------|
//! | [`TracingObserver`] | `tracing` debug event (default) |
//! | [`ConsoleObserver`] | human-readable record on stdout |
//! | [`NoopObserver`] | nothing |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde_json::to_string_pretty;
use tracing::debug;

use super::Envelope;

// ============================================================================
// Direction
// ============================================================================

/// Which way a message travelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Received from the peer.
    Inbound,
    /// Sent to the peer.
    Outbound,
}

impl Direction {
    /// Returns the banner line used by console records.
    #[inline]
    #[must_use]
    pub const fn marker(self) -> &'static str {
        match self {
            Self::Inbound => "<<<<<<<<<< Message received:",
            Self::Outbound => ">>>>>>>>>> Message sent:",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inbound => f.write_str("inbound"),
            Self::Outbound => f.write_str("outbound"),
        }
    }
}

// ============================================================================
// Observer
// ============================================================================

/// Receives a record for every sent and received envelope.
pub trait Observer: Send + Sync + 'static {
    /// Records one message.
    fn record(&self, direction: Direction, envelope: &Envelope);
}

/// Logs records through `tracing` at debug level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl Observer for TracingObserver {
    fn record(&self, direction: Direction, envelope: &Envelope) {
        debug!(
            %direction,
            kind = %envelope.kind,
            data = %render_data(envelope),
            "Envelope"
        );
    }
}

/// Prints a human-readable record to stdout.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleObserver;

impl Observer for ConsoleObserver {
    fn record(&self, direction: Direction, envelope: &Envelope) {
        println!("{}", render_record(direction, envelope));
    }
}

/// Discards all records.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl Observer for NoopObserver {
    #[inline]
    fn record(&self, _direction: Direction, _envelope: &Envelope) {}
}

// ============================================================================
// Rendering
// ============================================================================

/// Builds the console record for one message.
///
/// ```text
///
/// >>>>>>>>>> Message sent:
/// Type: greet
/// Data: {
///   "msg": "hi"
/// }
///
/// ```
#[must_use]
pub fn render_record(direction: Direction, envelope: &Envelope) -> String {
    format!(
        "\n{}\nType: {}\nData: {}\n",
        direction.marker(),
        envelope.kind,
        render_data(envelope)
    )
}

/// Pretty-prints the envelope data, or `undefined` when absent.
fn render_data(envelope: &Envelope) -> String {
    match &envelope.data {
        Some(value) => to_string_pretty(value).unwrap_or_else(|_| value.to_string()),
        None => "undefined".to_string(),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn test_render_outbound_record() {
        let envelope = Envelope::new("greet", Some(json!({ "msg": "hi" })));
        let record = render_record(Direction::Outbound, &envelope);

        assert_eq!(
            record,
            "\n>>>>>>>>>> Message sent:\nType: greet\nData: {\n  \"msg\": \"hi\"\n}\n"
        );
    }

    #[test]
    fn test_render_inbound_without_data() {
        let record = render_record(Direction::Inbound, &Envelope::bare("ping"));

        assert!(record.contains("<<<<<<<<<< Message received:"));
        assert!(record.contains("Type: ping"));
        assert!(record.ends_with("Data: undefined\n"));
    }

    #[test]
    fn test_direction_display() {
        assert_eq!(Direction::Inbound.to_string(), "inbound");
        assert_eq!(Direction::Outbound.to_string(), "outbound");
    }
}
