//! Envelope message type and frame codec.
//!
//! Every application message travels as a JSON text frame:
//!
//! ```json
//! { "type": "chat.message", "data": { ... } }
//! ```
//!
//! Decoding never fails. Frames that are not JSON objects are routed by
//! their literal text, so bare control strings such as `ping` still reach
//! handlers registered for `"ping"`.

// ============================================================================
// Imports
// ============================================================================

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::Result;

// ============================================================================
// Envelope
// ============================================================================

/// The `{type, data}` unit of application-level communication.
///
/// `data: None` means the payload is absent: the `data` key is omitted on
/// the wire. `Some(Value::Null)` is an explicit `null`.
///
/// # Format
///
/// ```json
/// {
///   "type": "module.event",
///   "data": { ... }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    /// Route key.
    #[serde(rename = "type")]
    pub kind: String,

    /// Arbitrary JSON payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl Envelope {
    /// Creates a new envelope.
    #[inline]
    #[must_use]
    pub fn new(kind: impl Into<String>, data: Option<Value>) -> Self {
        Self {
            kind: kind.into(),
            data,
        }
    }

    /// Creates an envelope without data.
    #[inline]
    #[must_use]
    pub fn bare(kind: impl Into<String>) -> Self {
        Self::new(kind, None)
    }

    /// Serializes the envelope into a text frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`](crate::Error::Json) if serialization fails.
    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decodes a text frame into an envelope.
    ///
    /// - A JSON object yields its `type` and `data` fields. A missing or
    ///   `null` type becomes the empty kind; any other non-string type
    ///   uses its JSON text.
    /// - Anything else (invalid JSON, or a JSON value that is not an
    ///   object) becomes a bare envelope whose kind is the raw frame.
    ///
    /// There is no catch-all `"undefined"` kind: frames without a usable
    /// `type` never share a route with frames whose type is literally
    /// `"undefined"`.
    #[must_use]
    pub fn decode(raw: &str) -> Self {
        match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(map)) => Self::from_object(map),
            _ => Self::bare(raw),
        }
    }

    /// Extracts `type` and `data` from a parsed JSON object.
    fn from_object(mut map: Map<String, Value>) -> Self {
        let kind = match map.remove("type") {
            Some(Value::String(kind)) => kind,
            None | Some(Value::Null) => String::new(),
            Some(other) => other.to_string(),
        };

        Self {
            kind,
            data: map.remove("data"),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
