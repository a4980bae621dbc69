//! Error types for the protocol layer.
//!
//! [`ProtocolError`] is what goes wrong while turning frames into bytes and
//! back. [`Failure`] is different: it is the *payload* of a negative ack,
//! the shape every rejected request takes on the wire.

use serde::{Deserialize, Serialize};

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed.
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: malformed JSON, a missing field, or an
    /// unknown event name.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The frame parsed but breaks a protocol rule.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}

/// Coarse classification of a rejected request.
///
/// Clients branch on this, not on the message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The room or participant does not exist (or no longer exists).
    NotFound,
    /// The request is well-formed but the current state forbids it:
    /// wrong phase, full room, not the judge, quorum not met.
    Conflict,
    /// The request itself is malformed: empty text, bad payload.
    Invalid,
}

/// The error payload carried by a negative [`Ack`](crate::Ack).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    /// Coarse class.
    pub kind: ErrorKind,
    /// Stable machine-readable code, e.g. `"room_full"`.
    pub code: String,
    /// Human-readable explanation.
    pub message: String,
}

impl Failure {
    /// Builds a failure from its parts.
    pub fn new(kind: ErrorKind, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            code: code.into(),
            message: message.into(),
        }
    }

    /// Shorthand for an [`ErrorKind::Invalid`] failure.
    pub fn invalid(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Invalid, code, message)
    }
}

impl From<&ProtocolError> for Failure {
    fn from(err: &ProtocolError) -> Self {
        Self::invalid("malformed_request", err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::NotFound).unwrap();
        assert_eq!(json, "\"not_found\"");
    }

    #[test]
    fn test_failure_from_protocol_error_is_invalid() {
        let err = ProtocolError::InvalidMessage("seq missing".into());
        let failure = Failure::from(&err);
        assert_eq!(failure.kind, ErrorKind::Invalid);
        assert_eq!(failure.code, "malformed_request");
        assert!(failure.message.contains("seq missing"));
    }
}
