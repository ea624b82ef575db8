//! Error types for the sightline wire protocol.
//!
//! Framing itself cannot fail: bytes without a delimiter simply wait for
//! more data. Errors only arise when a delimited segment is not a JSON
//! document, when a document has the wrong shape, or when an outbound command
//! is malformed or cannot be serialized.

use thiserror::Error;

use crate::command::CommandKind;

/// Result alias for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors produced while decoding inbound segments or encoding commands.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// A delimited segment was not a JSON document.
    #[error("segment of {len} bytes is not valid JSON: {source}")]
    InvalidJson {
        /// Length of the rejected segment
        len: usize,
        /// Underlying parser error
        source: serde_json::Error,
    },

    /// A decoded payload did not have the expected shape.
    #[error("unexpected payload shape: {0}")]
    PayloadShape(#[source] serde_json::Error),

    /// A command's `entity` does not match its kind.
    #[error("{kind:?} command {reason}")]
    CommandShape {
        /// Kind of the rejected command
        kind: CommandKind,
        /// What is wrong with its entity
        reason: &'static str,
    },

    /// An outbound value could not be serialized.
    #[error("failed to encode command: {0}")]
    Encode(#[source] serde_json::Error),
}
