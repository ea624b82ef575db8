//! Error types for observer-side state.

use sightline_proto::ProtocolError;
use thiserror::Error;

/// Errors raised while folding producer payloads into a view.
#[derive(Error, Debug)]
pub enum ViewError {
    /// The payload was JSON but not a snapshot.
    #[error("malformed snapshot: {0}")]
    MalformedSnapshot(#[from] ProtocolError),
}
