//! Observer runtime error types.

use std::io;

use thiserror::Error;

/// Errors that can stop the observer runtime.
///
/// Everything that goes wrong while serving producers (undecodable segments,
/// commands for unknown sessions, send failures) is absorbed and logged.
/// Only setup and socket failures reach the caller.
#[derive(Debug, Error)]
pub enum ObserverError {
    /// Configuration error (invalid bind address, zero-sized buffer, etc.).
    ///
    /// Fatal at startup. Fix configuration and restart.
    #[error("configuration error: {0}")]
    Config(String),

    /// Socket error (bind failure, address in use, etc.).
    #[error("transport error: {0}")]
    Transport(#[from] io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_convert_to_transport() {
        let err: ObserverError = io::Error::new(io::ErrorKind::AddrInUse, "in use").into();
        assert!(matches!(err, ObserverError::Transport(_)));
        assert_eq!(err.to_string(), "transport error: in use");
    }
}
