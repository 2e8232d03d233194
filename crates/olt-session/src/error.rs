//! Error types for OLT sessions.

use olt_cli_protocol::ProtocolError;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while talking to an OLT.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The TCP connection could not be established.
    #[error("failed to connect to {address}: {source}")]
    Connect {
        address: String,
        #[source]
        source: io::Error,
    },

    /// The established connection failed or was closed by the device.
    #[error("connection error: {0}")]
    Connection(#[from] io::Error),

    /// No completion condition was met within the bounded wait.
    #[error("{command:?} timed out after {elapsed:?} waiting for {waiting_for}")]
    Timeout {
        /// Command (or phase, such as `login`) that was waiting.
        command: String,
        /// What the read was waiting for.
        waiting_for: String,
        elapsed: Duration,
        /// Decoded text received before giving up.
        buffered: String,
    },

    /// The session was closed, possibly from another thread.
    #[error("session closed")]
    Closed,

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The output of a command did not contain what the caller needed.
    #[error("failed to parse output of {command:?}: {source}")]
    Parse {
        command: String,
        #[source]
        source: ProtocolError,
    },

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    /// A diagnostic capture file could not be opened.
    #[error("cannot open capture file {path}: {source}")]
    CaptureSink {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl SessionError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, SessionError::Timeout { .. })
    }
}

/// Result type alias for session operations.
pub type SessionResult<T> = Result<T, SessionError>;
