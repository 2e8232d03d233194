//! Error types for the OLT CLI protocol.

use thiserror::Error;

/// Errors that can occur when framing or parsing OLT console output.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// The configured prompt cannot be used for completion detection.
    #[error("invalid prompt {prompt:?}: {reason}")]
    InvalidPrompt {
        /// The prompt as configured.
        prompt: String,
        /// Why it was rejected.
        reason: String,
    },

    /// No line of the output satisfied the table header predicate.
    #[error("no table header containing {required:?} found in output")]
    NoHeaderFound {
        /// Header tokens that all had to be present.
        required: Vec<String>,
    },
}

impl ProtocolError {
    /// Whether this error only means the expected table was absent.
    pub fn is_missing_table(&self) -> bool {
        matches!(self, ProtocolError::NoHeaderFound { .. })
    }
}

/// Result type alias for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;
