//! Error types for the wire protocol.

use thiserror::Error;

/// Errors that can occur when decoding an inbound record.
///
/// None of these are fatal: the core logs the record and drops it.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The record is not valid JSON.
    #[error("malformed record: {0}")]
    MalformedJson(#[from] serde_json::Error),

    /// The `type` field is missing or not a recognized command kind.
    #[error("unknown command type: {0:?}")]
    UnknownCommand(String),

    /// A required payload field is missing for this command kind.
    #[error("command `{kind}` missing required field `{field}`")]
    MissingField {
        /// Command kind string.
        kind: &'static str,
        /// Name of the missing field.
        field: &'static str,
    },

    /// The mode string is not one of the recognized operating modes.
    #[error("invalid mode: {0:?}")]
    InvalidMode(String),
}

/// Result type alias for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;
