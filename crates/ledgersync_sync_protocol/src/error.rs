//! Error types for the wire codec.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors raised while encoding or decoding a single record.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// JSON cannot represent NaN or infinite numbers.
    #[error("non-finite real in {table}/{row}/{column}")]
    NonFiniteReal {
        /// Table name.
        table: String,
        /// Row id.
        row: i64,
        /// Column name.
        column: String,
    },

    /// A field required by the record kind is absent.
    #[error("{kind} record is missing field {field}")]
    MissingField {
        /// Record kind.
        kind: &'static str,
        /// Field name.
        field: &'static str,
    },

    /// The record does not have the expected shape.
    #[error("invalid record: {message}")]
    InvalidRecord {
        /// Description of the problem.
        message: String,
    },

    /// The payload as a whole could not be encoded or decoded.
    #[error("json error: {message}")]
    Json {
        /// Underlying serde_json message.
        message: String,
    },
}

impl CodecError {
    /// Creates an invalid-record error.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidRecord {
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for CodecError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json {
            message: err.to_string(),
        }
    }
}
