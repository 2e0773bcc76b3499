//! Error types for the codec crate.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur during encoding or decoding.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Failed to encode a value as JSON.
    #[error("encoding failed: {message}")]
    EncodingFailed {
        /// Description of the encoding error.
        message: String,
    },

    /// Failed to decode JSON text.
    #[error("decoding failed: {message}")]
    DecodingFailed {
        /// Description of the decoding error.
        message: String,
    },

    /// The emitter was asked to close a container that is not open.
    #[error("unbalanced container: expected {expected}, found {found}")]
    UnbalancedContainer {
        /// The container kind the caller tried to close.
        expected: &'static str,
        /// The container kind that is actually open.
        found: &'static str,
    },

    /// A property name was written where a value was expected, or vice versa.
    #[error("invalid JSON structure: {message}")]
    InvalidStructure {
        /// Description of the structural error.
        message: String,
    },

    /// A string value was streamed while another one was still open.
    #[error("a streamed string value is already open")]
    StringAlreadyOpen,

    /// A streamed string chunk was written with no streamed string open.
    #[error("no streamed string value is open")]
    NoOpenString,
}

impl CodecError {
    /// Create an encoding failed error.
    pub fn encoding_failed(message: impl Into<String>) -> Self {
        Self::EncodingFailed {
            message: message.into(),
        }
    }

    /// Create a decoding failed error.
    pub fn decoding_failed(message: impl Into<String>) -> Self {
        Self::DecodingFailed {
            message: message.into(),
        }
    }

    /// Create an invalid structure error.
    pub fn invalid_structure(message: impl Into<String>) -> Self {
        Self::InvalidStructure {
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for CodecError {
    fn from(err: serde_json::Error) -> Self {
        Self::decoding_failed(err.to_string())
    }
}
