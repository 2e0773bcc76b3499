//! Error types for the payload model.

use odelta_codec::CodecError;
use thiserror::Error;

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors raised by the payload model and the duplicate collector.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModelError {
    /// A set was given both a next-page link and a delta link.
    #[error("a resource set cannot carry both a next-page link and a delta link")]
    ConflictingSetLinks,

    /// The same property name appeared twice in one object.
    #[error("duplicate property '{name}'")]
    DuplicateProperty {
        /// The repeated property name.
        name: String,
    },

    /// The same annotation appeared twice for one property or instance.
    #[error("duplicate annotation '{annotation}'{}", .property.as_ref().map(|p| format!(" on property '{p}'")).unwrap_or_default())]
    DuplicateAnnotation {
        /// The repeated annotation.
        annotation: String,
        /// The annotated property, or `None` for an instance annotation.
        property: Option<String>,
    },

    /// A payload did not have the expected shape.
    #[error("invalid payload: {message}")]
    InvalidPayload {
        /// Description of the problem.
        message: String,
    },

    /// JSON codec error.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
}

impl ModelError {
    /// Creates a duplicate property error.
    pub fn duplicate_property(name: impl Into<String>) -> Self {
        Self::DuplicateProperty { name: name.into() }
    }

    /// Creates a duplicate annotation error.
    pub fn duplicate_annotation(property: Option<&str>, annotation: impl Into<String>) -> Self {
        Self::DuplicateAnnotation {
            annotation: annotation.into(),
            property: property.map(str::to_string),
        }
    }

    /// Creates an invalid payload error.
    pub fn invalid_payload(message: impl Into<String>) -> Self {
        Self::InvalidPayload {
            message: message.into(),
        }
    }
}
