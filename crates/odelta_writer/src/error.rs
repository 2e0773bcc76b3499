//! Error types for the payload writer.

use crate::scope::ScopeKind;
use odelta_codec::CodecError;
use odelta_model::{ItemKind, ModelError};
use std::fmt;
use std::io;
use thiserror::Error;

/// Result type for writer operations.
pub type WriterResult<T> = Result<T, WriterError>;

/// A set-level annotation that may only appear in responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryAnnotation {
    /// Item count.
    Count,
    /// Next-page link.
    NextPageLink,
    /// Delta link.
    DeltaLink,
}

impl fmt::Display for QueryAnnotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            QueryAnnotation::Count => "count",
            QueryAnnotation::NextPageLink => "next-page link",
            QueryAnnotation::DeltaLink => "delta link",
        })
    }
}

/// Broad classification of writer errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The call is not a legal edge from the current scope.
    InvalidTransition,
    /// A response-only construct was used in a request, or vice versa.
    Direction,
    /// A resource that needs an identity has none.
    Identity,
    /// A value's type is not assignable to the expected type.
    TypeIncompatibility,
    /// Duplicates, unreleased streams and property value misuse.
    ResourceDiscipline,
    /// Batch and changeset framing rules.
    BatchDiscipline,
    /// The output sink or the JSON emitter failed.
    Sink,
}

/// Errors raised by the payload writer.
///
/// Every error is returned from the offending call and leaves the scope
/// stack as it was.
#[derive(Debug, Error)]
pub enum WriterError {
    /// Illegal first item.
    #[error("cannot begin {attempted} at the start of a payload")]
    InvalidTransitionFromStart {
        /// The rejected item kind.
        attempted: ItemKind,
    },

    /// Illegal child of a resource or property scope.
    #[error("cannot write {attempted} inside {from}")]
    InvalidTransitionFromResource {
        /// The current scope.
        from: ScopeKind,
        /// The rejected item kind.
        attempted: ItemKind,
    },

    /// Illegal child of a resource set or delta resource set.
    #[error("cannot write {attempted} inside {from}")]
    InvalidTransitionFromResourceSet {
        /// The current scope.
        from: ScopeKind,
        /// The rejected item kind.
        attempted: ItemKind,
    },

    /// Illegal content of a navigation property.
    #[error("cannot write {attempted} as content of a navigation property")]
    InvalidTransitionFromExpandedLink {
        /// The rejected item kind.
        attempted: ItemKind,
    },

    /// Anything begun inside a null resource.
    #[error("cannot write {attempted} inside a null resource")]
    InvalidTransitionFromNullResource {
        /// The rejected item kind.
        attempted: ItemKind,
    },

    /// Anything begun after the payload was completed.
    #[error("cannot write {attempted} after the payload was completed")]
    InvalidTransitionFromCompleted {
        /// The rejected item kind.
        attempted: ItemKind,
    },

    /// Content inside a legacy-dialect deleted entry.
    #[error("cannot write {attempted} inside a 4.0 deleted entry")]
    InvalidTransitionFromLegacyDeletedResource {
        /// The rejected item kind.
        attempted: ItemKind,
    },

    /// `end()` with no open scope.
    #[error("end called in state {state}")]
    WriteEndCalledInInvalidState {
        /// The current state.
        state: ScopeKind,
    },

    /// A response-only set annotation in a request.
    #[error("{annotation} is only allowed in responses")]
    QueryAnnotationInRequest {
        /// The offending annotation.
        annotation: QueryAnnotation,
    },

    /// A deferred navigation link in a request.
    #[error("navigation property '{name}' has no content or binding in a request")]
    DeferredLinkInRequest {
        /// Navigation property name.
        name: String,
    },

    /// An entity reference binding in a response.
    #[error("entity reference binding of '{name}' is only allowed in requests")]
    EntityReferenceLinkInResponse {
        /// Navigation property name.
        name: String,
    },

    /// Expanded or nested delta content under the legacy dialect.
    #[error("navigation property '{name}' cannot carry nested content in a 4.0 delta payload")]
    NestedContentInLegacyDelta {
        /// Navigation property name.
        name: String,
    },

    /// A delta member with no identity.
    #[error("{kind} in a delta set has neither an id nor key properties")]
    DeltaResourceWithoutIdOrKeyProperties {
        /// Resource or DeletedResource.
        kind: ItemKind,
    },

    /// A type mismatch.
    #[error("type '{actual}' is not compatible with expected type '{expected}'")]
    IncompatibleTypes {
        /// The value's type.
        actual: String,
        /// The expected type.
        expected: String,
    },

    /// `end()` on a property whose stream is still open.
    #[error("the stream of property '{property}' was not finished")]
    StreamNotDisposed {
        /// Property name.
        property: String,
    },

    /// A second value for one property scope.
    #[error("property '{property}' already has a value")]
    PropertyValueAlreadyWritten {
        /// Property name.
        property: String,
    },

    /// A property scope ended without a value.
    #[error("property '{property}' was ended without a value")]
    PropertyValueNotWritten {
        /// Property name.
        property: String,
    },

    /// A property value outside of a property scope.
    #[error("no property scope is open (state {state})")]
    NoOpenProperty {
        /// The current state.
        state: ScopeKind,
    },

    /// Model error, such as a duplicate property.
    #[error("model error: {0}")]
    Model(#[from] ModelError),

    /// JSON codec error.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// I/O error from the sink.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl WriterError {
    /// Returns a stable identifier for this error.
    pub fn identifier(&self) -> &'static str {
        match self {
            WriterError::InvalidTransitionFromStart { .. } => "invalid_transition_from_start",
            WriterError::InvalidTransitionFromResource { .. } => "invalid_transition_from_resource",
            WriterError::InvalidTransitionFromResourceSet { .. } => {
                "invalid_transition_from_resource_set"
            }
            WriterError::InvalidTransitionFromExpandedLink { .. } => {
                "invalid_transition_from_expanded_link"
            }
            WriterError::InvalidTransitionFromNullResource { .. } => {
                "invalid_transition_from_null_resource"
            }
            WriterError::InvalidTransitionFromCompleted { .. } => {
                "invalid_transition_from_completed"
            }
            WriterError::InvalidTransitionFromLegacyDeletedResource { .. } => {
                "invalid_transition_from_legacy_deleted_resource"
            }
            WriterError::WriteEndCalledInInvalidState { .. } => "write_end_called_in_invalid_state",
            WriterError::QueryAnnotationInRequest { .. } => "query_annotation_in_request",
            WriterError::DeferredLinkInRequest { .. } => "deferred_link_in_request",
            WriterError::EntityReferenceLinkInResponse { .. } => {
                "entity_reference_link_in_response"
            }
            WriterError::NestedContentInLegacyDelta { .. } => "nested_content_in_legacy_delta",
            WriterError::DeltaResourceWithoutIdOrKeyProperties { .. } => {
                "delta_resource_without_id_or_key_properties"
            }
            WriterError::IncompatibleTypes { .. } => "incompatible_types",
            WriterError::StreamNotDisposed { .. } => "stream_not_disposed",
            WriterError::PropertyValueAlreadyWritten { .. } => "property_value_already_written",
            WriterError::PropertyValueNotWritten { .. } => "property_value_not_written",
            WriterError::NoOpenProperty { .. } => "no_open_property",
            WriterError::Model(ModelError::DuplicateProperty { .. }) => "duplicate_property",
            WriterError::Model(ModelError::DuplicateAnnotation { .. }) => "duplicate_annotation",
            WriterError::Model(ModelError::ConflictingSetLinks) => "conflicting_set_links",
            WriterError::Model(_) => "model",
            WriterError::Codec(_) => "codec",
            WriterError::Io(_) => "io",
        }
    }

    /// Returns the broad classification of this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            WriterError::InvalidTransitionFromStart { .. }
            | WriterError::InvalidTransitionFromResource { .. }
            | WriterError::InvalidTransitionFromResourceSet { .. }
            | WriterError::InvalidTransitionFromExpandedLink { .. }
            | WriterError::InvalidTransitionFromNullResource { .. }
            | WriterError::InvalidTransitionFromCompleted { .. }
            | WriterError::InvalidTransitionFromLegacyDeletedResource { .. }
            | WriterError::WriteEndCalledInInvalidState { .. }
            | WriterError::NestedContentInLegacyDelta { .. } => ErrorCategory::InvalidTransition,
            WriterError::QueryAnnotationInRequest { .. }
            | WriterError::DeferredLinkInRequest { .. }
            | WriterError::EntityReferenceLinkInResponse { .. } => ErrorCategory::Direction,
            WriterError::DeltaResourceWithoutIdOrKeyProperties { .. } => ErrorCategory::Identity,
            WriterError::IncompatibleTypes { .. } => ErrorCategory::TypeIncompatibility,
            WriterError::StreamNotDisposed { .. }
            | WriterError::PropertyValueAlreadyWritten { .. }
            | WriterError::PropertyValueNotWritten { .. }
            | WriterError::NoOpenProperty { .. }
            | WriterError::Model(_) => ErrorCategory::ResourceDiscipline,
            WriterError::Codec(_) | WriterError::Io(_) => ErrorCategory::Sink,
        }
    }

    pub(crate) fn incompatible_types(actual: &str, expected: &str) -> Self {
        Self::IncompatibleTypes {
            actual: actual.to_string(),
            expected: expected.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_are_snake_case() {
        let err = WriterError::InvalidTransitionFromResourceSet {
            from: ScopeKind::ResourceSet,
            attempted: ItemKind::DeltaLink,
        };
        assert_eq!(err.identifier(), "invalid_transition_from_resource_set");
        assert_eq!(err.category(), ErrorCategory::InvalidTransition);
        assert_eq!(
            err.to_string(),
            "cannot write DeltaLink inside ResourceSet"
        );
    }

    #[test]
    fn model_errors_are_resource_discipline() {
        let err = WriterError::from(ModelError::duplicate_property("Name"));
        assert_eq!(err.identifier(), "duplicate_property");
        assert_eq!(err.category(), ErrorCategory::ResourceDiscipline);
    }

    #[test]
    fn direction_errors() {
        let err = WriterError::QueryAnnotationInRequest {
            annotation: QueryAnnotation::DeltaLink,
        };
        assert_eq!(err.category(), ErrorCategory::Direction);
        assert_eq!(err.to_string(), "delta link is only allowed in responses");
    }

    #[test]
    fn io_errors_are_sink_errors() {
        let err = WriterError::from(io::Error::other("disk full"));
        assert_eq!(err.identifier(), "io");
        assert_eq!(err.category(), ErrorCategory::Sink);
    }
}
