//! Error types for batch framing.

use crate::framer::BatchState;
use odelta_model::Direction;
use odelta_writer::{ErrorCategory, WriterError};
use std::fmt;
use std::io;
use thiserror::Error;

/// Result type for batch operations.
pub type BatchResult<T> = Result<T, BatchError>;

/// A configured batch limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quota {
    /// Top-level parts (operations and changesets) in one batch.
    PartsPerBatch,
    /// Operations in one changeset.
    OperationsPerChangeset,
}

impl fmt::Display for Quota {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Quota::PartsPerBatch => "parts per batch",
            Quota::OperationsPerChangeset => "operations per changeset",
        })
    }
}

/// Errors raised by the batch framer.
#[derive(Debug, Error)]
pub enum BatchError {
    /// The call is not legal in the current state.
    #[error("cannot move from {from} to {to}")]
    InvalidTransition {
        /// The current state.
        from: BatchState,
        /// The requested state.
        to: BatchState,
    },

    /// A changeset was begun inside another.
    #[error("a changeset is already open")]
    ChangesetAlreadyOpen,

    /// A changeset was ended with none open.
    #[error("no changeset is open")]
    NoOpenChangeset,

    /// The batch was ended inside a changeset.
    #[error("cannot end the batch while a changeset is open")]
    BatchEndedWithOpenChangeset,

    /// An operation of the wrong direction for this batch.
    #[error("cannot create this operation in a {direction} batch")]
    WrongDirection {
        /// The batch direction.
        direction: Direction,
    },

    /// A GET request inside a changeset.
    #[error("GET operations are not allowed inside a changeset")]
    GetInChangeset,

    /// A content id used twice in one batch.
    #[error("content id '{id}' is already used in this batch")]
    DuplicateContentId {
        /// The repeated id.
        id: String,
    },

    /// A dependency on an operation of another changeset.
    #[error("content id '{id}' belongs to a different changeset")]
    CrossChangesetDependency {
        /// The referenced id.
        id: String,
    },

    /// A dependency on an id that was never assigned.
    #[error("dependency '{id}' does not name an earlier operation")]
    UnknownDependency {
        /// The referenced id.
        id: String,
    },

    /// A `$id` URL prefix that names no earlier operation.
    #[error("URL reference '${reference}' does not name an earlier operation")]
    UnresolvedContentIdReference {
        /// The referenced id, without the `$`.
        reference: String,
    },

    /// A URL that cannot be parsed.
    #[error("invalid URL '{url}': {message}")]
    InvalidUrl {
        /// The URL.
        url: String,
        /// Parser message.
        message: String,
    },

    /// The previous operation body was not finished.
    #[error("the previous operation body was not finished")]
    OperationStreamNotDisposed,

    /// A configured limit was reached.
    #[error("batch limit exceeded: at most {limit} {quota}")]
    QuotaExceeded {
        /// Which limit.
        quota: Quota,
        /// The configured limit.
        limit: usize,
    },

    /// Error from an operation's payload writer.
    #[error("payload writer error: {0}")]
    Writer(#[from] WriterError),

    /// I/O error from the sink.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl BatchError {
    /// Returns a stable identifier for this error.
    pub fn identifier(&self) -> &'static str {
        match self {
            BatchError::InvalidTransition { .. } => "invalid_batch_transition",
            BatchError::ChangesetAlreadyOpen => "changeset_already_open",
            BatchError::NoOpenChangeset => "no_open_changeset",
            BatchError::BatchEndedWithOpenChangeset => "batch_ended_with_open_changeset",
            BatchError::WrongDirection { .. } => "wrong_direction",
            BatchError::GetInChangeset => "get_in_changeset",
            BatchError::DuplicateContentId { .. } => "duplicate_content_id",
            BatchError::CrossChangesetDependency { .. } => "cross_changeset_dependency",
            BatchError::UnknownDependency { .. } => "unknown_dependency",
            BatchError::UnresolvedContentIdReference { .. } => "unresolved_content_id_reference",
            BatchError::InvalidUrl { .. } => "invalid_url",
            BatchError::OperationStreamNotDisposed => "operation_stream_not_disposed",
            BatchError::QuotaExceeded { .. } => "quota_exceeded",
            BatchError::Writer(inner) => inner.identifier(),
            BatchError::Io(_) => "io",
        }
    }

    /// Returns the broad classification of this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            BatchError::InvalidTransition { .. } => ErrorCategory::InvalidTransition,
            BatchError::WrongDirection { .. } => ErrorCategory::Direction,
            BatchError::Writer(inner) => inner.category(),
            BatchError::Io(_) => ErrorCategory::Sink,
            _ => ErrorCategory::BatchDiscipline,
        }
    }

    pub(crate) fn invalid_url(url: &str, err: impl fmt::Display) -> Self {
        Self::InvalidUrl {
            url: url.to_string(),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quota_reports_the_limit() {
        let err = BatchError::QuotaExceeded {
            quota: Quota::OperationsPerChangeset,
            limit: 2,
        };
        assert_eq!(
            err.to_string(),
            "batch limit exceeded: at most 2 operations per changeset"
        );
        assert_eq!(err.category(), ErrorCategory::BatchDiscipline);
    }

    #[test]
    fn writer_errors_keep_their_identity() {
        let err = BatchError::from(WriterError::NoOpenProperty {
            state: odelta_writer::ScopeKind::Start,
        });
        assert_eq!(err.identifier(), "no_open_property");
        assert_eq!(err.category(), ErrorCategory::ResourceDiscipline);
    }

    #[test]
    fn reference_message_keeps_dollar() {
        let err = BatchError::UnresolvedContentIdReference {
            reference: "9".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "URL reference '$9' does not name an earlier operation"
        );
    }
}
