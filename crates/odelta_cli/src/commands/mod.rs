//! CLI command implementations.

pub mod annotations;
pub mod context_url;
pub mod scenario;

use thiserror::Error;

/// Invalid command-line input detected after parsing.
#[derive(Debug, Error)]
pub enum UsageError {
    /// Unknown `--format` value.
    #[error("unknown output format '{0}' (expected text or json)")]
    Format(String),

    /// Unknown `--kind` value.
    #[error("unknown navigation source kind '{0}' (expected entity-set, singleton or contained)")]
    SourceKind(String),

    /// Unknown `--suffix` value.
    #[error("unknown context suffix '{0}'")]
    Suffix(String),

    /// Unknown scenario name.
    #[error("unknown scenario '{0}' (expected delta, nested-delta or batch)")]
    Scenario(String),
}
