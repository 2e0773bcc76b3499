//! Batch configuration.

use odelta_model::Direction;
use serde::{Deserialize, Serialize};

/// Settings for one batch session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchSettings {
    /// Whether the batch is a request or a response.
    pub direction: Direction,
    /// Base URI that relative operation URLs resolve against.
    pub base_uri: Option<String>,
    /// Fixed boundary token. A random UUID is used when unset.
    pub boundary_token: Option<String>,
    /// Maximum top-level parts per batch.
    pub max_parts_per_batch: usize,
    /// Maximum operations per changeset.
    pub max_operations_per_changeset: usize,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            direction: Direction::Request,
            base_uri: None,
            boundary_token: None,
            max_parts_per_batch: 100,
            max_operations_per_changeset: 1000,
        }
    }
}

impl BatchSettings {
    /// Creates request settings with default limits.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the direction.
    #[must_use]
    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    /// Sets the base URI.
    #[must_use]
    pub fn with_base_uri(mut self, base_uri: impl Into<String>) -> Self {
        self.base_uri = Some(base_uri.into());
        self
    }

    /// Fixes the boundary token.
    #[must_use]
    pub fn with_boundary_token(mut self, token: impl Into<String>) -> Self {
        self.boundary_token = Some(token.into());
        self
    }

    /// Sets the maximum top-level parts per batch.
    #[must_use]
    pub fn with_max_parts_per_batch(mut self, max: usize) -> Self {
        self.max_parts_per_batch = max;
        self
    }

    /// Sets the maximum operations per changeset.
    #[must_use]
    pub fn with_max_operations_per_changeset(mut self, max: usize) -> Self {
        self.max_operations_per_changeset = max;
        self
    }
}
