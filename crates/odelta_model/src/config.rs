//! Writer configuration.

use crate::annotations::Dialect;
use crate::select_expand::SelectExpand;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Whether a payload is a request or a response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// A request payload sent by a client.
    Request,
    /// A response payload sent by a service.
    #[default]
    Response,
}

impl Direction {
    /// Returns the direction name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Direction::Request => "request",
            Direction::Response => "response",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "request" => Ok(Direction::Request),
            "response" => Ok(Direction::Response),
            other => Err(format!("unknown direction '{other}'")),
        }
    }
}

/// How much control information is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetadataLevel {
    /// No context URLs and no computable annotations.
    None,
    /// Context URLs and the annotations that cannot be computed.
    #[default]
    Minimal,
    /// Everything, including navigation and association links.
    Full,
}

impl FromStr for MetadataLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(MetadataLevel::None),
            "minimal" => Ok(MetadataLevel::Minimal),
            "full" => Ok(MetadataLevel::Full),
            other => Err(format!("unknown metadata level '{other}'")),
        }
    }
}

/// Settings for one payload writer session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WriterSettings {
    /// Protocol dialect.
    pub dialect: Dialect,

    /// Request or response payload.
    pub direction: Direction,

    /// Metadata verbosity.
    pub metadata_level: MetadataLevel,

    /// Service root URL; context URLs are only written when this is set.
    pub service_root: Option<String>,

    /// Projection applied to the top-level payload.
    pub select_expand: Option<SelectExpand>,

    /// Number of buffered bytes after which the sink is flushed.
    pub buffer_size: usize,
}

impl Default for WriterSettings {
    fn default() -> Self {
        Self {
            dialect: Dialect::V401,
            direction: Direction::Response,
            metadata_level: MetadataLevel::Minimal,
            service_root: None,
            select_expand: None,
            buffer_size: 8 * 1024, // 8 KB
        }
    }
}

impl WriterSettings {
    /// Creates settings with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the dialect.
    #[must_use]
    pub fn dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    /// Sets the direction.
    #[must_use]
    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    /// Sets the metadata level.
    #[must_use]
    pub fn metadata_level(mut self, level: MetadataLevel) -> Self {
        self.metadata_level = level;
        self
    }

    /// Sets the flush threshold.
    #[must_use]
    pub fn buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }

    /// Sets the service root.
    #[must_use]
    pub fn service_root(mut self, root: impl Into<String>) -> Self {
        self.service_root = Some(root.into());
        self
    }

    /// Sets the top-level projection.
    #[must_use]
    pub fn select_expand(mut self, projection: SelectExpand) -> Self {
        self.select_expand = Some(projection);
        self
    }

    /// Whether these settings describe a response payload.
    pub fn is_response(&self) -> bool {
        self.direction == Direction::Response
    }

    /// Whether context URLs are written.
    pub fn writes_context_url(&self) -> bool {
        self.is_response()
            && self.service_root.is_some()
            && self.metadata_level != MetadataLevel::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings() {
        let settings = WriterSettings::default();
        assert_eq!(settings.dialect, Dialect::V401);
        assert!(settings.is_response());
        assert!(!settings.writes_context_url());
    }

    #[test]
    fn builder_pattern() {
        let settings = WriterSettings::new()
            .dialect(Dialect::V4)
            .service_root("http://host/service/")
            .buffer_size(16);
        assert_eq!(settings.dialect, Dialect::V4);
        assert_eq!(settings.buffer_size, 16);
        assert!(settings.writes_context_url());

        assert!(!settings.clone().direction(Direction::Request).writes_context_url());
        assert!(!settings
            .metadata_level(MetadataLevel::None)
            .writes_context_url());
    }

    #[test]
    fn settings_deserialize_with_defaults() {
        let settings: WriterSettings =
            serde_json::from_str(r#"{"dialect":"4.0","direction":"request"}"#).unwrap();
        assert_eq!(settings.dialect, Dialect::V4);
        assert_eq!(settings.direction, Direction::Request);
        assert_eq!(settings.metadata_level, MetadataLevel::Minimal);
        assert_eq!(settings.buffer_size, 8 * 1024);
    }
}
