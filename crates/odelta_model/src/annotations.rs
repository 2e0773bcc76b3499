//! Annotation name resolution.
//!
//! The two protocol dialects spell the same reserved annotations differently.
//! The legacy dialect prefixes every reserved term with `odata.`; the newer
//! dialect drops the prefix, except for media annotations which keep it.
//! Resolution is a fixed table keyed by concept and dialect and never looks
//! at the value being written.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Protocol dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Dialect {
    /// The legacy `4.0` dialect.
    #[serde(rename = "4.0")]
    V4,
    /// The newer `4.01` dialect.
    #[default]
    #[serde(rename = "4.01")]
    V401,
}

impl Dialect {
    /// All dialects, oldest first.
    pub const ALL: [Dialect; 2] = [Dialect::V4, Dialect::V401];

    /// Returns the version string used in `OData-Version` headers.
    pub const fn as_str(self) -> &'static str {
        match self {
            Dialect::V4 => "4.0",
            Dialect::V401 => "4.01",
        }
    }

    /// Whether this is the legacy dialect.
    pub const fn is_legacy(self) -> bool {
        matches!(self, Dialect::V4)
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "4.0" | "4" | "legacy" => Ok(Dialect::V4),
            "4.01" | "newer" => Ok(Dialect::V401),
            other => Err(format!("unknown dialect '{other}' (expected 4.0 or 4.01)")),
        }
    }
}

/// A reserved annotation concept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Annotation {
    /// Context URL.
    Context,
    /// Resource identity.
    Id,
    /// Type cast.
    Type,
    /// Item count of a set.
    Count,
    /// Next-page link of a set.
    NextLink,
    /// Delta-token link of a set.
    DeltaLink,
    /// Entity tag.
    Etag,
    /// Edit link.
    EditLink,
    /// Read link.
    ReadLink,
    /// Navigation link of a navigation property.
    NavigationLink,
    /// Association link of a navigation property.
    AssociationLink,
    /// Entity reference binding in requests.
    Bind,
    /// Null marker for a top-level null value.
    Null,
    /// Deletion marker, newer dialect only.
    Removed,
    /// Nested delta collection marker, newer dialect only.
    Delta,
    /// Media edit link.
    MediaEditLink,
    /// Media read link.
    MediaReadLink,
    /// Media content type.
    MediaContentType,
    /// Media entity tag.
    MediaEtag,
}

impl Annotation {
    /// Every reserved annotation concept.
    pub const ALL: [Annotation; 19] = [
        Annotation::Context,
        Annotation::Id,
        Annotation::Type,
        Annotation::Count,
        Annotation::NextLink,
        Annotation::DeltaLink,
        Annotation::Etag,
        Annotation::EditLink,
        Annotation::ReadLink,
        Annotation::NavigationLink,
        Annotation::AssociationLink,
        Annotation::Bind,
        Annotation::Null,
        Annotation::Removed,
        Annotation::Delta,
        Annotation::MediaEditLink,
        Annotation::MediaReadLink,
        Annotation::MediaContentType,
        Annotation::MediaEtag,
    ];

    /// Returns the wire key for this concept in the given dialect,
    /// including the leading `@`.
    ///
    /// Returns `None` when the dialect has no key for the concept.
    pub const fn resolve(self, dialect: Dialect) -> Option<&'static str> {
        use Annotation::*;
        let key = match (self, dialect) {
            (Context, Dialect::V4) => "@odata.context",
            (Context, Dialect::V401) => "@context",
            (Id, Dialect::V4) => "@odata.id",
            (Id, Dialect::V401) => "@id",
            (Type, Dialect::V4) => "@odata.type",
            (Type, Dialect::V401) => "@type",
            (Count, Dialect::V4) => "@odata.count",
            (Count, Dialect::V401) => "@count",
            (NextLink, Dialect::V4) => "@odata.nextLink",
            (NextLink, Dialect::V401) => "@nextLink",
            (DeltaLink, Dialect::V4) => "@odata.deltaLink",
            (DeltaLink, Dialect::V401) => "@deltaLink",
            (Etag, Dialect::V4) => "@odata.etag",
            (Etag, Dialect::V401) => "@etag",
            (EditLink, Dialect::V4) => "@odata.editLink",
            (EditLink, Dialect::V401) => "@editLink",
            (ReadLink, Dialect::V4) => "@odata.readLink",
            (ReadLink, Dialect::V401) => "@readLink",
            (NavigationLink, Dialect::V4) => "@odata.navigationLink",
            (NavigationLink, Dialect::V401) => "@navigationLink",
            (AssociationLink, Dialect::V4) => "@odata.associationLink",
            (AssociationLink, Dialect::V401) => "@associationLink",
            (Bind, Dialect::V4) => "@odata.bind",
            (Bind, Dialect::V401) => "@bind",
            (Null, Dialect::V4) => "@odata.null",
            (Null, Dialect::V401) => "@null",
            (Removed, Dialect::V4) | (Delta, Dialect::V4) => return None,
            (Removed, Dialect::V401) => "@removed",
            (Delta, Dialect::V401) => "@delta",
            (MediaEditLink, _) => "@odata.mediaEditLink",
            (MediaReadLink, _) => "@odata.mediaReadLink",
            (MediaContentType, _) => "@odata.mediaContentType",
            (MediaEtag, _) => "@odata.mediaEtag",
        };
        Some(key)
    }

    /// Returns a dialect-independent name for this concept, used as the
    /// bookkeeping key in duplicate detection.
    pub const fn term(self) -> &'static str {
        use Annotation::*;
        match self {
            Context => "context",
            Id => "id",
            Type => "type",
            Count => "count",
            NextLink => "nextLink",
            DeltaLink => "deltaLink",
            Etag => "etag",
            EditLink => "editLink",
            ReadLink => "readLink",
            NavigationLink => "navigationLink",
            AssociationLink => "associationLink",
            Bind => "bind",
            Null => "null",
            Removed => "removed",
            Delta => "delta",
            MediaEditLink => "mediaEditLink",
            MediaReadLink => "mediaReadLink",
            MediaContentType => "mediaContentType",
            MediaEtag => "mediaEtag",
        }
    }

    /// Parses an annotation key (with its leading `@`) as read in the given
    /// dialect.
    ///
    /// A newer-dialect reader accepts both spellings; a legacy reader accepts
    /// only the `odata.`-prefixed spelling.
    pub fn parse(key: &str, dialect: Dialect) -> Option<Annotation> {
        Self::ALL.into_iter().find(|a| {
            a.resolve(Dialect::V4) == Some(key)
                || (dialect == Dialect::V401 && a.resolve(Dialect::V401) == Some(key))
        })
    }
}

impl fmt::Display for Annotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.term())
    }
}

/// Returns the wire key for `annotation` scoped to `property`, such as
/// `Orders@odata.count`.
pub fn property_annotation_key(
    property: &str,
    annotation: Annotation,
    dialect: Dialect,
) -> Option<String> {
    annotation
        .resolve(dialect)
        .map(|key| format!("{property}{key}"))
}

/// Splits an annotation key into its property part and its `@`-prefixed
/// annotation part.
///
/// `"Orders@odata.count"` yields `(Some("Orders"), "@odata.count")` and
/// `"@odata.id"` yields `(None, "@odata.id")`. Keys without `@` are plain
/// property names and yield `None`.
pub fn split_annotation_key(key: &str) -> Option<(Option<&str>, &str)> {
    let at = key.find('@')?;
    let property = if at == 0 { None } else { Some(&key[..at]) };
    Some((property, &key[at..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_keys_carry_odata_prefix() {
        for annotation in Annotation::ALL {
            if let Some(key) = annotation.resolve(Dialect::V4) {
                assert!(key.starts_with("@odata."), "{key}");
            }
        }
    }

    #[test]
    fn newer_keys_drop_prefix_except_media() {
        assert_eq!(Annotation::Context.resolve(Dialect::V401), Some("@context"));
        assert_eq!(Annotation::Count.resolve(Dialect::V401), Some("@count"));
        assert_eq!(
            Annotation::DeltaLink.resolve(Dialect::V401),
            Some("@deltaLink")
        );
        assert_eq!(
            Annotation::MediaEditLink.resolve(Dialect::V401),
            Some("@odata.mediaEditLink")
        );
        assert_eq!(
            Annotation::MediaEtag.resolve(Dialect::V401),
            Annotation::MediaEtag.resolve(Dialect::V4)
        );
    }

    #[test]
    fn delta_markers_exist_only_in_newer_dialect() {
        assert_eq!(Annotation::Removed.resolve(Dialect::V4), None);
        assert_eq!(Annotation::Delta.resolve(Dialect::V4), None);
        assert_eq!(Annotation::Removed.resolve(Dialect::V401), Some("@removed"));
        assert_eq!(Annotation::Delta.resolve(Dialect::V401), Some("@delta"));
    }

    #[test]
    fn property_scoped_keys() {
        assert_eq!(
            property_annotation_key("Orders", Annotation::Count, Dialect::V4).as_deref(),
            Some("Orders@odata.count")
        );
        assert_eq!(
            property_annotation_key("Orders", Annotation::Delta, Dialect::V401).as_deref(),
            Some("Orders@delta")
        );
        assert_eq!(
            property_annotation_key("Orders", Annotation::Delta, Dialect::V4),
            None
        );
    }

    #[test]
    fn parse_respects_reader_dialect() {
        assert_eq!(
            Annotation::parse("@odata.id", Dialect::V4),
            Some(Annotation::Id)
        );
        assert_eq!(Annotation::parse("@id", Dialect::V4), None);
        assert_eq!(Annotation::parse("@id", Dialect::V401), Some(Annotation::Id));
        assert_eq!(
            Annotation::parse("@odata.id", Dialect::V401),
            Some(Annotation::Id)
        );
        assert_eq!(Annotation::parse("@NS.custom", Dialect::V401), None);
    }

    #[test]
    fn split_keys() {
        assert_eq!(
            split_annotation_key("Orders@odata.count"),
            Some((Some("Orders"), "@odata.count"))
        );
        assert_eq!(split_annotation_key("@odata.id"), Some((None, "@odata.id")));
        assert_eq!(split_annotation_key("Name"), None);
    }

    #[test]
    fn dialect_strings() {
        assert_eq!("4.0".parse::<Dialect>(), Ok(Dialect::V4));
        assert_eq!("4.01".parse::<Dialect>(), Ok(Dialect::V401));
        assert!("5".parse::<Dialect>().is_err());
        assert_eq!(Dialect::V401.to_string(), "4.01");
    }
}
