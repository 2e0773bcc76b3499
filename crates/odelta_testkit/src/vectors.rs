//! Shared test vectors.
//!
//! Expected wire names and context URLs, written out by hand so that the
//! resolver and builder are checked against an independent table.

use odelta_model::{Annotation, ContextSuffix, Dialect, NavigationSourceKind};
use serde::{Deserialize, Serialize};

/// Expected keys of one annotation concept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationVector {
    /// Concept name.
    pub term: String,
    /// Key in the legacy dialect, if any.
    pub legacy: Option<String>,
    /// Key in the newer dialect, if any.
    pub newer: Option<String>,
}

impl AnnotationVector {
    fn new(term: &str, legacy: Option<&str>, newer: Option<&str>) -> Self {
        Self {
            term: term.to_string(),
            legacy: legacy.map(str::to_string),
            newer: newer.map(str::to_string),
        }
    }

    /// Expected key for `dialect`.
    pub fn expected(&self, dialect: Dialect) -> Option<&str> {
        match dialect {
            Dialect::V4 => self.legacy.as_deref(),
            Dialect::V401 => self.newer.as_deref(),
        }
    }

    /// The concept this vector describes.
    pub fn annotation(&self) -> Option<Annotation> {
        Annotation::ALL.into_iter().find(|a| a.term() == self.term)
    }
}

/// The reserved annotation table.
pub fn annotation_vectors() -> Vec<AnnotationVector> {
    let prefixed = |term: &str, bare: &str| {
        AnnotationVector::new(term, Some(&format!("@odata.{bare}")), Some(&format!("@{bare}")))
    };
    let mut vectors: Vec<AnnotationVector> = [
        "context",
        "id",
        "type",
        "count",
        "nextLink",
        "deltaLink",
        "etag",
        "editLink",
        "readLink",
        "navigationLink",
        "associationLink",
        "bind",
        "null",
    ]
    .into_iter()
    .map(|term| prefixed(term, term))
    .collect();
    vectors.push(AnnotationVector::new("removed", None, Some("@removed")));
    vectors.push(AnnotationVector::new("delta", None, Some("@delta")));
    for term in ["mediaEditLink", "mediaReadLink", "mediaContentType", "mediaEtag"] {
        let key = format!("@odata.{term}");
        vectors.push(AnnotationVector::new(term, Some(&key), Some(&key)));
    }
    vectors
}

/// An expected context URL.
#[derive(Debug, Clone)]
pub struct ContextUrlVector {
    /// Identifier for this vector.
    pub id: &'static str,
    /// Navigation source.
    pub source: &'static str,
    /// Navigation source kind.
    pub kind: NavigationSourceKind,
    /// Runtime type, when it differs from the declared one.
    pub runtime_type: Option<&'static str>,
    /// Trailing segment.
    pub suffix: ContextSuffix,
    /// Expected URL.
    pub expected: &'static str,
}

/// Context URLs over the fixture model rooted at `http://host/service/`.
pub fn context_url_vectors() -> Vec<ContextUrlVector> {
    let vector = |id, source, suffix, expected| ContextUrlVector {
        id,
        source,
        kind: NavigationSourceKind::EntitySet,
        runtime_type: None,
        suffix,
        expected,
    };
    vec![
        vector("set", "Customers", ContextSuffix::None, "http://host/service/$metadata#Customers"),
        vector("entity", "Customers", ContextSuffix::Entity, "http://host/service/$metadata#Customers/$entity"),
        vector("delta", "Customers", ContextSuffix::Delta, "http://host/service/$metadata#Customers/$delta"),
        vector("link", "Customers", ContextSuffix::Link, "http://host/service/$metadata#Customers/$link"),
        vector(
            "deleted_link",
            "Customers",
            ContextSuffix::DeletedLink,
            "http://host/service/$metadata#Customers/$deletedLink",
        ),
        vector(
            "deleted_entity",
            "Orders",
            ContextSuffix::DeletedEntity,
            "http://host/service/$metadata#Orders/$deletedEntity",
        ),
        ContextUrlVector {
            runtime_type: Some("NS.VipCustomer"),
            ..vector(
                "derived_without_own_set",
                "Customers",
                ContextSuffix::Entity,
                "http://host/service/$metadata#Customers/$entity",
            )
        },
        ContextUrlVector {
            kind: NavigationSourceKind::Singleton,
            ..vector("singleton", "Me", ContextSuffix::Entity, "http://host/service/$metadata#Me")
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_concept_has_a_vector() {
        let vectors = annotation_vectors();
        assert_eq!(vectors.len(), Annotation::ALL.len());
        assert!(vectors.iter().all(|v| v.annotation().is_some()));
    }

    #[test]
    fn vectors_serialize() {
        let json = serde_json::to_string(&annotation_vectors()[13]).unwrap();
        assert_eq!(json, r#"{"term":"removed","legacy":null,"newer":"@removed"}"#);
    }
}
