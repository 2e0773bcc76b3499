//! # odelta Model
//!
//! Payload model and version-aware naming rules for odelta.
//!
//! This crate provides:
//! - Payload value carriers (`Resource`, `ResourceSet`, `DeletedResource`,
//!   delta links, `NestedResourceInfo`, properties)
//! - The annotation name resolver for both protocol dialects
//! - The context-URL builder
//! - The select/expand projection tree
//! - Service metadata oracles and an in-memory model
//! - The duplicate property/annotation collector shared with the reader
//! - Writer settings
//! - A minimal resource reader
//!
//! This is a pure model crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod annotations;
mod config;
mod context_url;
mod duplicates;
mod error;
mod metadata;
mod payload;
mod reader;
mod select_expand;

pub use annotations::{property_annotation_key, split_annotation_key, Annotation, Dialect};
pub use config::{Direction, MetadataLevel, WriterSettings};
pub use context_url::{metadata_document_url, ContextSuffix, ContextUrlBuilder, ContextUrlInfo};
pub use duplicates::DuplicateAnnotationChecker;
pub use error::{ModelError, ModelResult};
pub use metadata::{InMemoryModel, NavigationTarget, NoMetadata, ServiceMetadata};
pub use payload::{
    DeletedReason, DeletedResource, DeltaDeletedLink, DeltaLink, EntityReferenceLink,
    InstanceAnnotation, Item, ItemKind, MediaResource, NavigationSourceKind, NestedResourceInfo,
    NullResource, Property, PropertyInfo, Resource, ResourceSet, SerializationInfo,
};
pub use reader::{ReadResource, ResourceReader};
pub use select_expand::SelectExpand;

pub use odelta_codec::Value;

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn dialect() -> impl Strategy<Value = Dialect> {
        prop_oneof![Just(Dialect::V4), Just(Dialect::V401)]
    }

    fn annotation() -> impl Strategy<Value = Annotation> {
        (0..Annotation::ALL.len()).prop_map(|i| Annotation::ALL[i])
    }

    proptest! {
        #[test]
        fn resolution_is_stable(a in annotation(), d in dialect()) {
            prop_assert_eq!(a.resolve(d), a.resolve(d));
        }

        #[test]
        fn resolved_keys_parse_back(a in annotation(), d in dialect()) {
            if let Some(key) = a.resolve(d) {
                prop_assert_eq!(Annotation::parse(key, d), Some(a));
                prop_assert_eq!(Annotation::parse(key, Dialect::V401), Some(a));
            }
        }

        #[test]
        fn property_keys_split_back(name in "[A-Za-z][A-Za-z0-9_]{0,12}", a in annotation(), d in dialect()) {
            if let Some(key) = property_annotation_key(&name, a, d) {
                let (property, annotation_key) = split_annotation_key(&key).unwrap();
                prop_assert_eq!(property, Some(name.as_str()));
                prop_assert_eq!(Some(annotation_key), a.resolve(d));
            }
        }
    }
}
