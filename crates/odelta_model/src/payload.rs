//! Payload value carriers.
//!
//! These types describe what the caller wants written. They are plain data
//! with builder methods; the writer reads them and never mutates them.

use crate::error::{ModelError, ModelResult};
use odelta_codec::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of navigation source a payload belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavigationSourceKind {
    /// An entity set.
    #[default]
    EntitySet,
    /// A contained entity set reached through a containment navigation.
    ContainedEntitySet,
    /// A singleton.
    Singleton,
}

/// Serialization hints describing where a payload lives.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializationInfo {
    /// Name of the navigation source, e.g. `Customers`.
    pub navigation_source_name: Option<String>,
    /// Declared entity type of the navigation source.
    pub navigation_source_entity_type: Option<String>,
    /// Type expected by the enclosing scope.
    pub expected_type: Option<String>,
    /// Kind of the navigation source.
    pub navigation_source_kind: NavigationSourceKind,
}

impl SerializationInfo {
    /// Hints for an entity set.
    pub fn entity_set(name: impl Into<String>, entity_type: impl Into<String>) -> Self {
        Self {
            navigation_source_name: Some(name.into()),
            navigation_source_entity_type: Some(entity_type.into()),
            expected_type: None,
            navigation_source_kind: NavigationSourceKind::EntitySet,
        }
    }

    /// Hints for a singleton.
    pub fn singleton(name: impl Into<String>, entity_type: impl Into<String>) -> Self {
        Self {
            navigation_source_kind: NavigationSourceKind::Singleton,
            ..Self::entity_set(name, entity_type)
        }
    }

    /// Hints for a contained entity set.
    pub fn contained(name: impl Into<String>, entity_type: impl Into<String>) -> Self {
        Self {
            navigation_source_kind: NavigationSourceKind::ContainedEntitySet,
            ..Self::entity_set(name, entity_type)
        }
    }

    /// Sets the expected type.
    #[must_use]
    pub fn with_expected_type(mut self, type_name: impl Into<String>) -> Self {
        self.expected_type = Some(type_name.into());
        self
    }
}

/// A custom instance annotation such as `@NS.rating`.
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceAnnotation {
    /// Namespace-qualified term, without the leading `@`.
    pub name: String,
    /// Annotation value.
    pub value: Value,
}

impl InstanceAnnotation {
    /// Creates a new instance annotation.
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A property with an inline value.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    /// Property name.
    pub name: String,
    /// Property value.
    pub value: Value,
    /// Optional type name, written as a property type annotation.
    pub type_name: Option<String>,
    /// Property-scoped instance annotations.
    pub annotations: Vec<InstanceAnnotation>,
}

impl Property {
    /// Creates a new property.
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            type_name: None,
            annotations: Vec::new(),
        }
    }

    /// Sets the type name.
    #[must_use]
    pub fn with_type_name(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    /// Adds a property-scoped instance annotation.
    #[must_use]
    pub fn with_annotation(mut self, annotation: InstanceAnnotation) -> Self {
        self.annotations.push(annotation);
        self
    }
}

/// A property begun as a scope; its value follows separately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyInfo {
    /// Property name.
    pub name: String,
    /// Optional type name.
    pub type_name: Option<String>,
}

impl PropertyInfo {
    /// Creates a new property scope description.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: None,
        }
    }

    /// Sets the type name.
    #[must_use]
    pub fn with_type_name(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }
}

/// Media resource annotations of a media entity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaResource {
    /// Media edit link.
    pub edit_link: Option<String>,
    /// Media read link.
    pub read_link: Option<String>,
    /// Media content type.
    pub content_type: Option<String>,
    /// Media entity tag.
    pub etag: Option<String>,
}

/// A resource (entity or complex instance).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resource {
    /// Identity URL.
    pub id: Option<String>,
    /// Runtime type name.
    pub type_name: Option<String>,
    /// Ordered properties.
    pub properties: Vec<Property>,
    /// Serialization hints.
    pub serialization_info: Option<SerializationInfo>,
    /// Custom instance annotations.
    pub instance_annotations: Vec<InstanceAnnotation>,
    /// Entity tag.
    pub etag: Option<String>,
    /// Edit link.
    pub edit_link: Option<String>,
    /// Read link.
    pub read_link: Option<String>,
    /// Media resource annotations.
    pub media: Option<MediaResource>,
}

impl Resource {
    /// Creates an empty resource.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the identity URL.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Sets the runtime type name.
    #[must_use]
    pub fn with_type_name(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    /// Appends a property.
    #[must_use]
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.push(Property::new(name, value));
        self
    }

    /// Appends a fully described property.
    #[must_use]
    pub fn with_property_value(mut self, property: Property) -> Self {
        self.properties.push(property);
        self
    }

    /// Sets the serialization hints.
    #[must_use]
    pub fn with_serialization_info(mut self, info: SerializationInfo) -> Self {
        self.serialization_info = Some(info);
        self
    }

    /// Adds a custom instance annotation.
    #[must_use]
    pub fn with_annotation(mut self, annotation: InstanceAnnotation) -> Self {
        self.instance_annotations.push(annotation);
        self
    }

    /// Sets the entity tag.
    #[must_use]
    pub fn with_etag(mut self, etag: impl Into<String>) -> Self {
        self.etag = Some(etag.into());
        self
    }

    /// Sets the edit link.
    #[must_use]
    pub fn with_edit_link(mut self, link: impl Into<String>) -> Self {
        self.edit_link = Some(link.into());
        self
    }

    /// Sets the read link.
    #[must_use]
    pub fn with_read_link(mut self, link: impl Into<String>) -> Self {
        self.read_link = Some(link.into());
        self
    }

    /// Sets the media resource annotations.
    #[must_use]
    pub fn with_media(mut self, media: MediaResource) -> Self {
        self.media = Some(media);
        self
    }

    /// Looks up a property by name.
    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name == name)
    }
}

/// Why a resource appears as deleted in a delta payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeletedReason {
    /// The resource was deleted.
    Deleted,
    /// The resource no longer matches the query.
    Changed,
}

impl DeletedReason {
    /// Returns the wire string.
    pub const fn as_str(self) -> &'static str {
        match self {
            DeletedReason::Deleted => "deleted",
            DeletedReason::Changed => "changed",
        }
    }
}

/// A resource reported as removed from a delta set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeletedResource {
    /// The resource content and identity.
    pub resource: Resource,
    /// The deletion reason, if known.
    pub reason: Option<DeletedReason>,
}

impl DeletedResource {
    /// Creates a deleted resource with the given reason.
    pub fn new(reason: Option<DeletedReason>) -> Self {
        Self {
            resource: Resource::new(),
            reason,
        }
    }

    /// Wraps an existing resource.
    pub fn from_resource(resource: Resource, reason: Option<DeletedReason>) -> Self {
        Self { resource, reason }
    }

    /// Sets the identity URL.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.resource.id = Some(id.into());
        self
    }

    /// Appends a property.
    #[must_use]
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.resource.properties.push(Property::new(name, value));
        self
    }

    /// Sets the serialization hints.
    #[must_use]
    pub fn with_serialization_info(mut self, info: SerializationInfo) -> Self {
        self.resource.serialization_info = Some(info);
        self
    }
}

/// A set of resources.
///
/// The same shape serves plain sets and delta sets; the kind is chosen
/// when the set is begun.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceSet {
    count: Option<i64>,
    next_page_link: Option<String>,
    delta_link: Option<String>,
    /// Element type name of the set.
    pub type_name: Option<String>,
    /// Serialization hints.
    pub serialization_info: Option<SerializationInfo>,
    /// Custom instance annotations.
    pub instance_annotations: Vec<InstanceAnnotation>,
}

impl ResourceSet {
    /// Creates an empty set description.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the item count.
    #[must_use]
    pub fn with_count(mut self, count: i64) -> Self {
        self.count = Some(count);
        self
    }

    /// Sets the next-page link.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::ConflictingSetLinks`] if a delta link is set.
    pub fn with_next_page_link(mut self, link: impl Into<String>) -> ModelResult<Self> {
        if self.delta_link.is_some() {
            return Err(ModelError::ConflictingSetLinks);
        }
        self.next_page_link = Some(link.into());
        Ok(self)
    }

    /// Sets the delta link.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::ConflictingSetLinks`] if a next-page link is set.
    pub fn with_delta_link(mut self, link: impl Into<String>) -> ModelResult<Self> {
        if self.next_page_link.is_some() {
            return Err(ModelError::ConflictingSetLinks);
        }
        self.delta_link = Some(link.into());
        Ok(self)
    }

    /// Sets the element type name.
    #[must_use]
    pub fn with_type_name(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    /// Sets the serialization hints.
    #[must_use]
    pub fn with_serialization_info(mut self, info: SerializationInfo) -> Self {
        self.serialization_info = Some(info);
        self
    }

    /// Adds a custom instance annotation.
    #[must_use]
    pub fn with_annotation(mut self, annotation: InstanceAnnotation) -> Self {
        self.instance_annotations.push(annotation);
        self
    }

    /// The item count.
    pub fn count(&self) -> Option<i64> {
        self.count
    }

    /// The next-page link.
    pub fn next_page_link(&self) -> Option<&str> {
        self.next_page_link.as_deref()
    }

    /// The delta link.
    pub fn delta_link(&self) -> Option<&str> {
        self.delta_link.as_deref()
    }
}

/// An added link between two resources in a delta payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeltaLink {
    /// Source resource URL.
    pub source: String,
    /// Navigation property name.
    pub relationship: String,
    /// Target resource URL.
    pub target: String,
}

impl DeltaLink {
    /// Creates a new added link.
    pub fn new(
        source: impl Into<String>,
        relationship: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            relationship: relationship.into(),
            target: target.into(),
        }
    }
}

/// A removed link between two resources in a delta payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeltaDeletedLink {
    /// Source resource URL.
    pub source: String,
    /// Navigation property name.
    pub relationship: String,
    /// Target resource URL.
    pub target: String,
}

impl DeltaDeletedLink {
    /// Creates a new removed link.
    pub fn new(
        source: impl Into<String>,
        relationship: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            relationship: relationship.into(),
            target: target.into(),
        }
    }
}

/// A navigation property about to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NestedResourceInfo {
    /// Navigation property name.
    pub name: String,
    /// Whether the property is collection-valued.
    pub is_collection: bool,
    /// Direct URL of a deferred (reference-only) link.
    pub url: Option<String>,
    /// Navigation link URL.
    pub navigation_link: Option<String>,
    /// Association link URL.
    pub association_link: Option<String>,
}

impl NestedResourceInfo {
    /// Describes a single-valued navigation property.
    pub fn single(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_collection: false,
            url: None,
            navigation_link: None,
            association_link: None,
        }
    }

    /// Describes a collection-valued navigation property.
    pub fn collection(name: impl Into<String>) -> Self {
        Self {
            is_collection: true,
            ..Self::single(name)
        }
    }

    /// Sets the deferred link URL.
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Sets the navigation link URL.
    #[must_use]
    pub fn with_navigation_link(mut self, url: impl Into<String>) -> Self {
        self.navigation_link = Some(url.into());
        self
    }

    /// Sets the association link URL.
    #[must_use]
    pub fn with_association_link(mut self, url: impl Into<String>) -> Self {
        self.association_link = Some(url.into());
        self
    }
}

/// A reference to an existing entity, bound in a request payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityReferenceLink {
    /// URL of the referenced entity.
    pub url: String,
}

impl EntityReferenceLink {
    /// Creates a new reference link.
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

/// A null single-valued resource.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NullResource {
    /// Serialization hints, used for the context URL at the top level.
    pub serialization_info: Option<SerializationInfo>,
}

/// A value passed to the writer's `begin`.
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    /// A resource.
    Resource(Resource),
    /// A null resource.
    NullResource(NullResource),
    /// A plain resource set.
    ResourceSet(ResourceSet),
    /// A delta resource set.
    DeltaResourceSet(ResourceSet),
    /// A deleted resource.
    DeletedResource(DeletedResource),
    /// A navigation property.
    NestedResourceInfo(NestedResourceInfo),
    /// A property whose value is written separately.
    Property(PropertyInfo),
}

impl Item {
    /// Returns the kind of this item.
    pub fn kind(&self) -> ItemKind {
        match self {
            Item::Resource(_) => ItemKind::Resource,
            Item::NullResource(_) => ItemKind::NullResource,
            Item::ResourceSet(_) => ItemKind::ResourceSet,
            Item::DeltaResourceSet(_) => ItemKind::DeltaResourceSet,
            Item::DeletedResource(_) => ItemKind::DeletedResource,
            Item::NestedResourceInfo(_) => ItemKind::NestedResourceInfo,
            Item::Property(_) => ItemKind::Property,
        }
    }
}

impl From<Resource> for Item {
    fn from(resource: Resource) -> Self {
        Item::Resource(resource)
    }
}

impl From<DeletedResource> for Item {
    fn from(resource: DeletedResource) -> Self {
        Item::DeletedResource(resource)
    }
}

impl From<NestedResourceInfo> for Item {
    fn from(info: NestedResourceInfo) -> Self {
        Item::NestedResourceInfo(info)
    }
}

impl From<PropertyInfo> for Item {
    fn from(info: PropertyInfo) -> Self {
        Item::Property(info)
    }
}

impl From<NullResource> for Item {
    fn from(resource: NullResource) -> Self {
        Item::NullResource(resource)
    }
}

/// Kinds of items and leaf writes, used in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemKind {
    /// A resource.
    Resource,
    /// A null resource.
    NullResource,
    /// A plain resource set.
    ResourceSet,
    /// A delta resource set.
    DeltaResourceSet,
    /// A deleted resource.
    DeletedResource,
    /// A navigation property.
    NestedResourceInfo,
    /// A property.
    Property,
    /// An added link.
    DeltaLink,
    /// A removed link.
    DeltaDeletedLink,
    /// An entity reference binding.
    EntityReferenceLink,
}

impl ItemKind {
    /// Returns the kind name.
    pub const fn as_str(self) -> &'static str {
        match self {
            ItemKind::Resource => "Resource",
            ItemKind::NullResource => "NullResource",
            ItemKind::ResourceSet => "ResourceSet",
            ItemKind::DeltaResourceSet => "DeltaResourceSet",
            ItemKind::DeletedResource => "DeletedResource",
            ItemKind::NestedResourceInfo => "NestedResourceInfo",
            ItemKind::Property => "Property",
            ItemKind::DeltaLink => "DeltaLink",
            ItemKind::DeltaDeletedLink => "DeltaDeletedLink",
            ItemKind::EntityReferenceLink => "EntityReferenceLink",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
