//! The writer state machine.
//!
//! [`WriterCore`] validates every call against its scope stack and, once a
//! call is known to be legal, emits JSON into an in-memory buffer. It never
//! performs I/O; the sync and async shims drain the buffer into their sinks.

use crate::error::{QueryAnnotation, WriterError, WriterResult};
use crate::identity::derive_identity;
use crate::scope::{
    Frame, NestedInfoFrame, PendingIdentity, PropertyFrame, PropertyValueState, ResourceFrame,
    ScopeKind, SetFrame,
};
use base64::prelude::*;
use bytes::Bytes;
use odelta_codec::{CodecError, JsonEmitter, Value};
use odelta_model::{
    property_annotation_key, Annotation, ContextSuffix, ContextUrlBuilder, ContextUrlInfo,
    DeletedReason, DeltaDeletedLink, DeltaLink, DuplicateAnnotationChecker, EntityReferenceLink,
    InstanceAnnotation, Item, ItemKind, MetadataLevel, NestedResourceInfo, NoMetadata,
    NullResource, Property, PropertyInfo, Resource, ResourceSet, SerializationInfo,
    ServiceMetadata, WriterSettings,
};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Service metadata shared between writer sessions.
pub type SharedMetadata = Arc<dyn ServiceMetadata + Send + Sync>;

/// Kind of value streamed into a property scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    /// Binary content, written as base64.
    Binary,
    /// Text content, written as an escaped JSON string.
    Text,
}

/// Where a begun item sits relative to the current scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placement {
    TopLevel,
    SetMember { delta: bool },
    NestedContent,
    ResourceChild,
}

/// What a navigation property is about to contain.
enum NestedContent<'a> {
    Resource,
    Null,
    Set { delta: bool, set: &'a ResourceSet },
}

/// The state-transition core shared by the sync and async writers.
pub struct WriterCore {
    settings: WriterSettings,
    metadata: SharedMetadata,
    emitter: JsonEmitter,
    stack: Vec<Frame>,
}

impl fmt::Debug for WriterCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriterCore")
            .field("settings", &self.settings)
            .field("state", &self.state())
            .field("depth", &self.depth())
            .field("buffered", &self.emitter.len())
            .finish_non_exhaustive()
    }
}

impl WriterCore {
    /// Creates a core with no service metadata.
    pub fn new(settings: WriterSettings) -> Self {
        Self::with_metadata(settings, Arc::new(NoMetadata))
    }

    /// Creates a core backed by the given service metadata.
    pub fn with_metadata(settings: WriterSettings, metadata: SharedMetadata) -> Self {
        Self {
            emitter: JsonEmitter::with_capacity(settings.buffer_size),
            settings,
            metadata,
            stack: vec![Frame::Start],
        }
    }

    /// The session settings.
    pub fn settings(&self) -> &WriterSettings {
        &self.settings
    }

    /// The kind of the innermost scope.
    pub fn state(&self) -> ScopeKind {
        self.top().kind()
    }

    /// Number of open scopes.
    pub fn depth(&self) -> usize {
        self.stack.len() - 1
    }

    /// Whether the top-level item was ended.
    pub fn is_completed(&self) -> bool {
        matches!(self.top(), Frame::Completed)
    }

    /// Number of buffered output bytes.
    pub fn buffered_len(&self) -> usize {
        self.emitter.len()
    }

    /// Drains the buffered output.
    pub fn take_output(&mut self) -> Bytes {
        self.emitter.take()
    }

    /// Opens a scope for `item`.
    ///
    /// # Errors
    ///
    /// Returns an error if `item` is not a legal child of the current scope,
    /// or if it breaks a dialect, direction, identity or type rule. Nothing
    /// is emitted and the scope stack is unchanged on error.
    pub fn begin(&mut self, item: Item) -> WriterResult<()> {
        let attempted = item.kind();
        let placement = self.placement(attempted)?;
        match item {
            Item::Resource(resource) => self.begin_resource(resource, None, placement)?,
            Item::DeletedResource(deleted) => {
                self.begin_resource(deleted.resource, Some(deleted.reason), placement)?;
            }
            Item::NullResource(null) => self.begin_null(null, placement)?,
            Item::ResourceSet(set) => self.begin_set(set, false, placement)?,
            Item::DeltaResourceSet(set) => self.begin_set(set, true, placement)?,
            Item::NestedResourceInfo(info) => self.begin_nested_info(info)?,
            Item::Property(info) => self.begin_property(info, placement)?,
        }
        trace!(scope = %self.state(), depth = self.depth(), "begin");
        Ok(())
    }

    /// Closes the innermost scope.
    ///
    /// # Errors
    ///
    /// Returns an error if no scope is open, if a delta member still lacks
    /// an identity, if a property has no value or an unfinished stream, or
    /// if a navigation property in a request has neither content nor
    /// bindings.
    pub fn end(&mut self) -> WriterResult<()> {
        self.check_end()?;
        let Some(frame) = self.stack.pop() else {
            return Err(WriterError::WriteEndCalledInInvalidState {
                state: ScopeKind::Completed,
            });
        };
        let kind = frame.kind();
        match frame {
            Frame::Property(property) => {
                if property.top_level {
                    self.emitter.end_object()?;
                }
            }
            Frame::Resource(_) | Frame::DeletedResource(_) => self.emitter.end_object()?,
            Frame::NullResource { top_level } => {
                if top_level {
                    self.emitter.end_object()?;
                }
            }
            Frame::ResourceSet(set) | Frame::DeltaResourceSet(set) => {
                self.emitter.end_array()?;
                match &set.nested_name {
                    Some(name) => {
                        if let Some(link) = &set.next_page_link {
                            self.write_property_annotation(name, Annotation::NextLink, &Value::from(link.as_str()))?;
                        }
                        if let Some(link) = &set.delta_link {
                            self.write_property_annotation(name, Annotation::DeltaLink, &Value::from(link.as_str()))?;
                        }
                    }
                    None => self.emitter.end_object()?,
                }
            }
            Frame::NestedResourceInfo(nested) => {
                if nested.binds.is_empty() {
                    for (annotation, url) in self.navigation_links(&nested) {
                        self.write_property_annotation(&nested.info.name, annotation, &Value::Text(url))?;
                    }
                } else {
                    self.write_binds(&nested.info.name, nested.info.is_collection, &nested.binds)?;
                }
            }
            Frame::NestedResourceInfoWithContent(_) | Frame::Start | Frame::Completed => {}
        }
        trace!(scope = %kind, depth = self.depth(), "end");

        if self.stack.len() == 1 {
            self.stack[0] = Frame::Completed;
            debug!(
                dialect = %self.settings.dialect,
                direction = %self.settings.direction,
                buffered = self.emitter.len(),
                "payload completed"
            );
        }
        Ok(())
    }

    /// Writes a property with an inline value into the current resource.
    ///
    /// # Errors
    ///
    /// Returns an error outside a resource scope, inside a 4.0 deleted
    /// entry, or if the property or one of its annotations is repeated.
    pub fn write_property(&mut self, property: &Property) -> WriterResult<()> {
        self.require_resource_scope(ItemKind::Property)?;
        if let Frame::Resource(frame) | Frame::DeletedResource(frame) = self.top_mut() {
            frame.checker.record_property(&property.name)?;
            for annotation in &property.annotations {
                frame
                    .checker
                    .record_annotation(Some(&property.name), &annotation.name)?;
            }
            if property.value.to_key_literal().is_some() {
                if let Some(pending) = &mut frame.identity {
                    pending.note_key(&property.name);
                }
            }
        }
        self.emit_property(property)
    }

    /// Writes an added link into the current delta set.
    ///
    /// # Errors
    ///
    /// Returns an error unless the innermost scope is a delta resource set.
    pub fn write_link(&mut self, link: &DeltaLink) -> WriterResult<()> {
        self.write_delta_link(
            ItemKind::DeltaLink,
            ContextSuffix::Link,
            [&link.source, &link.relationship, &link.target],
        )
    }

    /// Writes a removed link into the current delta set.
    ///
    /// # Errors
    ///
    /// Returns an error unless the innermost scope is a delta resource set.
    pub fn write_deleted_link(&mut self, link: &DeltaDeletedLink) -> WriterResult<()> {
        self.write_delta_link(
            ItemKind::DeltaDeletedLink,
            ContextSuffix::DeletedLink,
            [&link.source, &link.relationship, &link.target],
        )
    }

    /// Binds an existing entity to the current navigation property.
    ///
    /// Bindings are request-only and are written as `Name@odata.bind`.
    ///
    /// # Errors
    ///
    /// Returns an error unless the innermost scope is a navigation property
    /// without content, in a response, or when binding a second entity to
    /// a single-valued navigation property.
    pub fn write_entity_reference_link(&mut self, link: &EntityReferenceLink) -> WriterResult<()> {
        let attempted = ItemKind::EntityReferenceLink;
        let Frame::NestedResourceInfo(nested) = self.top() else {
            return Err(self.transition_error(attempted));
        };
        if self.settings.is_response() {
            return Err(WriterError::EntityReferenceLinkInResponse {
                name: nested.info.name.clone(),
            });
        }
        if !nested.info.is_collection && !nested.binds.is_empty() {
            return Err(WriterError::InvalidTransitionFromExpandedLink { attempted });
        }
        if let Frame::NestedResourceInfo(nested) = self.top_mut() {
            nested.binds.push(link.url.clone());
        }
        Ok(())
    }

    /// Writes the value of the current property scope.
    ///
    /// # Errors
    ///
    /// Returns an error outside a property scope, or if the property
    /// already has a value or an open stream.
    pub fn write_property_value(&mut self, value: &Value) -> WriterResult<()> {
        let name = self.pending_property()?;
        self.emitter.write_value(value)?;
        self.set_property_state(PropertyValueState::Written);
        if value.to_key_literal().is_some() {
            self.note_key_in_parent(&name);
        }
        Ok(())
    }

    /// Opens a streamed value for the current property scope.
    ///
    /// # Errors
    ///
    /// Same as [`WriterCore::write_property_value`].
    pub fn open_stream(&mut self, kind: StreamKind) -> WriterResult<()> {
        self.pending_property()?;
        self.emitter.start_string_value()?;
        self.set_property_state(match kind {
            StreamKind::Binary => PropertyValueState::Binary(Vec::new()),
            StreamKind::Text => PropertyValueState::Text,
        });
        Ok(())
    }

    /// Appends bytes to an open binary stream.
    ///
    /// Bytes are encoded in groups of three; up to two bytes stay buffered
    /// until more arrive or the stream is closed.
    ///
    /// # Errors
    ///
    /// Returns an error if no binary stream is open.
    pub fn write_stream_bytes(&mut self, bytes: &[u8]) -> WriterResult<()> {
        let encoded = {
            let Frame::Property(PropertyFrame {
                value: PropertyValueState::Binary(carry),
                ..
            }) = self.top_mut()
            else {
                return Err(CodecError::NoOpenString.into());
            };
            carry.extend_from_slice(bytes);
            let whole = carry.len() / 3 * 3;
            let encoded = BASE64_STANDARD.encode(&carry[..whole]);
            carry.drain(..whole);
            encoded
        };
        if !encoded.is_empty() {
            self.emitter.write_string_chunk(&encoded)?;
        }
        Ok(())
    }

    /// Appends text to an open text stream.
    ///
    /// # Errors
    ///
    /// Returns an error if no text stream is open.
    pub fn write_stream_text(&mut self, text: &str) -> WriterResult<()> {
        match self.top() {
            Frame::Property(PropertyFrame {
                value: PropertyValueState::Text,
                ..
            }) => {
                self.emitter.write_string_chunk(text)?;
                Ok(())
            }
            _ => Err(CodecError::NoOpenString.into()),
        }
    }

    /// Closes the open stream of the current property scope.
    ///
    /// # Errors
    ///
    /// Returns an error if no stream is open.
    pub fn close_stream(&mut self) -> WriterResult<()> {
        let tail = match self.top_mut() {
            Frame::Property(property) => {
                match std::mem::replace(&mut property.value, PropertyValueState::Written) {
                    PropertyValueState::Binary(carry) => BASE64_STANDARD.encode(carry),
                    PropertyValueState::Text => String::new(),
                    other => {
                        property.value = other;
                        return Err(CodecError::NoOpenString.into());
                    }
                }
            }
            _ => return Err(CodecError::NoOpenString.into()),
        };
        if !tail.is_empty() {
            self.emitter.write_string_chunk(&tail)?;
        }
        self.emitter.end_string_value()?;
        Ok(())
    }

    fn top(&self) -> &Frame {
        &self.stack[self.stack.len() - 1]
    }

    fn top_mut(&mut self) -> &mut Frame {
        let last = self.stack.len() - 1;
        &mut self.stack[last]
    }

    /// The error for attempting `attempted` in the current scope.
    fn transition_error(&self, attempted: ItemKind) -> WriterError {
        match self.top() {
            Frame::Start => WriterError::InvalidTransitionFromStart { attempted },
            Frame::DeletedResource(frame) if frame.legacy_deleted => {
                WriterError::InvalidTransitionFromLegacyDeletedResource { attempted }
            }
            Frame::Resource(_) | Frame::DeletedResource(_) | Frame::Property(_) => {
                WriterError::InvalidTransitionFromResource {
                    from: self.state(),
                    attempted,
                }
            }
            Frame::ResourceSet(_) | Frame::DeltaResourceSet(_) => {
                WriterError::InvalidTransitionFromResourceSet {
                    from: self.state(),
                    attempted,
                }
            }
            Frame::NestedResourceInfo(_) | Frame::NestedResourceInfoWithContent(_) => {
                WriterError::InvalidTransitionFromExpandedLink { attempted }
            }
            Frame::NullResource { .. } => WriterError::InvalidTransitionFromNullResource { attempted },
            Frame::Completed => WriterError::InvalidTransitionFromCompleted { attempted },
        }
    }

    fn placement(&self, attempted: ItemKind) -> WriterResult<Placement> {
        use ItemKind as K;
        let placement = match (self.top(), attempted) {
            (
                Frame::Start,
                K::Resource | K::ResourceSet | K::DeltaResourceSet | K::NullResource | K::Property,
            ) => Some(Placement::TopLevel),
            (Frame::Resource(_), K::NestedResourceInfo | K::Property) => {
                Some(Placement::ResourceChild)
            }
            (Frame::DeletedResource(frame), K::NestedResourceInfo | K::Property)
                if !frame.legacy_deleted =>
            {
                Some(Placement::ResourceChild)
            }
            (Frame::ResourceSet(_), K::Resource) => Some(Placement::SetMember { delta: false }),
            (Frame::DeltaResourceSet(_), K::Resource | K::DeletedResource) => {
                Some(Placement::SetMember { delta: true })
            }
            (
                Frame::NestedResourceInfo(_),
                K::Resource | K::ResourceSet | K::DeltaResourceSet | K::NullResource,
            ) => Some(Placement::NestedContent),
            (Frame::NestedResourceInfo(nested), K::DeletedResource) => {
                if self.settings.dialect.is_legacy() {
                    return Err(WriterError::NestedContentInLegacyDelta {
                        name: nested.info.name.clone(),
                    });
                }
                Some(Placement::NestedContent)
            }
            _ => None,
        };
        placement.ok_or_else(|| self.transition_error(attempted))
    }

    fn require_resource_scope(&self, attempted: ItemKind) -> WriterResult<()> {
        match self.top() {
            Frame::Resource(_) => Ok(()),
            Frame::DeletedResource(frame) if !frame.legacy_deleted => Ok(()),
            _ => Err(self.transition_error(attempted)),
        }
    }

    fn check_end(&self) -> WriterResult<()> {
        match self.top() {
            Frame::Start | Frame::Completed => Err(WriterError::WriteEndCalledInInvalidState {
                state: self.state(),
            }),
            Frame::Property(property) => match property.value {
                PropertyValueState::Written => Ok(()),
                PropertyValueState::Pending => Err(WriterError::PropertyValueNotWritten {
                    property: property.name.clone(),
                }),
                PropertyValueState::Binary(_) | PropertyValueState::Text => {
                    Err(WriterError::StreamNotDisposed {
                        property: property.name.clone(),
                    })
                }
            },
            Frame::Resource(frame) | Frame::DeletedResource(frame) => match &frame.identity {
                Some(pending) if !pending.is_satisfied() => {
                    Err(WriterError::DeltaResourceWithoutIdOrKeyProperties { kind: pending.kind })
                }
                _ => Ok(()),
            },
            Frame::NestedResourceInfo(nested)
                if !self.settings.is_response() && nested.binds.is_empty() =>
            {
                Err(WriterError::DeferredLinkInRequest {
                    name: nested.info.name.clone(),
                })
            }
            _ => Ok(()),
        }
    }

    fn begin_resource(
        &mut self,
        resource: Resource,
        deleted: Option<Option<DeletedReason>>,
        placement: Placement,
    ) -> WriterResult<()> {
        let kind = if deleted.is_some() {
            ItemKind::DeletedResource
        } else {
            ItemKind::Resource
        };
        let legacy_deleted = deleted.is_some() && self.settings.dialect.is_legacy();
        let info = resource.serialization_info.as_ref();
        let own_source = info.and_then(|i| i.navigation_source_name.clone());
        let declared = self.declared_type(info);

        // The enclosing scope decides the source, expected type and whether
        // an identity is needed.
        let (source, set_source, expected_type, path, in_delta, delta_member) = match placement {
            Placement::TopLevel => {
                let expected = info
                    .and_then(|i| i.expected_type.clone())
                    .or_else(|| declared.clone());
                (own_source, None, expected, Vec::new(), false, false)
            }
            Placement::SetMember { delta } => {
                let (Frame::ResourceSet(set) | Frame::DeltaResourceSet(set)) = self.top() else {
                    return Err(self.transition_error(kind));
                };
                // A member from another source is checked against that
                // source's type, not the set's.
                let foreign = own_source.is_some() && own_source != set.navigation_source;
                let expected = if foreign {
                    declared.clone()
                } else {
                    set.element_type.clone()
                };
                let source = own_source.or_else(|| set.navigation_source.clone());
                (
                    source,
                    set.navigation_source.clone(),
                    expected,
                    set.path.clone(),
                    set.in_delta,
                    delta,
                )
            }
            Placement::NestedContent => {
                let Frame::NestedResourceInfo(nested) = self.top() else {
                    return Err(self.transition_error(kind));
                };
                self.check_nested_content(nested, kind, false)?;
                let expected = nested
                    .target_type
                    .clone()
                    .or_else(|| info.and_then(|i| i.expected_type.clone()));
                let source = own_source.or_else(|| nested.target_source.clone());
                (source, None, expected, nested.path(), nested.in_delta, false)
            }
            Placement::ResourceChild => return Err(self.transition_error(kind)),
        };

        self.check_assignable(resource.type_name.as_deref(), expected_type.as_deref())?;

        let mut checker = DuplicateAnnotationChecker::new();
        for annotation in &resource.instance_annotations {
            checker.record_annotation(None, &annotation.name)?;
        }
        for property in &resource.properties {
            checker.record_property(&property.name)?;
            for annotation in &property.annotations {
                checker.record_annotation(Some(&property.name), &annotation.name)?;
            }
        }

        // Requests only insist on identities for deleted resources.
        let identity_required = delta_member && (deleted.is_some() || self.settings.is_response());
        let keys = source
            .as_deref()
            .map(|s| self.metadata.key_property_names(s))
            .unwrap_or_default();
        let derived = source
            .as_deref()
            .and_then(|s| derive_identity(s, &keys, &resource.properties));
        let mut identity = None;
        if identity_required && resource.id.is_none() && derived.is_none() {
            if legacy_deleted {
                return Err(WriterError::DeltaResourceWithoutIdOrKeyProperties { kind });
            }
            let found = resource
                .properties
                .iter()
                .filter(|p| keys.contains(&p.name) && p.value.to_key_literal().is_some())
                .map(|p| p.name.clone())
                .collect();
            identity = Some(PendingIdentity { kind, keys, found });
        }

        let source_kind = info.map(|i| i.navigation_source_kind).unwrap_or_default();
        let context = match (placement, source.as_deref()) {
            (Placement::TopLevel, Some(s)) => self.context_url(&ContextUrlInfo {
                navigation_source: s,
                source_kind,
                declared_type: declared.as_deref(),
                runtime_type: resource.type_name.as_deref(),
                select_expand: self.settings.select_expand.as_ref(),
                suffix: ContextSuffix::Entity,
            }),
            (Placement::SetMember { delta: true }, Some(s))
                if legacy_deleted || set_source.as_deref() != Some(s) =>
            {
                self.context_url(&ContextUrlInfo {
                    navigation_source: s,
                    source_kind,
                    declared_type: declared.as_deref(),
                    runtime_type: resource.type_name.as_deref(),
                    select_expand: None,
                    suffix: if deleted.is_some() {
                        ContextSuffix::DeletedEntity
                    } else {
                        ContextSuffix::Entity
                    },
                })
            }
            _ => None,
        };

        if placement == Placement::NestedContent {
            self.open_nested_content(NestedContent::Resource)?;
        }
        self.emitter.start_object()?;
        if legacy_deleted {
            if let Some(context) = &context {
                self.write_annotation_str(Annotation::Context, context)?;
            }
            if let Some(id) = resource.id.as_ref().or(derived.as_ref()) {
                self.emitter.write_string_member("id", id)?;
            }
            if let Some(reason) = deleted.flatten() {
                self.emitter.write_string_member("reason", reason.as_str())?;
            }
        } else {
            if let (Some(reason), Some(key)) = (deleted, Annotation::Removed.resolve(self.settings.dialect)) {
                self.emitter.write_name(key)?;
                self.emitter.start_object()?;
                if let Some(reason) = reason {
                    self.emitter.write_string_member("reason", reason.as_str())?;
                }
                self.emitter.end_object()?;
            }
            if let Some(context) = &context {
                self.write_annotation_str(Annotation::Context, context)?;
            }
            self.write_resource_body(&resource, expected_type.as_deref())?;
        }

        let frame = ResourceFrame {
            entity_type: resource.type_name.clone().or(expected_type),
            checker,
            identity,
            legacy_deleted,
            path,
            in_delta,
        };
        self.stack.push(if deleted.is_some() {
            Frame::DeletedResource(frame)
        } else {
            Frame::Resource(frame)
        });
        Ok(())
    }

    fn begin_null(&mut self, null: NullResource, placement: Placement) -> WriterResult<()> {
        match placement {
            Placement::TopLevel => {
                let info = null.serialization_info.as_ref();
                let context = info
                    .and_then(|i| i.navigation_source_name.as_deref())
                    .and_then(|s| {
                        self.context_url(&ContextUrlInfo {
                            source_kind: info.map(|i| i.navigation_source_kind).unwrap_or_default(),
                            ..ContextUrlInfo::new(s, ContextSuffix::Entity)
                        })
                    });
                self.emitter.start_object()?;
                if let Some(context) = &context {
                    self.write_annotation_str(Annotation::Context, context)?;
                }
                self.write_annotation(Annotation::Null, &Value::Bool(true))?;
                self.stack.push(Frame::NullResource { top_level: true });
            }
            Placement::NestedContent => {
                let Frame::NestedResourceInfo(nested) = self.top() else {
                    return Err(self.transition_error(ItemKind::NullResource));
                };
                self.check_nested_content(nested, ItemKind::NullResource, false)?;
                self.open_nested_content(NestedContent::Null)?;
                self.emitter.write_value(&Value::Null)?;
                self.stack.push(Frame::NullResource { top_level: false });
            }
            _ => return Err(self.transition_error(ItemKind::NullResource)),
        }
        Ok(())
    }

    fn begin_set(&mut self, set: ResourceSet, delta: bool, placement: Placement) -> WriterResult<()> {
        let kind = if delta {
            ItemKind::DeltaResourceSet
        } else {
            ItemKind::ResourceSet
        };
        if !self.settings.is_response() {
            let annotation = if set.count().is_some() {
                Some(QueryAnnotation::Count)
            } else if set.next_page_link().is_some() {
                Some(QueryAnnotation::NextPageLink)
            } else if set.delta_link().is_some() {
                Some(QueryAnnotation::DeltaLink)
            } else {
                None
            };
            if let Some(annotation) = annotation {
                return Err(WriterError::QueryAnnotationInRequest { annotation });
            }
        }

        let mut checker = DuplicateAnnotationChecker::new();
        for annotation in &set.instance_annotations {
            checker.record_annotation(None, &annotation.name)?;
        }

        let info = set.serialization_info.as_ref();
        let own_source = info.and_then(|i| i.navigation_source_name.clone());
        match placement {
            Placement::TopLevel => {
                let declared = self.declared_type(info);
                let expected = info.and_then(|i| i.expected_type.clone());
                self.check_assignable(set.type_name.as_deref(), expected.as_deref())?;

                let context = own_source.as_deref().and_then(|s| {
                    self.context_url(&ContextUrlInfo {
                        navigation_source: s,
                        source_kind: info.map(|i| i.navigation_source_kind).unwrap_or_default(),
                        declared_type: declared.as_deref(),
                        runtime_type: set.type_name.as_deref(),
                        select_expand: self.settings.select_expand.as_ref(),
                        suffix: if delta {
                            ContextSuffix::Delta
                        } else {
                            ContextSuffix::None
                        },
                    })
                });

                self.emitter.start_object()?;
                if let Some(context) = &context {
                    self.write_annotation_str(Annotation::Context, context)?;
                }
                if let Some(count) = set.count() {
                    self.write_annotation(Annotation::Count, &Value::Integer(count))?;
                }
                if let Some(link) = set.next_page_link() {
                    self.write_annotation_str(Annotation::NextLink, link)?;
                }
                if let Some(link) = set.delta_link() {
                    self.write_annotation_str(Annotation::DeltaLink, link)?;
                }
                for annotation in &set.instance_annotations {
                    self.write_custom_annotation(None, annotation)?;
                }
                self.emitter.write_name("value")?;
                self.emitter.start_array()?;

                let frame = SetFrame {
                    navigation_source: own_source,
                    element_type: set.type_name.clone().or(expected).or(declared),
                    nested_name: None,
                    next_page_link: None,
                    delta_link: None,
                    path: Vec::new(),
                    in_delta: delta,
                };
                self.stack.push(if delta {
                    Frame::DeltaResourceSet(frame)
                } else {
                    Frame::ResourceSet(frame)
                });
            }
            Placement::NestedContent => {
                let Frame::NestedResourceInfo(nested) = self.top() else {
                    return Err(self.transition_error(kind));
                };
                self.check_nested_content(nested, kind, true)?;
                if self.settings.dialect.is_legacy() && delta {
                    return Err(WriterError::NestedContentInLegacyDelta {
                        name: nested.info.name.clone(),
                    });
                }
                self.check_assignable(set.type_name.as_deref(), nested.target_type.as_deref())?;

                let frame = SetFrame {
                    navigation_source: own_source.or_else(|| nested.target_source.clone()),
                    element_type: set.type_name.clone().or_else(|| nested.target_type.clone()),
                    nested_name: Some(nested.info.name.clone()),
                    next_page_link: set.next_page_link().map(str::to_string),
                    delta_link: set.delta_link().map(str::to_string),
                    path: nested.path(),
                    in_delta: nested.in_delta || delta,
                };
                self.open_nested_content(NestedContent::Set { delta, set: &set })?;
                self.emitter.start_array()?;
                self.stack.push(if delta {
                    Frame::DeltaResourceSet(frame)
                } else {
                    Frame::ResourceSet(frame)
                });
            }
            _ => return Err(self.transition_error(kind)),
        }
        Ok(())
    }

    fn begin_nested_info(&mut self, info: NestedResourceInfo) -> WriterResult<()> {
        if !self.settings.is_response() && info.url.is_some() {
            return Err(WriterError::DeferredLinkInRequest { name: info.name });
        }
        let (entity_type, parent_path, in_delta) = match self.top() {
            Frame::Resource(frame) | Frame::DeletedResource(frame) => {
                (frame.entity_type.clone(), frame.path.clone(), frame.in_delta)
            }
            _ => return Err(self.transition_error(ItemKind::NestedResourceInfo)),
        };
        if let Frame::Resource(frame) | Frame::DeletedResource(frame) = self.top_mut() {
            frame.checker.record_property(&info.name)?;
        }
        let target = entity_type
            .as_deref()
            .and_then(|t| self.metadata.navigation_target(t, &info.name));
        let (target_type, target_source) = match target {
            Some(target) => (Some(target.entity_type), target.source),
            None => (None, None),
        };
        self.stack.push(Frame::NestedResourceInfo(NestedInfoFrame {
            info,
            target_type,
            target_source,
            binds: Vec::new(),
            parent_path,
            in_delta,
        }));
        Ok(())
    }

    fn begin_property(&mut self, info: PropertyInfo, placement: Placement) -> WriterResult<()> {
        match placement {
            Placement::TopLevel => {
                let context = info
                    .type_name
                    .as_deref()
                    .and_then(|t| self.type_context_url(t));
                self.emitter.start_object()?;
                if let Some(context) = &context {
                    self.write_annotation_str(Annotation::Context, context)?;
                }
                self.emitter.write_name("value")?;
                self.stack.push(Frame::Property(PropertyFrame {
                    name: info.name,
                    top_level: true,
                    value: PropertyValueState::Pending,
                }));
            }
            Placement::ResourceChild => {
                if let Frame::Resource(frame) | Frame::DeletedResource(frame) = self.top_mut() {
                    frame.checker.record_property(&info.name)?;
                }
                if let Some(type_name) = &info.type_name {
                    if self.settings.metadata_level != MetadataLevel::None {
                        self.write_property_annotation(
                            &info.name,
                            Annotation::Type,
                            &Value::Text(format!("#{type_name}")),
                        )?;
                    }
                }
                self.emitter.write_name(&info.name)?;
                self.stack.push(Frame::Property(PropertyFrame {
                    name: info.name,
                    top_level: false,
                    value: PropertyValueState::Pending,
                }));
            }
            _ => return Err(self.transition_error(ItemKind::Property)),
        }
        Ok(())
    }

    /// Checks the content rules of a navigation property before content is
    /// begun under it.
    fn check_nested_content(
        &self,
        nested: &NestedInfoFrame,
        attempted: ItemKind,
        is_set: bool,
    ) -> WriterResult<()> {
        if is_set && !nested.info.is_collection {
            return Err(WriterError::InvalidTransitionFromExpandedLink { attempted });
        }
        if !is_set && nested.info.is_collection && self.settings.is_response() {
            return Err(WriterError::InvalidTransitionFromExpandedLink { attempted });
        }
        if self.settings.dialect.is_legacy() && nested.in_delta {
            return Err(WriterError::NestedContentInLegacyDelta {
                name: nested.info.name.clone(),
            });
        }
        Ok(())
    }

    /// Writes everything that precedes the content of the current navigation
    /// property and marks it as having content.
    fn open_nested_content(&mut self, content: NestedContent<'_>) -> WriterResult<()> {
        let Frame::NestedResourceInfo(nested) = self.top() else {
            return Err(CodecError::invalid_structure("no navigation property is open").into());
        };
        let name = nested.info.name.clone();
        let is_collection = nested.info.is_collection;
        let binds = nested.binds.clone();
        let links = self.navigation_links(nested);

        if !binds.is_empty() {
            self.write_binds(&name, is_collection, &binds)?;
        }
        for (annotation, url) in links {
            self.write_property_annotation(&name, annotation, &Value::Text(url))?;
        }
        let key = match content {
            NestedContent::Set { delta, set } => {
                if let Some(count) = set.count() {
                    self.write_property_annotation(&name, Annotation::Count, &Value::Integer(count))?;
                }
                for annotation in &set.instance_annotations {
                    self.write_custom_annotation(Some(&name), annotation)?;
                }
                let delta_key = if delta {
                    property_annotation_key(&name, Annotation::Delta, self.settings.dialect)
                } else {
                    None
                };
                delta_key.unwrap_or_else(|| name.clone())
            }
            NestedContent::Resource | NestedContent::Null => name.clone(),
        };
        self.emitter.write_name(&key)?;

        let top = self.top_mut();
        *top = match std::mem::replace(top, Frame::Completed) {
            Frame::NestedResourceInfo(nested) => Frame::NestedResourceInfoWithContent(nested),
            other => other,
        };
        Ok(())
    }

    /// Navigation and association links written for a navigation property
    /// in full-metadata responses, when the property is selected.
    fn navigation_links(&self, nested: &NestedInfoFrame) -> Vec<(Annotation, String)> {
        if !self.settings.is_response() || self.settings.metadata_level != MetadataLevel::Full {
            return Vec::new();
        }
        if let Some(projection) = &self.settings.select_expand {
            let parent: Vec<&str> = nested.parent_path.iter().map(String::as_str).collect();
            if !projection.is_selected(&parent, &nested.info.name) {
                return Vec::new();
            }
        }
        let mut links = Vec::new();
        if let Some(url) = &nested.info.association_link {
            links.push((Annotation::AssociationLink, url.clone()));
        }
        if let Some(url) = nested.info.navigation_link.as_ref().or(nested.info.url.as_ref()) {
            links.push((Annotation::NavigationLink, url.clone()));
        }
        links
    }

    fn write_binds(&mut self, name: &str, is_collection: bool, binds: &[String]) -> WriterResult<()> {
        let Some(key) = property_annotation_key(name, Annotation::Bind, self.settings.dialect) else {
            return Ok(());
        };
        self.emitter.write_name(&key)?;
        match binds {
            [single] if !is_collection => self.emitter.write_string(single)?,
            _ => {
                self.emitter.start_array()?;
                for url in binds {
                    self.emitter.write_string(url)?;
                }
                self.emitter.end_array()?;
            }
        }
        Ok(())
    }

    fn write_delta_link(
        &mut self,
        attempted: ItemKind,
        suffix: ContextSuffix,
        [source, relationship, target]: [&String; 3],
    ) -> WriterResult<()> {
        let set_source = match self.top() {
            Frame::DeltaResourceSet(set) => set.navigation_source.clone(),
            _ => return Err(self.transition_error(attempted)),
        };
        let context = set_source
            .as_deref()
            .and_then(|s| self.context_url(&ContextUrlInfo::new(s, suffix)));
        self.emitter.start_object()?;
        if let Some(context) = &context {
            self.write_annotation_str(Annotation::Context, context)?;
        }
        self.emitter.write_string_member("source", source)?;
        self.emitter.write_string_member("relationship", relationship)?;
        self.emitter.write_string_member("target", target)?;
        self.emitter.end_object()?;
        trace!(kind = %attempted, "delta link");
        Ok(())
    }

    fn write_resource_body(&mut self, resource: &Resource, expected_type: Option<&str>) -> WriterResult<()> {
        if let Some(type_name) = self.type_annotation(resource.type_name.as_deref(), expected_type) {
            self.write_annotation_str(Annotation::Type, &type_name)?;
        }
        if let Some(id) = &resource.id {
            self.write_annotation_str(Annotation::Id, id)?;
        }
        if let Some(etag) = &resource.etag {
            self.write_annotation_str(Annotation::Etag, etag)?;
        }
        if self.settings.metadata_level != MetadataLevel::None {
            if let Some(link) = &resource.edit_link {
                self.write_annotation_str(Annotation::EditLink, link)?;
            }
            if let Some(link) = &resource.read_link {
                self.write_annotation_str(Annotation::ReadLink, link)?;
            }
        }
        if let Some(media) = &resource.media {
            let fields = [
                (Annotation::MediaEditLink, &media.edit_link),
                (Annotation::MediaReadLink, &media.read_link),
                (Annotation::MediaContentType, &media.content_type),
                (Annotation::MediaEtag, &media.etag),
            ];
            for (annotation, value) in fields {
                if let Some(value) = value {
                    self.write_annotation_str(annotation, value)?;
                }
            }
        }
        for annotation in &resource.instance_annotations {
            self.write_custom_annotation(None, annotation)?;
        }
        for property in &resource.properties {
            self.emit_property(property)?;
        }
        Ok(())
    }

    fn emit_property(&mut self, property: &Property) -> WriterResult<()> {
        if let Some(type_name) = &property.type_name {
            if self.settings.metadata_level != MetadataLevel::None {
                self.write_property_annotation(
                    &property.name,
                    Annotation::Type,
                    &Value::Text(format!("#{type_name}")),
                )?;
            }
        }
        for annotation in &property.annotations {
            self.write_custom_annotation(Some(&property.name), annotation)?;
        }
        self.emitter.write_member(&property.name, &property.value)?;
        Ok(())
    }

    /// The `#Type` value to write, if the runtime type needs announcing.
    fn type_annotation(&self, actual: Option<&str>, expected: Option<&str>) -> Option<String> {
        let actual = actual?;
        let needed = match self.settings.metadata_level {
            MetadataLevel::Full => true,
            MetadataLevel::Minimal | MetadataLevel::None => expected != Some(actual),
        };
        needed.then(|| format!("#{actual}"))
    }

    fn check_assignable(&self, actual: Option<&str>, expected: Option<&str>) -> WriterResult<()> {
        if let (Some(actual), Some(expected)) = (actual, expected) {
            if !self.metadata.is_assignable(actual, expected) {
                return Err(WriterError::incompatible_types(actual, expected));
            }
        }
        Ok(())
    }

    fn declared_type(&self, info: Option<&SerializationInfo>) -> Option<String> {
        let info = info?;
        info.navigation_source_entity_type.clone().or_else(|| {
            info.navigation_source_name
                .as_deref()
                .and_then(|s| self.metadata.source_entity_type(s))
        })
    }

    fn context_url(&self, info: &ContextUrlInfo<'_>) -> Option<String> {
        if !self.settings.writes_context_url() {
            return None;
        }
        let root = self.settings.service_root.as_deref()?;
        let builder = ContextUrlBuilder::new(root, self.settings.dialect, self.metadata.as_ref());
        Some(builder.build(info))
    }

    fn type_context_url(&self, type_name: &str) -> Option<String> {
        if !self.settings.writes_context_url() {
            return None;
        }
        let root = self.settings.service_root.as_deref()?;
        let builder = ContextUrlBuilder::new(root, self.settings.dialect, self.metadata.as_ref());
        Some(builder.for_type(type_name))
    }

    fn write_annotation(&mut self, annotation: Annotation, value: &Value) -> WriterResult<()> {
        if let Some(key) = annotation.resolve(self.settings.dialect) {
            self.emitter.write_member(key, value)?;
        }
        Ok(())
    }

    fn write_annotation_str(&mut self, annotation: Annotation, value: &str) -> WriterResult<()> {
        if let Some(key) = annotation.resolve(self.settings.dialect) {
            self.emitter.write_string_member(key, value)?;
        }
        Ok(())
    }

    fn write_property_annotation(
        &mut self,
        property: &str,
        annotation: Annotation,
        value: &Value,
    ) -> WriterResult<()> {
        if let Some(key) = property_annotation_key(property, annotation, self.settings.dialect) {
            self.emitter.write_member(&key, value)?;
        }
        Ok(())
    }

    fn write_custom_annotation(
        &mut self,
        property: Option<&str>,
        annotation: &InstanceAnnotation,
    ) -> WriterResult<()> {
        let key = format!("{}@{}", property.unwrap_or_default(), annotation.name);
        self.emitter.write_member(&key, &annotation.value)?;
        Ok(())
    }

    /// Returns the name of the current property scope if it still awaits
    /// its value.
    fn pending_property(&self) -> WriterResult<String> {
        match self.top() {
            Frame::Property(property) => match property.value {
                PropertyValueState::Pending => Ok(property.name.clone()),
                PropertyValueState::Written => Err(WriterError::PropertyValueAlreadyWritten {
                    property: property.name.clone(),
                }),
                PropertyValueState::Binary(_) | PropertyValueState::Text => {
                    Err(WriterError::StreamNotDisposed {
                        property: property.name.clone(),
                    })
                }
            },
            _ => Err(WriterError::NoOpenProperty {
                state: self.state(),
            }),
        }
    }

    fn set_property_state(&mut self, state: PropertyValueState) {
        if let Frame::Property(property) = self.top_mut() {
            property.value = state;
        }
    }

    fn note_key_in_parent(&mut self, name: &str) {
        let len = self.stack.len();
        if len < 2 {
            return;
        }
        if let Frame::Resource(frame) | Frame::DeletedResource(frame) = &mut self.stack[len - 2] {
            if let Some(pending) = &mut frame.identity {
                pending.note_key(name);
            }
        }
    }
}

impl Drop for WriterCore {
    fn drop(&mut self) {
        if !matches!(self.top(), Frame::Start | Frame::Completed) {
            warn!(
                state = %self.state(),
                depth = self.depth(),
                "payload writer dropped with open scopes"
            );
        }
    }
}
