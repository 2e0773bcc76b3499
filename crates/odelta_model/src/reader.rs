//! Minimal resource reader.
//!
//! Reads a single resource object back into a [`Resource`]. Reserved
//! annotations are mapped to resource fields, custom annotations become
//! instance annotations, and every other member becomes a property.
//! Duplicates are detected with the same [`DuplicateAnnotationChecker`] the
//! writer uses.

use crate::annotations::{split_annotation_key, Annotation, Dialect};
use crate::duplicates::DuplicateAnnotationChecker;
use crate::error::{ModelError, ModelResult};
use crate::payload::{InstanceAnnotation, MediaResource, Property, Resource};
use odelta_codec::{from_json, Value};

/// A resource read from a payload, with its context URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadResource {
    /// The context URL, if the payload carried one.
    pub context_url: Option<String>,
    /// The resource.
    pub resource: Resource,
}

/// Reads resource objects written in one dialect.
#[derive(Debug, Clone, Copy)]
pub struct ResourceReader {
    dialect: Dialect,
}

enum PropertyAnnotation {
    Type(String),
    Custom(InstanceAnnotation),
}

impl ResourceReader {
    /// Creates a reader for the given dialect.
    pub fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }

    /// Reads one resource object from JSON text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a JSON object, if a reserved
    /// annotation has the wrong value type or does not belong on a
    /// resource, or if a property or annotation is repeated.
    pub fn read_resource(&self, text: &str) -> ModelResult<ReadResource> {
        let value = from_json(text)?;
        let Value::Complex(members) = value else {
            return Err(ModelError::invalid_payload("expected a JSON object"));
        };

        let mut checker = DuplicateAnnotationChecker::new();
        let mut context_url = None;
        let mut resource = Resource::new();
        let mut pending: Vec<(String, PropertyAnnotation)> = Vec::new();

        for (key, value) in members {
            match split_annotation_key(&key) {
                None => {
                    checker.record_property(&key)?;
                    resource.properties.push(Property::new(key, value));
                }
                Some((None, annotation_key)) => {
                    match Annotation::parse(annotation_key, self.dialect) {
                        Some(annotation) => {
                            checker.record_annotation(None, annotation.term())?;
                            let text = expect_text(annotation_key, &value)?;
                            match annotation {
                                Annotation::Context => context_url = Some(text),
                                Annotation::Id => resource.id = Some(text),
                                Annotation::Type => resource.type_name = Some(strip_hash(text)),
                                Annotation::Etag => resource.etag = Some(text),
                                Annotation::EditLink => resource.edit_link = Some(text),
                                Annotation::ReadLink => resource.read_link = Some(text),
                                Annotation::MediaEditLink => media(&mut resource).edit_link = Some(text),
                                Annotation::MediaReadLink => media(&mut resource).read_link = Some(text),
                                Annotation::MediaContentType => {
                                    media(&mut resource).content_type = Some(text);
                                }
                                Annotation::MediaEtag => media(&mut resource).etag = Some(text),
                                _ => {
                                    return Err(ModelError::invalid_payload(format!(
                                        "annotation '{annotation_key}' does not belong on a resource"
                                    )))
                                }
                            }
                        }
                        None => {
                            let name = custom_term(annotation_key)?;
                            checker.record_annotation(None, name)?;
                            resource
                                .instance_annotations
                                .push(InstanceAnnotation::new(name, value));
                        }
                    }
                }
                Some((Some(property), annotation_key)) => {
                    let parsed = Annotation::parse(annotation_key, self.dialect);
                    let term = match parsed {
                        Some(annotation) => annotation.term(),
                        None => custom_term(annotation_key)?,
                    };
                    checker.record_annotation(Some(property), term)?;
                    match parsed {
                        Some(Annotation::Type) => {
                            let text = expect_text(annotation_key, &value)?;
                            pending.push((property.to_string(), PropertyAnnotation::Type(strip_hash(text))));
                        }
                        // Navigation control information has no property to attach to.
                        Some(_) => {}
                        None => pending.push((
                            property.to_string(),
                            PropertyAnnotation::Custom(InstanceAnnotation::new(term, value)),
                        )),
                    }
                }
            }
        }

        for (name, annotation) in pending {
            if let Some(property) = resource.properties.iter_mut().find(|p| p.name == name) {
                match annotation {
                    PropertyAnnotation::Type(type_name) => property.type_name = Some(type_name),
                    PropertyAnnotation::Custom(custom) => property.annotations.push(custom),
                }
            }
        }

        Ok(ReadResource {
            context_url,
            resource,
        })
    }
}

fn media(resource: &mut Resource) -> &mut MediaResource {
    resource.media.get_or_insert_with(MediaResource::default)
}

fn expect_text(key: &str, value: &Value) -> ModelResult<String> {
    value
        .as_text()
        .map(str::to_string)
        .ok_or_else(|| ModelError::invalid_payload(format!("annotation '{key}' must be a string")))
}

fn strip_hash(type_name: String) -> String {
    match type_name.strip_prefix('#') {
        Some(stripped) => stripped.to_string(),
        None => type_name,
    }
}

/// Custom annotations are namespace-qualified; reserved-looking names that
/// did not resolve are rejected.
fn custom_term(key: &str) -> ModelResult<&str> {
    let term = &key[1..];
    if term.contains('.') && !term.starts_with("odata.") {
        Ok(term)
    } else {
        Err(ModelError::invalid_payload(format!(
            "unknown annotation '{key}'"
        )))
    }
}
