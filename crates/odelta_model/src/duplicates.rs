//! Duplicate property and annotation detection.

use crate::error::{ModelError, ModelResult};
use std::collections::HashSet;

/// Tracks the property names and annotations recorded for one JSON object.
///
/// Both the writer and the reader keep one checker per object scope.
/// Annotations are recorded by their dialect-independent term so that
/// `@odata.id` and `@id` count as the same annotation.
#[derive(Debug, Default)]
pub struct DuplicateAnnotationChecker {
    properties: HashSet<String>,
    annotations: HashSet<(Option<String>, String)>,
}

impl DuplicateAnnotationChecker {
    /// Creates an empty checker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a property name.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::DuplicateProperty`] if the name was already
    /// recorded.
    pub fn record_property(&mut self, name: &str) -> ModelResult<()> {
        if self.properties.insert(name.to_string()) {
            Ok(())
        } else {
            Err(ModelError::duplicate_property(name))
        }
    }

    /// Records an annotation on `property`, or on the instance itself when
    /// `property` is `None`.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::DuplicateAnnotation`] if the same annotation
    /// was already recorded for the same target.
    pub fn record_annotation(&mut self, property: Option<&str>, annotation: &str) -> ModelResult<()> {
        let key = (property.map(str::to_string), annotation.to_string());
        if self.annotations.insert(key) {
            Ok(())
        } else {
            Err(ModelError::duplicate_annotation(property, annotation))
        }
    }

    /// Whether a property name was recorded.
    pub fn has_property(&self, name: &str) -> bool {
        self.properties.contains(name)
    }

    /// Forgets everything recorded so far.
    pub fn reset(&mut self) {
        self.properties.clear();
        self.annotations.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_property_is_rejected() {
        let mut checker = DuplicateAnnotationChecker::new();
        checker.record_property("Name").unwrap();
        checker.record_property("City").unwrap();
        assert_eq!(
            checker.record_property("Name"),
            Err(ModelError::duplicate_property("Name"))
        );
        assert!(checker.has_property("City"));
    }

    #[test]
    fn annotations_are_scoped_by_target() {
        let mut checker = DuplicateAnnotationChecker::new();
        checker.record_annotation(None, "id").unwrap();
        checker.record_annotation(Some("Orders"), "count").unwrap();
        checker.record_annotation(Some("Lines"), "count").unwrap();
        checker.record_annotation(None, "count").unwrap();

        let err = checker.record_annotation(Some("Orders"), "count").unwrap_err();
        assert_eq!(
            err,
            ModelError::DuplicateAnnotation {
                annotation: "count".to_string(),
                property: Some("Orders".to_string()),
            }
        );
        assert!(checker.record_annotation(None, "id").is_err());
    }

    #[test]
    fn annotation_and_property_names_do_not_collide() {
        let mut checker = DuplicateAnnotationChecker::new();
        checker.record_property("id").unwrap();
        checker.record_annotation(None, "id").unwrap();
    }

    #[test]
    fn reset_clears_state() {
        let mut checker = DuplicateAnnotationChecker::new();
        checker.record_property("Name").unwrap();
        checker.reset();
        checker.record_property("Name").unwrap();
    }

    #[test]
    fn error_messages() {
        assert_eq!(
            ModelError::duplicate_annotation(Some("Orders"), "count").to_string(),
            "duplicate annotation 'count' on property 'Orders'"
        );
        assert_eq!(
            ModelError::duplicate_annotation(None, "id").to_string(),
            "duplicate annotation 'id'"
        );
    }
}
