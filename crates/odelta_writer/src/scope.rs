//! Scope frames of the writer state machine.

use odelta_model::{DuplicateAnnotationChecker, ItemKind, NestedResourceInfo};
use std::collections::BTreeSet;
use std::fmt;

/// The kind of the innermost open scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeKind {
    /// Nothing written yet.
    Start,
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
    /// A navigation property with no content yet.
    NestedResourceInfo,
    /// A navigation property whose content was begun.
    NestedResourceInfoWithContent,
    /// A property scope.
    Property,
    /// The payload is complete.
    Completed,
}

impl ScopeKind {
    /// Returns the scope name.
    pub const fn as_str(self) -> &'static str {
        match self {
            ScopeKind::Start => "Start",
            ScopeKind::Resource => "Resource",
            ScopeKind::NullResource => "NullResource",
            ScopeKind::ResourceSet => "ResourceSet",
            ScopeKind::DeltaResourceSet => "DeltaResourceSet",
            ScopeKind::DeletedResource => "DeletedResource",
            ScopeKind::NestedResourceInfo => "NestedResourceInfo",
            ScopeKind::NestedResourceInfoWithContent => "NestedResourceInfoWithContent",
            ScopeKind::Property => "Property",
            ScopeKind::Completed => "Completed",
        }
    }
}

impl fmt::Display for ScopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity requirement of a delta member that could not be settled when
/// it was begun. Key properties written later may still satisfy it.
#[derive(Debug)]
pub(crate) struct PendingIdentity {
    pub kind: ItemKind,
    pub keys: Vec<String>,
    pub found: BTreeSet<String>,
}

impl PendingIdentity {
    pub fn note_key(&mut self, name: &str) {
        if self.keys.iter().any(|k| k == name) {
            self.found.insert(name.to_string());
        }
    }

    pub fn is_satisfied(&self) -> bool {
        !self.keys.is_empty() && self.keys.iter().all(|k| self.found.contains(k))
    }
}

#[derive(Debug)]
pub(crate) struct ResourceFrame {
    /// Entity type used for navigation lookups.
    pub entity_type: Option<String>,
    pub checker: DuplicateAnnotationChecker,
    pub identity: Option<PendingIdentity>,
    /// Set only for 4.0 deleted entries, which carry no content.
    pub legacy_deleted: bool,
    pub path: Vec<String>,
    pub in_delta: bool,
}

#[derive(Debug)]
pub(crate) struct SetFrame {
    pub navigation_source: Option<String>,
    pub element_type: Option<String>,
    /// Navigation property name when the set is nested.
    pub nested_name: Option<String>,
    /// Links written after the closing bracket of a nested set.
    pub next_page_link: Option<String>,
    pub delta_link: Option<String>,
    pub path: Vec<String>,
    pub in_delta: bool,
}

#[derive(Debug)]
pub(crate) struct NestedInfoFrame {
    pub info: NestedResourceInfo,
    pub target_type: Option<String>,
    pub target_source: Option<String>,
    pub binds: Vec<String>,
    pub parent_path: Vec<String>,
    pub in_delta: bool,
}

impl NestedInfoFrame {
    pub fn path(&self) -> Vec<String> {
        let mut path = self.parent_path.clone();
        path.push(self.info.name.clone());
        path
    }
}

#[derive(Debug)]
pub(crate) enum PropertyValueState {
    Pending,
    Written,
    /// Base64 stream; holds up to two bytes not yet encoded.
    Binary(Vec<u8>),
    Text,
}

#[derive(Debug)]
pub(crate) struct PropertyFrame {
    pub name: String,
    pub top_level: bool,
    pub value: PropertyValueState,
}

#[derive(Debug)]
pub(crate) enum Frame {
    Start,
    Resource(ResourceFrame),
    DeletedResource(ResourceFrame),
    NullResource { top_level: bool },
    ResourceSet(SetFrame),
    DeltaResourceSet(SetFrame),
    NestedResourceInfo(NestedInfoFrame),
    NestedResourceInfoWithContent(NestedInfoFrame),
    Property(PropertyFrame),
    Completed,
}

impl Frame {
    pub fn kind(&self) -> ScopeKind {
        match self {
            Frame::Start => ScopeKind::Start,
            Frame::Resource(_) => ScopeKind::Resource,
            Frame::DeletedResource(_) => ScopeKind::DeletedResource,
            Frame::NullResource { .. } => ScopeKind::NullResource,
            Frame::ResourceSet(_) => ScopeKind::ResourceSet,
            Frame::DeltaResourceSet(_) => ScopeKind::DeltaResourceSet,
            Frame::NestedResourceInfo(_) => ScopeKind::NestedResourceInfo,
            Frame::NestedResourceInfoWithContent(_) => ScopeKind::NestedResourceInfoWithContent,
            Frame::Property(_) => ScopeKind::Property,
            Frame::Completed => ScopeKind::Completed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_identity_needs_every_key() {
        let mut pending = PendingIdentity {
            kind: ItemKind::DeletedResource,
            keys: vec!["OrderId".to_string(), "Line".to_string()],
            found: BTreeSet::new(),
        };
        pending.note_key("OrderId");
        pending.note_key("Other");
        assert!(!pending.is_satisfied());
        pending.note_key("Line");
        assert!(pending.is_satisfied());
    }

    #[test]
    fn no_keys_never_satisfies() {
        let pending = PendingIdentity {
            kind: ItemKind::Resource,
            keys: Vec::new(),
            found: BTreeSet::new(),
        };
        assert!(!pending.is_satisfied());
    }

    #[test]
    fn nested_path_appends_name() {
        let frame = NestedInfoFrame {
            info: NestedResourceInfo::collection("Orders"),
            target_type: None,
            target_source: None,
            binds: Vec::new(),
            parent_path: vec!["Customer".to_string()],
            in_delta: false,
        };
        assert_eq!(frame.path(), ["Customer", "Orders"]);
        assert_eq!(
            Frame::NestedResourceInfoWithContent(frame).kind(),
            ScopeKind::NestedResourceInfoWithContent
        );
    }
}
