//! Select/expand projection tree.

use crate::annotations::Dialect;
use serde::{Deserialize, Serialize};

/// A parsed `$select`/`$expand` projection.
///
/// An empty selection means every structural property is selected.
/// Expanded navigation properties carry their own nested projection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectExpand {
    selected: Vec<String>,
    expanded: Vec<(String, SelectExpand)>,
}

impl SelectExpand {
    /// Creates a projection that selects everything and expands nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds selected properties.
    #[must_use]
    pub fn select<I, S>(mut self, properties: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selected.extend(properties.into_iter().map(Into::into));
        self
    }

    /// Adds an expanded navigation property with its nested projection.
    #[must_use]
    pub fn expand(mut self, navigation: impl Into<String>, nested: SelectExpand) -> Self {
        self.expanded.push((navigation.into(), nested));
        self
    }

    /// Whether every property is selected at this level.
    pub fn selects_all(&self) -> bool {
        self.selected.is_empty()
    }

    /// Whether nothing is selected or expanded at this level.
    pub fn is_empty(&self) -> bool {
        self.selected.is_empty() && self.expanded.is_empty()
    }

    /// Returns the projection that applies at `path`, a sequence of expanded
    /// navigation property names starting from the top level.
    ///
    /// Returns `None` if the path leaves the expanded tree.
    pub fn expand_tree(&self, path: &[&str]) -> Option<&SelectExpand> {
        let mut current = self;
        for segment in path {
            current = current
                .expanded
                .iter()
                .find(|(name, _)| name == segment)
                .map(|(_, nested)| nested)?;
        }
        Some(current)
    }

    /// Whether `property` is selected in the scope at `path`.
    ///
    /// Scopes outside the expanded tree are unconstrained.
    pub fn is_selected(&self, path: &[&str], property: &str) -> bool {
        match self.expand_tree(path) {
            Some(scope) => {
                scope.selects_all()
                    || scope.selected.iter().any(|p| p == property)
                    || scope.expanded.iter().any(|(name, _)| name == property)
            }
            None => true,
        }
    }

    /// Renders the projection as a context-URL fragment, such as
    /// `Name,Orders(Id)`, without the enclosing parentheses.
    ///
    /// An expanded property with no nested projection is left out in the
    /// legacy dialect and written as `Orders()` in the newer dialect.
    /// Returns `None` when there is nothing to render.
    pub fn context_fragment(&self, dialect: Dialect) -> Option<String> {
        let mut parts: Vec<String> = self.selected.clone();
        for (name, nested) in &self.expanded {
            match nested.context_fragment(dialect) {
                Some(inner) => parts.push(format!("{name}({inner})")),
                None if dialect == Dialect::V401 => parts.push(format!("{name}()")),
                None => {}
            }
        }
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(","))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SelectExpand {
        SelectExpand::new()
            .select(["Name"])
            .expand("Orders", SelectExpand::new().select(["Id"]))
    }

    #[test]
    fn empty_selection_selects_all() {
        let projection = SelectExpand::new();
        assert!(projection.is_selected(&[], "Anything"));
        assert!(projection.is_empty());
    }

    #[test]
    fn selection_at_top_level() {
        let projection = sample();
        assert!(projection.is_selected(&[], "Name"));
        assert!(projection.is_selected(&[], "Orders"));
        assert!(!projection.is_selected(&[], "City"));
    }

    #[test]
    fn selection_in_expanded_scope() {
        let projection = sample();
        assert!(projection.is_selected(&["Orders"], "Id"));
        assert!(!projection.is_selected(&["Orders"], "Total"));
        assert!(projection.is_selected(&["Unknown"], "Total"));
    }

    #[test]
    fn expand_tree_walks_paths() {
        let projection = sample();
        assert_eq!(
            projection.expand_tree(&["Orders"]),
            Some(&SelectExpand::new().select(["Id"]))
        );
        assert!(projection.expand_tree(&["Orders", "Items"]).is_none());
    }

    #[test]
    fn fragment_nests_recursively() {
        assert_eq!(
            sample().context_fragment(Dialect::V4).as_deref(),
            Some("Name,Orders(Id)")
        );
    }

    #[test]
    fn bare_expand_differs_by_dialect() {
        let projection = SelectExpand::new()
            .select(["Name"])
            .expand("Orders", SelectExpand::new());
        assert_eq!(
            projection.context_fragment(Dialect::V4).as_deref(),
            Some("Name")
        );
        assert_eq!(
            projection.context_fragment(Dialect::V401).as_deref(),
            Some("Name,Orders()")
        );
        assert_eq!(SelectExpand::new().context_fragment(Dialect::V401), None);
    }
}
