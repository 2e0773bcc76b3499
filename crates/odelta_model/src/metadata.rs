//! Service metadata oracles.
//!
//! The writer never parses a metadata document. It asks a
//! [`ServiceMetadata`] implementation a handful of questions about types and
//! navigation sources.

use crate::payload::NavigationSourceKind;
use std::collections::BTreeMap;

/// Where a navigation property leads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationTarget {
    /// Target entity type.
    pub entity_type: String,
    /// Target navigation source, if bound to one.
    pub source: Option<String>,
    /// Whether the navigation property is collection-valued.
    pub is_collection: bool,
}

/// Questions the writer asks about the service model.
pub trait ServiceMetadata {
    /// Whether a value of type `actual` may appear where `expected` is
    /// declared.
    fn is_assignable(&self, actual: &str, expected: &str) -> bool;

    /// Key property names of the entity type behind `navigation_source`,
    /// in declaration order.
    fn key_property_names(&self, navigation_source: &str) -> Vec<String>;

    /// Declared entity type of a navigation source.
    fn source_entity_type(&self, _navigation_source: &str) -> Option<String> {
        None
    }

    /// Target of a navigation property declared on `entity_type`.
    fn navigation_target(&self, _entity_type: &str, _navigation: &str) -> Option<NavigationTarget> {
        None
    }

    /// The navigation source that holds instances of `entity_type` by
    /// default.
    fn default_navigation_source(&self, _entity_type: &str) -> Option<String> {
        None
    }
}

/// Metadata for writers that have no service model.
///
/// Types are only assignable to themselves and no source has keys.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoMetadata;

impl ServiceMetadata for NoMetadata {
    fn is_assignable(&self, actual: &str, expected: &str) -> bool {
        actual == expected
    }

    fn key_property_names(&self, _navigation_source: &str) -> Vec<String> {
        Vec::new()
    }
}

#[derive(Debug, Clone)]
struct EntityTypeDef {
    base: Option<String>,
    keys: Vec<String>,
    navigations: BTreeMap<String, NavigationTarget>,
}

#[derive(Debug, Clone)]
struct SourceDef {
    name: String,
    entity_type: String,
    kind: NavigationSourceKind,
}

/// A service model held in memory and assembled with builder calls.
///
/// Derived types inherit keys and navigation properties from their base.
#[derive(Debug, Clone, Default)]
pub struct InMemoryModel {
    entity_types: BTreeMap<String, EntityTypeDef>,
    sources: Vec<SourceDef>,
}

impl InMemoryModel {
    /// Creates an empty model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares an entity type. Derived types pass their base and no keys.
    #[must_use]
    pub fn with_entity_type(mut self, name: &str, base: Option<&str>, keys: &[&str]) -> Self {
        self.entity_types.insert(
            name.to_string(),
            EntityTypeDef {
                base: base.map(str::to_string),
                keys: keys.iter().map(|k| (*k).to_string()).collect(),
                navigations: BTreeMap::new(),
            },
        );
        self
    }

    /// Declares an entity set.
    #[must_use]
    pub fn with_entity_set(self, name: &str, entity_type: &str) -> Self {
        self.with_source(name, entity_type, NavigationSourceKind::EntitySet)
    }

    /// Declares a singleton.
    #[must_use]
    pub fn with_singleton(self, name: &str, entity_type: &str) -> Self {
        self.with_source(name, entity_type, NavigationSourceKind::Singleton)
    }

    fn with_source(mut self, name: &str, entity_type: &str, kind: NavigationSourceKind) -> Self {
        self.sources.push(SourceDef {
            name: name.to_string(),
            entity_type: entity_type.to_string(),
            kind,
        });
        self
    }

    /// Declares a navigation property on `entity_type`. Undeclared entity
    /// types are ignored.
    #[must_use]
    pub fn with_navigation(
        mut self,
        entity_type: &str,
        name: &str,
        target_type: &str,
        target_source: Option<&str>,
        is_collection: bool,
    ) -> Self {
        if let Some(def) = self.entity_types.get_mut(entity_type) {
            def.navigations.insert(
                name.to_string(),
                NavigationTarget {
                    entity_type: target_type.to_string(),
                    source: target_source.map(str::to_string),
                    is_collection,
                },
            );
        }
        self
    }

    /// Kind of a declared navigation source.
    pub fn source_kind(&self, navigation_source: &str) -> Option<NavigationSourceKind> {
        self.source(navigation_source).map(|s| s.kind)
    }

    fn source(&self, name: &str) -> Option<&SourceDef> {
        self.sources.iter().find(|s| s.name == name)
    }

    /// Walks `entity_type` and its ancestors, nearest first. Stops on cycles.
    fn lineage<'a>(&'a self, entity_type: &'a str) -> impl Iterator<Item = (&'a str, &'a EntityTypeDef)> + 'a {
        let mut next = Some(entity_type);
        let mut steps = 0;
        std::iter::from_fn(move || {
            let name = next?;
            let def = self.entity_types.get(name)?;
            steps += 1;
            next = if steps > self.entity_types.len() {
                None
            } else {
                def.base.as_deref()
            };
            Some((name, def))
        })
    }
}

impl ServiceMetadata for InMemoryModel {
    fn is_assignable(&self, actual: &str, expected: &str) -> bool {
        actual == expected || self.lineage(actual).any(|(name, _)| name == expected)
    }

    fn key_property_names(&self, navigation_source: &str) -> Vec<String> {
        let Some(source) = self.source(navigation_source) else {
            return Vec::new();
        };
        self.lineage(&source.entity_type)
            .find(|(_, def)| !def.keys.is_empty())
            .map(|(_, def)| def.keys.clone())
            .unwrap_or_default()
    }

    fn source_entity_type(&self, navigation_source: &str) -> Option<String> {
        self.source(navigation_source).map(|s| s.entity_type.clone())
    }

    fn navigation_target(&self, entity_type: &str, navigation: &str) -> Option<NavigationTarget> {
        self.lineage(entity_type)
            .find_map(|(_, def)| def.navigations.get(navigation))
            .cloned()
    }

    fn default_navigation_source(&self, entity_type: &str) -> Option<String> {
        self.sources
            .iter()
            .find(|s| s.kind == NavigationSourceKind::EntitySet && s.entity_type == entity_type)
            .map(|s| s.name.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> InMemoryModel {
        InMemoryModel::new()
            .with_entity_type("NS.Customer", None, &["CustomerID"])
            .with_entity_type("NS.VipCustomer", Some("NS.Customer"), &[])
            .with_entity_type("NS.Order", None, &["Id"])
            .with_entity_type("NS.OrderLine", None, &["OrderId", "Line"])
            .with_entity_set("Customers", "NS.Customer")
            .with_entity_set("VipCustomers", "NS.VipCustomer")
            .with_entity_set("Orders", "NS.Order")
            .with_entity_set("OrderLines", "NS.OrderLine")
            .with_singleton("Me", "NS.Customer")
            .with_navigation("NS.Customer", "Orders", "NS.Order", Some("Orders"), true)
    }

    #[test]
    fn assignability_walks_base_types() {
        let m = model();
        assert!(m.is_assignable("NS.VipCustomer", "NS.Customer"));
        assert!(m.is_assignable("NS.Customer", "NS.Customer"));
        assert!(!m.is_assignable("NS.Customer", "NS.VipCustomer"));
        assert!(!m.is_assignable("NS.Order", "NS.Customer"));
        assert!(m.is_assignable("Edm.String", "Edm.String"));
    }

    #[test]
    fn keys_come_from_nearest_declaring_type() {
        let m = model();
        assert_eq!(m.key_property_names("Customers"), ["CustomerID"]);
        assert_eq!(m.key_property_names("VipCustomers"), ["CustomerID"]);
        assert_eq!(m.key_property_names("OrderLines"), ["OrderId", "Line"]);
        assert!(m.key_property_names("Nowhere").is_empty());
    }

    #[test]
    fn navigation_is_inherited() {
        let m = model();
        let target = m.navigation_target("NS.VipCustomer", "Orders").unwrap();
        assert_eq!(target.entity_type, "NS.Order");
        assert_eq!(target.source.as_deref(), Some("Orders"));
        assert!(target.is_collection);
        assert!(m.navigation_target("NS.Order", "Orders").is_none());
    }

    #[test]
    fn default_sources_skip_singletons() {
        let m = model();
        assert_eq!(
            m.default_navigation_source("NS.VipCustomer").as_deref(),
            Some("VipCustomers")
        );
        assert_eq!(
            m.default_navigation_source("NS.Customer").as_deref(),
            Some("Customers")
        );
        assert_eq!(m.source_kind("Me"), Some(NavigationSourceKind::Singleton));
        assert_eq!(m.source_entity_type("Orders").as_deref(), Some("NS.Order"));
    }

    #[test]
    fn base_cycles_terminate() {
        let m = InMemoryModel::new()
            .with_entity_type("A", Some("B"), &[])
            .with_entity_type("B", Some("A"), &[]);
        assert!(!m.is_assignable("A", "C"));
    }

    #[test]
    fn no_metadata_is_neutral() {
        assert!(NoMetadata.is_assignable("X", "X"));
        assert!(!NoMetadata.is_assignable("X", "Y"));
        assert!(NoMetadata.key_property_names("Customers").is_empty());
        assert!(NoMetadata.default_navigation_source("X").is_none());
    }
}
