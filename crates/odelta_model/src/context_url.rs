//! Context URL construction.

use crate::annotations::Dialect;
use crate::metadata::ServiceMetadata;
use crate::payload::NavigationSourceKind;
use crate::select_expand::SelectExpand;

/// The trailing segment of a context URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextSuffix {
    /// A bare set.
    None,
    /// A single entity.
    Entity,
    /// A delta set.
    Delta,
    /// An added link.
    Link,
    /// A removed link.
    DeletedLink,
    /// A legacy deleted entry.
    DeletedEntity,
}

impl ContextSuffix {
    /// Returns the suffix with its leading slash, or an empty string.
    pub const fn as_str(self) -> &'static str {
        match self {
            ContextSuffix::None => "",
            ContextSuffix::Entity => "/$entity",
            ContextSuffix::Delta => "/$delta",
            ContextSuffix::Link => "/$link",
            ContextSuffix::DeletedLink => "/$deletedLink",
            ContextSuffix::DeletedEntity => "/$deletedEntity",
        }
    }
}

/// What a context URL describes.
#[derive(Debug, Clone, Copy)]
pub struct ContextUrlInfo<'a> {
    /// Navigation source name.
    pub navigation_source: &'a str,
    /// Navigation source kind.
    pub source_kind: NavigationSourceKind,
    /// Declared entity type of the navigation source.
    pub declared_type: Option<&'a str>,
    /// Runtime type of the item.
    pub runtime_type: Option<&'a str>,
    /// Projection, only passed for top-level scopes.
    pub select_expand: Option<&'a SelectExpand>,
    /// Trailing segment.
    pub suffix: ContextSuffix,
}

impl<'a> ContextUrlInfo<'a> {
    /// Describes an item of `navigation_source` with the given suffix.
    pub fn new(navigation_source: &'a str, suffix: ContextSuffix) -> Self {
        Self {
            navigation_source,
            source_kind: NavigationSourceKind::EntitySet,
            declared_type: None,
            runtime_type: None,
            select_expand: None,
            suffix,
        }
    }
}

/// Returns the metadata document URL for a service root.
pub fn metadata_document_url(service_root: &str) -> String {
    if service_root.ends_with('/') {
        format!("{service_root}$metadata")
    } else {
        format!("{service_root}/$metadata")
    }
}

/// Builds context URLs for one service.
pub struct ContextUrlBuilder<'a> {
    metadata_url: String,
    dialect: Dialect,
    metadata: &'a dyn ServiceMetadata,
}

impl<'a> ContextUrlBuilder<'a> {
    /// Creates a builder for the service at `service_root`.
    pub fn new(service_root: &str, dialect: Dialect, metadata: &'a dyn ServiceMetadata) -> Self {
        Self {
            metadata_url: metadata_document_url(service_root),
            dialect,
            metadata,
        }
    }

    /// Builds the context URL for a set, entity, delta or link scope.
    ///
    /// `{root}$metadata#{source}({projection})/{suffix}`. Singletons omit
    /// `/$entity`. When the runtime type differs from the declared type and
    /// the model knows a default source for it, that source is used.
    pub fn build(&self, info: &ContextUrlInfo<'_>) -> String {
        let redirected = match (info.runtime_type, info.declared_type) {
            (Some(runtime), Some(declared)) if runtime != declared => {
                self.metadata.default_navigation_source(runtime)
            }
            _ => None,
        };
        let source = redirected.as_deref().unwrap_or(info.navigation_source);

        let projection = info
            .select_expand
            .and_then(|p| p.context_fragment(self.dialect))
            .map(|fragment| format!("({fragment})"))
            .unwrap_or_default();

        let suffix = match (info.suffix, info.source_kind) {
            (ContextSuffix::Entity, NavigationSourceKind::Singleton) if redirected.is_none() => "",
            (suffix, _) => suffix.as_str(),
        };

        format!("{}#{source}{projection}{suffix}", self.metadata_url)
    }

    /// Builds the context URL for a top-level property value of `type_name`.
    pub fn for_type(&self, type_name: &str) -> String {
        format!("{}#{type_name}", self.metadata_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{InMemoryModel, NoMetadata};

    const ROOT: &str = "http://host/service/";

    #[test]
    fn metadata_url_normalizes_slash() {
        assert_eq!(
            metadata_document_url("http://host/service"),
            "http://host/service/$metadata"
        );
        assert_eq!(
            metadata_document_url(ROOT),
            "http://host/service/$metadata"
        );
    }

    #[test]
    fn suffixes() {
        let builder = ContextUrlBuilder::new(ROOT, Dialect::V4, &NoMetadata);
        let cases = [
            (ContextSuffix::None, "http://host/service/$metadata#Customers"),
            (ContextSuffix::Entity, "http://host/service/$metadata#Customers/$entity"),
            (ContextSuffix::Delta, "http://host/service/$metadata#Customers/$delta"),
            (ContextSuffix::Link, "http://host/service/$metadata#Customers/$link"),
            (
                ContextSuffix::DeletedLink,
                "http://host/service/$metadata#Customers/$deletedLink",
            ),
            (
                ContextSuffix::DeletedEntity,
                "http://host/service/$metadata#Customers/$deletedEntity",
            ),
        ];
        for (suffix, expected) in cases {
            assert_eq!(builder.build(&ContextUrlInfo::new("Customers", suffix)), expected);
        }
    }

    #[test]
    fn singleton_omits_entity_suffix() {
        let builder = ContextUrlBuilder::new(ROOT, Dialect::V401, &NoMetadata);
        let info = ContextUrlInfo {
            source_kind: NavigationSourceKind::Singleton,
            ..ContextUrlInfo::new("Me", ContextSuffix::Entity)
        };
        assert_eq!(builder.build(&info), "http://host/service/$metadata#Me");
    }

    #[test]
    fn projection_is_rendered() {
        let projection = SelectExpand::new()
            .select(["Name"])
            .expand("Orders", SelectExpand::new().select(["Id"]));
        let builder = ContextUrlBuilder::new(ROOT, Dialect::V4, &NoMetadata);
        let info = ContextUrlInfo {
            select_expand: Some(&projection),
            ..ContextUrlInfo::new("Customers", ContextSuffix::None)
        };
        assert_eq!(
            builder.build(&info),
            "http://host/service/$metadata#Customers(Name,Orders(Id))"
        );
    }

    #[test]
    fn derived_type_uses_its_default_source() {
        let model = InMemoryModel::new()
            .with_entity_type("NS.Customer", None, &["CustomerID"])
            .with_entity_type("NS.VipCustomer", Some("NS.Customer"), &[])
            .with_entity_type("NS.Gold", Some("NS.Customer"), &[])
            .with_entity_set("Customers", "NS.Customer")
            .with_entity_set("VipCustomers", "NS.VipCustomer");
        let builder = ContextUrlBuilder::new(ROOT, Dialect::V4, &model);

        let info = ContextUrlInfo {
            declared_type: Some("NS.Customer"),
            runtime_type: Some("NS.VipCustomer"),
            ..ContextUrlInfo::new("Customers", ContextSuffix::Entity)
        };
        assert_eq!(
            builder.build(&info),
            "http://host/service/$metadata#VipCustomers/$entity"
        );

        let info = ContextUrlInfo {
            runtime_type: Some("NS.Gold"),
            ..info
        };
        assert_eq!(
            builder.build(&info),
            "http://host/service/$metadata#Customers/$entity"
        );
    }

    #[test]
    fn property_context() {
        let builder = ContextUrlBuilder::new(ROOT, Dialect::V4, &NoMetadata);
        assert_eq!(
            builder.for_type("Edm.String"),
            "http://host/service/$metadata#Edm.String"
        );
    }
}
