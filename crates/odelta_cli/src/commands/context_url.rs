//! Context-url command implementation.

use super::UsageError;
use odelta_model::{
    ContextSuffix, ContextUrlBuilder, ContextUrlInfo, Dialect, NavigationSourceKind, NoMetadata,
    SelectExpand,
};

fn parse_kind(kind: &str) -> Result<NavigationSourceKind, UsageError> {
    match kind {
        "entity-set" => Ok(NavigationSourceKind::EntitySet),
        "singleton" => Ok(NavigationSourceKind::Singleton),
        "contained" => Ok(NavigationSourceKind::ContainedEntitySet),
        other => Err(UsageError::SourceKind(other.to_string())),
    }
}

fn parse_suffix(suffix: &str) -> Result<ContextSuffix, UsageError> {
    match suffix {
        "none" => Ok(ContextSuffix::None),
        "entity" => Ok(ContextSuffix::Entity),
        "delta" => Ok(ContextSuffix::Delta),
        "link" => Ok(ContextSuffix::Link),
        "deleted-link" => Ok(ContextSuffix::DeletedLink),
        "deleted-entity" => Ok(ContextSuffix::DeletedEntity),
        other => Err(UsageError::Suffix(other.to_string())),
    }
}

/// Computes a context URL without service metadata.
pub fn compute(
    root: &str,
    dialect: Dialect,
    source: &str,
    kind: &str,
    suffix: &str,
    select: &[String],
) -> Result<String, UsageError> {
    let projection = (!select.is_empty()).then(|| SelectExpand::new().select(select.iter().cloned()));
    let info = ContextUrlInfo {
        source_kind: parse_kind(kind)?,
        select_expand: projection.as_ref(),
        ..ContextUrlInfo::new(source, parse_suffix(suffix)?)
    };
    Ok(ContextUrlBuilder::new(root, dialect, &NoMetadata).build(&info))
}

/// Runs the context-url command.
pub fn run(
    root: &str,
    dialect: Dialect,
    source: &str,
    kind: &str,
    suffix: &str,
    select: &[String],
) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", compute(root, dialect, source, kind, suffix, select)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delta_set_url() {
        let url = compute("http://host/service", Dialect::V4, "Customers", "entity-set", "delta", &[]).unwrap();
        assert_eq!(url, "http://host/service/$metadata#Customers/$delta");
    }

    #[test]
    fn singleton_with_selection() {
        let select = vec!["Name".to_string()];
        let url = compute("http://host/service/", Dialect::V401, "Me", "singleton", "entity", &select).unwrap();
        assert_eq!(url, "http://host/service/$metadata#Me(Name)");
    }

    #[test]
    fn unknown_kind() {
        assert!(matches!(
            compute("http://host/", Dialect::V4, "X", "view", "none", &[]),
            Err(UsageError::SourceKind(_))
        ));
    }
}
