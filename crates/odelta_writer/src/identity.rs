//! Resource identity derivation.

use odelta_model::Property;

/// Derives a resource identity from its navigation source and key values.
///
/// A single key gives `Customers('ALFKI')`; composite keys give
/// `OrderLines(OrderId=1,Line=2)`. Returns `None` when `keys` is empty or
/// any key is missing or cannot be written as a key literal.
pub fn derive_identity(source: &str, keys: &[String], properties: &[Property]) -> Option<String> {
    if keys.is_empty() {
        return None;
    }
    let mut literals = Vec::with_capacity(keys.len());
    for key in keys {
        let property = properties.iter().find(|p| &p.name == key)?;
        literals.push(property.value.to_key_literal()?);
    }
    let segment = if keys.len() == 1 {
        literals.remove(0)
    } else {
        keys.iter()
            .zip(literals)
            .map(|(key, literal)| format!("{key}={literal}"))
            .collect::<Vec<_>>()
            .join(",")
    };
    Some(format!("{source}({segment})"))
}
