//! Annotations command implementation.

use super::UsageError;
use odelta_model::{Annotation, Dialect};
use serde::Serialize;

/// One row of the resolver table.
#[derive(Debug, Serialize)]
pub struct AnnotationRow {
    /// Concept name.
    pub term: &'static str,
    /// Wire key, or `None` when the dialect has no key for the concept.
    pub key: Option<&'static str>,
}

/// Resolves every reserved annotation for `dialect`.
pub fn table(dialect: Dialect) -> Vec<AnnotationRow> {
    Annotation::ALL
        .into_iter()
        .map(|annotation| AnnotationRow {
            term: annotation.term(),
            key: annotation.resolve(dialect),
        })
        .collect()
}

/// Runs the annotations command.
pub fn run(dialect: Dialect, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let rows = table(dialect);
    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&rows)?),
        "text" => {
            println!("Reserved annotations ({dialect})");
            for row in &rows {
                println!("  {:<18} {}", row.term, row.key.unwrap_or("-"));
            }
        }
        other => return Err(UsageError::Format(other.to_string()).into()),
    }
    Ok(())
}
