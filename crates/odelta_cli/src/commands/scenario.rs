//! Scenario command implementation.

use super::UsageError;
use odelta_model::Dialect;
use odelta_testkit::scenarios;
use tracing::debug;

/// Renders a named scenario.
pub fn render(name: &str, dialect: Dialect, boundary_token: &str) -> Result<String, Box<dyn std::error::Error>> {
    debug!(name, %dialect, "rendering scenario");
    let text = match name {
        "delta" => scenarios::flat_delta(dialect)?,
        "nested-delta" => scenarios::nested_delta(dialect)?,
        "batch" => scenarios::batch(boundary_token)?,
        other => return Err(UsageError::Scenario(other.to_string()).into()),
    };
    Ok(text)
}

/// Runs the scenario command.
pub fn run(name: &str, dialect: Dialect, boundary_token: &str) -> Result<(), Box<dyn std::error::Error>> {
    let text = render(name, dialect, boundary_token)?;
    if text.ends_with('\n') {
        print!("{text}");
    } else {
        println!("{text}");
    }
    Ok(())
}
