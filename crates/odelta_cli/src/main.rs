//! odelta CLI
//!
//! Command-line tools for inspecting odelta's wire naming and rendering
//! sample payloads.
//!
//! # Commands
//!
//! - `annotations` - Print the reserved annotation table for a dialect
//! - `context-url` - Compute a context URL
//! - `scenario` - Render a built-in delta or batch scenario
//! - `version` - Show version information

mod commands;

use clap::{Parser, Subcommand};
use odelta_model::Dialect;
use tracing_subscriber::EnvFilter;

/// odelta command-line tools.
#[derive(Parser)]
#[command(name = "odelta")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the reserved annotation table
    Annotations {
        /// Protocol dialect (4.0, 4.01)
        #[arg(short, long, default_value = "4.01")]
        dialect: Dialect,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Compute a context URL
    ContextUrl {
        /// Navigation source name
        #[arg(short, long)]
        source: String,

        /// Navigation source kind (entity-set, singleton, contained)
        #[arg(short, long, default_value = "entity-set")]
        kind: String,

        /// Trailing segment (none, entity, delta, link, deleted-link, deleted-entity)
        #[arg(long, default_value = "none")]
        suffix: String,

        /// Service root URL
        #[arg(short, long, default_value = odelta_testkit::SERVICE_ROOT)]
        root: String,

        /// Selected properties, comma separated
        #[arg(long, value_delimiter = ',')]
        select: Vec<String>,

        /// Protocol dialect (4.0, 4.01)
        #[arg(short, long, default_value = "4.01")]
        dialect: Dialect,
    },

    /// Render a built-in scenario (delta, nested-delta, batch)
    Scenario {
        /// Scenario name
        name: String,

        /// Protocol dialect (4.0, 4.01)
        #[arg(short, long, default_value = "4.01")]
        dialect: Dialect,

        /// Batch boundary token
        #[arg(long, default_value = "odelta")]
        boundary: String,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Annotations { dialect, format } => {
            commands::annotations::run(dialect, &format)?;
        }
        Commands::ContextUrl {
            source,
            kind,
            suffix,
            root,
            select,
            dialect,
        } => {
            commands::context_url::run(&root, dialect, &source, &kind, &suffix, &select)?;
        }
        Commands::Scenario {
            name,
            dialect,
            boundary,
        } => {
            commands::scenario::run(&name, dialect, &boundary)?;
        }
        Commands::Version => {
            println!("odelta CLI v{}", env!("CARGO_PKG_VERSION"));
            let dialects: Vec<&str> = Dialect::ALL.iter().map(|d| d.as_str()).collect();
            println!("Dialects: {}", dialects.join(", "));
        }
    }

    Ok(())
}
