//! # odelta Testkit
//!
//! Test utilities for odelta.
//!
//! This crate provides:
//! - The sample customers/orders service model and writer helpers
//! - Named payload and batch scenarios shared with the CLI and benchmarks
//! - Property-based test generators using proptest
//! - Golden file helpers
//! - Hand-written annotation and context-URL vectors
//!
//! ## Usage
//!
//! ```rust
//! use odelta_model::Dialect;
//! use odelta_testkit::prelude::*;
//!
//! let json = scenarios::nested_delta(Dialect::V401).unwrap();
//! assert!(json.contains("\"Orders@delta\":["));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod golden;
pub mod vectors;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::vectors::*;
}

pub use fixtures::*;
pub use generators::*;
pub use golden::*;
pub use vectors::*;
