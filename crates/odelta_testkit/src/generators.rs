//! Property-based test generators using proptest.
//!
//! Provides strategies for generating payload items that respect the
//! writer's invariants (unique property names, valid identifiers).

use odelta_batch::HttpMethod;
use odelta_model::{Dialect, Direction, Resource, Value};
use proptest::prelude::*;
use std::collections::BTreeMap;

/// Strategy for either dialect.
pub fn dialect_strategy() -> impl Strategy<Value = Dialect> {
    prop_oneof![Just(Dialect::V4), Just(Dialect::V401)]
}

/// Strategy for either direction.
pub fn direction_strategy() -> impl Strategy<Value = Direction> {
    prop_oneof![Just(Direction::Request), Just(Direction::Response)]
}

/// Strategy for property names: identifiers that never contain `@`.
pub fn property_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Z][A-Za-z0-9_]{0,15}").expect("Invalid regex")
}

/// Strategy for values usable in a key predicate.
pub fn key_value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<i64>().prop_map(Value::Integer),
        any::<bool>().prop_map(Value::Bool),
        ".{0,12}".prop_map(Value::Text),
    ]
}

/// Strategy for primitive property values.
pub fn primitive_value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Integer),
        (-1.0e9f64..1.0e9).prop_map(Value::Double),
        ".{0,24}".prop_map(Value::Text),
        prop::collection::vec(any::<u8>(), 0..16).prop_map(Value::Binary),
    ]
}

/// Strategy for resources with distinct property names and an optional id.
pub fn resource_strategy() -> impl Strategy<Value = Resource> {
    (
        prop::option::of("Customers\\('[A-Z]{5}'\\)"),
        prop::collection::btree_map(property_name_strategy(), primitive_value_strategy(), 0..6),
    )
        .prop_map(|(id, properties): (Option<String>, BTreeMap<String, Value>)| {
            let mut resource = Resource::new();
            resource.id = id;
            for (name, value) in properties {
                resource = resource.with_property(name, value);
            }
            resource
        })
}

/// One top-level part of a generated request batch.
#[derive(Debug, Clone)]
pub enum BatchPart {
    /// A standalone operation.
    Operation(HttpMethod),
    /// A changeset with the given number of operations.
    Changeset(usize),
}

/// Strategy for request batch layouts.
pub fn batch_layout_strategy(max_parts: usize) -> impl Strategy<Value = Vec<BatchPart>> {
    let part = prop_oneof![
        prop_oneof![
            Just(HttpMethod::Get),
            Just(HttpMethod::Post),
            Just(HttpMethod::Patch),
            Just(HttpMethod::Delete),
        ]
        .prop_map(BatchPart::Operation),
        (0usize..5).prop_map(BatchPart::Changeset),
    ];
    prop::collection::vec(part, 0..max_parts)
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}
