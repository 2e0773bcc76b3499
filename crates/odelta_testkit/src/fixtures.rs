//! Test fixtures and writer helpers.
//!
//! Provides the sample service model used across the workspace tests and
//! convenience functions for rendering payloads into strings.

use odelta_model::{Dialect, Direction, InMemoryModel, SerializationInfo, WriterSettings};
use odelta_writer::{ODataWriter, SharedMetadata, WriterResult};
use std::sync::Arc;

/// Service root used by every fixture.
pub const SERVICE_ROOT: &str = "http://host/service/";

/// The sample model: customers with orders.
///
/// - `NS.Customer` keyed by `CustomerID`, derived `NS.VipCustomer`
/// - `NS.Order` keyed by `Id`
/// - entity sets `Customers` and `Orders`, singleton `Me`
/// - navigations `Customer.Orders` (collection) and `Order.Customer`
pub fn northwind_model() -> InMemoryModel {
    InMemoryModel::new()
        .with_entity_type("NS.Customer", None, &["CustomerID"])
        .with_entity_type("NS.VipCustomer", Some("NS.Customer"), &[])
        .with_entity_type("NS.Order", None, &["Id"])
        .with_entity_set("Customers", "NS.Customer")
        .with_entity_set("Orders", "NS.Order")
        .with_singleton("Me", "NS.Customer")
        .with_navigation("NS.Customer", "Orders", "NS.Order", Some("Orders"), true)
        .with_navigation("NS.Order", "Customer", "NS.Customer", Some("Customers"), false)
}

/// The sample model behind a shared handle.
pub fn shared_model() -> SharedMetadata {
    Arc::new(northwind_model())
}

/// Serialization hints for the `Customers` set.
pub fn customers() -> SerializationInfo {
    SerializationInfo::entity_set("Customers", "NS.Customer")
}

/// Serialization hints for the `Orders` set.
pub fn orders() -> SerializationInfo {
    SerializationInfo::entity_set("Orders", "NS.Order")
}

/// Response settings rooted at [`SERVICE_ROOT`].
pub fn response_settings(dialect: Dialect) -> WriterSettings {
    WriterSettings::new()
        .dialect(dialect)
        .direction(Direction::Response)
        .service_root(SERVICE_ROOT)
}

/// Request settings rooted at [`SERVICE_ROOT`].
pub fn request_settings(dialect: Dialect) -> WriterSettings {
    response_settings(dialect).direction(Direction::Request)
}

/// Runs `f` against a writer over the sample model and returns the text
/// it produced.
///
/// # Example
///
/// ```rust
/// use odelta_model::{Dialect, Resource};
/// use odelta_testkit::{render, response_settings};
///
/// let json = render(response_settings(Dialect::V401), |writer| {
///     writer.begin(Resource::new().with_property("Name", "x"))?;
///     writer.end()
/// })
/// .unwrap();
/// assert_eq!(json, r#"{"Name":"x"}"#);
/// ```
pub fn render<F>(settings: WriterSettings, f: F) -> WriterResult<String>
where
    F: FnOnce(&mut ODataWriter<Vec<u8>>) -> WriterResult<()>,
{
    let mut writer = ODataWriter::with_metadata(Vec::new(), settings, shared_model());
    f(&mut writer)?;
    let bytes = writer.into_inner()?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Named payload scenarios shared by tests, benchmarks and the CLI.
pub mod scenarios {
    use super::*;
    use odelta_batch::{BatchResult, BatchSettings, BatchWriter, HttpMethod, UriOption};
    use odelta_model::{
        DeletedReason, DeletedResource, DeltaDeletedLink, DeltaLink, Item, NestedResourceInfo,
        Resource, ResourceSet, Value,
    };

    /// Delta link of the flat delta scenario.
    pub const DELTA_LINK: &str = "Customers?$expand=Orders&$deltatoken=8015";

    /// Writes the flat delta scenario: a changed customer, a removed and an
    /// added link, an order from another set and a deleted customer.
    pub fn write_flat_delta<W: std::io::Write>(writer: &mut ODataWriter<W>) -> WriterResult<()> {
        let set = ResourceSet::new()
            .with_count(5)
            .with_delta_link(DELTA_LINK)?
            .with_serialization_info(customers());
        writer.begin(Item::DeltaResourceSet(set))?;

        writer.begin(
            Resource::new()
                .with_id("Customers('BOTTM')")
                .with_property("ContactName", "Susan Halvenstern"),
        )?;
        writer.end()?;

        writer.write_deleted_link(&DeltaDeletedLink::new(
            "Customers('ALFKI')",
            "Orders",
            "Orders('10643')",
        ))?;
        writer.write_link(&DeltaLink::new("Customers('BOTTM')", "Orders", "Orders('10645')"))?;

        let address = Value::complex([
            ("Street", Value::from("23 Tsawassen Blvd.")),
            ("City", Value::from("Tsawassen")),
            ("Region", Value::from("BC")),
            ("PostalCode", Value::from("T2F 8M4")),
        ]);
        writer.begin(
            Resource::new()
                .with_id("Orders(10643)")
                .with_property("ShippingAddress", address)
                .with_serialization_info(orders()),
        )?;
        writer.end()?;

        writer.begin(DeletedResource::new(Some(DeletedReason::Deleted)).with_id("Customers('ANTON')"))?;
        writer.end()?;

        writer.end()
    }

    /// Renders the flat delta scenario.
    pub fn flat_delta(dialect: Dialect) -> WriterResult<String> {
        render(response_settings(dialect), write_flat_delta)
    }

    /// Writes a customer whose orders are a nested delta set holding one
    /// removed and one changed order.
    pub fn write_nested_delta<W: std::io::Write>(writer: &mut ODataWriter<W>) -> WriterResult<()> {
        writer.begin(
            Resource::new()
                .with_id("Customers('BOTTM')")
                .with_serialization_info(customers()),
        )?;
        writer.begin(NestedResourceInfo::collection("Orders"))?;
        writer.begin(Item::DeltaResourceSet(ResourceSet::new()))?;

        writer.begin(DeletedResource::new(Some(DeletedReason::Deleted)).with_id("Orders(10643)"))?;
        writer.end()?;
        writer.begin(Resource::new().with_id("Orders(10645)").with_property("Amount", 12i64))?;
        writer.end()?;

        writer.end()?;
        writer.end()?;
        writer.end()
    }

    /// Renders the nested delta scenario.
    pub fn nested_delta(dialect: Dialect) -> WriterResult<String> {
        render(response_settings(dialect), write_nested_delta)
    }

    /// Renders a request batch: a changeset creating a customer and one of
    /// its orders by reference, followed by a standalone query.
    pub fn batch(boundary_token: &str) -> BatchResult<String> {
        let settings = BatchSettings::new()
            .with_base_uri(SERVICE_ROOT)
            .with_boundary_token(boundary_token);
        let mut batch = BatchWriter::new(Vec::new(), settings);
        batch.begin_batch()?;

        batch.begin_changeset()?;
        batch.create_operation_request_message(
            HttpMethod::Post,
            "Customers",
            Some("1"),
            UriOption::AbsoluteUri,
            &[],
        )?;
        batch.set_operation_header("Content-Type", "application/json")?;
        let mut body = batch.operation_body()?;
        let mut writer = body.payload_writer(request_settings(Dialect::V401));
        writer.begin(Resource::new().with_property("CustomerID", "NEWCO"))?;
        writer.end()?;
        drop(writer);
        body.finish()?;

        batch.create_operation_request_message(
            HttpMethod::Post,
            "$1/Orders",
            Some("2"),
            UriOption::AbsoluteUri,
            &["1"],
        )?;
        batch.set_operation_header("Content-Type", "application/json")?;
        let mut body = batch.operation_body()?;
        let mut writer = body.payload_writer(request_settings(Dialect::V401));
        writer.begin(Resource::new().with_property("Amount", 12i64))?;
        writer.end()?;
        drop(writer);
        body.finish()?;
        batch.end_changeset()?;

        batch.create_operation_request_message(
            HttpMethod::Get,
            "Customers('NEWCO')?$expand=Orders",
            None,
            UriOption::AbsoluteResourcePathAndHost,
            &[],
        )?;
        batch.end_batch()?;

        Ok(String::from_utf8_lossy(&batch.into_inner()).into_owned())
    }
}
