//! End-to-end delta payloads over the sample model.

use odelta_model::{DeletedReason, DeletedResource, Dialect, Item, NestedResourceInfo, Resource, ResourceSet};
use odelta_testkit::prelude::*;
use odelta_testkit::GoldenTest;
use odelta_writer::{AsyncODataWriter, WriterError};

const LEGACY_FLAT_DELTA: &str = concat!(
    r#"{"@odata.context":"http://host/service/$metadata#Customers/$delta","#,
    r#""@odata.count":5,"#,
    r#""@odata.deltaLink":"Customers?$expand=Orders&$deltatoken=8015","#,
    r#""value":["#,
    r#"{"@odata.id":"Customers('BOTTM')","ContactName":"Susan Halvenstern"},"#,
    r#"{"@odata.context":"http://host/service/$metadata#Customers/$deletedLink","source":"Customers('ALFKI')","relationship":"Orders","target":"Orders('10643')"},"#,
    r#"{"@odata.context":"http://host/service/$metadata#Customers/$link","source":"Customers('BOTTM')","relationship":"Orders","target":"Orders('10645')"},"#,
    r#"{"@odata.context":"http://host/service/$metadata#Orders/$entity","@odata.id":"Orders(10643)","ShippingAddress":{"Street":"23 Tsawassen Blvd.","City":"Tsawassen","Region":"BC","PostalCode":"T2F 8M4"}},"#,
    r#"{"@odata.context":"http://host/service/$metadata#Customers/$deletedEntity","id":"Customers('ANTON')","reason":"deleted"}"#,
    r#"]}"#,
);

const NEWER_NESTED_DELTA: &str = concat!(
    r#"{"@context":"http://host/service/$metadata#Customers/$entity","#,
    r#""@id":"Customers('BOTTM')","#,
    r#""Orders@delta":["#,
    r#"{"@removed":{"reason":"deleted"},"@id":"Orders(10643)"},"#,
    r#"{"@id":"Orders(10645)","Amount":12}"#,
    r#"]}"#,
);

#[test]
fn legacy_flat_delta_is_exact() {
    assert_eq!(scenarios::flat_delta(Dialect::V4).unwrap(), LEGACY_FLAT_DELTA);
}

#[test]
fn newer_flat_delta_matches_golden() {
    let json = scenarios::flat_delta(Dialect::V401).unwrap();
    GoldenTest::with_default_dir("flat_delta_v401").assert_text("json", &json);
    let set_keys = json.find("\"@count\":5").zip(json.find("\"@deltaLink\"")).zip(json.find("\"value\""));
    let ((count, delta_link), value) = set_keys.unwrap();
    assert!(count < delta_link && delta_link < value);
}

#[test]
fn newer_nested_delta_is_exact() {
    assert_eq!(scenarios::nested_delta(Dialect::V401).unwrap(), NEWER_NESTED_DELTA);
}

#[test]
fn legacy_dialect_rejects_nested_delta() {
    let err = scenarios::nested_delta(Dialect::V4).unwrap_err();
    assert!(matches!(err, WriterError::NestedContentInLegacyDelta { ref name } if name == "Orders"));
}

#[test]
fn legacy_deleted_entry_stays_flat() {
    let json = render(response_settings(Dialect::V4), |writer| {
        writer.begin(Item::DeltaResourceSet(ResourceSet::new().with_serialization_info(orders())))?;
        writer.begin(DeletedResource::new(None).with_property("Id", 10643i64))?;
        writer.end()?;
        writer.end()
    })
    .unwrap();
    assert_eq!(
        json,
        r#"{"@odata.context":"http://host/service/$metadata#Orders/$delta","value":[{"@odata.context":"http://host/service/$metadata#Orders/$deletedEntity","id":"Orders(10643)"}]}"#
    );
}

#[test]
fn newer_deleted_resource_from_other_source_carries_context() {
    let json = render(response_settings(Dialect::V401), |writer| {
        writer.begin(Item::DeltaResourceSet(ResourceSet::new().with_serialization_info(customers())))?;
        writer.begin(
            DeletedResource::new(Some(DeletedReason::Changed))
                .with_id("Orders(1)")
                .with_serialization_info(orders()),
        )?;
        writer.end()?;
        writer.end()
    })
    .unwrap();
    assert_eq!(
        json,
        r#"{"@context":"http://host/service/$metadata#Customers/$delta","value":[{"@removed":{"reason":"changed"},"@context":"http://host/service/$metadata#Orders/$deletedEntity","@id":"Orders(1)"}]}"#
    );
}

#[test]
fn typed_member_from_other_source_is_checked_against_its_own_source() {
    let json = render(response_settings(Dialect::V4), |writer| {
        writer.begin(Item::DeltaResourceSet(ResourceSet::new().with_serialization_info(customers())))?;
        writer.begin(
            Resource::new()
                .with_id("Orders(10643)")
                .with_type_name("NS.Order")
                .with_serialization_info(orders()),
        )?;
        writer.end()?;
        writer.end()
    })
    .unwrap();
    assert_eq!(
        json,
        r#"{"@odata.context":"http://host/service/$metadata#Customers/$delta","value":[{"@odata.context":"http://host/service/$metadata#Orders/$entity","@odata.id":"Orders(10643)"}]}"#
    );

    let err = render(response_settings(Dialect::V4), |writer| {
        writer.begin(Item::DeltaResourceSet(ResourceSet::new().with_serialization_info(customers())))?;
        writer.begin(
            Resource::new()
                .with_id("Orders(10643)")
                .with_type_name("NS.Customer")
                .with_serialization_info(orders()),
        )
    })
    .unwrap_err();
    assert!(matches!(
        err,
        WriterError::IncompatibleTypes { ref actual, ref expected } if actual == "NS.Customer" && expected == "NS.Order"
    ));
}

#[test]
fn newer_deleted_resource_as_navigation_content() {
    let json = render(response_settings(Dialect::V401), |writer| {
        writer.begin(Resource::new().with_id("Orders(1)").with_serialization_info(orders()))?;
        writer.begin(NestedResourceInfo::single("Customer"))?;
        writer.begin(DeletedResource::new(Some(DeletedReason::Deleted)).with_id("Customers('ALFKI')"))?;
        writer.end()?;
        writer.end()?;
        writer.end()
    })
    .unwrap();
    assert_eq!(
        json,
        r#"{"@context":"http://host/service/$metadata#Orders/$entity","@id":"Orders(1)","Customer":{"@removed":{"reason":"deleted"},"@id":"Customers('ALFKI')"}}"#
    );
}

#[test]
fn legacy_deleted_resource_as_navigation_content_is_rejected() {
    let err = render(response_settings(Dialect::V4), |writer| {
        writer.begin(Resource::new().with_id("Orders(1)").with_serialization_info(orders()))?;
        writer.begin(NestedResourceInfo::single("Customer"))?;
        writer.begin(DeletedResource::new(Some(DeletedReason::Deleted)).with_id("Customers('ALFKI')"))
    })
    .unwrap_err();
    assert!(matches!(err, WriterError::NestedContentInLegacyDelta { ref name } if name == "Customer"));
}

#[tokio::test]
async fn async_writer_matches_blocking_writer() {
    let mut writer = AsyncODataWriter::with_metadata(
        Vec::new(),
        response_settings(Dialect::V401).buffer_size(8),
        shared_model(),
    );
    writer
        .begin(Resource::new().with_id("Customers('BOTTM')").with_serialization_info(customers()))
        .await
        .unwrap();
    writer.begin(NestedResourceInfo::collection("Orders")).await.unwrap();
    writer.begin(Item::DeltaResourceSet(ResourceSet::new())).await.unwrap();
    writer
        .begin(DeletedResource::new(Some(DeletedReason::Deleted)).with_id("Orders(10643)"))
        .await
        .unwrap();
    writer.end().await.unwrap();
    writer
        .begin(Resource::new().with_id("Orders(10645)").with_property("Amount", 12i64))
        .await
        .unwrap();
    for _ in 0..4 {
        writer.end().await.unwrap();
    }
    let bytes = writer.into_inner().await.unwrap();
    assert_eq!(String::from_utf8(bytes).unwrap(), NEWER_NESTED_DELTA);
}
