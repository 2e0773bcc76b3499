//! Payload writer benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use odelta_codec::Value;
use odelta_model::{Dialect, Item, NestedResourceInfo, Resource, ResourceSet};
use odelta_testkit::{customers, render, response_settings, scenarios};
use odelta_writer::ODataWriter;
use std::io::{self, Write};

/// Create a customer with a handful of properties.
fn customer(i: usize) -> Resource {
    Resource::new()
        .with_id(format!("Customers('C{i:05}')"))
        .with_property("CustomerID", format!("C{i:05}"))
        .with_property("ContactName", "Susan Halvenstern")
        .with_property("Rank", i64::try_from(i).unwrap_or(i64::MAX))
        .with_property(
            "Address",
            Value::complex([
                ("Street", Value::from("23 Tsawassen Blvd.")),
                ("City", Value::from("Tsawassen")),
            ]),
        )
}

/// Benchmark the built-in scenarios in both dialects.
fn bench_scenarios(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenario");

    for dialect in Dialect::ALL {
        group.bench_with_input(BenchmarkId::new("flat_delta", dialect), &dialect, |b, &dialect| {
            b.iter(|| black_box(scenarios::flat_delta(dialect).unwrap()));
        });
    }

    group.bench_function("nested_delta", |b| {
        b.iter(|| black_box(scenarios::nested_delta(Dialect::V401).unwrap()));
    });

    group.finish();
}

/// Benchmark delta sets of growing size into a discarding sink.
fn bench_delta_sets(c: &mut Criterion) {
    let mut group = c.benchmark_group("delta_set");

    for size in [10usize, 100, 1000] {
        let resources: Vec<Resource> = (0..size).map(customer).collect();
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &resources, |b, resources| {
            b.iter(|| {
                let mut writer = ODataWriter::with_metadata(
                    io::sink(),
                    response_settings(Dialect::V401),
                    odelta_testkit::shared_model(),
                );
                let set = ResourceSet::new().with_serialization_info(customers());
                writer.begin(Item::DeltaResourceSet(set)).unwrap();
                for resource in resources {
                    writer.begin(resource.clone()).unwrap();
                    writer.end().unwrap();
                }
                writer.end().unwrap();
                black_box(writer.into_inner().unwrap());
            });
        });
    }

    group.finish();
}

/// Benchmark expanded navigation properties.
fn bench_expanded(c: &mut Criterion) {
    c.bench_function("expanded_orders", |b| {
        b.iter(|| {
            let json = render(response_settings(Dialect::V4), |writer| {
                writer.begin(customer(1).with_serialization_info(customers()))?;
                writer.begin(NestedResourceInfo::collection("Orders"))?;
                writer.begin(Item::ResourceSet(ResourceSet::new()))?;
                for id in 0..20i64 {
                    writer.begin(Resource::new().with_property("Id", id))?;
                    writer.end()?;
                }
                writer.end()?;
                writer.end()?;
                writer.end()
            })
            .unwrap();
            black_box(json);
        });
    });
}

/// Benchmark base64 streaming of a binary property.
fn bench_binary_stream(c: &mut Criterion) {
    let payload = vec![0xA5u8; 64 * 1024];
    let mut group = c.benchmark_group("stream");
    group.throughput(Throughput::Bytes(payload.len() as u64));
    group.bench_function("binary_64k", |b| {
        b.iter(|| {
            let mut writer = ODataWriter::new(io::sink(), response_settings(Dialect::V401));
            writer.begin(Resource::new()).unwrap();
            writer.begin(odelta_model::PropertyInfo::new("Photo")).unwrap();
            let mut stream = writer.create_stream().unwrap();
            for chunk in payload.chunks(1000) {
                stream.write_all(black_box(chunk)).unwrap();
            }
            stream.finish().unwrap();
            writer.end().unwrap();
            writer.end().unwrap();
        });
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_scenarios,
    bench_delta_sets,
    bench_expanded,
    bench_binary_stream
);
criterion_main!(benches);
