//! Benchmarks for snapshot import, rollback and export.
//!
//! Sites are cloned per iteration so every run starts from the same state.

// Criterion macros generate items without docs - this is expected for benchmarks
#![allow(missing_docs)]
#![allow(clippy::expect_used, clippy::unwrap_used, clippy::print_stderr)]

use criterion::{BatchSize, BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;

use field_snapshots::{
    EventLog, ExportRequest, ExportService, FieldDescriptor, FieldGroup, Importer, PostId,
    SiteStore, TargetContext,
};
use serde_json::{Map, Value, json};

const FIELDS: [&str; 4] = ["headline", "summary", "rating", "tags"];

fn post(id: u64) -> PostId {
    PostId::new(id).unwrap()
}

/// Site with `posts` posts, each holding every field.
fn build_site(posts: u64) -> SiteStore {
    let mut site = SiteStore::new();
    site.add_field_group(FieldGroup::new(
        "g",
        FIELDS
            .iter()
            .map(|name| FieldDescriptor::plain(*name, "text"))
            .collect(),
    ));
    for id in 1..=posts {
        site.add_post(post(id), "post");
        for name in FIELDS {
            site.set_value(name, TargetContext::Post(post(id)), json!(format!("{name} {id}")));
        }
    }
    site
}

/// Snapshot updating every field of posts `1..=posts`, plus one missing
/// post at the end when `fail` is set.
fn build_snapshot(posts: u64, fail: bool) -> String {
    let mut group = Map::new();
    for name in FIELDS {
        let mut values: Map<String, Value> = (1..=posts)
            .map(|id| (id.to_string(), json!(format!("updated {name} {id}"))))
            .collect();
        if fail && name == FIELDS[FIELDS.len() - 1] {
            values.insert((posts + 1).to_string(), json!("missing"));
        }
        group.insert(name.to_string(), json!({ "post_types": { "post": values } }));
    }
    json!({ "g": group }).to_string()
}

fn bench_import(c: &mut Criterion) {
    let mut group = c.benchmark_group("import");

    for posts in [10u64, 100, 1000] {
        let site = build_site(posts);
        let snapshot = build_snapshot(posts, false);
        group.throughput(Throughput::Elements(posts * FIELDS.len() as u64));

        group.bench_with_input(BenchmarkId::new("apply", posts), &snapshot, |b, snapshot| {
            b.iter_batched(
                || site.clone(),
                |mut site| {
                    let mut importer = Importer::new(&mut site, EventLog::new());
                    black_box(importer.import_field_data(black_box(snapshot), true))
                },
                BatchSize::LargeInput,
            );
        });

        let failing = build_snapshot(posts, true);
        group.bench_with_input(BenchmarkId::new("rollback", posts), &failing, |b, snapshot| {
            b.iter_batched(
                || site.clone(),
                |mut site| {
                    let mut importer = Importer::new(&mut site, EventLog::new());
                    black_box(importer.import_field_data(black_box(snapshot), true))
                },
                BatchSize::LargeInput,
            );
        });
    }

    group.finish();
}

fn bench_unchanged(c: &mut Criterion) {
    let mut group = c.benchmark_group("import_unchanged");

    for posts in [10u64, 100, 1000] {
        let site = build_site(posts);
        let ids: Vec<PostId> = (1..=posts).map(post).collect();
        let snapshot = ExportService::new(&site)
            .export(&ExportRequest::new(["g"]).with_posts("post", ids))
            .unwrap()
            .to_json_pretty()
            .unwrap();

        group.bench_with_input(BenchmarkId::new("skip", posts), &snapshot, |b, snapshot| {
            b.iter_batched(
                || site.clone(),
                |mut site| {
                    let mut importer = Importer::new(&mut site, EventLog::new());
                    black_box(importer.import_field_data(black_box(snapshot), true))
                },
                BatchSize::LargeInput,
            );
        });
    }

    group.finish();
}

fn bench_export(c: &mut Criterion) {
    let mut group = c.benchmark_group("export");

    for posts in [10u64, 100, 1000] {
        let site = build_site(posts);
        let request = ExportRequest::new(["g"]).with_posts("post", (1..=posts).map(post));

        group.bench_with_input(BenchmarkId::new("posts", posts), &request, |b, request| {
            b.iter(|| ExportService::new(&site).export(black_box(request)).unwrap());
        });
    }

    group.finish();
}

criterion_group!(benches, bench_import, bench_unchanged, bench_export);
criterion_main!(benches);
