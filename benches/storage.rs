//! Output benchmark: atomic snapshot DB and JSONL writes.

use chrono::{TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use defi_sentinel::event::{Kind, Protocol, Source};
use defi_sentinel::storage::{write_jsonl, OutputWriter};
use defi_sentinel::{FeatureRow, FeatureSnapshot};
use tempfile::tempdir;

fn snapshot() -> FeatureSnapshot {
    let as_of = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    let rows = [Protocol::AaveV3, Protocol::UniswapV3, Protocol::General]
        .into_iter()
        .map(|protocol| FeatureRow {
            protocol,
            source: Source::Onchain,
            kind: Kind::ProtocolEvent,
            count_1h: 12,
            count_24h: 48,
            count_7d: 300,
            expected_1h: 2.0,
            surge_ratio: 13.0 / 3.0,
            as_of,
        })
        .collect();
    FeatureSnapshot { as_of, rows }
}

fn bench_write_features(c: &mut Criterion) {
    let dir = tempdir().unwrap();
    let writer = OutputWriter::create(dir.path()).unwrap();
    let snapshot = snapshot();

    c.bench_function("storage_write_features", |b| {
        b.iter(|| black_box(writer.write_features(&snapshot, &snapshot.rows, "0.1")).unwrap())
    });
}

fn bench_write_jsonl(c: &mut Criterion) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("rows.jsonl");
    let rows: Vec<FeatureRow> = snapshot().rows.into_iter().cycle().take(1_000).collect();

    c.bench_function("storage_write_jsonl_1k_rows", |b| {
        b.iter(|| black_box(write_jsonl(&path, &rows)).unwrap())
    });
}

criterion_group!(benches, bench_write_features, bench_write_jsonl);
criterion_main!(benches);
