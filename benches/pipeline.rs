//! Pipeline benchmark: store load → windowed aggregation → surge detection.

use chrono::{Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use defi_sentinel::anomaly::find_anomalies;
use defi_sentinel::event::{GroupKey, Kind, Protocol, Source};
use defi_sentinel::features::{compute_features, EventStore};
use defi_sentinel::Normalizer;
use defi_sentinel::SCHEMA_V0_1;

const GROUPS: [GroupKey; 3] = [
    GroupKey {
        protocol: Protocol::AaveV3,
        source: Source::Onchain,
        kind: Kind::ProtocolEvent,
    },
    GroupKey {
        protocol: Protocol::UniswapV3,
        source: Source::Onchain,
        kind: Kind::ProtocolEvent,
    },
    GroupKey {
        protocol: Protocol::General,
        source: Source::Offchain,
        kind: Kind::Advisory,
    },
];

/// `n` events spread over eight days, one per minute, round-robin across groups.
fn make_store(n: usize) -> EventStore {
    let start = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
    let mut store = EventStore::new();
    for i in 0..n {
        store.insert_at(GROUPS[i % GROUPS.len()], start + Duration::minutes(i as i64));
    }
    store
}

fn bench_aggregation(c: &mut Criterion) {
    let store = make_store(12_000);
    c.bench_function("compute_features_12k_events", |b| {
        b.iter(|| black_box(compute_features(black_box(&store))))
    });
}

fn bench_aggregate_and_detect(c: &mut Criterion) {
    let store = make_store(12_000);
    c.bench_function("compute_and_detect_12k_events", |b| {
        b.iter(|| {
            let snapshot = compute_features(&store).unwrap();
            black_box(find_anomalies(&snapshot.rows))
        })
    });
}

fn bench_normalize_line(c: &mut Criterion) {
    let normalizer = Normalizer::new(&SCHEMA_V0_1);
    let line = r#"{"event_id":"offchain:general:advisory:a1","source":"offchain","kind":"advisory","protocol":"general","event_time":"2024-05-01T10:00:00Z","title":"Advisory","source_url":"https://example.org/a1"}"#;
    c.bench_function("normalize_and_validate_line", |b| {
        b.iter(|| {
            let fields = normalizer.normalize_line(black_box(line)).unwrap();
            black_box(defi_sentinel::CanonicalEvent::validate(&fields))
        })
    });
}

criterion_group!(benches, bench_aggregation, bench_aggregate_and_detect, bench_normalize_line);
criterion_main!(benches);
