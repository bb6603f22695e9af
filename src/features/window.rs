//! Rolling-window aggregation anchored at the latest observed event time.
//!
//! Windows are `[as_of - span, as_of]`, inclusive at both ends. Anchoring on
//! the data instead of the wall clock keeps runs replayable against
//! historical fixtures.

use super::store::EventStore;
use super::{FeatureRow, FeatureSnapshot};
use chrono::{DateTime, Duration, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WindowSpan {
    Hour1,
    Hour24,
    Day7,
}

impl WindowSpan {
    pub const ALL: [WindowSpan; 3] = [WindowSpan::Hour1, WindowSpan::Hour24, WindowSpan::Day7];

    pub fn as_str(&self) -> &'static str {
        match self {
            WindowSpan::Hour1 => "1h",
            WindowSpan::Hour24 => "24h",
            WindowSpan::Day7 => "7d",
        }
    }

    pub fn duration(&self) -> Duration {
        match self {
            WindowSpan::Hour1 => Duration::hours(1),
            WindowSpan::Hour24 => Duration::hours(24),
            WindowSpan::Day7 => Duration::days(7),
        }
    }

    /// Earliest event time still inside the window.
    pub fn start(&self, as_of: DateTime<Utc>) -> DateTime<Utc> {
        as_of - self.duration()
    }
}

/// Hourly rate the trailing day implies.
pub fn expected_hourly(count_24h: u64) -> f64 {
    count_24h as f64 / 24.0
}

/// Laplace-smoothed ratio of the last hour against the expected rate.
pub fn surge_ratio(count_1h: u64, expected_1h: f64) -> f64 {
    (count_1h as f64 + 1.0) / (expected_1h + 1.0)
}

/// One row per group present in the store, sorted by group key. `None`
/// when nothing is loaded.
pub fn compute_features(store: &EventStore) -> Option<FeatureSnapshot> {
    let as_of = store.as_of()?;
    let rows = store
        .groups()
        .map(|key| {
            let [count_1h, count_24h, count_7d] =
                WindowSpan::ALL.map(|span| store.count_group_since(key, span.start(as_of)));
            let expected_1h = expected_hourly(count_24h);
            FeatureRow {
                protocol: key.protocol,
                source: key.source,
                kind: key.kind,
                count_1h,
                count_24h,
                count_7d,
                expected_1h,
                surge_ratio: surge_ratio(count_1h, expected_1h),
                as_of,
            }
        })
        .collect();
    Some(FeatureSnapshot { as_of, rows })
}
