//! Rolling-window activity features per (protocol, source, kind).

mod store;
mod window;

pub use store::EventStore;
pub use window::{compute_features, expected_hourly, surge_ratio, WindowSpan};

use crate::event::{GroupKey, Kind, Protocol, Source};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Aggregate for one group as of a single anchor. Field order is the
/// on-disk key order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    pub protocol: Protocol,
    pub source: Source,
    pub kind: Kind,
    pub count_1h: u64,
    pub count_24h: u64,
    pub count_7d: u64,
    pub expected_1h: f64,
    pub surge_ratio: f64,
    pub as_of: DateTime<Utc>,
}

impl FeatureRow {
    pub fn group_key(&self) -> GroupKey {
        GroupKey {
            protocol: self.protocol,
            source: self.source,
            kind: self.kind,
        }
    }
}

/// All feature rows of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSnapshot {
    pub as_of: DateTime<Utc>,
    pub rows: Vec<FeatureRow>,
}
