//! Fixed surge predicate: enough activity in the last hour, and well above
//! the rate the trailing day implies.

use crate::features::FeatureRow;

pub const MIN_COUNT_1H: u64 = 3;
pub const MIN_SURGE_RATIO: f64 = 4.0;

pub fn is_surge(row: &FeatureRow) -> bool {
    row.count_1h >= MIN_COUNT_1H && row.surge_ratio >= MIN_SURGE_RATIO
}

/// Rows that surge, in input order. Ranking is left to consumers.
pub fn find_anomalies(rows: &[FeatureRow]) -> Vec<FeatureRow> {
    rows.iter().filter(|row| is_surge(row)).cloned().collect()
}
