//! Surge detection over feature rows.

mod detector;

pub use detector::{find_anomalies, is_surge, MIN_COUNT_1H, MIN_SURGE_RATIO};
