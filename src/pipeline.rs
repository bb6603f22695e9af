//! One batch run: normalize → screen → load → aggregate → detect → write.
//!
//! Aggregation starts only after every input of the run has been read.

use crate::anomaly::find_anomalies;
use crate::error::Result;
use crate::features::{compute_features, EventStore};
use crate::normalize::Normalizer;
use crate::storage::{OutputPaths, OutputWriter};
use crate::validate::screen;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// How a run ended, short of a fatal error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Outputs written, every record accepted
    Clean,
    /// Outputs written from the accepted records; some lines or records were rejected
    Rejected,
    /// No inputs or no usable events; feature outputs left untouched
    NoData,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BuildSummary {
    pub status: RunStatus,
    pub files: usize,
    /// Records that parsed as JSON objects
    pub records: usize,
    pub malformed: usize,
    pub rejected: usize,
    pub events: usize,
    pub duplicate_ids: usize,
    pub as_of: Option<DateTime<Utc>>,
    pub feature_rows: usize,
    pub anomalies: usize,
    pub outputs: Option<OutputPaths>,
}

impl BuildSummary {
    fn empty(files: usize) -> Self {
        Self {
            status: RunStatus::NoData,
            files,
            records: 0,
            malformed: 0,
            rejected: 0,
            events: 0,
            duplicate_ids: 0,
            as_of: None,
            feature_rows: 0,
            anomalies: 0,
            outputs: None,
        }
    }
}

/// Build features from `inputs` into `out_dir`. Per-record problems are
/// counted, not fatal; any I/O or storage failure aborts the run.
pub fn build_features(
    normalizer: &Normalizer<'_>,
    inputs: &[PathBuf],
    out_dir: &Path,
) -> Result<BuildSummary> {
    if inputs.is_empty() {
        warn!("no input event files");
        return Ok(BuildSummary::empty(0));
    }

    let outcome = normalizer.normalize_files(inputs)?;
    let writer = OutputWriter::create(out_dir)?;
    writer.write_normalized(&outcome.records)?;

    let screened = screen(&outcome.records);
    let duplicate_ids = count_duplicate_ids(screened.accepted.iter().map(|e| e.event_id.as_str()));
    if duplicate_ids > 0 {
        warn!(duplicate_ids, "duplicate event ids across inputs; counted as separate events");
    }

    let mut summary = BuildSummary {
        records: outcome.records.len(),
        malformed: outcome.failures.len(),
        rejected: screened.rejected.len(),
        events: screened.accepted.len(),
        duplicate_ids,
        ..BuildSummary::empty(inputs.len())
    };
    info!(
        files = summary.files,
        records = summary.records,
        malformed = summary.malformed,
        rejected = summary.rejected,
        events = summary.events,
        "loaded events"
    );

    let store = EventStore::from_events(&screened.accepted);
    let Some(snapshot) = compute_features(&store) else {
        warn!("no events to compute features");
        return Ok(summary);
    };
    let anomalies = find_anomalies(&snapshot.rows);
    let outputs = writer.write_features(&snapshot, &anomalies, normalizer.schema().version)?;

    summary.status = if summary.malformed + summary.rejected > 0 {
        RunStatus::Rejected
    } else {
        RunStatus::Clean
    };
    summary.as_of = Some(snapshot.as_of);
    summary.feature_rows = snapshot.rows.len();
    summary.anomalies = anomalies.len();
    summary.outputs = Some(outputs);
    Ok(summary)
}

fn count_duplicate_ids<'a>(ids: impl Iterator<Item = &'a str>) -> usize {
    let mut seen = HashSet::new();
    ids.filter(|id| !seen.insert(*id)).count()
}
