//! Durable run outputs: a SQLite columnar snapshot and JSONL streams.
//!
//! Every file is staged as a temp file in its destination directory and
//! renamed into place only once fully written, so readers see either the
//! previous complete file or the new complete file.

mod jsonl;
mod snapshot;

pub use jsonl::write_jsonl;
pub use snapshot::SnapshotStore;

use crate::error::{Error, Result};
use crate::features::{FeatureRow, FeatureSnapshot};
use crate::normalize::NormalizedRecord;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::info;

pub const FEATURE_SNAPSHOT_DB: &str = "feature_snapshot.sqlite";
pub const FEATURE_SNAPSHOT_JSONL: &str = "feature_snapshot.jsonl";
pub const ANOMALIES_JSONL: &str = "anomalies.jsonl";
pub const NORMALIZED_EVENTS_JSONL: &str = "_events_normalized.jsonl";

fn staging_file(path: &Path) -> Result<NamedTempFile> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    NamedTempFile::new_in(dir).map_err(|e| Error::io(dir, e))
}

/// Mode of published outputs. Temp files start owner-only.
#[cfg(unix)]
const OUTPUT_MODE: u32 = 0o644;

fn commit(staged: NamedTempFile, path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        staged
            .as_file()
            .set_permissions(std::fs::Permissions::from_mode(OUTPUT_MODE))
            .map_err(|e| Error::io(staged.path(), e))?;
    }
    staged.persist(path).map_err(|e| Error::Persist {
        path: path.to_path_buf(),
        source: e.error,
    })?;
    Ok(())
}

/// Stream into a temp file beside `path`, fsync, then rename over `path`.
pub(crate) fn persist_atomically<F>(path: &Path, fill: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<&File>) -> Result<()>,
{
    let staged = staging_file(path)?;
    {
        let mut w = BufWriter::new(staged.as_file());
        fill(&mut w)?;
        w.flush().map_err(|e| Error::io(staged.path(), e))?;
    }
    staged
        .as_file()
        .sync_all()
        .map_err(|e| Error::io(staged.path(), e))?;
    commit(staged, path)
}

/// Build the SQLite snapshot in a temp file, then rename it over `path`.
pub fn write_snapshot_db(
    path: &Path,
    snapshot: &FeatureSnapshot,
    schema_version: &str,
    anomaly_count: usize,
) -> Result<()> {
    let staged = staging_file(path)?;
    let mut store = SnapshotStore::open(staged.path())?;
    store.replace(snapshot, schema_version, anomaly_count)?;
    store.close()?;
    commit(staged, path)
}

/// Paths written by [`OutputWriter::write_features`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub snapshot_db: PathBuf,
    pub features_jsonl: PathBuf,
    pub anomalies_jsonl: PathBuf,
}

pub struct OutputWriter {
    out_dir: PathBuf,
}

impl OutputWriter {
    /// Create the output directory if needed.
    pub fn create(out_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(out_dir).map_err(|e| Error::io(out_dir, e))?;
        Ok(Self {
            out_dir: out_dir.to_path_buf(),
        })
    }

    /// Persist the completed record stream, one record per line.
    pub fn write_normalized(&self, records: &[NormalizedRecord]) -> Result<PathBuf> {
        let path = self.out_dir.join(NORMALIZED_EVENTS_JSONL);
        let fields: Vec<_> = records.iter().map(|r| &r.fields).collect();
        write_jsonl(&path, &fields)?;
        Ok(path)
    }

    /// Write the snapshot DB, the feature stream and the anomaly stream.
    /// Fails on the first file that cannot be written.
    pub fn write_features(
        &self,
        snapshot: &FeatureSnapshot,
        anomalies: &[FeatureRow],
        schema_version: &str,
    ) -> Result<OutputPaths> {
        let paths = OutputPaths {
            snapshot_db: self.out_dir.join(FEATURE_SNAPSHOT_DB),
            features_jsonl: self.out_dir.join(FEATURE_SNAPSHOT_JSONL),
            anomalies_jsonl: self.out_dir.join(ANOMALIES_JSONL),
        };
        write_snapshot_db(&paths.snapshot_db, snapshot, schema_version, anomalies.len())?;
        let rows = write_jsonl(&paths.features_jsonl, &snapshot.rows)?;
        let flagged = write_jsonl(&paths.anomalies_jsonl, anomalies)?;
        info!(
            out_dir = %self.out_dir.display(),
            rows,
            anomalies = flagged,
            "wrote feature outputs"
        );
        Ok(paths)
    }
}
