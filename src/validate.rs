//! Record-level validation against the canonical event model, both as a
//! standalone report over input files and as the screening step of a build.

use crate::error::Result;
use crate::event::{CanonicalEvent, SchemaError};
use crate::ingest::{LineError, RecordOrigin};
use crate::normalize::{NormalizedRecord, Normalizer};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Why a single record did not make it into the event set.
#[derive(Debug, thiserror::Error)]
pub enum RecordRejection {
    #[error(transparent)]
    Malformed(#[from] LineError),

    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),
}

#[derive(Debug)]
pub struct RecordFailure {
    pub line: usize,
    pub reason: RecordRejection,
}

#[derive(Debug)]
pub struct FileReport {
    pub path: PathBuf,
    /// Non-blank lines in the file
    pub records: usize,
    pub failures: Vec<RecordFailure>,
}

impl FileReport {
    pub fn is_ok(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

#[derive(Debug, Default)]
pub struct ValidationReport {
    pub files: Vec<FileReport>,
}

impl ValidationReport {
    pub fn total_records(&self) -> usize {
        self.files.iter().map(|f| f.records).sum()
    }

    pub fn total_failures(&self) -> usize {
        self.files.iter().map(|f| f.failures.len()).sum()
    }

    /// At least one file was checked and every record passed.
    pub fn passed(&self) -> bool {
        !self.files.is_empty() && self.total_failures() == 0
    }
}

/// Check every record of one file. Nothing is loaded or written.
pub fn validate_file(normalizer: &Normalizer<'_>, path: &Path) -> Result<FileReport> {
    let outcome = normalizer.normalize_file(path)?;
    let records = outcome.lines_seen();

    let mut failures: Vec<RecordFailure> = outcome
        .failures
        .into_iter()
        .map(|f| RecordFailure {
            line: f.origin.line,
            reason: f.error.into(),
        })
        .collect();
    for record in &outcome.records {
        if let Err(e) = CanonicalEvent::validate(&record.fields) {
            failures.push(RecordFailure {
                line: record.origin.line,
                reason: e.into(),
            });
        }
    }
    failures.sort_by_key(|f| f.line);

    Ok(FileReport {
        path: path.to_path_buf(),
        records,
        failures,
    })
}

pub fn validate_files(normalizer: &Normalizer<'_>, paths: &[PathBuf]) -> Result<ValidationReport> {
    let files = paths
        .iter()
        .map(|path| validate_file(normalizer, path))
        .collect::<Result<Vec<_>>>()?;
    Ok(ValidationReport { files })
}

#[derive(Debug)]
pub struct Rejected {
    pub origin: RecordOrigin,
    pub error: SchemaError,
}

/// Validated events in input order, and the records that failed.
#[derive(Debug, Default)]
pub struct Screened {
    pub accepted: Vec<CanonicalEvent>,
    pub rejected: Vec<Rejected>,
}

pub fn screen(records: &[NormalizedRecord]) -> Screened {
    let mut out = Screened::default();
    for record in records {
        match CanonicalEvent::validate(&record.fields) {
            Ok(event) => out.accepted.push(event),
            Err(error) => {
                warn!(origin = %record.origin, %error, "rejecting record");
                out.rejected.push(Rejected {
                    origin: record.origin.clone(),
                    error,
                });
            }
        }
    }
    out
}
