//! Structural completion of raw event records: every canonical key is made
//! present, absent keys are filled from the schema's default table. No
//! semantic validation and no deduplication happens here.

use crate::error::Result;
use crate::ingest::{JsonlLines, LineError, RecordOrigin};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Value a canonical key takes when the producer left it out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldDefault {
    Null,
    Text(&'static str),
    EmptyList,
    EmptyObject,
}

impl FieldDefault {
    pub fn to_value(self) -> Value {
        match self {
            FieldDefault::Null => Value::Null,
            FieldDefault::Text(s) => Value::String(s.to_string()),
            FieldDefault::EmptyList => Value::Array(Vec::new()),
            FieldDefault::EmptyObject => Value::Object(Map::new()),
        }
    }

    /// Collections are also restored when a producer sends an explicit null.
    fn replaces_null(self) -> bool {
        matches!(self, FieldDefault::EmptyList | FieldDefault::EmptyObject)
    }
}

/// Canonical key set and defaults for one schema version.
#[derive(Debug, Clone, Copy)]
pub struct CanonicalSchema {
    pub version: &'static str,
    pub fields: &'static [(&'static str, FieldDefault)],
}

pub const SCHEMA_V0_1: CanonicalSchema = CanonicalSchema {
    version: "0.1",
    fields: &[
        ("schema_version", FieldDefault::Text("0.1")),
        ("event_id", FieldDefault::Null),
        ("source", FieldDefault::Null),
        ("kind", FieldDefault::Null),
        ("protocol", FieldDefault::Null),
        ("chain", FieldDefault::Null),
        ("event_time", FieldDefault::Null),
        ("ingest_time", FieldDefault::Null),
        ("severity", FieldDefault::Text("info")),
        ("title", FieldDefault::Null),
        ("summary", FieldDefault::Null),
        ("source_url", FieldDefault::Null),
        ("tx_hash", FieldDefault::Null),
        ("block_number", FieldDefault::Null),
        ("log_index", FieldDefault::Null),
        ("entities", FieldDefault::EmptyList),
        ("tags", FieldDefault::EmptyList),
        ("raw", FieldDefault::EmptyObject),
    ],
};

impl CanonicalSchema {
    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|(key, _)| *key)
    }
}

#[derive(Debug, Clone)]
pub struct NormalizedRecord {
    pub origin: RecordOrigin,
    pub fields: Map<String, Value>,
}

#[derive(Debug)]
pub struct LineFailure {
    pub origin: RecordOrigin,
    pub error: LineError,
}

/// Records in input order plus the lines that could not be parsed.
#[derive(Debug, Default)]
pub struct NormalizeOutcome {
    pub records: Vec<NormalizedRecord>,
    pub failures: Vec<LineFailure>,
}

impl NormalizeOutcome {
    /// Non-blank lines seen, parsed or not
    pub fn lines_seen(&self) -> usize {
        self.records.len() + self.failures.len()
    }

    fn extend(&mut self, other: NormalizeOutcome) {
        self.records.extend(other.records);
        self.failures.extend(other.failures);
    }
}

pub struct Normalizer<'s> {
    schema: &'s CanonicalSchema,
}

impl<'s> Normalizer<'s> {
    pub fn new(schema: &'s CanonicalSchema) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &CanonicalSchema {
        self.schema
    }

    /// Fill absent canonical keys. Present values are never touched, except
    /// a null collection which becomes empty. Extra keys are kept.
    pub fn complete(&self, mut record: Map<String, Value>) -> Map<String, Value> {
        for (key, default) in self.schema.fields {
            match record.get_mut(*key) {
                None => {
                    record.insert((*key).to_string(), default.to_value());
                }
                Some(value) if value.is_null() && default.replaces_null() => {
                    *value = default.to_value();
                }
                Some(_) => {}
            }
        }
        record
    }

    pub fn normalize_line(&self, text: &str) -> std::result::Result<Map<String, Value>, LineError> {
        match serde_json::from_str::<Value>(text)? {
            Value::Object(record) => Ok(self.complete(record)),
            _ => Err(LineError::NotAnObject),
        }
    }

    pub fn normalize_file(&self, path: &Path) -> Result<NormalizeOutcome> {
        let mut outcome = NormalizeOutcome::default();
        for raw in JsonlLines::open(path)? {
            let raw = raw?;
            let origin = RecordOrigin {
                file: path.to_path_buf(),
                line: raw.line,
            };
            match raw.text.and_then(|text| self.normalize_line(&text)) {
                Ok(fields) => outcome.records.push(NormalizedRecord { origin, fields }),
                Err(error) => {
                    warn!(%origin, %error, "skipping malformed line");
                    outcome.failures.push(LineFailure { origin, error });
                }
            }
        }
        debug!(
            file = %path.display(),
            records = outcome.records.len(),
            malformed = outcome.failures.len(),
            "normalized file"
        );
        Ok(outcome)
    }

    /// Normalize files in order. A malformed line never stops the run; an
    /// unreadable file does.
    pub fn normalize_files(&self, paths: &[PathBuf]) -> Result<NormalizeOutcome> {
        let mut outcome = NormalizeOutcome::default();
        for path in paths {
            outcome.extend(self.normalize_file(path)?);
        }
        Ok(outcome)
    }
}
