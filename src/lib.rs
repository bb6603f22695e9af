//! DeFi Sentinel: event normalization, rolling-window activity features and
//! surge detection for DeFi protocol events.
//!
//! Modular structure:
//! - [`event`]: Canonical event model and validation rules
//! - [`ingest`]: Input discovery and NDJSON line reading
//! - [`normalize`]: Structural completion against a schema default table
//! - [`features`]: Aggregate store and 1h/24h/7d windowed aggregation
//! - [`anomaly`]: Surge predicate over feature rows
//! - [`storage`]: Atomic SQLite snapshot and JSONL outputs
//! - [`validate`]: Per-file, per-record validation reports
//! - [`pipeline`]: One batch build run
//! - [`logging`]: Structured logging

pub mod anomaly;
pub mod config;
pub mod error;
pub mod event;
pub mod features;
pub mod ingest;
pub mod logging;
pub mod normalize;
pub mod pipeline;
pub mod storage;
pub mod validate;

pub use config::SentinelConfig;
pub use error::{Error, Result};
pub use event::{CanonicalEvent, GroupKey, SchemaError};
pub use features::{compute_features, EventStore, FeatureRow, FeatureSnapshot};
pub use logging::StructuredLogger;
pub use normalize::{CanonicalSchema, Normalizer, SCHEMA_V0_1};
pub use pipeline::{build_features, BuildSummary, RunStatus};
pub use storage::OutputWriter;
pub use validate::{validate_files, ValidationReport};
