//! Field and cross-field validation for [`CanonicalEvent`].
//!
//! A key that is absent and a key that is `null` are treated the same way.
//! Optional fields with a documented default (`schema_version`, `severity`,
//! `entities`, `tags`, `raw`) take that default only when absent; an explicit
//! `null` for them is a type error.

use super::{CanonicalEvent, Chain, Kind, Protocol, Severity, Source, Vocabulary};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use serde_json::{Map, Value};

pub const MIN_EVENT_ID_LEN: usize = 8;
const TX_HASH_LEN: usize = 66;
const DEFAULT_SCHEMA_VERSION: &str = "0.1";

/// Offset-free date-times; these fail as missing a timezone, not as garbage.
const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    #[error("field `{field}` must be {expected}")]
    WrongType {
        field: &'static str,
        expected: &'static str,
    },

    #[error("field `{field}` has unknown value {value:?}")]
    UnknownValue { field: &'static str, value: String },

    #[error("event_id must be at least {min} characters, got {len}")]
    IdTooShort { min: usize, len: usize },

    #[error("tx_hash must be 0x + 64 hex chars")]
    MalformedTxHash,

    #[error("field `{0}` must be timezone-aware")]
    MissingTimezone(&'static str),

    #[error("field `{field}` is not an RFC 3339 timestamp: {value:?}")]
    InvalidTimestamp { field: &'static str, value: String },

    #[error(transparent)]
    CrossField(#[from] CrossFieldRule),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CrossFieldRule {
    #[error("chain is required for onchain events")]
    OnchainMissingChain,
    #[error("tx_hash and block_number are required for onchain events")]
    OnchainMissingLocator,
    #[error("source_url must be empty for onchain events")]
    OnchainHasSourceUrl,
    #[error("onchain events must use kind=protocol_event")]
    OnchainWrongKind,
    #[error("source_url is required for offchain events")]
    OffchainMissingSourceUrl,
    #[error("chain must be empty for offchain events")]
    OffchainHasChain,
    #[error("tx_hash, block_number, log_index must be empty for offchain events")]
    OffchainHasLocator,
}

impl CanonicalEvent {
    /// Validate one raw record. Pure: the same record always yields the
    /// same outcome, and nothing is coerced.
    pub fn validate(record: &Map<String, Value>) -> Result<Self, SchemaError> {
        let schema_version = match record.get("schema_version") {
            None => DEFAULT_SCHEMA_VERSION.to_string(),
            Some(Value::String(s)) => s.clone(),
            Some(_) => return Err(wrong_type("schema_version", "a string")),
        };

        let event_id = required_string(record, "event_id")?;
        let len = event_id.chars().count();
        if len < MIN_EVENT_ID_LEN {
            return Err(SchemaError::IdTooShort {
                min: MIN_EVENT_ID_LEN,
                len,
            });
        }

        let source: Source = required_label(record, "source")?;
        let kind: Kind = required_label(record, "kind")?;
        let protocol: Protocol = required_label(record, "protocol")?;
        let chain: Option<Chain> = label(record, "chain")?;

        let event_time = match present(record, "event_time") {
            Some(value) => instant("event_time", value)?,
            None => return Err(SchemaError::MissingField("event_time")),
        };
        let ingest_time = present(record, "ingest_time")
            .map(|value| instant("ingest_time", value))
            .transpose()?;

        let severity = match record.get("severity") {
            None => Severity::default(),
            Some(Value::String(value)) => Severity::parse(value).ok_or_else(|| {
                SchemaError::UnknownValue {
                    field: "severity",
                    value: value.clone(),
                }
            })?,
            Some(_) => return Err(wrong_type("severity", "a string")),
        };

        let title = required_string(record, "title")?;
        let summary = string(record, "summary")?;
        let source_url = string(record, "source_url")?;

        let tx_hash = string(record, "tx_hash")?;
        if let Some(hash) = &tx_hash {
            if !is_tx_hash(hash) {
                return Err(SchemaError::MalformedTxHash);
            }
        }
        let block_number = unsigned(record, "block_number")?;
        let log_index = unsigned(record, "log_index")?;

        let entities = string_list(record, "entities")?;
        let tags = string_list(record, "tags")?;
        let raw = match record.get("raw") {
            None => Map::new(),
            Some(Value::Object(map)) => map.clone(),
            Some(_) => return Err(wrong_type("raw", "an object")),
        };

        let event = CanonicalEvent {
            schema_version,
            event_id,
            source,
            kind,
            protocol,
            chain,
            event_time,
            ingest_time,
            severity,
            title,
            summary,
            source_url,
            tx_hash,
            block_number,
            log_index,
            entities,
            tags,
            raw,
        };
        event.check_cross_fields()?;
        Ok(event)
    }

    fn check_cross_fields(&self) -> Result<(), CrossFieldRule> {
        match self.source {
            Source::Onchain => {
                if self.chain.is_none() {
                    return Err(CrossFieldRule::OnchainMissingChain);
                }
                if self.tx_hash.is_none() || self.block_number.is_none() {
                    return Err(CrossFieldRule::OnchainMissingLocator);
                }
                if self.source_url.is_some() {
                    return Err(CrossFieldRule::OnchainHasSourceUrl);
                }
                if self.kind != Kind::ProtocolEvent {
                    return Err(CrossFieldRule::OnchainWrongKind);
                }
            }
            Source::Offchain => {
                if self.source_url.is_none() {
                    return Err(CrossFieldRule::OffchainMissingSourceUrl);
                }
                if self.chain.is_some() {
                    return Err(CrossFieldRule::OffchainHasChain);
                }
                if self.tx_hash.is_some() || self.block_number.is_some() || self.log_index.is_some()
                {
                    return Err(CrossFieldRule::OffchainHasLocator);
                }
            }
        }
        Ok(())
    }
}

fn wrong_type(field: &'static str, expected: &'static str) -> SchemaError {
    SchemaError::WrongType { field, expected }
}

/// Value of `field` unless absent or null.
fn present<'a>(record: &'a Map<String, Value>, field: &str) -> Option<&'a Value> {
    record.get(field).filter(|v| !v.is_null())
}

fn string(record: &Map<String, Value>, field: &'static str) -> Result<Option<String>, SchemaError> {
    match present(record, field) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(wrong_type(field, "a string")),
    }
}

fn required_string(record: &Map<String, Value>, field: &'static str) -> Result<String, SchemaError> {
    string(record, field)?.ok_or(SchemaError::MissingField(field))
}

fn label<T: Vocabulary>(record: &Map<String, Value>, field: &'static str) -> Result<Option<T>, SchemaError> {
    match string(record, field)? {
        None => Ok(None),
        Some(value) => T::parse(&value)
            .map(Some)
            .ok_or(SchemaError::UnknownValue { field, value }),
    }
}

fn required_label<T: Vocabulary>(record: &Map<String, Value>, field: &'static str) -> Result<T, SchemaError> {
    label(record, field)?.ok_or(SchemaError::MissingField(field))
}

fn unsigned(record: &Map<String, Value>, field: &'static str) -> Result<Option<u64>, SchemaError> {
    match present(record, field) {
        None => Ok(None),
        Some(v) => v
            .as_u64()
            .map(Some)
            .ok_or_else(|| wrong_type(field, "a non-negative integer")),
    }
}

fn string_list(record: &Map<String, Value>, field: &'static str) -> Result<Vec<String>, SchemaError> {
    let items = match record.get(field) {
        None => return Ok(Vec::new()),
        Some(Value::Array(items)) => items,
        Some(_) => return Err(wrong_type(field, "a list of strings")),
    };
    items
        .iter()
        .map(|item| match item {
            Value::String(s) => Ok(s.clone()),
            _ => Err(wrong_type(field, "a list of strings")),
        })
        .collect()
}

fn is_tx_hash(value: &str) -> bool {
    value.len() == TX_HASH_LEN
        && value.starts_with("0x")
        && value.as_bytes()[2..].iter().all(u8::is_ascii_hexdigit)
}

/// Parse an offset-carrying timestamp. Strings that are valid date-times
/// without an offset are reported as missing a timezone.
fn instant(field: &'static str, value: &Value) -> Result<DateTime<FixedOffset>, SchemaError> {
    let text = value
        .as_str()
        .ok_or_else(|| wrong_type(field, "an RFC 3339 string"))?;

    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Ok(ts);
    }
    if let Ok(ts) = DateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Ok(ts);
    }

    let naive = NAIVE_DATETIME_FORMATS
        .iter()
        .any(|fmt| NaiveDateTime::parse_from_str(text, fmt).is_ok())
        || NaiveDate::parse_from_str(text, "%Y-%m-%d").is_ok();
    if naive {
        Err(SchemaError::MissingTimezone(field))
    } else {
        Err(SchemaError::InvalidTimestamp {
            field,
            value: text.to_string(),
        })
    }
}
