//! Canonical event model: one schema for on-chain log events and off-chain
//! feed entries. Construction goes through [`CanonicalEvent::validate`].

mod schema;

use chrono::{DateTime, FixedOffset, Utc};
use serde::de::{value::StrDeserializer, DeserializeOwned, IntoDeserializer};
use serde::{Deserialize, Serialize};

pub use schema::{CrossFieldRule, SchemaError, MIN_EVENT_ID_LEN};

/// Closed set of string labels accepted for an enumerated field. Parsing
/// goes through the serde derive, so the wire labels are the source of truth.
pub trait Vocabulary: Sized + Copy + DeserializeOwned + 'static {
    const VARIANTS: &'static [Self];

    fn as_str(&self) -> &'static str;

    fn parse(label: &str) -> Option<Self> {
        let de: StrDeserializer<'_, serde::de::value::Error> = label.into_deserializer();
        Self::deserialize(de).ok()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Onchain,
    Offchain,
}

impl Vocabulary for Source {
    const VARIANTS: &'static [Self] = &[Source::Onchain, Source::Offchain];

    fn as_str(&self) -> &'static str {
        match self {
            Source::Onchain => "onchain",
            Source::Offchain => "offchain",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Kind {
    ProtocolEvent,
    Governance,
    Advisory,
}

impl Vocabulary for Kind {
    const VARIANTS: &'static [Self] = &[Kind::ProtocolEvent, Kind::Governance, Kind::Advisory];

    fn as_str(&self) -> &'static str {
        match self {
            Kind::ProtocolEvent => "protocol_event",
            Kind::Governance => "governance",
            Kind::Advisory => "advisory",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Protocol {
    AaveV3,
    UniswapV3,
    General,
}

impl Vocabulary for Protocol {
    const VARIANTS: &'static [Self] = &[Protocol::AaveV3, Protocol::UniswapV3, Protocol::General];

    fn as_str(&self) -> &'static str {
        match self {
            Protocol::AaveV3 => "aave_v3",
            Protocol::UniswapV3 => "uniswap_v3",
            Protocol::General => "general",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    #[default]
    Info,
    Low,
    Medium,
    High,
    Critical,
}

impl Vocabulary for Severity {
    const VARIANTS: &'static [Self] = &[
        Severity::Info,
        Severity::Low,
        Severity::Medium,
        Severity::High,
        Severity::Critical,
    ];

    fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Chain {
    Ethereum,
}

impl Vocabulary for Chain {
    const VARIANTS: &'static [Self] = &[Chain::Ethereum];

    fn as_str(&self) -> &'static str {
        match self {
            Chain::Ethereum => "ethereum",
        }
    }
}

/// Partition key for aggregation. Field order defines the output sort order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GroupKey {
    pub protocol: Protocol,
    pub source: Source,
    pub kind: Kind,
}

/// A validated, schema-conformant event. Never mutated after validation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalEvent {
    pub schema_version: String,
    pub event_id: String,
    pub source: Source,
    pub kind: Kind,
    pub protocol: Protocol,
    pub chain: Option<Chain>,
    pub event_time: DateTime<FixedOffset>,
    pub ingest_time: Option<DateTime<FixedOffset>>,
    pub severity: Severity,
    pub title: String,
    pub summary: Option<String>,
    pub source_url: Option<String>,
    pub tx_hash: Option<String>,
    pub block_number: Option<u64>,
    pub log_index: Option<u64>,
    pub entities: Vec<String>,
    pub tags: Vec<String>,
    /// Original producer payload, kept for audit
    pub raw: serde_json::Map<String, serde_json::Value>,
}

impl CanonicalEvent {
    pub fn group_key(&self) -> GroupKey {
        GroupKey {
            protocol: self.protocol,
            source: self.source,
            kind: self.kind,
        }
    }

    pub fn event_time_utc(&self) -> DateTime<Utc> {
        self.event_time.with_timezone(&Utc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vocabulary_roundtrips_labels() {
        for p in Protocol::VARIANTS {
            assert_eq!(Protocol::parse(p.as_str()), Some(*p));
        }
        assert_eq!(Kind::parse("protocol_event"), Some(Kind::ProtocolEvent));
        assert_eq!(Severity::parse("critical"), Some(Severity::Critical));
        assert_eq!(Source::parse("Onchain"), None);
        assert_eq!(Chain::parse("polygon"), None);
    }

    fn assert_labels_match_serde<T: Vocabulary + Serialize + std::fmt::Debug + PartialEq>() {
        for v in T::VARIANTS {
            assert_eq!(serde_json::to_value(v).unwrap(), v.as_str(), "{v:?}");
            assert_eq!(T::parse(v.as_str()).as_ref(), Some(v));
        }
    }

    #[test]
    fn serde_labels_match_vocabulary() {
        assert_labels_match_serde::<Source>();
        assert_labels_match_serde::<Kind>();
        assert_labels_match_serde::<Protocol>();
        assert_labels_match_serde::<Severity>();
        assert_labels_match_serde::<Chain>();
        assert_eq!(Protocol::parse("uniswap_v3"), Some(Protocol::UniswapV3));
        assert_eq!(Kind::parse(""), None);
    }

    #[test]
    fn group_keys_sort_by_protocol_first() {
        let a = GroupKey {
            protocol: Protocol::AaveV3,
            source: Source::Offchain,
            kind: Kind::Governance,
        };
        let b = GroupKey {
            protocol: Protocol::UniswapV3,
            source: Source::Onchain,
            kind: Kind::ProtocolEvent,
        };
        assert!(a < b);
    }
}
