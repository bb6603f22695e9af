//! In-memory aggregate store: event times bucketed by group key.

use crate::event::{CanonicalEvent, GroupKey};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Holds the `event_time` of every loaded event, per group, sorted
/// ascending. Loading happens once per run before any query.
#[derive(Debug, Default, Clone)]
pub struct EventStore {
    groups: BTreeMap<GroupKey, Vec<DateTime<Utc>>>,
    len: usize,
}

impl EventStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_events<'a>(events: impl IntoIterator<Item = &'a CanonicalEvent>) -> Self {
        let mut store = Self::new();
        for event in events {
            store.insert(event);
        }
        store
    }

    pub fn insert(&mut self, event: &CanonicalEvent) {
        self.insert_at(event.group_key(), event.event_time_utc());
    }

    pub fn insert_at(&mut self, key: GroupKey, at: DateTime<Utc>) {
        let times = self.groups.entry(key).or_default();
        let idx = times.partition_point(|t| *t <= at);
        times.insert(idx, at);
        self.len += 1;
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Latest event time across all groups; the aggregation anchor.
    pub fn as_of(&self) -> Option<DateTime<Utc>> {
        self.groups.values().filter_map(|times| times.last()).max().copied()
    }

    /// Group keys with at least one loaded event, in key order.
    pub fn groups(&self) -> impl Iterator<Item = &GroupKey> {
        self.groups.keys()
    }

    /// Events in `key` with `event_time >= threshold`.
    pub fn count_group_since(&self, key: &GroupKey, threshold: DateTime<Utc>) -> u64 {
        self.groups
            .get(key)
            .map(|times| (times.len() - times.partition_point(|t| *t < threshold)) as u64)
            .unwrap_or(0)
    }

    /// Per-group counts of events with `event_time >= threshold`. Every
    /// loaded group appears, possibly with zero.
    pub fn count_since(&self, threshold: DateTime<Utc>) -> BTreeMap<GroupKey, u64> {
        self.groups
            .keys()
            .map(|key| (*key, self.count_group_since(key, threshold)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{Kind, Protocol, Source};
    use chrono::{Duration, TimeZone};

    fn key(protocol: Protocol) -> GroupKey {
        GroupKey {
            protocol,
            source: Source::Onchain,
            kind: Kind::ProtocolEvent,
        }
    }

    fn t(hour: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, hour, min, 0).unwrap()
    }

    #[test]
    fn empty_store_has_no_anchor() {
        let store = EventStore::new();
        assert!(store.is_empty());
        assert_eq!(store.as_of(), None);
        assert!(store.count_since(t(0, 0)).is_empty());
    }

    #[test]
    fn anchor_is_max_across_groups() {
        let mut store = EventStore::new();
        store.insert_at(key(Protocol::AaveV3), t(10, 0));
        store.insert_at(key(Protocol::UniswapV3), t(12, 30));
        store.insert_at(key(Protocol::AaveV3), t(11, 0));
        assert_eq!(store.as_of(), Some(t(12, 30)));
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn threshold_is_inclusive() {
        let mut store = EventStore::new();
        let k = key(Protocol::AaveV3);
        for at in [t(9, 59), t(10, 0), t(10, 1), t(11, 0)] {
            store.insert_at(k, at);
        }
        assert_eq!(store.count_group_since(&k, t(10, 0)), 3);
        assert_eq!(store.count_group_since(&k, t(11, 0) + Duration::seconds(1)), 0);
        assert_eq!(store.count_group_since(&key(Protocol::General), t(0, 0)), 0);
    }

    #[test]
    fn out_of_order_inserts_stay_sorted() {
        let mut store = EventStore::new();
        let k = key(Protocol::UniswapV3);
        for at in [t(12, 0), t(8, 0), t(10, 0), t(10, 0)] {
            store.insert_at(k, at);
        }
        assert_eq!(store.count_group_since(&k, t(10, 0)), 3);
        assert_eq!(store.count_group_since(&k, t(9, 0)), 3);
        assert_eq!(store.count_group_since(&k, t(7, 0)), 4);
    }

    #[test]
    fn count_since_lists_every_group() {
        let mut store = EventStore::new();
        store.insert_at(key(Protocol::AaveV3), t(1, 0));
        store.insert_at(key(Protocol::General), t(12, 0));
        let counts = store.count_since(t(11, 0));
        assert_eq!(counts.len(), 2);
        assert_eq!(counts[&key(Protocol::AaveV3)], 0);
        assert_eq!(counts[&key(Protocol::General)], 1);
    }
}
