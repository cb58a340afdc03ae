//! Bounded, thread-safe ring buffer of captured packets.
//!
//! The store holds the most recent `capacity` records in insertion order and
//! evicts from the head on overflow. The lock is held only for the duration
//! of a buffer mutation or scan, never across I/O.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::filter::QueryFilter;
use crate::record::PacketRecord;

pub const DEFAULT_CAPACITY: usize = 1000;

/// Result of a filtered historical query.
#[derive(Clone, Debug)]
pub struct QueryResult {
    /// Matching records, newest first.
    pub records: Vec<Arc<PacketRecord>>,
    /// Records currently held by the store, before filtering.
    pub total_count: usize,
    /// Records returned after filtering and limiting.
    pub filtered_count: usize,
}

pub struct PacketStore {
    records: Mutex<VecDeque<Arc<PacketRecord>>>,
    capacity: usize,
}

impl PacketStore {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// Appends at the tail, evicting the oldest record first when full.
    pub fn append(&self, record: Arc<PacketRecord>) {
        let mut records = self.records.lock();
        if records.len() == self.capacity {
            records.pop_front();
        }
        records.push_back(record);
    }

    /// Scans newest-first, returning at most `limit` matching records.
    /// `limit == 0` yields an empty result; default/ceiling enforcement is
    /// the boundary layer's concern.
    pub fn query(&self, filter: &QueryFilter, limit: usize) -> QueryResult {
        let records = self.records.lock();
        let matches: Vec<Arc<PacketRecord>> = records
            .iter()
            .rev()
            .filter(|record| filter.matches(record))
            .take(limit)
            .cloned()
            .collect();
        QueryResult {
            total_count: records.len(),
            filtered_count: matches.len(),
            records: matches,
        }
    }

    /// Empties the buffer. Does not touch the lifecycle packet counter.
    pub fn clear(&self) {
        self.records.lock().clear();
    }
}

impl Default for PacketStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Protocol;
    use chrono::Utc;
    use proptest::prelude::*;

    fn record(protocol: Protocol, src: &str, seq: u32) -> Arc<PacketRecord> {
        Arc::new(PacketRecord {
            timestamp: Utc::now(),
            protocol,
            source_ip: src.into(),
            destination_ip: "10.0.0.255".into(),
            source_port: None,
            destination_port: None,
            packet_size: seq,
            ttl: Some(64),
            flags: None,
        })
    }

    #[test]
    fn evicts_oldest_first_at_capacity() {
        let store = PacketStore::with_capacity(3);
        for seq in 0..5 {
            store.append(record(Protocol::Tcp, "10.0.0.1", seq));
        }
        assert_eq!(store.len(), 3);
        // Newest-first query: sizes 4, 3, 2 survive; 0 and 1 were evicted.
        let result = store.query(&QueryFilter::default(), 10);
        let sizes: Vec<u32> = result.records.iter().map(|r| r.packet_size).collect();
        assert_eq!(sizes, vec![4, 3, 2]);
    }

    #[test]
    fn empty_filter_returns_full_contents_bounded_by_limit() {
        let store = PacketStore::with_capacity(100);
        for seq in 0..10 {
            store.append(record(Protocol::Udp, "10.0.0.1", seq));
        }
        let all = store.query(&QueryFilter::default(), 100);
        assert_eq!(all.total_count, 10);
        assert_eq!(all.filtered_count, 10);

        let limited = store.query(&QueryFilter::default(), 3);
        assert_eq!(limited.total_count, 10);
        assert_eq!(limited.filtered_count, 3);
        let sizes: Vec<u32> = limited.records.iter().map(|r| r.packet_size).collect();
        assert_eq!(sizes, vec![9, 8, 7]);
    }

    #[test]
    fn zero_limit_returns_nothing() {
        let store = PacketStore::with_capacity(10);
        store.append(record(Protocol::Tcp, "10.0.0.1", 0));
        let result = store.query(&QueryFilter::default(), 0);
        assert!(result.records.is_empty());
        assert_eq!(result.total_count, 1);
    }

    #[test]
    fn filtered_query_preserves_relative_order() {
        let store = PacketStore::with_capacity(10);
        store.append(record(Protocol::Tcp, "10.0.0.1", 0));
        store.append(record(Protocol::Udp, "10.0.0.2", 1));
        store.append(record(Protocol::Tcp, "10.0.0.1", 2));
        store.append(record(Protocol::Icmp, "10.0.0.3", 3));

        let filter = QueryFilter {
            protocol: Some(Protocol::Tcp),
            ..Default::default()
        };
        let result = store.query(&filter, 10);
        assert_eq!(result.filtered_count, 2);
        assert!(result.records.iter().all(|r| r.protocol == Protocol::Tcp));
        // Newest-first: the seq-2 record before the seq-0 record.
        let sizes: Vec<u32> = result.records.iter().map(|r| r.packet_size).collect();
        assert_eq!(sizes, vec![2, 0]);
    }

    #[test]
    fn clear_empties_the_buffer() {
        let store = PacketStore::with_capacity(10);
        store.append(record(Protocol::Tcp, "10.0.0.1", 0));
        store.append(record(Protocol::Tcp, "10.0.0.1", 1));
        store.clear();
        assert!(store.is_empty());
        assert_eq!(store.query(&QueryFilter::default(), 10).total_count, 0);
    }

    proptest! {
        /// The bound holds for any append sequence, and the survivors are
        /// exactly the most recent `capacity` records in insertion order.
        #[test]
        fn bound_and_fifo_hold_for_any_sequence(
            count in 0usize..300,
            capacity in 1usize..50,
        ) {
            let store = PacketStore::with_capacity(capacity);
            for seq in 0..count {
                store.append(record(Protocol::Tcp, "10.0.0.1", seq as u32));
                prop_assert!(store.len() <= capacity);
            }
            let result = store.query(&QueryFilter::default(), count + 1);
            let expected: Vec<u32> = (0..count as u32).rev().take(capacity).collect();
            let sizes: Vec<u32> = result.records.iter().map(|r| r.packet_size).collect();
            prop_assert_eq!(sizes, expected);
        }
    }
}
