//! Fan-out distribution from the capture loop to live subscribers.
//!
//! Each subscriber gets an independent bounded queue. Publishing is a
//! non-blocking attempt per queue: a full queue drops the new event for that
//! subscriber only (drop-newest) and bumps its drop counter, so one slow
//! consumer can neither stall the capture loop nor starve other subscribers.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::record::StreamEvent;

pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Opaque handle identifying a live subscriber.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

struct SubscriberSlot {
    tx: Sender<StreamEvent>,
    dropped: Arc<AtomicU64>,
}

/// A live observer's end of the stream.
///
/// Dropping the subscription closes the queue; the broker reaps the slot on
/// the next publish. Explicit [`StreamBroker::unsubscribe`] releases it
/// immediately.
pub struct Subscription {
    id: SubscriberId,
    events: Receiver<StreamEvent>,
    dropped: Arc<AtomicU64>,
}

impl Subscription {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Inbound event sequence, FIFO in publish order.
    pub fn events(&self) -> &Receiver<StreamEvent> {
        &self.events
    }

    /// Events dropped for this subscriber because its queue was full.
    pub fn dropped_events(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

pub struct StreamBroker {
    // Guarded independently of store/state locks so slow-subscriber handling
    // never couples with the capture path.
    subscribers: Mutex<HashMap<SubscriberId, SubscriberSlot>>,
    next_id: AtomicU64,
    queue_capacity: usize,
}

impl StreamBroker {
    pub fn new() -> Self {
        Self::with_queue_capacity(DEFAULT_QUEUE_CAPACITY)
    }

    pub fn with_queue_capacity(queue_capacity: usize) -> Self {
        Self {
            subscribers: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(0),
            queue_capacity: queue_capacity.max(1),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }

    /// Registers a new live observer and returns its handle and queue.
    pub fn subscribe(&self) -> Subscription {
        self.subscribe_inner(None)
    }

    /// Registers a new live observer with a seed event already enqueued.
    /// The seed goes into the queue before the slot becomes visible to
    /// `publish`, so it is guaranteed to precede every subsequent event.
    pub fn subscribe_with(&self, initial: StreamEvent) -> Subscription {
        self.subscribe_inner(Some(initial))
    }

    fn subscribe_inner(&self, initial: Option<StreamEvent>) -> Subscription {
        let id = SubscriberId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = bounded(self.queue_capacity);
        let dropped = Arc::new(AtomicU64::new(0));
        if let Some(event) = initial {
            // Queue capacity is at least one and nobody else holds the
            // sender yet, so the seed cannot be rejected.
            let _ = tx.try_send(event);
        }
        self.subscribers.lock().insert(
            id,
            SubscriberSlot {
                tx,
                dropped: dropped.clone(),
            },
        );
        debug!(subscriber = id.0, "stream subscriber registered");
        Subscription {
            id,
            events: rx,
            dropped,
        }
    }

    /// Removes a subscriber and releases its queue. Idempotent.
    pub fn unsubscribe(&self, id: SubscriberId) {
        if self.subscribers.lock().remove(&id).is_some() {
            debug!(subscriber = id.0, "stream subscriber removed");
        }
    }

    /// Enqueues a copy of the event into every live subscriber's queue
    /// without blocking. Returns how many subscribers had the event dropped
    /// because their queue was full. Subscribers whose receiving side is gone
    /// are reaped here.
    pub fn publish(&self, event: StreamEvent) -> u64 {
        let mut subscribers = self.subscribers.lock();
        let mut dropped = 0;
        let mut disconnected = Vec::new();
        for (id, slot) in subscribers.iter() {
            match slot.tx.try_send(event.clone()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    dropped += 1;
                    slot.dropped.fetch_add(1, Ordering::Relaxed);
                    trace!(subscriber = id.0, "subscriber queue full, event dropped");
                }
                Err(TrySendError::Disconnected(_)) => disconnected.push(*id),
            }
        }
        for id in disconnected {
            subscribers.remove(&id);
            debug!(subscriber = id.0, "disconnected subscriber reaped");
        }
        dropped
    }
}

impl Default for StreamBroker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{CaptureStatus, PacketRecord, Protocol};
    use chrono::Utc;

    fn packet_event(seq: u32) -> StreamEvent {
        StreamEvent::Packet(Arc::new(PacketRecord {
            timestamp: Utc::now(),
            protocol: Protocol::Tcp,
            source_ip: "10.0.0.1".into(),
            destination_ip: "10.0.0.2".into(),
            source_port: Some(1000 + seq as u16),
            destination_port: Some(80),
            packet_size: seq,
            ttl: Some(64),
            flags: None,
        }))
    }

    fn seq_of(event: &StreamEvent) -> u32 {
        match event {
            StreamEvent::Packet(record) => record.packet_size,
            StreamEvent::Status(_) => panic!("expected packet event"),
        }
    }

    #[test]
    fn all_subscribers_receive_events_in_publish_order() {
        let broker = StreamBroker::new();
        let a = broker.subscribe();
        let b = broker.subscribe();

        for seq in 0..3 {
            assert_eq!(broker.publish(packet_event(seq)), 0);
        }

        for sub in [&a, &b] {
            let seqs: Vec<u32> = (0..3).map(|_| seq_of(&sub.events().recv().unwrap())).collect();
            assert_eq!(seqs, vec![0, 1, 2]);
        }
    }

    #[test]
    fn slow_subscriber_drops_without_affecting_others() {
        let broker = StreamBroker::with_queue_capacity(2);
        let slow = broker.subscribe();
        let fast = broker.subscribe();

        for seq in 0..5 {
            broker.publish(packet_event(seq));
            // Fast consumer drains as events arrive.
            assert_eq!(seq_of(&fast.events().recv().unwrap()), seq);
        }

        // Slow consumer kept only the first two; the rest were dropped newest.
        assert_eq!(slow.dropped_events(), 3);
        assert_eq!(fast.dropped_events(), 0);
        let kept: Vec<u32> = slow.events().try_iter().map(|e| seq_of(&e)).collect();
        assert_eq!(kept, vec![0, 1]);
    }

    #[test]
    fn unsubscribe_is_immediate_and_idempotent() {
        let broker = StreamBroker::new();
        let sub = broker.subscribe();
        assert_eq!(broker.subscriber_count(), 1);
        broker.unsubscribe(sub.id());
        broker.unsubscribe(sub.id());
        assert_eq!(broker.subscriber_count(), 0);
        // Publishing after removal reaches nobody and drops nothing.
        assert_eq!(broker.publish(packet_event(0)), 0);
    }

    #[test]
    fn dropped_receiver_is_reaped_on_publish() {
        let broker = StreamBroker::new();
        let sub = broker.subscribe();
        let keep = broker.subscribe();
        drop(sub);
        broker.publish(packet_event(0));
        assert_eq!(broker.subscriber_count(), 1);
        assert_eq!(seq_of(&keep.events().recv().unwrap()), 0);
    }

    fn status_event() -> StreamEvent {
        StreamEvent::Status(CaptureStatus {
            is_capturing: true,
            packets_captured: 0,
            capture_start_time: None,
        })
    }

    #[test]
    fn seeded_subscription_gets_its_status_first() {
        let broker = StreamBroker::new();
        let plain = broker.subscribe();
        let seeded = broker.subscribe_with(status_event());

        broker.publish(packet_event(0));

        assert!(matches!(
            seeded.events().recv().unwrap(),
            StreamEvent::Status(_)
        ));
        assert_eq!(seq_of(&seeded.events().recv().unwrap()), 0);
        // The unseeded subscriber sees only the published packet.
        assert_eq!(seq_of(&plain.events().recv().unwrap()), 0);
        assert!(plain.events().try_recv().is_err());
    }

    #[test]
    fn seed_precedes_events_from_a_concurrent_publisher() {
        let broker = Arc::new(StreamBroker::new());
        let publisher = {
            let broker = broker.clone();
            std::thread::spawn(move || {
                for seq in 0..500u32 {
                    broker.publish(packet_event(seq));
                }
            })
        };

        // However subscription interleaves with the publisher, the seed is
        // enqueued before the slot is visible, so it always arrives first.
        for _ in 0..20 {
            let sub = broker.subscribe_with(status_event());
            assert!(matches!(
                sub.events().recv().unwrap(),
                StreamEvent::Status(_)
            ));
            broker.unsubscribe(sub.id());
        }
        publisher.join().unwrap();
    }
}
