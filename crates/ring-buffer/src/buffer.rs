//! Bounded FIFO Implementation

use crate::{OverflowPolicy, PushOutcome};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use telemetry_core::WireRecord;
use tokio::sync::Notify;
use tracing::warn;

/// Default capacity (~40 s of a 100 frames/s bus)
pub const DEFAULT_CAPACITY: usize = 4096;

/// Counters since creation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    pub pushed: u64,
    pub popped: u64,
    pub dropped: u64,
}

/// Bounded FIFO of wire records with push wake-ups
pub struct HandoffQueue {
    /// Queued records, oldest at the front
    records: Mutex<VecDeque<WireRecord>>,
    /// Maximum number of queued records
    capacity: usize,
    /// Overflow behaviour when full
    policy: OverflowPolicy,
    /// Wakes the consumer after a push
    pushed_notify: Notify,
    pushed: AtomicU64,
    popped: AtomicU64,
    dropped: AtomicU64,
}

impl HandoffQueue {
    /// Create a queue holding at most `capacity` records (minimum 1)
    pub fn new(capacity: usize, policy: OverflowPolicy) -> Self {
        let capacity = capacity.max(1);
        Self {
            records: Mutex::new(VecDeque::with_capacity(capacity.min(DEFAULT_CAPACITY))),
            capacity,
            policy,
            pushed_notify: Notify::new(),
            pushed: AtomicU64::new(0),
            popped: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    /// Create a queue with default capacity, dropping the oldest on overflow
    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_CAPACITY, OverflowPolicy::default())
    }

    /// Append a record. Never blocks, never fails.
    pub fn push(&self, record: WireRecord) -> PushOutcome {
        let (outcome, depth) = {
            let mut records = self.lock();
            let outcome = if records.len() < self.capacity {
                records.push_back(record);
                PushOutcome::Queued
            } else {
                match self.policy {
                    OverflowPolicy::DropOldest => {
                        let evicted = records.pop_front();
                        records.push_back(record);
                        match evicted {
                            Some(old) => PushOutcome::DroppedOldest(old),
                            None => PushOutcome::Queued,
                        }
                    }
                    OverflowPolicy::DropNewest => PushOutcome::DroppedNewest,
                }
            };
            (outcome, records.len())
        };

        self.pushed.fetch_add(1, Ordering::Relaxed);
        metrics::gauge!("canlink_queue_depth").set(depth as f64);

        match outcome {
            PushOutcome::Queued => {}
            PushOutcome::DroppedOldest(_) | PushOutcome::DroppedNewest => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                metrics::counter!("canlink_queue_dropped_total").increment(1);
                // One warning per 1000 drops keeps long outages readable
                if dropped % 1000 == 1 {
                    warn!(
                        "Hand-off queue full ({} records), {:?}: {} dropped so far",
                        self.capacity, self.policy, dropped
                    );
                }
            }
        }

        if outcome != PushOutcome::DroppedNewest {
            self.pushed_notify.notify_one();
        }
        outcome
    }

    /// Remove and return the oldest record, if any. Never blocks.
    pub fn try_pop(&self) -> Option<WireRecord> {
        let record = self.lock().pop_front();
        if record.is_some() {
            self.popped.fetch_add(1, Ordering::Relaxed);
        }
        record
    }

    /// Wait until a push happens. A push since the last wait completes
    /// this immediately. Intended for the single consumer.
    pub async fn notified(&self) {
        self.pushed_notify.notified().await;
    }

    /// Number of queued records
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the queue is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of queued records
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Configured overflow policy
    pub fn policy(&self) -> OverflowPolicy {
        self.policy
    }

    /// Counters since creation
    pub fn stats(&self) -> QueueStats {
        QueueStats {
            pushed: self.pushed.load(Ordering::Relaxed),
            popped: self.popped.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<WireRecord>> {
        // A panic elsewhere cannot leave the deque half-updated
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for HandoffQueue {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    fn record(n: u32) -> WireRecord {
        WireRecord::new(n, n as u8, &n.to_le_bytes())
    }

    #[test]
    fn test_fifo_order() {
        let queue = HandoffQueue::with_default_capacity();
        queue.push(record(1));
        queue.push(record(2));
        queue.push(record(3));

        assert_eq!(queue.try_pop(), Some(record(1)));
        assert_eq!(queue.try_pop(), Some(record(2)));
        assert_eq!(queue.try_pop(), Some(record(3)));
        assert_eq!(queue.try_pop(), None);
    }

    #[test]
    fn test_drop_oldest_when_full() {
        let queue = HandoffQueue::new(2, OverflowPolicy::DropOldest);
        queue.push(record(1));
        queue.push(record(2));

        assert_eq!(queue.push(record(3)), PushOutcome::DroppedOldest(record(1)));
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.try_pop(), Some(record(2)));
        assert_eq!(queue.try_pop(), Some(record(3)));
        assert_eq!(queue.stats().dropped, 1);
    }

    #[test]
    fn test_drop_newest_when_full() {
        let queue = HandoffQueue::new(2, OverflowPolicy::DropNewest);
        queue.push(record(1));
        queue.push(record(2));

        assert_eq!(queue.push(record(3)), PushOutcome::DroppedNewest);
        assert_eq!(queue.try_pop(), Some(record(1)));
        assert_eq!(queue.try_pop(), Some(record(2)));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_zero_capacity_is_raised_to_one() {
        let queue = HandoffQueue::new(0, OverflowPolicy::DropOldest);
        assert_eq!(queue.capacity(), 1);
        queue.push(record(1));
        queue.push(record(2));
        assert_eq!(queue.try_pop(), Some(record(2)));
    }

    #[test]
    fn test_order_with_concurrent_producer() {
        let queue = Arc::new(HandoffQueue::new(100_000, OverflowPolicy::DropNewest));
        let producer = {
            let queue = queue.clone();
            std::thread::spawn(move || {
                for n in 0..10_000 {
                    queue.push(record(n));
                }
            })
        };

        let mut next = 0u32;
        while next < 10_000 {
            if let Some(r) = queue.try_pop() {
                assert_eq!(r.timestamp(), next);
                next += 1;
            } else {
                std::thread::yield_now();
            }
        }
        producer.join().unwrap();

        let stats = queue.stats();
        assert_eq!(stats.pushed, 10_000);
        assert_eq!(stats.popped, 10_000);
    }

    #[tokio::test]
    async fn test_push_wakes_consumer() {
        let queue = Arc::new(HandoffQueue::with_default_capacity());
        let waiter = {
            let queue = queue.clone();
            tokio::spawn(async move {
                queue.notified().await;
                queue.try_pop()
            })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        queue.push(record(9));

        let popped = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(popped, Some(record(9)));
    }
}
