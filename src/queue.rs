//! Bounded drop-oldest delivery queue

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::Notify;

use crate::error::{AcquireError, Result};
use crate::types::DeliveryPackage;

/// Default bound on the push-side lock wait.
pub const DEFAULT_PUSH_WAIT: Duration = Duration::from_millis(100);

/// Fixed-capacity FIFO of delivery packages with drop-oldest backpressure.
///
/// The queue sits between the acquisition worker and whatever transmits
/// packages onward; both sides hold it through an `Arc`. Under sustained
/// load it sheds the oldest undelivered package instead of growing or
/// blocking: a push against a full queue evicts the head and appends, inside
/// one critical section, so the length never exceeds capacity and two
/// producers can never both evict for the same slot.
///
/// Producers never wait on consumers. The only wait anywhere is push-side
/// lock acquisition, bounded by the configured push wait, after which the
/// push fails with [`AcquireError::QueueBusy`] instead of stalling the frame
/// callback.
pub struct DeliveryQueue {
    inner: Mutex<VecDeque<DeliveryPackage>>,
    capacity: usize,
    push_wait: Duration,
    ready: Notify,
}

impl DeliveryQueue {
    /// Create a queue bounded at `capacity` packages with the default push
    /// wait.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero; a queue that can hold nothing cannot
    /// satisfy the drop-oldest contract.
    pub fn new(capacity: usize) -> Self {
        Self::with_push_wait(capacity, DEFAULT_PUSH_WAIT)
    }

    /// Create a queue with an explicit bound on the push-side lock wait.
    pub fn with_push_wait(capacity: usize, push_wait: Duration) -> Self {
        assert!(capacity > 0, "delivery queue capacity must be at least 1");
        Self {
            inner: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            push_wait,
            ready: Notify::new(),
        }
    }

    /// Append `package`, evicting the oldest entry if the queue is full.
    ///
    /// Returns the evicted package when eviction happened, `Ok(None)` on a
    /// plain append, and [`AcquireError::QueueBusy`] when the lock could not
    /// be acquired within the push wait. Capacity never makes a push fail.
    pub fn push(&self, package: DeliveryPackage) -> Result<Option<DeliveryPackage>> {
        let Some(mut queue) = self.inner.try_lock_for(self.push_wait) else {
            return Err(AcquireError::QueueBusy { waited: self.push_wait });
        };
        let evicted = if queue.len() == self.capacity { queue.pop_front() } else { None };
        queue.push_back(package);
        drop(queue);

        self.ready.notify_one();
        Ok(evicted)
    }

    /// Remove and return the oldest package, or `None` when empty.
    pub fn pop(&self) -> Option<DeliveryPackage> {
        self.inner.lock().pop_front()
    }

    /// Wait for the next package.
    ///
    /// Consumer-side convenience over [`pop`](DeliveryQueue::pop): parks on a
    /// notification instead of spinning. Intended for a single draining task;
    /// with several concurrent callers each package wakes only one of them.
    pub async fn recv(&self) -> DeliveryPackage {
        loop {
            if let Some(package) = self.pop() {
                return package;
            }
            self.ready.notified().await;
        }
    }

    /// Remove and return everything currently queued, oldest first.
    pub fn drain(&self) -> Vec<DeliveryPackage> {
        self.inner.lock().drain(..).collect()
    }

    /// Number of packages currently queued.
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Whether the queue is currently empty.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// The fixed capacity set at construction.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
