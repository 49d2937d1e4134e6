//! Bounded shared message channel with port semantics.
//!
//! Many independent instances (schedulers, the allocator, the dispatcher)
//! exchange JSON strings over one of these. The contract mirrors a bounded
//! port: non-blocking writes that fail when full, a non-destructive `peek`
//! at the head entry, and a destructive `read`. The peek-then-conditionally-
//! consume discipline in [`crate::infra::envelope`] depends on `pop_head_if`
//! being atomic so two consumers can never take the same entry.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

/// A cloneable handle to a bounded, shared FIFO of JSON-encoded messages.
#[derive(Clone)]
pub struct SharedChannel {
    queue: Arc<Mutex<VecDeque<String>>>,
    capacity: usize,
}

impl SharedChannel {
    /// Create a channel holding at most `capacity` entries.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity,
        }
    }

    /// Non-blocking write; returns `false` when the channel is full.
    pub fn try_write(&self, message: String) -> bool {
        let mut queue = self.queue.lock();
        if queue.len() >= self.capacity {
            return false;
        }
        queue.push_back(message);
        true
    }

    /// Inspect the head entry without consuming it.
    #[must_use]
    pub fn peek(&self) -> Option<String> {
        self.queue.lock().front().cloned()
    }

    /// Consume and return the head entry.
    #[must_use]
    pub fn read(&self) -> Option<String> {
        self.queue.lock().pop_front()
    }

    /// Atomically consume the head entry only if `decide` approves it.
    ///
    /// The closure runs under the channel lock, so a matching head cannot be
    /// taken by another consumer between inspection and removal.
    pub fn pop_head_if(&self, decide: impl FnOnce(&str) -> bool) -> Option<String> {
        let mut queue = self.queue.lock();
        if queue.front().is_some_and(|head| decide(head)) {
            queue.pop_front()
        } else {
            None
        }
    }

    /// Number of queued entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    /// Whether the channel is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }
}
