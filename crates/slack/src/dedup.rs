//! Duplicate-delivery suppression.
//!
//! Slack retries webhook deliveries on slow acks, so the same `event_id`
//! can arrive more than once. This set remembers recently processed ids so
//! each event is answered at most once. It is capacity-bounded (oldest
//! recorded ids are evicted first) and deliberately not durable; a restart
//! clears it.

use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;

#[derive(Debug)]
pub struct SeenEventIds {
    inner: Mutex<SeenInner>,
    capacity: usize,
}

#[derive(Debug, Default)]
struct SeenInner {
    order: VecDeque<String>,
    members: HashSet<String>,
}

impl SeenEventIds {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "dedup capacity must be non-zero");
        Self { inner: Mutex::new(SeenInner::default()), capacity }
    }

    /// Record an event id. Returns `false` when the id was already present,
    /// meaning the delivery is a retry and must be dropped.
    ///
    /// Safe under concurrent deliveries racing on the same id; exactly one
    /// caller observes `true`.
    pub fn insert(&self, event_id: &str) -> bool {
        let mut inner = self.inner.lock().expect("seen-event lock poisoned");

        if !inner.members.insert(event_id.to_string()) {
            return false;
        }
        inner.order.push_back(event_id.to_string());

        while inner.order.len() > self.capacity {
            if let Some(oldest) = inner.order.pop_front() {
                inner.members.remove(&oldest);
            }
        }

        true
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("seen-event lock poisoned").members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
