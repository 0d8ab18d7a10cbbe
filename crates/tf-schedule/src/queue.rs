//! `SpawnQueue`: sparse per-tick spawn queue.
//!
//! Most ticks spawn nothing.  Keying requests by tick makes the per-tick
//! check a single `BTreeMap` lookup instead of a scan over every pending
//! request.

use std::collections::BTreeMap;

use tf_core::Tick;

use crate::SpawnRequest;

#[derive(Clone, Debug, Default)]
pub struct SpawnQueue {
    inner: BTreeMap<Tick, Vec<SpawnRequest>>,
    /// Cached total request count for O(1) `len()`.
    total: usize,
}

impl SpawnQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_requests(requests: impl IntoIterator<Item = SpawnRequest>) -> Self {
        let mut queue = Self::new();
        for r in requests {
            queue.push(r);
        }
        queue
    }

    /// Requests for the same tick keep their insertion order.
    pub fn push(&mut self, request: SpawnRequest) {
        self.inner.entry(request.tick).or_default().push(request);
        self.total += 1;
    }

    /// Remove and return all requests scheduled for exactly `tick`.
    pub fn drain_tick(&mut self, tick: Tick) -> Option<Vec<SpawnRequest>> {
        let requests = self.inner.remove(&tick)?;
        self.total -= requests.len();
        Some(requests)
    }

    /// Remove and return every request due at or before `now`, oldest tick
    /// first.
    pub fn drain_due(&mut self, now: Tick) -> Vec<SpawnRequest> {
        let later = self.inner.split_off(&now.offset(1));
        let due = std::mem::replace(&mut self.inner, later);
        let out: Vec<SpawnRequest> = due.into_values().flatten().collect();
        self.total -= out.len();
        out
    }

    /// The earliest tick with at least one request, or `None` if empty.
    pub fn next_tick(&self) -> Option<Tick> {
        self.inner.keys().next().copied()
    }

    pub fn len(&self) -> usize {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Number of distinct future ticks that have at least one request.
    pub fn tick_count(&self) -> usize {
        self.inner.len()
    }

    pub fn clear(&mut self) {
        self.inner.clear();
        self.total = 0;
    }
}
