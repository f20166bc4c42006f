//! Moderation gate: temporary block list populated by reports.
//!
//! A blocked peer stays connected and may keep queueing, but the
//! compatibility check refuses to pair it with anyone until its entry
//! expires. Expiry is checked lazily on every lookup, and a periodic
//! sweep pops dead entries off a min-heap keyed by expiry time, so there
//! is no per-report timer.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::time::{Duration, Instant};

use tandem_core::PeerId;

#[derive(Debug, Default)]
pub struct BlockList {
    /// Current expiry per blocked peer. Authoritative.
    expiries: HashMap<PeerId, Instant>,
    /// Sweep order. May hold stale entries for peers whose block was
    /// extended; those are skipped when popped.
    heap: BinaryHeap<Reverse<(Instant, PeerId)>>,
}

impl BlockList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block `peer` until `until`. A repeat report never shortens an
    /// existing block.
    pub fn block(&mut self, peer: PeerId, until: Instant) {
        let expiry = *self
            .expiries
            .entry(peer)
            .and_modify(|e| *e = (*e).max(until))
            .or_insert(until);
        self.heap.push(Reverse((expiry, peer)));
        tracing::info!(peer = %peer, "peer blocked from matching");
    }

    /// An entry whose expiry has passed never blocks, swept or not.
    pub fn is_blocked(&self, peer: &PeerId, now: Instant) -> bool {
        self.expiries.get(peer).is_some_and(|expiry| *expiry > now)
    }

    /// Time left on an active block.
    pub fn remaining(&self, peer: &PeerId, now: Instant) -> Option<Duration> {
        self.expiries
            .get(peer)
            .filter(|expiry| **expiry > now)
            .map(|expiry| *expiry - now)
    }

    /// Drop every expired entry. Returns the released peers.
    pub fn sweep(&mut self, now: Instant) -> Vec<PeerId> {
        let mut released = Vec::new();
        while let Some(Reverse((expiry, peer))) = self.heap.peek().copied() {
            if expiry > now {
                break;
            }
            self.heap.pop();
            if self.expiries.get(&peer) == Some(&expiry) {
                self.expiries.remove(&peer);
                released.push(peer);
            }
        }
        if !released.is_empty() {
            tracing::debug!(released = released.len(), "expired block entries swept");
        }
        released
    }

    /// Active blocks with their remaining time.
    pub fn list(&self, now: Instant) -> Vec<(PeerId, Duration)> {
        self.expiries
            .iter()
            .filter(|(_, expiry)| **expiry > now)
            .map(|(peer, expiry)| (*peer, *expiry - now))
            .collect()
    }

    pub fn active_count(&self, now: Instant) -> usize {
        self.expiries.values().filter(|e| **e > now).count()
    }
}
