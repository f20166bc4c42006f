//! Waiting queue: peers seeking a match, in arrival order.

use std::collections::{HashSet, VecDeque};

use tandem_core::PeerId;

/// FIFO of waiting peer ids. An id appears at most once; re-entering
/// moves it to the back as a fresh arrival.
#[derive(Debug, Default)]
pub struct WaitingQueue {
    order: VecDeque<PeerId>,
    members: HashSet<PeerId>,
}

impl WaitingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append as the newest arrival, dropping any earlier position.
    pub fn push_back(&mut self, id: PeerId) {
        self.remove(&id);
        self.members.insert(id);
        self.order.push_back(id);
    }

    /// Returns true if the id was queued.
    pub fn remove(&mut self, id: &PeerId) -> bool {
        if !self.members.remove(id) {
            return false;
        }
        self.order.retain(|p| p != id);
        true
    }

    pub fn contains(&self, id: &PeerId) -> bool {
        self.members.contains(id)
    }

    /// Waiting ids, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &PeerId> {
        self.order.iter()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
