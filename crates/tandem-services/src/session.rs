//! Session table: tracks active paired sessions.

use std::collections::HashMap;
use std::time::Instant;

use tandem_core::{PeerId, SessionId};

/// A bound pair of peers. Created by a successful match, destroyed by
/// teardown, never mutated in between.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: SessionId,
    /// Always two distinct peers.
    pub peers: [PeerId; 2],
    /// From the coordinator's clock; drives `age_secs` in operator views.
    pub started_at: Instant,
}

impl Session {
    pub fn new(a: PeerId, b: PeerId, started_at: Instant) -> Self {
        debug_assert_ne!(a, b, "a session needs two distinct peers");
        Self {
            id: SessionId::new(),
            peers: [a, b],
            started_at,
        }
    }

    /// The other participant, or `None` if `peer` is not in this session.
    pub fn partner_of(&self, peer: &PeerId) -> Option<PeerId> {
        match self.peers {
            [a, b] if a == *peer => Some(b),
            [a, b] if b == *peer => Some(a),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
pub struct SessionTable {
    sessions: HashMap<SessionId, Session>,
}

impl SessionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, session: Session) {
        self.sessions.insert(session.id, session);
    }

    pub fn get(&self, id: &SessionId) -> Option<&Session> {
        self.sessions.get(id)
    }

    pub fn remove(&mut self, id: &SessionId) -> Option<Session> {
        self.sessions.remove(id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Session> {
        self.sessions.values()
    }
}
