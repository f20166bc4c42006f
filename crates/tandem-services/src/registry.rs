//! Connection registry: tracks each live peer and its metadata.

use std::collections::HashMap;
use std::net::IpAddr;
use std::time::Instant;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use tandem_core::protocol::{PartnerInfo, ServerMessage};
use tandem_core::{Location, PeerId, SessionId};

/// Outbound half of a peer's transport. Owned by the transport adapter;
/// the coordinator only ever sends on it. Bounded, so a peer that stops
/// reading loses frames instead of growing the server's memory.
pub type PeerTx = mpsc::Sender<ServerMessage>;

/// Where a peer is in the matching lifecycle.
///
/// `Matched` carries the session id, so a peer can never be matched
/// without a session reference or waiting with one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerStatus {
    Idle,
    Waiting,
    Matched(SessionId),
}

/// Tracked state for one connected peer.
#[derive(Debug)]
pub struct Peer {
    pub id: PeerId,
    /// Originating network address. Used for the self-match check only,
    /// never sent to other peers.
    pub addr: IpAddr,
    tx: PeerTx,
    /// "Unknown" until the asynchronous lookup lands.
    pub location: Location,
    /// `None` means no preference.
    pub hobby: Option<String>,
    pub status: PeerStatus,
    /// From the coordinator's clock at registration.
    pub connected_at: Instant,
}

impl Peer {
    pub fn new(id: PeerId, addr: IpAddr, tx: PeerTx, connected_at: Instant) -> Self {
        Self {
            id,
            addr,
            tx,
            location: Location::unknown(),
            hobby: None,
            status: PeerStatus::Idle,
            connected_at,
        }
    }

    /// Queue a message for delivery without waiting. Returns false if the
    /// transport is gone or its queue is full; the message is dropped.
    pub fn send(&self, message: ServerMessage) -> bool {
        match self.tx.try_send(message) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                tracing::debug!(peer = %self.id, "outbound queue full, message dropped");
                false
            }
            Err(TrySendError::Closed(_)) => {
                tracing::warn!(peer = %self.id, "send on closed transport");
                false
            }
        }
    }

    /// Whether the transport adapter still holds the receiving half.
    pub fn is_live(&self) -> bool {
        !self.tx.is_closed()
    }

    pub fn session(&self) -> Option<SessionId> {
        match self.status {
            PeerStatus::Matched(id) => Some(id),
            _ => None,
        }
    }

    /// The public-safe view of this peer shown to its partner.
    pub fn partner_info(&self) -> PartnerInfo {
        PartnerInfo::new(&self.location, self.hobby.as_deref())
    }
}

/// All live peers, keyed by id. O(1) lookups.
#[derive(Debug, Default)]
pub struct PeerRegistry {
    peers: HashMap<PeerId, Peer>,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, peer: Peer) {
        self.peers.insert(peer.id, peer);
    }

    pub fn get(&self, id: &PeerId) -> Option<&Peer> {
        self.peers.get(id)
    }

    pub fn get_mut(&mut self, id: &PeerId) -> Option<&mut Peer> {
        self.peers.get_mut(id)
    }

    pub fn remove(&mut self, id: &PeerId) -> Option<Peer> {
        self.peers.remove(id)
    }

    pub fn contains(&self, id: &PeerId) -> bool {
        self.peers.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Peer> {
        self.peers.values()
    }
}
