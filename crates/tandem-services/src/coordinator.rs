//! Matching and relay coordinator.
//!
//! Owns the registry, waiting queue, session table and block list. Every
//! mutation happens through `&mut self`, and the transport layer shares
//! one instance behind a `tokio::sync::Mutex`, so a match (scan, dequeue,
//! session creation, both notifications) and a teardown are each a single
//! step that no other handler can observe half-done.
//!
//! Outbound delivery uses `try_send` on bounded channels, which never
//! blocks, so notifications are queued while the lock is held. A peer whose
//! queue is full misses frames rather than stalling the coordinator.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Mutex;

use tandem_core::config::MatchingConfig;
use tandem_core::protocol::{MatchFound, RelayedSignal, ReportRequest};
use tandem_core::report::{truncate_description, ReportSource};
use tandem_core::{
    Location, PeerId, ReportReason, ReportRecord, ServerMessage, SessionId, SignalKind,
    SignalPayload,
};

use crate::clock::Clock;
use crate::matcher::{self, HobbyError};
use crate::moderation::BlockList;
use crate::queue::WaitingQueue;
use crate::registry::{Peer, PeerRegistry, PeerStatus, PeerTx};
use crate::report_sink::ReportSink;
use crate::session::{Session, SessionTable};

pub type SharedCoordinator = Arc<Mutex<Coordinator>>;

pub fn new_shared(coordinator: Coordinator) -> SharedCoordinator {
    Arc::new(Mutex::new(coordinator))
}

#[derive(Debug, thiserror::Error)]
pub enum CoordinatorError {
    #[error("unknown peer {0}")]
    UnknownPeer(PeerId),
    #[error("invalid hobby: {0}")]
    InvalidHobby(#[from] HobbyError),
    #[error("No active chat to report")]
    NotInSession,
    #[error("Already in a chat, use next-stranger to leave it")]
    AlreadyMatched,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOutcome {
    Matched(SessionId),
    Waiting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayOutcome {
    Delivered,
    /// No session, no partner, or the partner's transport is gone.
    Dropped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeardownReason {
    Disconnect,
    Next,
    Report,
}

impl TeardownReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Disconnect => "disconnect",
            Self::Next => "next",
            Self::Report => "report",
        }
    }
}

/// What a teardown actually changed. All-default means it was a no-op.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TeardownOutcome {
    pub dequeued: bool,
    pub ended: Option<SessionId>,
    pub partner_notified: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportOutcome {
    pub report_id: String,
    pub reported: PeerId,
    pub session: SessionId,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoordinatorStats {
    pub active_users: usize,
    pub waiting_users: usize,
    pub active_sessions: usize,
    pub blocked_users: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub id: SessionId,
    pub peers: [PeerId; 2],
    pub age_secs: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockSummary {
    pub peer: PeerId,
    pub remaining_secs: u64,
}

pub struct Coordinator {
    registry: PeerRegistry,
    queue: WaitingQueue,
    sessions: SessionTable,
    blocks: BlockList,
    clock: Arc<dyn Clock>,
    reports: Arc<dyn ReportSink>,
    block_ttl: Duration,
    max_hobby_len: usize,
}

impl Coordinator {
    pub fn new(config: &MatchingConfig, clock: Arc<dyn Clock>, reports: Arc<dyn ReportSink>) -> Self {
        Self {
            registry: PeerRegistry::new(),
            queue: WaitingQueue::new(),
            sessions: SessionTable::new(),
            blocks: BlockList::new(),
            clock,
            reports,
            block_ttl: config.block_ttl(),
            max_hobby_len: config.max_hobby_len,
        }
    }

    // ── Registry ──────────────────────────────────────────────────────────────

    /// Track a new connection. The peer starts Idle with an unknown location.
    pub fn register(&mut self, id: PeerId, addr: IpAddr, tx: PeerTx) {
        let peer = Peer::new(id, addr, tx, self.clock.now());
        self.registry.insert(peer);
        tracing::debug!(peer = %id, %addr, "peer registered");
    }

    /// Attach a resolved location. Returns false if the peer has already
    /// gone, in which case the result is discarded.
    pub fn set_location(&mut self, id: &PeerId, location: Location) -> bool {
        match self.registry.get_mut(id) {
            Some(peer) => {
                tracing::debug!(peer = %id, country = %location.country_code, "location attached");
                peer.location = location;
                true
            }
            None => {
                tracing::debug!(peer = %id, "late location result discarded");
                false
            }
        }
    }

    /// Set or clear the hobby tag. Returns the normalised value.
    pub fn set_hobby(
        &mut self,
        id: &PeerId,
        raw: Option<&str>,
    ) -> Result<Option<String>, CoordinatorError> {
        let max_len = self.max_hobby_len;
        let peer = self
            .registry
            .get_mut(id)
            .ok_or(CoordinatorError::UnknownPeer(*id))?;
        let hobby = matcher::normalize_hobby(raw, max_len)?;
        tracing::debug!(peer = %id, hobby = ?hobby, "hobby preference set");
        peer.hobby = hobby.clone();
        Ok(hobby)
    }

    /// Tear down whatever the peer is part of, then forget it.
    pub fn unregister(&mut self, id: &PeerId) -> Option<Peer> {
        self.teardown(id, TeardownReason::Disconnect);
        let peer = self.registry.remove(id);
        if let Some(peer) = &peer {
            let connected_secs = self
                .clock
                .now()
                .saturating_duration_since(peer.connected_at)
                .as_secs();
            tracing::debug!(peer = %id, connected_secs, "peer unregistered");
        }
        peer
    }

    // ── Matching ──────────────────────────────────────────────────────────────

    /// Pair with the oldest compatible waiting peer, or join the queue.
    pub fn find_match(&mut self, id: &PeerId) -> Result<MatchOutcome, CoordinatorError> {
        let now = self.clock.now();
        let seeker = self
            .registry
            .get(id)
            .ok_or(CoordinatorError::UnknownPeer(*id))?;
        if matches!(seeker.status, PeerStatus::Matched(_)) {
            return Err(CoordinatorError::AlreadyMatched);
        }

        self.queue.remove(id);
        let candidate = matcher::first_fit(seeker, &self.queue, &self.registry, &self.blocks, now);

        match candidate {
            Some(partner) => {
                self.queue.remove(&partner);
                let session = self.create_session(*id, partner)?;
                Ok(MatchOutcome::Matched(session))
            }
            None => {
                self.queue.push_back(*id);
                if let Some(peer) = self.registry.get_mut(id) {
                    peer.status = PeerStatus::Waiting;
                    peer.send(ServerMessage::WaitingForMatch);
                }
                tracing::debug!(peer = %id, waiting = self.queue.len(), "no compatible partner, queued");
                Ok(MatchOutcome::Waiting)
            }
        }
    }

    fn create_session(&mut self, a: PeerId, b: PeerId) -> Result<SessionId, CoordinatorError> {
        let session = Session::new(a, b, self.clock.now());
        let session_id = session.id;

        let peer_a = self.registry.get(&a).ok_or(CoordinatorError::UnknownPeer(a))?;
        let peer_b = self.registry.get(&b).ok_or(CoordinatorError::UnknownPeer(b))?;
        peer_a.send(ServerMessage::MatchFound(MatchFound {
            session_id,
            partner: peer_b.partner_info(),
        }));
        peer_b.send(ServerMessage::MatchFound(MatchFound {
            session_id,
            partner: peer_a.partner_info(),
        }));

        for id in [a, b] {
            if let Some(peer) = self.registry.get_mut(&id) {
                peer.status = PeerStatus::Matched(session_id);
            }
        }
        self.sessions.insert(session);
        tracing::info!(session = %session_id, a = %a, b = %b, "match created");
        Ok(session_id)
    }

    // ── Relay ─────────────────────────────────────────────────────────────────

    /// Forward a signaling payload to the sender's current partner.
    pub fn relay(&self, from: &PeerId, kind: SignalKind, payload: SignalPayload) -> RelayOutcome {
        let partner = self
            .registry
            .get(from)
            .and_then(Peer::session)
            .and_then(|session| self.sessions.get(&session))
            .and_then(|session| session.partner_of(from))
            .and_then(|partner| self.registry.get(&partner));

        let Some(partner) = partner else {
            tracing::debug!(peer = %from, kind = kind.name(), "signal without session dropped");
            return RelayOutcome::Dropped;
        };

        if partner.send(kind.outbound(RelayedSignal::stamp(*from, payload))) {
            RelayOutcome::Delivered
        } else {
            RelayOutcome::Dropped
        }
    }

    // ── Moderation ────────────────────────────────────────────────────────────

    /// Report the reporter's current partner: block it from matching for
    /// the TTL, end the session, acknowledge the reporter, hand the record
    /// to the report sink. The reported peer only sees `partner-disconnected`.
    pub fn report(
        &mut self,
        reporter: &PeerId,
        request: ReportRequest,
    ) -> Result<ReportOutcome, CoordinatorError> {
        let peer = self
            .registry
            .get(reporter)
            .ok_or(CoordinatorError::UnknownPeer(*reporter))?;
        let reporter_addr = peer.addr;
        let session = peer.session().ok_or(CoordinatorError::NotInSession)?;
        let reported = self
            .sessions
            .get(&session)
            .and_then(|s| s.partner_of(reporter))
            .ok_or(CoordinatorError::NotInSession)?;

        self.blocks.block(reported, self.clock.now() + self.block_ttl);
        self.teardown(reporter, TeardownReason::Report);

        if let Some(peer) = self.registry.get(reporter) {
            peer.send(ServerMessage::ReportSubmitted);
        }

        let mut record = ReportRecord::new(
            ReportSource::Session,
            reported.to_string(),
            ReportReason::parse_lenient(&request.reason),
            truncate_description(request.description.as_deref().unwrap_or_default()),
        );
        record.reporter = Some(*reporter);
        record.reporter_addr = Some(reporter_addr);
        record.session = Some(session);
        let report_id = record.id.clone();
        self.reports.submit(record);

        Ok(ReportOutcome {
            report_id,
            reported,
            session,
        })
    }

    /// Release expired block entries.
    pub fn sweep_blocks(&mut self) -> usize {
        self.blocks.sweep(self.clock.now()).len()
    }

    pub fn is_blocked(&self, id: &PeerId) -> bool {
        self.blocks.is_blocked(id, self.clock.now())
    }

    // ── Teardown ──────────────────────────────────────────────────────────────

    /// Leave the queue and end the current session, if any.
    ///
    /// The partner is reset to Idle (not re-queued) and told
    /// `partner-disconnected` if its transport is still open. Calling this
    /// again for the same peer changes nothing.
    pub fn teardown(&mut self, id: &PeerId, reason: TeardownReason) -> TeardownOutcome {
        let mut outcome = TeardownOutcome {
            dequeued: self.queue.remove(id),
            ..TeardownOutcome::default()
        };

        let Some(peer) = self.registry.get_mut(id) else {
            return outcome;
        };
        let session_id = peer.session();
        peer.status = PeerStatus::Idle;

        let Some(session) = session_id.and_then(|sid| self.sessions.remove(&sid)) else {
            return outcome;
        };
        outcome.ended = Some(session.id);

        if let Some(partner) = session
            .partner_of(id)
            .and_then(|partner| self.registry.get_mut(&partner))
        {
            if partner.status == PeerStatus::Matched(session.id) {
                partner.status = PeerStatus::Idle;
                if partner.is_live() {
                    outcome.partner_notified = partner.send(ServerMessage::PartnerDisconnected);
                }
            }
        }

        tracing::info!(
            session = %session.id,
            peer = %id,
            reason = reason.as_str(),
            "session ended"
        );
        outcome
    }

    /// Leave the current partner and look for a new one straight away.
    pub fn next(&mut self, id: &PeerId) -> Result<MatchOutcome, CoordinatorError> {
        if !self.registry.contains(id) {
            return Err(CoordinatorError::UnknownPeer(*id));
        }
        self.teardown(id, TeardownReason::Next);
        self.find_match(id)
    }

    // ── Introspection ─────────────────────────────────────────────────────────

    pub fn stats(&self) -> CoordinatorStats {
        CoordinatorStats {
            active_users: self.registry.len(),
            waiting_users: self.queue.len(),
            active_sessions: self.sessions.len(),
            blocked_users: self.blocks.active_count(self.clock.now()),
        }
    }

    pub fn peer(&self, id: &PeerId) -> Option<&Peer> {
        self.registry.get(id)
    }

    pub fn status(&self, id: &PeerId) -> Option<PeerStatus> {
        self.registry.get(id).map(|p| p.status)
    }

    pub fn is_waiting(&self, id: &PeerId) -> bool {
        self.queue.contains(id)
    }

    pub fn sessions(&self) -> Vec<SessionSummary> {
        let now = self.clock.now();
        let mut out: Vec<_> = self
            .sessions
            .iter()
            .map(|s| SessionSummary {
                id: s.id,
                peers: s.peers,
                age_secs: now.saturating_duration_since(s.started_at).as_secs(),
            })
            .collect();
        out.sort_by(|a, b| b.age_secs.cmp(&a.age_secs));
        out
    }

    pub fn blocks(&self) -> Vec<BlockSummary> {
        let mut out: Vec<_> = self
            .blocks
            .list(self.clock.now())
            .into_iter()
            .map(|(peer, remaining)| BlockSummary {
                peer,
                remaining_secs: remaining.as_secs(),
            })
            .collect();
        out.sort_by_key(|b| b.remaining_secs);
        out
    }
}
