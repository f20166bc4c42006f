//! Wire protocol between peers and the coordinator.
//!
//! Every frame is a JSON object `{"type": "<kebab-case>", "data": ...}`.
//! Unit messages omit `data`. Signaling payloads are opaque JSON objects;
//! the coordinator only stamps the sender id onto them.

use serde::{Deserialize, Serialize};

use crate::id::{PeerId, SessionId};
use crate::location::Location;

/// Opaque signaling payload (SDP offer/answer, ICE candidate, ...).
pub type SignalPayload = serde_json::Map<String, serde_json::Value>;

/// Key stamped onto relayed payloads.
pub const FROM_KEY: &str = "from";

// ── Inbound ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case")]
pub enum ClientMessage {
    /// `null` clears the preference.
    SetHobbyPreference(Option<String>),
    FindMatch,
    Offer(SignalPayload),
    Answer(SignalPayload),
    IceCandidate(SignalPayload),
    NextStranger,
    ReportUser(ReportRequest),
}

impl ClientMessage {
    /// Split a signaling message into its kind and payload.
    pub fn into_signal(self) -> Result<(SignalKind, SignalPayload), Self> {
        match self {
            Self::Offer(p) => Ok((SignalKind::Offer, p)),
            Self::Answer(p) => Ok((SignalKind::Answer, p)),
            Self::IceCandidate(p) => Ok((SignalKind::IceCandidate, p)),
            other => Err(other),
        }
    }
}

/// Body of `report-user`. The reason is kept as a raw string so an
/// unrecognised value degrades to "other" instead of rejecting the frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRequest {
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

// ── Outbound ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case")]
pub enum ServerMessage {
    WaitingForMatch,
    MatchFound(MatchFound),
    Offer(RelayedSignal),
    Answer(RelayedSignal),
    IceCandidate(RelayedSignal),
    PartnerDisconnected,
    ReportSubmitted,
    Error(ErrorBody),
}

impl ServerMessage {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(ErrorBody {
            message: message.into(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchFound {
    pub session_id: SessionId,
    pub partner: PartnerInfo,
}

/// What a peer learns about its partner. Never carries the partner's
/// network address or transport handle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartnerInfo {
    pub country: String,
    pub country_code: String,
    pub location_flag: String,
    pub city: String,
    pub hobby: Option<String>,
}

impl PartnerInfo {
    pub fn new(location: &Location, hobby: Option<&str>) -> Self {
        Self {
            country: location.country.clone(),
            country_code: location.country_code.clone(),
            location_flag: location.flag.clone(),
            city: location.city.clone(),
            hobby: hobby.map(str::to_owned),
        }
    }
}

/// A signaling payload forwarded verbatim, plus the sender id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayedSignal {
    #[serde(flatten)]
    pub payload: SignalPayload,
    pub from: PeerId,
}

impl RelayedSignal {
    /// Stamp the sender. A client-supplied `from` is replaced, not duplicated.
    pub fn stamp(from: PeerId, mut payload: SignalPayload) -> Self {
        payload.remove(FROM_KEY);
        Self { payload, from }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
}

/// The three relayable signaling message kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    Offer,
    Answer,
    IceCandidate,
}

impl SignalKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Offer => "offer",
            Self::Answer => "answer",
            Self::IceCandidate => "ice-candidate",
        }
    }

    /// Wrap a stamped payload in the matching outbound message.
    pub fn outbound(self, signal: RelayedSignal) -> ServerMessage {
        match self {
            Self::Offer => ServerMessage::Offer(signal),
            Self::Answer => ServerMessage::Answer(signal),
            Self::IceCandidate => ServerMessage::IceCandidate(signal),
        }
    }
}
