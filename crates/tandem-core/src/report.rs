//! Abuse reports: reasons, validation, and the finalized record handed
//! to the report sink.

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::id::{PeerId, SessionId};

/// Longest accepted free-text description.
pub const MAX_DESCRIPTION_LEN: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportReason {
    InappropriateBehavior,
    Harassment,
    Nudity,
    Spam,
    Underage,
    Violence,
    Other,
}

impl ReportReason {
    pub const ALL: [ReportReason; 7] = [
        Self::InappropriateBehavior,
        Self::Harassment,
        Self::Nudity,
        Self::Spam,
        Self::Underage,
        Self::Violence,
        Self::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::InappropriateBehavior => "inappropriate_behavior",
            Self::Harassment => "harassment",
            Self::Nudity => "nudity",
            Self::Spam => "spam",
            Self::Underage => "underage",
            Self::Violence => "violence",
            Self::Other => "other",
        }
    }

    /// Parse, mapping anything unrecognised to `Other`.
    pub fn parse_lenient(s: &str) -> Self {
        s.parse().unwrap_or(Self::Other)
    }
}

impl fmt::Display for ReportReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportReason {
    type Err = ReportValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ReportValidationError::UnknownReason(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReportValidationError {
    #[error("unknown report reason: {0}")]
    UnknownReason(String),
    #[error("description is {0} characters, maximum is {MAX_DESCRIPTION_LEN}")]
    DescriptionTooLong(usize),
    #[error("reportedUserId is required")]
    MissingReportedUser,
    #[error("reason is required")]
    MissingReason,
}

/// Reject descriptions over the limit.
pub fn validate_description(description: &str) -> Result<(), ReportValidationError> {
    let len = description.chars().count();
    if len > MAX_DESCRIPTION_LEN {
        return Err(ReportValidationError::DescriptionTooLong(len));
    }
    Ok(())
}

/// Clamp a description to the limit on a char boundary.
pub fn truncate_description(description: &str) -> String {
    description.chars().take(MAX_DESCRIPTION_LEN).collect()
}

/// Where a report came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportSource {
    /// `report-user` from inside a live session.
    Session,
    /// `POST /api/report`.
    Http,
}

/// A finalized report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRecord {
    pub id: String,
    pub source: ReportSource,
    pub reported: String,
    pub reporter: Option<PeerId>,
    pub reporter_addr: Option<IpAddr>,
    pub session: Option<SessionId>,
    pub reason: ReportReason,
    pub description: String,
    /// Unix milliseconds.
    pub submitted_at: u64,
}

impl ReportRecord {
    pub fn new(
        source: ReportSource,
        reported: impl Into<String>,
        reason: ReportReason,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            source,
            reported: reported.into(),
            reporter: None,
            reporter_addr: None,
            session: None,
            reason,
            description: description.into(),
            submitted_at: unix_millis(),
        }
    }
}

/// Current wall-clock time in unix milliseconds.
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
