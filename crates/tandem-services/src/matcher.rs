//! Compatibility matcher: first-fit scan of the waiting queue.

use std::time::Instant;

use tandem_core::PeerId;

use crate::moderation::BlockList;
use crate::queue::WaitingQueue;
use crate::registry::{Peer, PeerRegistry};

/// Whether `a` and `b` may be paired right now.
///
/// - never if either side is under an active block
/// - never if both come from the same network address
/// - hobbies must be equal when both are set; an unset hobby pairs with anything
pub fn is_compatible(a: &Peer, b: &Peer, blocks: &BlockList, now: Instant) -> bool {
    if a.id == b.id {
        return false;
    }
    if blocks.is_blocked(&a.id, now) || blocks.is_blocked(&b.id, now) {
        return false;
    }
    if a.addr == b.addr {
        return false;
    }
    hobbies_compatible(a.hobby.as_deref(), b.hobby.as_deref())
}

pub fn hobbies_compatible(a: Option<&str>, b: Option<&str>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a == b,
        _ => true,
    }
}

/// First waiting peer, in arrival order, compatible with `seeker`.
/// Entries with no registry record or a closed transport are skipped.
pub fn first_fit(
    seeker: &Peer,
    queue: &WaitingQueue,
    registry: &PeerRegistry,
    blocks: &BlockList,
    now: Instant,
) -> Option<PeerId> {
    queue
        .iter()
        .filter_map(|id| registry.get(id))
        .filter(|candidate| candidate.is_live())
        .find(|candidate| is_compatible(seeker, candidate, blocks, now))
        .map(|candidate| candidate.id)
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HobbyError {
    #[error("hobby must be at most {0} characters")]
    TooLong(usize),
    #[error("hobby may only contain letters, digits, spaces, '-' and '_'")]
    InvalidCharacters,
}

/// Normalise a raw hobby preference into a tag.
///
/// Surrounding whitespace is trimmed and an empty tag means "no
/// preference". Comparison stays exact, so no case folding happens here.
pub fn normalize_hobby(raw: Option<&str>, max_len: usize) -> Result<Option<String>, HobbyError> {
    let Some(tag) = raw.map(str::trim).filter(|t| !t.is_empty()) else {
        return Ok(None);
    };
    if tag.chars().count() > max_len {
        return Err(HobbyError::TooLong(max_len));
    }
    if !tag
        .chars()
        .all(|c| c.is_alphanumeric() || c == ' ' || c == '-' || c == '_')
    {
        return Err(HobbyError::InvalidCharacters);
    }
    Ok(Some(tag.to_string()))
}
