use serde::{Deserialize, Serialize};

use crate::core::types::{EventId, MatchId, MatchStatus, PostulationId, RequesterId, Timestamp};

/// A committed pairing of one visitor postulation with one host postulation
/// ("emparejamiento"). Both postulations always belong to `event_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub id: MatchId,
    pub event_id: EventId,
    pub visitor_postulation_id: PostulationId,
    pub host_postulation_id: PostulationId,
    pub visitor_requester_id: RequesterId,
    pub host_requester_id: RequesterId,

    /// Places taken from the host when the match was committed
    pub people_count: u32,

    pub status: MatchStatus,
    pub created_at: Timestamp,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancelled_at: Option<Timestamp>,

    #[serde(default)]
    pub revision: u64,
}

impl MatchRecord {
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == MatchStatus::Active
    }
}

/// A match the store has not assigned an id or timestamps to yet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMatch {
    pub event_id: EventId,
    pub visitor_postulation_id: PostulationId,
    pub host_postulation_id: PostulationId,
    pub visitor_requester_id: RequesterId,
    pub host_requester_id: RequesterId,
    pub people_count: u32,
}
