use serde::Serialize;
use tracing::debug;

use crate::core::postulation::Postulation;
use crate::core::types::{EventId, PostulationId, RoleKind, Status};
use crate::error::MatchError;
use crate::matching::explain::Explanation;
use crate::matching::scoring::CompatibilityScore;
use crate::store::{PostulationQuery, PostulationStore};

/// Host statuses that can still take visitors (a matched host may have room left)
pub const HOST_CANDIDATE_STATUSES: [Status; 2] = [Status::Approved, Status::Matched];

/// Visitor statuses that can still be placed
pub const VISITOR_CANDIDATE_STATUSES: [Status; 1] = [Status::Approved];

/// Default minimum score threshold for suggestions
pub const DEFAULT_MIN_SCORE: u8 = 0;

/// Configuration for the suggestion engine
#[derive(Debug, Clone)]
pub struct MatchingConfig {
    /// Suggestions scoring below this are dropped
    pub min_score: u8,
    /// Maximum number of suggestions returned
    pub limit: Option<usize>,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            min_score: DEFAULT_MIN_SCORE,
            limit: None,
        }
    }
}

/// A candidate host for one visitor
#[derive(Debug, Clone, Serialize)]
pub struct HostSuggestion {
    pub host: Postulation,
    pub score: CompatibilityScore,
    pub explanation: Explanation,
}

/// A candidate visitor for one host
#[derive(Debug, Clone, Serialize)]
pub struct VisitorSuggestion {
    pub visitor: Postulation,
    pub score: CompatibilityScore,
    pub explanation: Explanation,
}

/// The best host found for one visitor of an event
#[derive(Debug, Clone, Serialize)]
pub struct PairSuggestion {
    pub visitor: Postulation,
    pub host: Postulation,
    pub score: CompatibilityScore,
    pub explanation: Explanation,
}

/// Anything that carries a compatibility score
trait Scored {
    fn total(&self) -> u8;
}

impl Scored for HostSuggestion {
    fn total(&self) -> u8 {
        self.score.total
    }
}

impl Scored for VisitorSuggestion {
    fn total(&self) -> u8 {
        self.score.total
    }
}

impl Scored for PairSuggestion {
    fn total(&self) -> u8 {
        self.score.total
    }
}

/// Ranks candidate pairings read from a [`PostulationStore`].
///
/// Read-only: nothing here writes to the store. Candidates are fetched in
/// ascending id order and ranked with a stable sort, so equal scores keep
/// ascending id order.
pub struct SuggestionEngine<'a, S: PostulationStore + ?Sized> {
    store: &'a S,
    config: MatchingConfig,
}

impl<'a, S: PostulationStore + ?Sized> SuggestionEngine<'a, S> {
    /// Create a new suggestion engine with default configuration
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            config: MatchingConfig::default(),
        }
    }

    /// Create a new suggestion engine with custom configuration
    pub fn with_config(store: &'a S, config: MatchingConfig) -> Self {
        Self { store, config }
    }

    /// Hosts that could lodge the visitor, best first.
    ///
    /// # Errors
    ///
    /// Returns [`MatchError::NotFound`] if `visitor_id` does not name a
    /// visitor postulation, or a store error.
    pub async fn suggest_hosts_for_visitor(
        &self,
        visitor_id: &PostulationId,
    ) -> Result<Vec<HostSuggestion>, MatchError> {
        let visitor = self.load(visitor_id, RoleKind::Visitor).await?;
        let people = visitor.as_visitor().map_or(0, |v| v.people_count);

        let hosts = self.candidate_hosts(&visitor.event_id).await?;
        let suggestions: Vec<HostSuggestion> = hosts
            .into_iter()
            .filter(|h| h.as_host().is_some_and(|offer| offer.can_take(people)))
            .map(|host| HostSuggestion {
                score: CompatibilityScore::calculate(&visitor, &host),
                explanation: Explanation::analyze(&visitor, &host),
                host,
            })
            .collect();

        debug!(
            visitor = %visitor_id,
            candidates = suggestions.len(),
            "Scored host candidates"
        );
        Ok(self.rank(suggestions))
    }

    /// Visitors the host could lodge, best first.
    ///
    /// # Errors
    ///
    /// Returns [`MatchError::NotFound`] if `host_id` does not name a host
    /// postulation, or a store error.
    pub async fn suggest_visitors_for_host(
        &self,
        host_id: &PostulationId,
    ) -> Result<Vec<VisitorSuggestion>, MatchError> {
        let host = self.load(host_id, RoleKind::Host).await?;
        let remaining = host.as_host().map_or(0, |h| h.remaining_capacity);

        let visitors = self.candidate_visitors(&host.event_id).await?;
        let suggestions: Vec<VisitorSuggestion> = visitors
            .into_iter()
            .filter(|v| v.as_visitor().is_some_and(|r| r.people_count <= remaining))
            .map(|visitor| VisitorSuggestion {
                score: CompatibilityScore::calculate(&visitor, &host),
                explanation: Explanation::analyze(&visitor, &host),
                visitor,
            })
            .collect();

        debug!(
            host = %host_id,
            candidates = suggestions.len(),
            "Scored visitor candidates"
        );
        Ok(self.rank(suggestions))
    }

    /// One best host per approved visitor of the event, best pairs first.
    ///
    /// This is a greedy per-visitor pick, not a global assignment: two
    /// visitors may be offered the same host even if it cannot take both.
    /// Among hosts with equal scores the lowest host id wins.
    ///
    /// # Errors
    ///
    /// Returns a store error if the candidate pools cannot be read.
    pub async fn suggest_for_event(
        &self,
        event_id: &EventId,
    ) -> Result<Vec<PairSuggestion>, MatchError> {
        let visitors = self.candidate_visitors(event_id).await?;
        let hosts = self.candidate_hosts(event_id).await?;

        let mut pairs = Vec::new();
        for visitor in visitors {
            let Some(people) = visitor.as_visitor().map(|v| v.people_count) else {
                continue;
            };

            let mut best: Option<(&Postulation, CompatibilityScore)> = None;
            for host in hosts
                .iter()
                .filter(|h| h.as_host().is_some_and(|offer| offer.can_take(people)))
            {
                let score = CompatibilityScore::calculate(&visitor, host);
                if best.as_ref().map_or(true, |(_, top)| score.total > top.total) {
                    best = Some((host, score));
                }
            }

            if let Some((host, score)) = best {
                pairs.push(PairSuggestion {
                    explanation: Explanation::analyze(&visitor, host),
                    host: host.clone(),
                    visitor,
                    score,
                });
            }
        }

        debug!(
            event = %event_id,
            hosts = hosts.len(),
            pairs = pairs.len(),
            "Built event-wide suggestions"
        );
        Ok(self.rank(pairs))
    }

    async fn load(&self, id: &PostulationId, role: RoleKind) -> Result<Postulation, MatchError> {
        match self.store.get_postulation(id).await? {
            Some(p) if p.role_kind() == role => Ok(p),
            _ => Err(MatchError::postulation_not_found(id)),
        }
    }

    async fn candidate_hosts(&self, event_id: &EventId) -> Result<Vec<Postulation>, MatchError> {
        let query = PostulationQuery::for_event(event_id)
            .with_role(RoleKind::Host)
            .with_statuses(&HOST_CANDIDATE_STATUSES);
        Ok(self.store.query_postulations(&query).await?)
    }

    async fn candidate_visitors(
        &self,
        event_id: &EventId,
    ) -> Result<Vec<Postulation>, MatchError> {
        let query = PostulationQuery::for_event(event_id)
            .with_role(RoleKind::Visitor)
            .with_statuses(&VISITOR_CANDIDATE_STATUSES);
        Ok(self.store.query_postulations(&query).await?)
    }

    /// Stable sort by score descending, then apply threshold and limit
    fn rank<T: Scored>(&self, mut results: Vec<T>) -> Vec<T> {
        results.sort_by(|a, b| b.total().cmp(&a.total()));
        results
            .into_iter()
            .filter(|r| r.total() >= self.config.min_score)
            .take(self.config.limit.unwrap_or(usize::MAX))
            .collect()
    }
}
