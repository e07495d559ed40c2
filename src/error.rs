use thiserror::Error;

use crate::core::types::PostulationId;
use crate::store::StoreError;
use crate::utils::validation::ValidationError;

/// Kind of record an error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Postulation,
    Match,
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Postulation => write!(f, "Postulation"),
            Self::Match => write!(f, "Match"),
        }
    }
}

/// Errors surfaced by suggestion, commit and intake operations
#[derive(Error, Debug)]
pub enum MatchError {
    #[error("{entity} '{id}' not found")]
    NotFound { entity: Entity, id: String },

    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("{entity} '{id}' is {current}, expected {expected}")]
    InvalidState {
        entity: Entity,
        id: String,
        current: String,
        expected: String,
    },

    #[error("Host '{host_id}' has {available} places left but {requested} were requested")]
    Capacity {
        host_id: PostulationId,
        available: u32,
        requested: u32,
    },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl MatchError {
    pub(crate) fn postulation_not_found(id: &PostulationId) -> Self {
        Self::NotFound {
            entity: Entity::Postulation,
            id: id.to_string(),
        }
    }

    pub(crate) fn invalid_state(
        entity: Entity,
        id: impl std::fmt::Display,
        current: impl std::fmt::Display,
        expected: impl Into<String>,
    ) -> Self {
        Self::InvalidState {
            entity,
            id: id.to_string(),
            current: current.to_string(),
            expected: expected.into(),
        }
    }

    /// Short machine-readable name of the error class
    #[must_use]
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::Validation(_) => "validation",
            Self::InvalidState { .. } => "invalid_state",
            Self::Capacity { .. } => "capacity",
            Self::Store(StoreError::Conflict { .. }) => "conflict",
            Self::Store(_) => "store",
        }
    }

    /// Whether the same call may succeed if repeated later.
    ///
    /// Only store availability problems and lost optimistic-concurrency races
    /// qualify; the core never retries these on its own beyond the commit
    /// service's conflict re-runs.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Store(err) => err.is_retryable(),
            _ => false,
        }
    }
}
