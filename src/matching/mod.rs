//! Visitor/host compatibility scoring, ranked suggestions and match commits.
//!
//! - [`CompatibilityScore`]: weighted factor breakdown for one (visitor, host) pair
//! - [`Explanation`]: the same factor checks as pros, cons and neutral notes
//! - [`SuggestionEngine`]: ranked candidates for a visitor, a host or a whole event
//! - [`MatchCommitService`]: atomic creation and cancellation of matches
//!
//! ## Scoring
//!
//! | Factor     | Points | Notes                                            |
//! |------------|--------|--------------------------------------------------|
//! | event      | 20     | different events disqualify (score 0)            |
//! | capacity   | 20     | too few places left disqualifies (score 0)       |
//! | tight fit  | +5     | extra credit when at most 2 places are left over |
//! | gender     | 15     | 8 for a mixed group with a single-gender host    |
//! | dates      | 15     | 12/8/5 by days of overshoot, 0 if arrival is out |
//! | children   | 10     | anyone under 12 needs a host accepting children  |
//! | pets       | 5      |                                                  |
//! | distance   | 10     | 10/7/4/2 at 1/3/5 km bands, 5 when unknown       |
//! | amenities  | 5      | 5/4/3/2 for 5+/3+/1+/none                        |
//!
//! The total is `round(100 * earned / 100)` clamped to `[0, 100]`.
//!
//! ## Example
//!
//! ```rust,no_run
//! use lodging_matcher::core::EventId;
//! use lodging_matcher::matching::SuggestionEngine;
//! use lodging_matcher::store::{MemoryStore, StoreSnapshot};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let store = MemoryStore::from_snapshot(StoreSnapshot::load_embedded()?)?;
//! let engine = SuggestionEngine::new(&store);
//!
//! for pair in engine.suggest_for_event(&EventId::new("fiesta-2025")).await? {
//!     println!("{} -> {}: {}", pair.visitor.id, pair.host.id, pair.score.total);
//! }
//! # Ok(())
//! # }
//! ```

pub mod commit;
pub mod engine;
pub mod explain;
pub mod scoring;

pub use commit::{CommitConfig, MatchCommitService};
pub use engine::{
    HostSuggestion, MatchingConfig, PairSuggestion, SuggestionEngine, VisitorSuggestion,
};
pub use explain::{explain, Explanation};
pub use scoring::{score, CompatibilityScore, Disqualification, Factor, FactorScore};
