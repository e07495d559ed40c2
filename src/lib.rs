//! # lodging-matcher
//!
//! Pairs visitors with hosts offering lodging during an event.
//!
//! People travelling to an event file a *visitor* postulation (group size,
//! ages, dates, preferences); locals file a *host* postulation (places
//! offered, who they accept, availability, amenities). Once an approval
//! workflow has approved them, this crate scores every visitor/host pair,
//! suggests the best candidates, and commits chosen pairings as matches,
//! keeping statuses and host capacity consistent.
//!
//! ## Features
//!
//! - **Weighted scoring**: event, capacity, gender, dates, children, pets,
//!   distance and amenities, normalized to `[0, 100]`
//! - **Explanations**: the same checks rendered as pros, cons and neutral notes
//! - **Suggestions**: ranked hosts for a visitor, visitors for a host, or a
//!   greedy best pair per visitor across an event
//! - **Atomic commits**: match creation and cancellation as one store batch
//!   guarded by record revisions
//! - **Pluggable storage**: async store traits with in-memory and JSON-file
//!   backends
//!
//! ## Example
//!
//! ```rust,no_run
//! use lodging_matcher::core::PostulationId;
//! use lodging_matcher::matching::{MatchCommitService, SuggestionEngine};
//! use lodging_matcher::store::{MemoryStore, StoreSnapshot};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let store = MemoryStore::from_snapshot(StoreSnapshot::load_embedded()?)?;
//!
//! let visitor = PostulationId::new("pos-000005");
//! let hosts = SuggestionEngine::new(&store)
//!     .suggest_hosts_for_visitor(&visitor)
//!     .await?;
//!
//! if let Some(best) = hosts.first() {
//!     let record = MatchCommitService::new(&store)
//!         .create_match(&visitor, &best.host.id)
//!         .await?;
//!     println!("{} lodged at {}", record.visitor_postulation_id, record.host_postulation_id);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`core`]: Postulations, matches, statuses and identifiers
//! - [`matching`]: Scoring, explanations, suggestions and match commits
//! - [`intake`]: Filing and reviewing postulations
//! - [`store`]: Storage traits and backends
//! - [`cli`]: Command-line interface implementation
//! - [`web`]: JSON API server

pub mod cli;
pub mod core;
pub mod error;
pub mod intake;
pub mod matching;
pub mod store;
pub mod utils;
pub mod web;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used types for convenience
pub use core::types::*;
pub use core::{MatchRecord, Postulation, Role};
pub use error::MatchError;
pub use matching::{CompatibilityScore, Explanation, MatchCommitService, SuggestionEngine};
pub use store::{FileStore, MemoryStore, StoreError, TransactionalStore};
