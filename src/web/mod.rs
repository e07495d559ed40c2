//! JSON API over the matching core.
//!
//! Every endpoint reads and writes through a shared [`TransactionalStore`],
//! either the `--data` snapshot file or, with `--demo`, the embedded demo
//! event held in memory.
//!
//! ## Starting the Server
//!
//! ```text
//! # Serve lodging.json on the default port 8080
//! lodging-matcher serve
//!
//! # Try the API against the demo event
//! lodging-matcher serve --demo --port 3000
//!
//! # Bind to all interfaces
//! lodging-matcher serve --address 0.0.0.0
//! ```
//!
//! ## API Endpoints
//!
//! - `GET /api/health` - Liveness check
//! - `GET /api/events/{event_id}/postulations?role=&status=` - List postulations
//! - `POST /api/events/{event_id}/postulations` - File a postulation
//! - `POST /api/postulations/{id}/review` - Move a postulation to a review status
//! - `GET /api/events/{event_id}/suggestions?min_score=&limit=` - Best host per visitor
//! - `GET /api/visitors/{id}/suggestions` - Ranked hosts for a visitor
//! - `GET /api/hosts/{id}/suggestions` - Ranked visitors for a host
//! - `GET /api/score?visitor=&host=` - Score and explain one pair
//! - `GET /api/events/{event_id}/matches?all=` - List matches
//! - `POST /api/matches` - Create a match
//! - `POST /api/matches/{id}/cancel` - Cancel a match
//!
//! Failures come back as `{"error", "error_type", "details"}` with status
//! 404 (`not_found`), 422 (`validation`), 409 (`invalid_state`, `capacity`,
//! `conflict`) or 503 (`store`).
//!
//! [`TransactionalStore`]: crate::store::TransactionalStore

pub mod server;
