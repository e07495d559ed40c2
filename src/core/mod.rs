//! Core data types for hospitality matching.
//!
//! - [`Postulation`]: a visitor or host application for one event, with the
//!   role-specific data held in the [`Role`] sum type
//! - [`MatchRecord`]: a committed visitor/host pairing
//! - [`Status`], [`MatchStatus`]: the lifecycle state machines
//! - [`PostulationId`], [`EventId`], [`RequesterId`], [`MatchId`]: opaque ids
//! - [`Timestamp`]: a store-assigned point in time
//!
//! ## Lifecycle
//!
//! | From               | To                    | Who                     |
//! |--------------------|-----------------------|-------------------------|
//! | pending            | approved              | approval workflow       |
//! | pending, approved  | rejected, cancelled   | approval workflow       |
//! | approved           | matched               | match commit            |
//! | matched            | approved              | match cancellation      |
//! | matched            | completed             | approval workflow       |

pub mod pairing;
pub mod postulation;
pub mod types;

pub use pairing::{MatchRecord, NewMatch};
pub use postulation::{
    Application, HostApplication, HostOffer, NewPostulation, Postulation, Role, VisitorPreferences,
    VisitorRequest,
};
pub use types::{
    EventId, Fit, GenderComposition, GenderPolicy, MatchId, MatchStatus, PostulationId,
    RequesterId, RoleKind, Status, Timestamp,
};
