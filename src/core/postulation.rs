use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::core::types::{
    EventId, GenderComposition, GenderPolicy, PostulationId, RequesterId, RoleKind, Status,
    Timestamp,
};

/// Anyone younger than this counts as a child when matching against hosts
pub const MINOR_AGE_LIMIT: u32 = 12;

/// An application to take part in an event's hospitality program
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Postulation {
    pub id: PostulationId,

    pub event_id: EventId,

    /// Who filed it (opaque, supplied by the identity provider)
    pub requester_id: RequesterId,

    pub status: Status,

    /// Visitor or host specific data
    pub role: Role,

    /// Reviewer or requester note
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observation: Option<String>,

    pub created_at: Timestamp,

    pub updated_at: Timestamp,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<Timestamp>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_at: Option<Timestamp>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancelled_at: Option<Timestamp>,

    /// Bumped by the store on every write; used for optimistic concurrency
    #[serde(default)]
    pub revision: u64,
}

impl Postulation {
    #[must_use]
    pub fn role_kind(&self) -> RoleKind {
        self.role.kind()
    }

    #[must_use]
    pub fn as_visitor(&self) -> Option<&VisitorRequest> {
        match &self.role {
            Role::Visitor(request) => Some(request),
            Role::Host(_) => None,
        }
    }

    #[must_use]
    pub fn as_host(&self) -> Option<&HostOffer> {
        match &self.role {
            Role::Host(offer) => Some(offer),
            Role::Visitor(_) => None,
        }
    }

    pub(crate) fn as_host_mut(&mut self) -> Option<&mut HostOffer> {
        match &mut self.role {
            Role::Host(offer) => Some(offer),
            Role::Visitor(_) => None,
        }
    }
}

/// The two kinds of postulation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Role {
    Visitor(VisitorRequest),
    Host(HostOffer),
}

impl Role {
    #[must_use]
    pub fn kind(&self) -> RoleKind {
        match self {
            Self::Visitor(_) => RoleKind::Visitor,
            Self::Host(_) => RoleKind::Host,
        }
    }
}

/// What a visiting group asks for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisitorRequest {
    pub people_count: u32,

    /// Ages of the group members, when the requester gave them
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ages: Vec<u32>,

    pub gender: GenderComposition,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arrival: Option<NaiveDate>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub departure: Option<NaiveDate>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special_needs: Option<String>,

    #[serde(default)]
    pub preferences: VisitorPreferences,
}

impl VisitorRequest {
    /// True if anyone in the group is under [`MINOR_AGE_LIMIT`]
    #[must_use]
    pub fn has_minors(&self) -> bool {
        self.ages.iter().any(|&age| age < MINOR_AGE_LIMIT)
    }

    /// Arrival and departure, when both are known
    #[must_use]
    pub fn stay(&self) -> Option<(NaiveDate, NaiveDate)> {
        Some((self.arrival?, self.departure?))
    }
}

/// Free-form visitor preferences; only `pets` is interpreted by matching
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VisitorPreferences {
    #[serde(default)]
    pub pets: bool,

    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// What a host offers, including the mutable capacity bookkeeping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostOffer {
    pub total_capacity: u32,

    /// Places not taken by an active match. Only the store changes this.
    pub remaining_capacity: u32,

    pub address: String,

    pub gender_policy: GenderPolicy,

    #[serde(default)]
    pub accepts_children: bool,

    #[serde(default)]
    pub accepts_pets: bool,

    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub amenities: BTreeSet<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available_from: Option<NaiveDate>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available_until: Option<NaiveDate>,

    /// Distance from the lodging to the event venue
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_meters: Option<u32>,

    /// Visitor postulations currently lodged here
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assigned_visitors: Vec<PostulationId>,
}

impl HostOffer {
    /// Availability window, when both ends are known
    #[must_use]
    pub fn window(&self) -> Option<(NaiveDate, NaiveDate)> {
        Some((self.available_from?, self.available_until?))
    }

    #[must_use]
    pub fn can_take(&self, people: u32) -> bool {
        self.remaining_capacity >= people
    }
}

/// Host data as submitted by the requester, before the store tracks capacity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostApplication {
    pub total_capacity: u32,
    pub address: String,
    pub gender_policy: GenderPolicy,
    #[serde(default)]
    pub accepts_children: bool,
    #[serde(default)]
    pub accepts_pets: bool,
    #[serde(default)]
    pub amenities: BTreeSet<String>,
    #[serde(default)]
    pub available_from: Option<NaiveDate>,
    #[serde(default)]
    pub available_until: Option<NaiveDate>,
    #[serde(default)]
    pub distance_meters: Option<u32>,
}

impl From<HostApplication> for HostOffer {
    fn from(app: HostApplication) -> Self {
        Self {
            total_capacity: app.total_capacity,
            remaining_capacity: app.total_capacity,
            address: app.address,
            gender_policy: app.gender_policy,
            accepts_children: app.accepts_children,
            accepts_pets: app.accepts_pets,
            amenities: app.amenities,
            available_from: app.available_from,
            available_until: app.available_until,
            distance_meters: app.distance_meters,
            assigned_visitors: Vec::new(),
        }
    }
}

/// Either side of an application form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Application {
    Visitor(VisitorRequest),
    Host(HostApplication),
}

impl Application {
    #[must_use]
    pub fn kind(&self) -> RoleKind {
        match self {
            Self::Visitor(_) => RoleKind::Visitor,
            Self::Host(_) => RoleKind::Host,
        }
    }
}

impl From<Application> for Role {
    fn from(app: Application) -> Self {
        match app {
            Application::Visitor(request) => Role::Visitor(request),
            Application::Host(host) => Role::Host(host.into()),
        }
    }
}

/// A postulation the store has not assigned an id or timestamps to yet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPostulation {
    pub event_id: EventId,
    pub requester_id: RequesterId,
    pub role: Role,
    #[serde(default)]
    pub observation: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn visitor_request(ages: Vec<u32>) -> VisitorRequest {
        VisitorRequest {
            people_count: 2,
            ages,
            gender: GenderComposition::Mixed,
            arrival: None,
            departure: None,
            special_needs: None,
            preferences: VisitorPreferences::default(),
        }
    }

    #[test]
    fn test_has_minors() {
        assert!(!visitor_request(vec![]).has_minors());
        assert!(!visitor_request(vec![30, 12]).has_minors());
        assert!(visitor_request(vec![30, 11]).has_minors());
    }

    #[test]
    fn test_host_application_starts_with_full_capacity() {
        let offer: HostOffer = HostApplication {
            total_capacity: 4,
            address: "Av. Siempre Viva 742".to_string(),
            gender_policy: GenderPolicy::Both,
            accepts_children: true,
            accepts_pets: false,
            amenities: BTreeSet::new(),
            available_from: None,
            available_until: None,
            distance_meters: None,
        }
        .into();

        assert_eq!(offer.remaining_capacity, 4);
        assert!(offer.assigned_visitors.is_empty());
        assert!(offer.can_take(4));
        assert!(!offer.can_take(5));
    }

    #[test]
    fn test_role_json_is_tagged() {
        let role = Role::Visitor(visitor_request(vec![40]));
        let json = serde_json::to_value(&role).unwrap();
        assert_eq!(json["type"], "visitor");
        assert_eq!(json["people_count"], 2);

        let back: Role = serde_json::from_value(json).unwrap();
        assert_eq!(back.kind(), RoleKind::Visitor);
    }

    #[test]
    fn test_preferences_keep_unknown_keys() {
        let prefs: VisitorPreferences =
            serde_json::from_str(r#"{"pets": true, "diet": "vegetarian"}"#).unwrap();
        assert!(prefs.pets);
        assert_eq!(prefs.extra["diet"], "vegetarian");
    }
}
