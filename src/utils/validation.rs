//! Centralized validation of incoming applications and pairing requests.

use crate::core::postulation::{Application, HostApplication, VisitorRequest};
use crate::core::types::{EventId, PostulationId, RoleKind};

/// Largest group a single visitor postulation may bring
pub const MAX_GROUP_SIZE: u32 = 50;

/// Largest number of places a single host may offer
pub const MAX_HOST_CAPACITY: u32 = 100;

/// Oldest plausible age in an ages list
pub const MAX_AGE: u32 = 120;

/// Limit for free-text fields (observations, special needs, addresses)
pub const MAX_TEXT_LENGTH: usize = 2_000;

/// Limit on the number of amenities a host may list
pub const MAX_AMENITIES: usize = 50;

/// Structural problems with input data
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("Postulations belong to different events ({visitor_event} vs {host_event})")]
    DifferentEvents {
        visitor_event: EventId,
        host_event: EventId,
    },

    #[error("Postulation '{id}' is a {found} postulation, expected {expected}")]
    WrongRole {
        id: PostulationId,
        expected: RoleKind,
        found: RoleKind,
    },

    #[error("Requester already has a live {role} postulation '{existing}' for this event")]
    DuplicateApplication {
        role: RoleKind,
        existing: PostulationId,
    },
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ValidationError {
    ValidationError::InvalidField {
        field,
        reason: reason.into(),
    }
}

/// Validate an application form before it is stored.
///
/// # Errors
///
/// Returns the first [`ValidationError`] found, naming the offending field.
pub fn validate_application(app: &Application) -> Result<(), ValidationError> {
    match app {
        Application::Visitor(request) => validate_visitor_request(request),
        Application::Host(host) => validate_host_application(host),
    }
}

/// # Errors
///
/// Returns an error if group size, ages, dates or text fields are out of range.
pub fn validate_visitor_request(request: &VisitorRequest) -> Result<(), ValidationError> {
    if request.people_count == 0 {
        return Err(invalid("people_count", "must be at least 1"));
    }
    if request.people_count > MAX_GROUP_SIZE {
        return Err(invalid(
            "people_count",
            format!("exceeds maximum of {MAX_GROUP_SIZE}"),
        ));
    }

    // Ages are optional, but when given they describe the group
    let ages = u32::try_from(request.ages.len()).unwrap_or(u32::MAX);
    if ages > request.people_count {
        return Err(invalid(
            "ages",
            format!(
                "{} ages listed for a group of {}",
                request.ages.len(),
                request.people_count
            ),
        ));
    }
    if let Some(age) = request.ages.iter().find(|&&age| age > MAX_AGE) {
        return Err(invalid("ages", format!("{age} is not a plausible age")));
    }

    match (request.arrival, request.departure) {
        (Some(arrival), Some(departure)) if departure < arrival => {
            return Err(invalid(
                "departure",
                format!("{departure} is before arrival {arrival}"),
            ));
        }
        (Some(_), None) => return Err(ValidationError::MissingField("departure")),
        (None, Some(_)) => return Err(ValidationError::MissingField("arrival")),
        _ => {}
    }

    if let Some(needs) = &request.special_needs {
        validate_text("special_needs", needs)?;
    }

    Ok(())
}

/// # Errors
///
/// Returns an error if capacity, address, amenities or the availability
/// window are out of range.
pub fn validate_host_application(host: &HostApplication) -> Result<(), ValidationError> {
    if host.total_capacity == 0 {
        return Err(invalid("total_capacity", "must be at least 1"));
    }
    if host.total_capacity > MAX_HOST_CAPACITY {
        return Err(invalid(
            "total_capacity",
            format!("exceeds maximum of {MAX_HOST_CAPACITY}"),
        ));
    }

    if host.address.trim().is_empty() {
        return Err(ValidationError::MissingField("address"));
    }
    validate_text("address", &host.address)?;

    if host.amenities.len() > MAX_AMENITIES {
        return Err(invalid(
            "amenities",
            format!("more than {MAX_AMENITIES} listed"),
        ));
    }
    if host.amenities.iter().any(|a| a.trim().is_empty()) {
        return Err(invalid("amenities", "empty amenity name"));
    }

    match (host.available_from, host.available_until) {
        (Some(from), Some(until)) if until < from => {
            return Err(invalid(
                "available_until",
                format!("{until} is before available_from {from}"),
            ));
        }
        (Some(_), None) => return Err(ValidationError::MissingField("available_until")),
        (None, Some(_)) => return Err(ValidationError::MissingField("available_from")),
        _ => {}
    }

    Ok(())
}

/// Validate an observation or other free-text field.
///
/// # Errors
///
/// Returns an error if the text is too long or contains control characters.
pub fn validate_text(field: &'static str, text: &str) -> Result<(), ValidationError> {
    if text.len() > MAX_TEXT_LENGTH {
        return Err(invalid(
            field,
            format!("exceeds {MAX_TEXT_LENGTH} characters"),
        ));
    }
    if text.chars().any(|c| c.is_control() && c != '\n' && c != '\t') {
        return Err(invalid(field, "contains control characters"));
    }
    Ok(())
}

/// # Errors
///
/// Returns [`ValidationError::DifferentEvents`] if the two events differ.
pub fn check_same_event(visitor_event: &EventId, host_event: &EventId) -> Result<(), ValidationError> {
    if visitor_event == host_event {
        Ok(())
    } else {
        Err(ValidationError::DifferentEvents {
            visitor_event: visitor_event.clone(),
            host_event: host_event.clone(),
        })
    }
}
