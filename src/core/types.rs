use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Declares an opaque string identifier.
macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(s: impl Into<String>) -> Self {
                Self(s.into())
            }

            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

string_id!(
    /// Identifier of a visitor or host postulation
    PostulationId
);
string_id!(
    /// Identifier of the event a postulation belongs to
    EventId
);
string_id!(
    /// Opaque reference to the person who filed a postulation
    RequesterId
);
string_id!(
    /// Identifier of a committed match
    MatchId
);

/// Point in time assigned by the store when a record is written.
///
/// Callers never compute these; the only way to obtain one is from a record
/// the store handed back (or from a snapshot the store wrote).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    pub(crate) fn assigned_now() -> Self {
        Self(Utc::now())
    }

    #[must_use]
    pub fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

/// Lifecycle status shared by visitor and host postulations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Pending,
    Approved,
    Matched,
    Rejected,
    Cancelled,
    Completed,
}

impl Status {
    pub const ALL: [Status; 6] = [
        Self::Pending,
        Self::Approved,
        Self::Matched,
        Self::Rejected,
        Self::Cancelled,
        Self::Completed,
    ];

    /// Whether the lifecycle allows moving from `self` to `next`.
    ///
    /// ```text
    /// pending -> approved -> matched -> completed
    /// pending | approved -> rejected | cancelled
    /// matched -> approved            (match reversal)
    /// ```
    #[must_use]
    pub fn can_transition_to(self, next: Status) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Approved)
                | (Self::Approved, Self::Matched)
                | (Self::Pending | Self::Approved, Self::Rejected | Self::Cancelled)
                | (Self::Matched, Self::Approved | Self::Completed)
        )
    }

    /// Rejected, cancelled and completed postulations never move again
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Rejected | Self::Cancelled | Self::Completed)
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Approved => write!(f, "approved"),
            Self::Matched => write!(f, "matched"),
            Self::Rejected => write!(f, "rejected"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

impl std::str::FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.to_string().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown status '{s}'"))
    }
}

/// Which side of the program a postulation is on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleKind {
    Visitor,
    Host,
}

impl std::fmt::Display for RoleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Visitor => write!(f, "visitor"),
            Self::Host => write!(f, "host"),
        }
    }
}

impl std::str::FromStr for RoleKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "visitor" => Ok(Self::Visitor),
            "host" => Ok(Self::Host),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

/// Gender composition of a visiting group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenderComposition {
    Male,
    Female,
    Mixed,
}

impl std::fmt::Display for GenderComposition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Male => write!(f, "male"),
            Self::Female => write!(f, "female"),
            Self::Mixed => write!(f, "mixed"),
        }
    }
}

/// Which groups a host is willing to lodge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenderPolicy {
    Male,
    Female,
    Both,
}

impl GenderPolicy {
    /// The single composition this policy is restricted to, if any
    #[must_use]
    pub fn restricted_to(self) -> Option<GenderComposition> {
        match self {
            Self::Male => Some(GenderComposition::Male),
            Self::Female => Some(GenderComposition::Female),
            Self::Both => None,
        }
    }
}

impl std::fmt::Display for GenderPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Male => write!(f, "male"),
            Self::Female => write!(f, "female"),
            Self::Both => write!(f, "both"),
        }
    }
}

/// Status of a committed match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Active,
    Cancelled,
}

impl std::fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Coarse presentation band for a compatibility score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Fit {
    Poor,
    Fair,
    Good,
    Excellent,
}

impl Fit {
    #[must_use]
    pub fn from_score(score: u8) -> Self {
        if score >= 85 {
            Self::Excellent
        } else if score >= 70 {
            Self::Good
        } else if score >= 50 {
            Self::Fair
        } else {
            Self::Poor
        }
    }
}

impl std::fmt::Display for Fit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Poor => write!(f, "poor"),
            Self::Fair => write!(f, "fair"),
            Self::Good => write!(f, "good"),
            Self::Excellent => write!(f, "excellent"),
        }
    }
}
