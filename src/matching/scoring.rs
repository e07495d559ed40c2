use chrono::NaiveDate;
use serde::Serialize;

use crate::core::postulation::{HostOffer, Postulation, VisitorRequest};
use crate::core::types::{Fit, GenderComposition, GenderPolicy};

/// Points available in the base factors. The tight-fit bonus is extra credit
/// on top of this, so a perfect pair clamps to 100.
pub const BASE_POSSIBLE: u32 = 100;

pub const EVENT_POINTS: u32 = 20;
pub const CAPACITY_POINTS: u32 = 20;
/// Extra credit for a host left with little slack. It counts toward earned
/// points only; the possible total stays at [`BASE_POSSIBLE`].
pub const TIGHT_FIT_BONUS: u32 = 5;
pub const GENDER_POINTS: u32 = 15;
pub const DATE_POINTS: u32 = 15;
pub const CHILDREN_POINTS: u32 = 10;
pub const PET_POINTS: u32 = 5;
pub const DISTANCE_POINTS: u32 = 10;
pub const AMENITY_POINTS: u32 = 5;

/// Slack at or below which the tight-fit bonus applies
pub const TIGHT_FIT_SLACK: u32 = 2;

/// One scoring factor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Factor {
    Event,
    Capacity,
    TightFit,
    Gender,
    Dates,
    Children,
    Pets,
    Distance,
    Amenities,
}

impl std::fmt::Display for Factor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Event => "event",
            Self::Capacity => "capacity",
            Self::TightFit => "tight fit",
            Self::Gender => "gender",
            Self::Dates => "dates",
            Self::Children => "children",
            Self::Pets => "pets",
            Self::Distance => "distance",
            Self::Amenities => "amenities",
        };
        write!(f, "{name}")
    }
}

/// Points earned for one factor out of the points it could contribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FactorScore {
    pub factor: Factor,
    pub earned: u32,
    pub possible: u32,
}

/// Why a pair scored zero without being weighed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Disqualification {
    DifferentEvents,
    InsufficientCapacity { available: u32, requested: u32 },
    NotAVisitor,
    NotAHost,
}

impl std::fmt::Display for Disqualification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DifferentEvents => write!(f, "Visitor and host belong to different events"),
            Self::InsufficientCapacity {
                available,
                requested,
            } => write!(
                f,
                "Host has {available} places left but the group needs {requested}"
            ),
            Self::NotAVisitor => write!(f, "First postulation is not a visitor"),
            Self::NotAHost => write!(f, "Second postulation is not a host"),
        }
    }
}

/// How a visitor's stay relates to a host's availability window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateFit {
    /// Either side gave no dates
    Unknown,
    Inside,
    /// Arrival fits but departure runs past the window by this many days
    Overshoot(i64),
    ArrivalOutside,
}

/// Compatibility of one visitor with one host, factor by factor
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompatibilityScore {
    /// Normalized score in `[0, 100]`
    pub total: u8,

    pub fit: Fit,

    /// Per-factor breakdown; empty when disqualified
    pub factors: Vec<FactorScore>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub disqualified: Option<Disqualification>,
}

impl CompatibilityScore {
    /// Score a visitor postulation against a host postulation.
    ///
    /// Never fails: a pair that cannot be matched at all scores zero and
    /// records the reason in `disqualified`.
    #[must_use]
    pub fn calculate(visitor: &Postulation, host: &Postulation) -> Self {
        let Some(request) = visitor.as_visitor() else {
            return Self::disqualified(Disqualification::NotAVisitor);
        };
        let Some(offer) = host.as_host() else {
            return Self::disqualified(Disqualification::NotAHost);
        };

        if visitor.event_id != host.event_id {
            return Self::disqualified(Disqualification::DifferentEvents);
        }
        if !offer.can_take(request.people_count) {
            return Self::disqualified(Disqualification::InsufficientCapacity {
                available: offer.remaining_capacity,
                requested: request.people_count,
            });
        }

        let slack = offer.remaining_capacity - request.people_count;
        let factors = vec![
            FactorScore {
                factor: Factor::Event,
                earned: EVENT_POINTS,
                possible: EVENT_POINTS,
            },
            FactorScore {
                factor: Factor::Capacity,
                earned: CAPACITY_POINTS,
                possible: CAPACITY_POINTS,
            },
            FactorScore {
                factor: Factor::TightFit,
                earned: if slack <= TIGHT_FIT_SLACK {
                    TIGHT_FIT_BONUS
                } else {
                    0
                },
                possible: 0,
            },
            FactorScore {
                factor: Factor::Gender,
                earned: gender_points(request.gender, offer.gender_policy),
                possible: GENDER_POINTS,
            },
            FactorScore {
                factor: Factor::Dates,
                earned: date_points(date_fit(request, offer)),
                possible: DATE_POINTS,
            },
            FactorScore {
                factor: Factor::Children,
                earned: if children_ok(request, offer) {
                    CHILDREN_POINTS
                } else {
                    0
                },
                possible: CHILDREN_POINTS,
            },
            FactorScore {
                factor: Factor::Pets,
                earned: if pets_ok(request, offer) { PET_POINTS } else { 0 },
                possible: PET_POINTS,
            },
            FactorScore {
                factor: Factor::Distance,
                earned: distance_points(offer.distance_meters),
                possible: DISTANCE_POINTS,
            },
            FactorScore {
                factor: Factor::Amenities,
                earned: amenity_points(offer.amenities.len()),
                possible: AMENITY_POINTS,
            },
        ];

        let earned: u32 = factors.iter().map(|f| f.earned).sum();
        let possible: u32 = factors.iter().map(|f| f.possible).sum();
        let total = normalize(earned, possible);

        Self {
            total,
            fit: Fit::from_score(total),
            factors,
            disqualified: None,
        }
    }

    fn disqualified(reason: Disqualification) -> Self {
        Self {
            total: 0,
            fit: Fit::Poor,
            factors: Vec::new(),
            disqualified: Some(reason),
        }
    }

    #[must_use]
    pub fn earned(&self) -> u32 {
        self.factors.iter().map(|f| f.earned).sum()
    }

    #[must_use]
    pub fn possible(&self) -> u32 {
        self.factors.iter().map(|f| f.possible).sum()
    }

    #[must_use]
    pub fn factor(&self, factor: Factor) -> Option<&FactorScore> {
        self.factors.iter().find(|f| f.factor == factor)
    }
}

/// Compatibility score in `[0, 100]`
#[must_use]
pub fn score(visitor: &Postulation, host: &Postulation) -> u8 {
    CompatibilityScore::calculate(visitor, host).total
}

/// `round(100 * earned / possible)` clamped to 100
fn normalize(earned: u32, possible: u32) -> u8 {
    if possible == 0 {
        return 0;
    }
    let (earned, possible) = (u64::from(earned), u64::from(possible));
    let percent = (200 * earned + possible) / (2 * possible);
    u8::try_from(percent.min(100)).unwrap_or(100)
}

pub(crate) fn gender_points(group: GenderComposition, policy: GenderPolicy) -> u32 {
    match (policy.restricted_to(), group) {
        (None, _) => GENDER_POINTS,
        (Some(accepted), group) if accepted == group => GENDER_POINTS,
        (Some(_), GenderComposition::Mixed) => 8,
        (Some(_), _) => 0,
    }
}

pub(crate) fn date_fit(request: &VisitorRequest, offer: &HostOffer) -> DateFit {
    let (Some((arrival, departure)), Some((from, until))) = (request.stay(), offer.window())
    else {
        return DateFit::Unknown;
    };
    classify_stay(arrival, departure, from, until)
}

fn classify_stay(arrival: NaiveDate, departure: NaiveDate, from: NaiveDate, until: NaiveDate) -> DateFit {
    if arrival < from || arrival > until {
        return DateFit::ArrivalOutside;
    }
    if departure <= until {
        DateFit::Inside
    } else {
        DateFit::Overshoot((departure - until).num_days())
    }
}

pub(crate) fn date_points(fit: DateFit) -> u32 {
    match fit {
        DateFit::Unknown | DateFit::Inside => DATE_POINTS,
        DateFit::Overshoot(days) if days <= 1 => 12,
        DateFit::Overshoot(2) => 8,
        DateFit::Overshoot(_) => 5,
        DateFit::ArrivalOutside => 0,
    }
}

pub(crate) fn children_ok(request: &VisitorRequest, offer: &HostOffer) -> bool {
    !request.has_minors() || offer.accepts_children
}

pub(crate) fn pets_ok(request: &VisitorRequest, offer: &HostOffer) -> bool {
    !request.preferences.pets || offer.accepts_pets
}

pub(crate) fn distance_points(distance_meters: Option<u32>) -> u32 {
    match distance_meters {
        None => 5,
        Some(d) if d <= 1_000 => DISTANCE_POINTS,
        Some(d) if d <= 3_000 => 7,
        Some(d) if d <= 5_000 => 4,
        Some(_) => 2,
    }
}

pub(crate) fn amenity_points(count: usize) -> u32 {
    match count {
        0 => 2,
        1..=2 => 3,
        3..=4 => 4,
        _ => AMENITY_POINTS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::EventId;
    use crate::testing::{host, host_offer, july, visitor, visitor_request};

    #[test]
    fn test_scenario_a_perfect_pair_scores_100() {
        let v = visitor("v1", visitor_request(2));
        let h = host("h1", host_offer(4));

        let result = CompatibilityScore::calculate(&v, &h);
        // wifi + breakfast is two amenities: 3 points
        assert_eq!(result.earned(), 103);
        assert_eq!(result.possible(), BASE_POSSIBLE);
        assert_eq!(result.total, 100);
        assert_eq!(result.fit, Fit::Excellent);
        assert_eq!(result.factor(Factor::TightFit).unwrap().earned, TIGHT_FIT_BONUS);
        assert_eq!(result.factor(Factor::Amenities).unwrap().earned, 3);
    }

    #[test]
    fn test_tight_fit_is_extra_credit() {
        let v = visitor("v1", visitor_request(2));
        let mut tight = host_offer(4);
        tight.distance_meters = Some(10_000);
        let mut roomy = tight.clone();
        roomy.total_capacity = 10;
        roomy.remaining_capacity = 10;

        let tight = CompatibilityScore::calculate(&v, &host("h1", tight));
        let roomy = CompatibilityScore::calculate(&v, &host("h2", roomy));

        assert_eq!(tight.factor(Factor::TightFit).unwrap().possible, 0);
        assert_eq!(tight.possible(), BASE_POSSIBLE);
        assert_eq!(roomy.possible(), BASE_POSSIBLE);
        assert_eq!(tight.total, 95);
        assert_eq!(roomy.total, 90);
    }

    #[test]
    fn test_scenario_b_insufficient_capacity() {
        let v = visitor("v1", visitor_request(2));
        let mut offer = host_offer(4);
        offer.remaining_capacity = 1;
        let h = host("h1", offer);

        let result = CompatibilityScore::calculate(&v, &h);
        assert_eq!(result.total, 0);
        assert_eq!(
            result.disqualified,
            Some(Disqualification::InsufficientCapacity {
                available: 1,
                requested: 2
            })
        );
        assert!(result.factors.is_empty());
    }

    #[test]
    fn test_scenario_c_one_day_overshoot() {
        let v = visitor("v1", visitor_request(2));
        let mut offer = host_offer(4);
        offer.available_until = Some(july(11));
        let h = host("h1", offer);

        let result = CompatibilityScore::calculate(&v, &h);
        assert_eq!(result.factor(Factor::Dates).unwrap().earned, 12);
        assert_eq!(result.earned(), 100);
        assert_eq!(result.total, 100);
    }

    #[test]
    fn test_different_events_score_zero() {
        let v = visitor("v1", visitor_request(2));
        let mut h = host("h1", host_offer(4));
        h.event_id = EventId::new("another-event");

        assert_eq!(score(&v, &h), 0);
        assert_eq!(
            CompatibilityScore::calculate(&v, &h).disqualified,
            Some(Disqualification::DifferentEvents)
        );
    }

    #[test]
    fn test_wrong_variants_score_zero() {
        let v = visitor("v1", visitor_request(2));
        let h = host("h1", host_offer(4));
        assert_eq!(score(&h, &h), 0);
        assert_eq!(score(&v, &v), 0);
    }

    #[test]
    fn test_date_classification() {
        let (from, until) = (july(1), july(11));
        assert_eq!(classify_stay(july(2), july(5), from, until), DateFit::Inside);
        assert_eq!(classify_stay(july(10), july(12), from, until), DateFit::Overshoot(1));
        assert_eq!(classify_stay(july(10), july(13), from, until), DateFit::Overshoot(2));
        assert_eq!(classify_stay(july(10), july(20), from, until), DateFit::Overshoot(9));
        assert_eq!(classify_stay(july(12), july(14), from, until), DateFit::ArrivalOutside);

        assert_eq!(date_points(DateFit::Overshoot(2)), 8);
        assert_eq!(date_points(DateFit::Overshoot(9)), 5);
        assert_eq!(date_points(DateFit::ArrivalOutside), 0);
        assert_eq!(date_points(DateFit::Unknown), DATE_POINTS);
    }

    #[test]
    fn test_missing_dates_are_no_constraint() {
        let mut request = visitor_request(2);
        request.arrival = None;
        request.departure = None;
        let v = visitor("v1", request);
        let h = host("h1", host_offer(4));

        let result = CompatibilityScore::calculate(&v, &h);
        assert_eq!(result.factor(Factor::Dates).unwrap().earned, DATE_POINTS);
    }

    #[test]
    fn test_gender_points() {
        use GenderComposition as G;
        use GenderPolicy as P;
        assert_eq!(gender_points(G::Female, P::Both), 15);
        assert_eq!(gender_points(G::Female, P::Female), 15);
        assert_eq!(gender_points(G::Mixed, P::Female), 8);
        assert_eq!(gender_points(G::Male, P::Female), 0);
    }

    #[test]
    fn test_children_and_pets() {
        let mut request = visitor_request(3);
        request.ages = vec![35, 33, 6];
        request.preferences.pets = true;
        let mut offer = host_offer(6);
        offer.accepts_children = false;
        offer.accepts_pets = false;

        assert!(!children_ok(&request, &offer));
        assert!(!pets_ok(&request, &offer));

        offer.accepts_children = true;
        offer.accepts_pets = true;
        assert!(children_ok(&request, &offer));
        assert!(pets_ok(&request, &offer));
    }

    #[test]
    fn test_distance_and_amenity_tiers() {
        assert_eq!(distance_points(Some(1_000)), 10);
        assert_eq!(distance_points(Some(1_001)), 7);
        assert_eq!(distance_points(Some(5_000)), 4);
        assert_eq!(distance_points(Some(12_000)), 2);
        assert_eq!(distance_points(None), 5);

        assert_eq!(amenity_points(0), 2);
        assert_eq!(amenity_points(1), 3);
        assert_eq!(amenity_points(3), 4);
        assert_eq!(amenity_points(7), 5);
    }

    #[test]
    fn test_score_stays_in_range() {
        // Worst case that still passes the disqualifiers
        let mut request = visitor_request(1);
        request.gender = GenderComposition::Male;
        request.ages = vec![5];
        request.preferences.pets = true;
        request.arrival = Some(july(20));
        request.departure = Some(july(22));

        let mut offer = host_offer(10);
        offer.gender_policy = GenderPolicy::Female;
        offer.accepts_children = false;
        offer.available_until = Some(july(15));
        offer.distance_meters = Some(20_000);
        offer.amenities.clear();

        let result = CompatibilityScore::calculate(&visitor("v", request), &host("h", offer));
        // event 20 + capacity 20 + distance 2 + amenities 2
        assert_eq!(result.earned(), 44);
        assert_eq!(result.total, 44);
        assert_eq!(result.fit, Fit::Poor);

        for people in 1..=4 {
            let s = score(&visitor("v", visitor_request(people)), &host("h", host_offer(4)));
            assert!(s <= 100);
        }
    }

    #[test]
    fn test_normalize_rounds_half_up() {
        assert_eq!(normalize(0, 100), 0);
        assert_eq!(normalize(1, 200), 1);
        assert_eq!(normalize(104, 100), 100);
        assert_eq!(normalize(5, 0), 0);
    }
}
