use serde::Serialize;

use crate::core::postulation::{HostOffer, Postulation, VisitorRequest};
use crate::core::types::{GenderComposition, GenderPolicy};
use crate::matching::scoring::{
    amenity_points, children_ok, date_fit, pets_ok, CompatibilityScore, DateFit, TIGHT_FIT_SLACK,
};

/// Human-readable breakdown of a (visitor, host) pairing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Explanation {
    /// Points in favour of the pairing
    pub pros: Vec<String>,

    /// Points against the pairing
    pub cons: Vec<String>,

    /// Facts worth knowing that neither help nor hurt
    pub neutral: Vec<String>,
}

impl Explanation {
    /// Walk the same factor checks as [`CompatibilityScore::calculate`] and
    /// sort each into pros, cons or neutral.
    #[must_use]
    pub fn analyze(visitor: &Postulation, host: &Postulation) -> Self {
        let mut explanation = Self::default();

        if let Some(reason) = CompatibilityScore::calculate(visitor, host).disqualified {
            explanation.cons.push(reason.to_string());
            return explanation;
        }
        let (Some(request), Some(offer)) = (visitor.as_visitor(), host.as_host()) else {
            return explanation;
        };

        explanation.capacity(request, offer);
        explanation.gender(request, offer);
        explanation.dates(request, offer);
        explanation.children(request, offer);
        explanation.pets(request, offer);
        explanation.distance(offer);
        explanation.amenities(offer);

        explanation
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pros.is_empty() && self.cons.is_empty() && self.neutral.is_empty()
    }

    fn capacity(&mut self, request: &VisitorRequest, offer: &HostOffer) {
        let slack = offer.remaining_capacity - request.people_count;
        if slack == 0 {
            self.pros.push(format!(
                "Exact fit: {} places for a group of {}",
                offer.remaining_capacity, request.people_count
            ));
        } else if slack <= TIGHT_FIT_SLACK {
            self.pros.push(format!(
                "Good fit: {slack} spare place(s) after lodging the group"
            ));
        } else {
            self.neutral.push(format!(
                "Host has {slack} places to spare beyond this group"
            ));
        }
    }

    fn gender(&mut self, request: &VisitorRequest, offer: &HostOffer) {
        match offer.gender_policy.restricted_to() {
            None => self.pros.push("Host accepts any group".to_string()),
            Some(accepted) if accepted == request.gender => self
                .pros
                .push(format!("Host welcomes {} groups", request.gender)),
            Some(accepted) if request.gender == GenderComposition::Mixed => {
                self.neutral
                    .push(format!("Mixed group, host prefers {accepted} guests"));
            }
            Some(_) => self.cons.push(format!(
                "Host only accepts {} guests",
                policy_label(offer.gender_policy)
            )),
        }
    }

    fn dates(&mut self, request: &VisitorRequest, offer: &HostOffer) {
        match date_fit(request, offer) {
            DateFit::Unknown => self
                .neutral
                .push("Dates not specified on both sides".to_string()),
            DateFit::Inside => self
                .pros
                .push("Stay fits entirely within host availability".to_string()),
            DateFit::Overshoot(days) => self.cons.push(format!(
                "Departure is {days} day(s) after host availability ends"
            )),
            DateFit::ArrivalOutside => self
                .cons
                .push("Arrival falls outside host availability".to_string()),
        }
    }

    fn children(&mut self, request: &VisitorRequest, offer: &HostOffer) {
        if !request.has_minors() {
            self.neutral.push("No children in the group".to_string());
        } else if children_ok(request, offer) {
            self.pros.push("Host accepts children".to_string());
        } else {
            self.cons
                .push("Group includes children but host does not accept them".to_string());
        }
    }

    fn pets(&mut self, request: &VisitorRequest, offer: &HostOffer) {
        if !request.preferences.pets {
            self.neutral.push("No pets".to_string());
        } else if pets_ok(request, offer) {
            self.pros.push("Host accepts pets".to_string());
        } else {
            self.cons
                .push("Group travels with pets but host does not accept them".to_string());
        }
    }

    fn distance(&mut self, offer: &HostOffer) {
        match offer.distance_meters {
            None => self
                .neutral
                .push("Distance to the venue unknown".to_string()),
            Some(d) if d <= 1_000 => self.pros.push(format!("Very close to the venue ({d} m)")),
            Some(d) if d <= 3_000 => self.pros.push(format!("Close to the venue ({d} m)")),
            Some(d) if d <= 5_000 => self
                .neutral
                .push(format!("Moderate distance to the venue ({d} m)")),
            Some(d) => self.cons.push(format!("Far from the venue ({d} m)")),
        }
    }

    fn amenities(&mut self, offer: &HostOffer) {
        let count = offer.amenities.len();
        let listed = offer
            .amenities
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        match amenity_points(count) {
            4 | 5 => self.pros.push(format!("{count} amenities: {listed}")),
            3 => self.neutral.push(format!("{count} amenities: {listed}")),
            _ => self.cons.push("No amenities listed".to_string()),
        }
    }
}

fn policy_label(policy: GenderPolicy) -> &'static str {
    match policy {
        GenderPolicy::Male => "male",
        GenderPolicy::Female => "female",
        GenderPolicy::Both => "any",
    }
}

/// Categorized pros, cons and neutral facts for a pairing
#[must_use]
pub fn explain(visitor: &Postulation, host: &Postulation) -> Explanation {
    Explanation::analyze(visitor, host)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{EventId, GenderComposition};
    use crate::testing::{host, host_offer, july, visitor, visitor_request};

    #[test]
    fn test_perfect_pair() {
        let v = visitor("v1", visitor_request(2));
        let h = host("h1", host_offer(4));

        let explanation = explain(&v, &h);
        assert!(explanation.cons.is_empty());
        assert!(explanation.pros.iter().any(|p| p.contains("Good fit")));
        assert!(explanation.pros.iter().any(|p| p.contains("800 m")));
        assert!(explanation
            .neutral
            .iter()
            .any(|n| n == "2 amenities: breakfast, wifi"));
    }

    #[test]
    fn test_explain_is_idempotent() {
        let mut request = visitor_request(3);
        request.ages = vec![40, 8, 6];
        request.preferences.pets = true;
        let v = visitor("v1", request);
        let h = host("h1", host_offer(6));

        assert_eq!(explain(&v, &h), explain(&v, &h));
    }

    #[test]
    fn test_disqualified_pair_has_single_con() {
        let v = visitor("v1", visitor_request(5));
        let h = host("h1", host_offer(4));

        let explanation = explain(&v, &h);
        assert!(explanation.pros.is_empty());
        assert!(explanation.neutral.is_empty());
        assert_eq!(explanation.cons.len(), 1);
        assert!(explanation.cons[0].contains("4 places left"));

        let mut other = host("h2", host_offer(4));
        other.event_id = EventId::new("other-event");
        assert_eq!(
            explain(&visitor("v1", visitor_request(2)), &other).cons,
            vec!["Visitor and host belong to different events".to_string()]
        );
    }

    #[test]
    fn test_cons_mirror_lost_points() {
        let mut request = visitor_request(2);
        request.gender = GenderComposition::Male;
        request.ages = vec![35, 4];
        request.preferences.pets = true;
        request.departure = Some(july(14));

        let mut offer = host_offer(10);
        offer.gender_policy = GenderPolicy::Female;
        offer.accepts_children = false;
        offer.available_until = Some(july(12));
        offer.distance_meters = Some(9_000);
        offer.amenities.clear();

        let explanation = explain(&visitor("v", request), &host("h", offer));
        assert_eq!(explanation.cons.len(), 6);
        assert!(explanation
            .cons
            .contains(&"Departure is 2 day(s) after host availability ends".to_string()));
        assert!(explanation
            .cons
            .contains(&"Host only accepts female guests".to_string()));
        assert!(explanation
            .neutral
            .iter()
            .any(|n| n.contains("8 places to spare")));
    }
}
