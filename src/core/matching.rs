use std::cmp::Ordering;

use crate::core::geo::{is_near, squared_distance};
use crate::models::{Coordinate, Hub, ScoredCandidate};

/// Case-insensitive containment in either direction
///
/// "Waterloo" matches "Waterloo Station" and vice versa.
#[inline]
pub fn names_match(a: &str, b: &str) -> bool {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();
    if a.is_empty() || b.is_empty() {
        return false;
    }
    a.contains(&b) || b.contains(&a)
}

/// Resolve one suggested name to a known hub
///
/// An exact (case-insensitive) name wins; otherwise the first hub in
/// directory order whose name contains, or is contained by, the suggestion.
pub fn match_hub<'a>(suggestion: &str, hubs: &'a [Hub]) -> Option<&'a Hub> {
    let wanted = suggestion.trim();
    if wanted.is_empty() {
        return None;
    }

    hubs.iter()
        .find(|hub| hub.name.trim().eq_ignore_ascii_case(wanted))
        .or_else(|| hubs.iter().find(|hub| names_match(&hub.name, wanted)))
}

/// Map scout suggestions onto known hubs, keeping suggestion order
///
/// Unknown names are dropped and each hub appears at most once.
pub fn match_suggestions(suggestions: &[String], hubs: &[Hub]) -> Vec<Hub> {
    let mut matched: Vec<Hub> = Vec::new();

    for suggestion in suggestions {
        match match_hub(suggestion, hubs) {
            Some(hub) if !matched.iter().any(|m| m.id == hub.id) => matched.push(hub.clone()),
            Some(_) => {}
            None => tracing::debug!("Scout suggestion '{}' matches no known hub", suggestion),
        }
    }

    matched
}

/// The `limit` hubs nearest to `origin`, nearest first (ties keep directory order)
pub fn proximity_shortlist(hubs: &[Hub], origin: Coordinate, limit: usize) -> Vec<Hub> {
    let mut ranked: Vec<(f64, &Hub)> = hubs
        .iter()
        .filter(|hub| hub.center().is_resolved())
        .map(|hub| (squared_distance(hub.center(), origin), hub))
        .collect();

    ranked.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));

    ranked.into_iter().take(limit).map(|(_, hub)| hub.clone()).collect()
}

/// Walk a ranked list and keep candidates that are not near an accepted one
///
/// Stops after `limit` acceptances, so two entrances of one interchange are
/// never offered as separate options.
pub fn dedup_nearby(ranked: &[ScoredCandidate], threshold_deg_sq: f64, limit: usize) -> Vec<ScoredCandidate> {
    let mut accepted: Vec<ScoredCandidate> = Vec::with_capacity(limit);

    for candidate in ranked {
        if accepted.len() >= limit {
            break;
        }
        let duplicate = accepted
            .iter()
            .any(|kept| is_near(kept.candidate.center, candidate.candidate.center, threshold_deg_sq));
        if duplicate {
            tracing::debug!("Skipping {}: too close to an accepted option", candidate.candidate.name);
            continue;
        }
        accepted.push(candidate.clone());
    }

    accepted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Candidate;
    use std::collections::BTreeMap;

    fn hub(id: &str, name: &str, lat: f64, lng: f64) -> Hub {
        Hub {
            id: id.to_string(),
            name: name.to_string(),
            lat,
            lng,
            zone: "1".to_string(),
            lines: vec![],
        }
    }

    fn hubs() -> Vec<Hub> {
        vec![
            hub("wat", "Waterloo", 51.5031, -0.1132),
            hub("wae", "Waterloo East", 51.5040, -0.1088),
            hub("kgx", "King's Cross St. Pancras", 51.5308, -0.1238),
            hub("bnk", "Bank", 51.5133, -0.0886),
            hub("mon", "Monument", 51.5113, -0.0872),
        ]
    }

    fn scored(id: &str, lat: f64, lng: f64, fairness: f64) -> ScoredCandidate {
        ScoredCandidate {
            candidate: Candidate {
                id: id.to_string(),
                name: id.to_string(),
                center: Coordinate::new(lat, lng),
                description: String::new(),
            },
            travel_legs: BTreeMap::new(),
            total_minutes: fairness as u32,
            worst_case_minutes: 30,
            fairness_score: fairness,
            missing_participants: vec![],
        }
    }

    #[test]
    fn test_names_match_both_directions() {
        assert!(names_match("Waterloo", "Waterloo Station"));
        assert!(names_match("WATERLOO STATION", "waterloo"));
        assert!(!names_match("Bank", "Waterloo"));
        assert!(!names_match("", "Waterloo"));
    }

    #[test]
    fn test_exact_match_beats_containment() {
        let hubs = hubs();
        assert_eq!(match_hub("waterloo", &hubs).unwrap().id, "wat");
        assert_eq!(match_hub("Waterloo East", &hubs).unwrap().id, "wae");
        assert_eq!(match_hub("King's Cross", &hubs).unwrap().id, "kgx");
        assert!(match_hub("   ", &hubs).is_none());
    }

    #[test]
    fn test_match_suggestions_dedups_and_keeps_order() {
        let suggestions = vec![
            "Bank Station".to_string(),
            "Atlantis".to_string(),
            "Waterloo".to_string(),
            "bank".to_string(),
        ];
        let matched = match_suggestions(&suggestions, &hubs());
        let ids: Vec<&str> = matched.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["bnk", "wat"]);
    }

    #[test]
    fn test_proximity_shortlist_orders_by_distance() {
        let origin = Coordinate::new(51.5120, -0.0880);
        let shortlist = proximity_shortlist(&hubs(), origin, 3);
        let ids: Vec<&str> = shortlist.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["mon", "bnk", "wae"]);
    }

    #[test]
    fn test_dedup_nearby_skips_neighbours() {
        let ranked = vec![
            scored("bank", 51.5133, -0.0886, 100.0),
            scored("monument", 51.5113, -0.0872, 101.0),
            scored("waterloo", 51.5031, -0.1132, 110.0),
            scored("kings_cross", 51.5308, -0.1238, 120.0),
            scored("victoria", 51.4965, -0.1447, 130.0),
        ];

        let accepted = dedup_nearby(&ranked, 0.00001, 3);
        let ids: Vec<&str> = accepted.iter().map(|s| s.candidate.id.as_str()).collect();
        assert_eq!(ids, vec!["bank", "waterloo", "kings_cross"]);

        for (i, a) in accepted.iter().enumerate() {
            for b in accepted.iter().skip(i + 1) {
                assert!(!is_near(a.candidate.center, b.candidate.center, 0.00001));
            }
        }
    }
}
