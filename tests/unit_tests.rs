// Unit tests for Fairmeet's public helpers

use std::collections::BTreeMap;

use fairmeet::core::{
    aggregate_legs, calculate_penalty, centroid, dedup_nearby, extract_json, is_near, match_suggestions,
    parse_judgement, parse_suggestions, proximity_shortlist, rank_candidates, summarize_travel,
    DEFAULT_CITY_CENTER,
};
use fairmeet::models::{
    Candidate, Coordinate, Hub, LocationSource, Participant, ResolvedParticipant, ScoredCandidate, ScoringParams,
    TravelLeg,
};

fn member(id: &str, name: &str) -> ResolvedParticipant {
    let home = Coordinate::new(51.5, -0.1);
    ResolvedParticipant {
        id: id.to_string(),
        name: name.to_string(),
        start_location: home,
        start_label: "Home".to_string(),
        end_location: home,
        end_label: "Home".to_string(),
    }
}

fn candidate(id: &str, lat: f64, lng: f64) -> Candidate {
    Candidate {
        id: id.to_string(),
        name: id.to_uppercase(),
        center: Coordinate::new(lat, lng),
        description: String::new(),
    }
}

fn leg(outbound: u32, back: u32) -> TravelLeg {
    TravelLeg {
        outbound_minutes: outbound,
        return_minutes: back,
        complete: true,
    }
}

fn scored(id: &str, lat: f64, lng: f64, fairness: f64) -> ScoredCandidate {
    ScoredCandidate {
        candidate: candidate(id, lat, lng),
        travel_legs: BTreeMap::new(),
        total_minutes: fairness as u32,
        worst_case_minutes: 0,
        fairness_score: fairness,
        missing_participants: Vec::new(),
    }
}

#[test]
fn test_centroid_lies_within_bounding_box() {
    let points = [
        Coordinate::new(51.5033, -0.1145),
        Coordinate::new(51.5308, -0.1238),
        Coordinate::new(51.4627, -0.1145),
        Coordinate::new(51.5416, -0.0042),
    ];
    let c = centroid(&points);

    assert!(c.lat >= 51.4627 && c.lat <= 51.5416);
    assert!(c.lng >= -0.1238 && c.lng <= -0.0042);
}

#[test]
fn test_centroid_ignores_unresolved_points() {
    let c = centroid(&[Coordinate::UNRESOLVED, Coordinate::new(51.5, -0.1)]);
    assert_eq!(c, Coordinate::new(51.5, -0.1));
    assert_eq!(centroid(&[Coordinate::UNRESOLVED]), DEFAULT_CITY_CENTER);
}

#[test]
fn test_fairness_never_below_total() {
    let params = ScoringParams::default();
    let members = vec![member("a", "Ana"), member("b", "Ben")];

    for (a, b) in [(20, 25), (45, 45), (60, 31), (80, 40)] {
        let legs = vec![leg(a, a), leg(b, b)];
        let s = aggregate_legs(candidate("x", 51.5, -0.1), &members, &legs, &params).unwrap();

        assert!(s.fairness_score >= s.total_minutes as f64);
        let penalised = s.worst_case_minutes > params.penalty_threshold_minutes;
        assert_eq!(s.fairness_score > s.total_minutes as f64, penalised);
    }
}

#[test]
fn test_penalty_example() {
    // worst round trip 100 minutes: 10 over the threshold at 5 per minute
    assert_eq!(calculate_penalty(100, &ScoringParams::default()), 50.0);
    assert_eq!(calculate_penalty(90, &ScoringParams::default()), 0.0);
}

#[test]
fn test_incomplete_leg_is_not_counted() {
    let params = ScoringParams::default();
    let members = vec![member("a", "Ana"), member("b", "Ben")];
    let legs = vec![
        leg(20, 25),
        TravelLeg {
            outbound_minutes: 0,
            return_minutes: 30,
            complete: false,
        },
    ];

    let s = aggregate_legs(candidate("x", 51.5, -0.1), &members, &legs, &params).unwrap();
    assert_eq!(s.total_minutes, 45);
    assert_eq!(s.missing_participants, vec!["b".to_string()]);

    let summary = summarize_travel(&s, &members);
    assert_eq!(summary.avg_minutes, 45.0);
    assert_eq!(summary.worst_participant.as_deref(), Some("Ana"));
}

#[test]
fn test_nothing_routed_drops_candidate() {
    let members = vec![member("a", "Ana")];
    let legs = vec![TravelLeg {
        outbound_minutes: 0,
        return_minutes: 0,
        complete: false,
    }];
    assert!(aggregate_legs(candidate("x", 51.5, -0.1), &members, &legs, &ScoringParams::default()).is_none());
}

#[test]
fn test_ranking_is_stable_and_prefers_complete() {
    let mut list = vec![
        scored("a", 51.50, -0.10, 100.0),
        scored("b", 51.51, -0.11, 90.0),
        scored("c", 51.52, -0.12, 100.0),
    ];
    list[1].missing_participants.push("m".to_string());

    rank_candidates(&mut list);
    let order: Vec<&str> = list.iter().map(|s| s.candidate.id.as_str()).collect();
    assert_eq!(order, vec!["a", "c", "b"]);
}

#[test]
fn test_dedup_keeps_best_of_a_cluster() {
    let ranked = vec![
        scored("bank", 51.5133, -0.0886, 60.0),
        scored("bank-dlr", 51.5134, -0.0887, 61.0),
        scored("waterloo", 51.5033, -0.1145, 70.0),
        scored("angel", 51.5322, -0.1058, 75.0),
        scored("victoria", 51.4965, -0.1447, 80.0),
    ];

    let accepted = dedup_nearby(&ranked, 0.00001, 3);
    let ids: Vec<&str> = accepted.iter().map(|s| s.candidate.id.as_str()).collect();
    assert_eq!(ids, vec!["bank", "waterloo", "angel"]);

    for (i, a) in accepted.iter().enumerate() {
        for b in &accepted[i + 1..] {
            assert!(!is_near(a.candidate.center, b.candidate.center, 0.00001));
        }
    }
}

fn hub(id: &str, name: &str, lat: f64, lng: f64) -> Hub {
    Hub {
        id: id.to_string(),
        name: name.to_string(),
        lat,
        lng,
        zone: String::new(),
        lines: vec![],
    }
}

#[test]
fn test_suggestions_match_known_hubs_loosely() {
    let hubs = vec![
        hub("kgx", "King's Cross St. Pancras", 51.5308, -0.1238),
        hub("wat", "Waterloo", 51.5033, -0.1145),
    ];
    let names = vec![
        "waterloo station".to_string(),
        "King's Cross".to_string(),
        "Waterloo".to_string(),
        "Narnia".to_string(),
    ];

    let matched = match_suggestions(&names, &hubs);
    let ids: Vec<&str> = matched.iter().map(|h| h.id.as_str()).collect();
    assert_eq!(ids, vec!["wat", "kgx"]);
}

#[test]
fn test_proximity_shortlist_orders_by_distance() {
    let hubs = vec![
        hub("far", "Far", 51.60, -0.30),
        hub("near", "Near", 51.5075, -0.1279),
        hub("mid", "Mid", 51.52, -0.10),
    ];
    let shortlist = proximity_shortlist(&hubs, DEFAULT_CITY_CENTER, 2);
    let ids: Vec<&str> = shortlist.iter().map(|h| h.id.as_str()).collect();
    assert_eq!(ids, vec!["near", "mid"]);
}

#[test]
fn test_json_extraction_from_chatty_output() {
    let text = "Here you go: {\"winner\": \"Bank {central}\", \"reasons\": {}} Hope that helps!";
    let value = extract_json(text).unwrap();
    assert_eq!(value["winner"], "Bank {central}");

    assert!(extract_json("no json at all").is_none());
    assert!(extract_json("[unbalanced").is_none());
}

#[test]
fn test_parse_helpers_fail_soft() {
    assert!(parse_suggestions("").is_empty());
    assert!(parse_suggestions("{\"oops\": true").is_empty());
    assert!(parse_judgement("nothing to see").is_none());

    let judgement = parse_judgement(r#"{"winner": "Angel", "reasons": {"Angel": "Northern line for all."}}"#).unwrap();
    assert_eq!(judgement.winner, "Angel");
}

#[test]
fn test_participant_payload_shape() {
    let json = serde_json::json!({
        "id": "p1",
        "name": "Ana",
        "status": "ready",
        "start": {"type": "station", "id": "waterloo"},
        "end": {"type": "custom", "location": {"lat": 51.46, "lng": -0.11}, "label": "Home"}
    });

    let p: Participant = serde_json::from_value(json).unwrap();
    assert!(p.is_active());
    assert_eq!(p.start, LocationSource::Station { id: "waterloo".to_string() });
    assert!(matches!(p.end, Some(LocationSource::Custom { ref label, .. }) if label == "Home"));
}
