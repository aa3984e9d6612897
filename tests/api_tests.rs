// HTTP surface tests

use std::sync::Arc;

use actix_web::{test, web, App};
use async_trait::async_trait;
use fairmeet::core::{CandidateScorer, HubSelector, RecordingSleeper, VenueSelector};
use fairmeet::models::{
    Candidate, Coordinate, Hub, Judgement, LegResult, ScoredCandidate, ScoringParams, SelectionParams, TravelMode,
    VenueParams,
};
use fairmeet::routes::{configure_routes, AppState};
use fairmeet::services::{PlaceGateway, RoutingGateway, StaticHubDirectory, SuggestionGateway};
use serde_json::{json, Value};

struct FlatRouting;

#[async_trait]
impl RoutingGateway for FlatRouting {
    async fn matrix(&self, origins: &[Coordinate], destinations: &[Coordinate], _mode: TravelMode) -> Vec<Vec<LegResult>> {
        vec![vec![LegResult::ok(20); destinations.len()]; origins.len()]
    }
}

struct OnePub;

#[async_trait]
impl PlaceGateway for OnePub {
    async fn search_nearby(&self, center: Coordinate, _radius_meters: u32, _tags: &[String]) -> Vec<Candidate> {
        vec![Candidate {
            id: "pub-1".to_string(),
            name: "The Railway Tavern".to_string(),
            center,
            description: String::new(),
        }]
    }

    async fn enrich(&self, _candidate: &Candidate) -> String {
        "Cosy station pub.".to_string()
    }

    async fn reverse_label(&self, _location: Coordinate) -> Option<String> {
        None
    }
}

struct SilentScout;

#[async_trait]
impl SuggestionGateway for SilentScout {
    async fn suggest_hubs(&self, _context: &str, _meeting_time: &str) -> Vec<String> {
        Vec::new()
    }

    async fn judge_candidates(&self, _candidates: &[ScoredCandidate], _context: &str) -> Option<Judgement> {
        None
    }
}

fn state() -> AppState {
    let directory = Arc::new(StaticHubDirectory::new(vec![
        Hub {
            id: "bank".to_string(),
            name: "Bank".to_string(),
            lat: 51.5133,
            lng: -0.0886,
            zone: "1".to_string(),
            lines: vec!["Central".to_string()],
        },
        Hub {
            id: "angel".to_string(),
            name: "Angel".to_string(),
            lat: 51.5322,
            lng: -0.1058,
            zone: "1".to_string(),
            lines: vec!["Northern".to_string()],
        },
    ]));
    let places = Arc::new(OnePub);
    let scorer = CandidateScorer::new(Arc::new(FlatRouting), ScoringParams::default());

    let hub_selector = HubSelector::new(
        directory.clone(),
        places.clone(),
        Arc::new(SilentScout),
        scorer.clone(),
        SelectionParams::default(),
    )
    .with_sleeper(Arc::new(RecordingSleeper::new()));
    let venue_selector = VenueSelector::new(directory.clone(), places, scorer, VenueParams::default());

    AppState {
        directory,
        hub_selector: Arc::new(hub_selector),
        venue_selector: Arc::new(venue_selector),
        postgres: None,
    }
}

fn members() -> Value {
    json!([
        {"id": "a", "name": "Ana", "status": "ready", "start": {"type": "station", "id": "bank"}},
        {"id": "b", "name": "Ben", "status": "ready", "start": {"type": "live", "location": {"lat": 51.52, "lng": -0.10}}}
    ])
}

#[actix_web::test]
async fn test_health() {
    let app = test::init_service(App::new().app_data(web::Data::new(state())).configure(configure_routes)).await;

    let req = test::TestRequest::get().uri("/api/v1/health").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["status"], "healthy");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[actix_web::test]
async fn test_list_hubs() {
    let app = test::init_service(App::new().app_data(web::Data::new(state())).configure(configure_routes)).await;

    let req = test::TestRequest::get().uri("/api/v1/hubs").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["count"], 2);
    assert_eq!(body["hubs"][0]["id"], "bank");
}

#[actix_web::test]
async fn test_select_hub_falls_back_when_scout_is_silent() {
    let app = test::init_service(App::new().app_data(web::Data::new(state())).configure(configure_routes)).await;

    let req = test::TestRequest::post()
        .uri("/api/v1/hubs/select")
        .set_json(json!({"members": members(), "meetingTime": "Friday 19:00"}))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["usedFallback"], true);
    let recs = body["recommendations"].as_array().unwrap();
    assert_eq!(recs.len(), 2);
    assert_eq!(recs[0]["rank"], 1);
    assert!(recs[0]["fairnessScore"].is_number());
    assert!(recs[0]["summary"]["avgMinutes"].is_number());
}

#[actix_web::test]
async fn test_select_hub_rejects_empty_group() {
    let app = test::init_service(App::new().app_data(web::Data::new(state())).configure(configure_routes)).await;

    let req = test::TestRequest::post()
        .uri("/api/v1/hubs/select")
        .set_json(json!({"members": []}))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), 400);
}

#[actix_web::test]
async fn test_select_venue_by_hub_id() {
    let app = test::init_service(App::new().app_data(web::Data::new(state())).configure(configure_routes)).await;

    let req = test::TestRequest::post()
        .uri("/api/v1/venues/select")
        .set_json(json!({"hubId": "bank", "members": members(), "radiusMeters": 500}))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    let recs = body["recommendations"].as_array().unwrap();
    assert_eq!(recs.len(), 1);
    assert_eq!(recs[0]["name"], "The Railway Tavern");
    assert_eq!(recs[0]["isWinner"], true);
    assert_eq!(recs[0]["rationale"], "Cosy station pub.");
}

#[actix_web::test]
async fn test_select_venue_unknown_hub_is_404() {
    let app = test::init_service(App::new().app_data(web::Data::new(state())).configure(configure_routes)).await;

    let req = test::TestRequest::post()
        .uri("/api/v1/venues/select")
        .set_json(json!({"hubId": "atlantis", "members": members()}))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), 404);
}

#[actix_web::test]
async fn test_select_venue_needs_a_hub() {
    let app = test::init_service(App::new().app_data(web::Data::new(state())).configure(configure_routes)).await;

    let req = test::TestRequest::post()
        .uri("/api/v1/venues/select")
        .set_json(json!({"members": members()}))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), 400);

    let req = test::TestRequest::post()
        .uri("/api/v1/venues/select")
        .set_json(json!({"hub": {"lat": 51.5133, "lng": -0.0886}, "members": members(), "radiusMeters": 50}))
        .to_request();
    let resp = test::call_service(&app, req).await;

    // below the minimum radius
    assert_eq!(resp.status(), 400);
}
