// Core algorithm exports
pub mod geo;
pub mod hub_selector;
pub mod matching;
pub mod parsing;
pub mod resolve;
pub mod retry;
pub mod scoring;
pub mod venue_selector;

pub use geo::{centroid, haversine_meters, is_near, squared_distance, DEFAULT_CITY_CENTER};
pub use hub_selector::{HubSelection, HubSelector, Stage};
pub use matching::{dedup_nearby, match_hub, match_suggestions, names_match, proximity_shortlist};
pub use parsing::{extract_json, parse_judgement, parse_suggestions};
pub use resolve::LocationResolver;
pub use retry::{retry_until, RecordingSleeper, RetryOutcome, RetryPolicy, Sleeper, TokioSleeper};
pub use scoring::{aggregate_legs, calculate_penalty, rank_candidates, summarize_travel, CandidateScorer};
pub use venue_selector::VenueSelector;
