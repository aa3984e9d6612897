//! Fairmeet - fair meeting-point selection for groups travelling across a city
//!
//! Given where each member starts and ends their evening, the selectors pick
//! the transit hub (and then the venue near it) whose round trips are both
//! short overall and balanced across the group.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use core::{calculate_penalty, centroid, is_near, CandidateScorer, HubSelection, HubSelector, VenueSelector};
pub use models::{Candidate, Coordinate, Hub, Participant, Recommendation, ScoredCandidate, ScoringParams};
