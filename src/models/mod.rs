// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    Candidate, Coordinate, Hub, Judgement, LegResult, LocationSource, Participant,
    ParticipantStatus, Recommendation, ResolvedParticipant, ScoredCandidate, ScoringParams,
    SelectionParams, TravelLeg, TravelMode, TravelSummary, VenueParams,
};
pub use requests::{SelectHubRequest, SelectVenueRequest};
pub use responses::{ErrorResponse, HealthResponse, HubListResponse, SelectHubResponse, SelectVenueResponse};
