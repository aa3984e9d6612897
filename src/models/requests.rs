use serde::{Deserialize, Serialize};
use validator::Validate;
use crate::models::domain::{Coordinate, Participant};

/// Request to pick a meeting hub
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SelectHubRequest {
    #[validate(length(min = 1, max = 50))]
    pub members: Vec<Participant>,
    #[serde(default, alias = "meeting_time", rename = "meetingTime")]
    pub meeting_time: String,
}

/// Request to pick a venue near a confirmed hub
///
/// Either `hubId` (looked up in the reference data) or `hub` must be set.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SelectVenueRequest {
    #[serde(default, alias = "hub_id", rename = "hubId")]
    pub hub_id: Option<String>,
    #[serde(default)]
    pub hub: Option<Coordinate>,
    #[validate(length(min = 1, max = 50))]
    pub members: Vec<Participant>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[validate(range(min = 100, max = 5000))]
    #[serde(default, alias = "radius_meters", rename = "radiusMeters")]
    pub radius_meters: Option<u32>,
}
