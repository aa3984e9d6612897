use serde::{Deserialize, Serialize};
use crate::models::domain::{Hub, Recommendation};

/// Response for the hub selection endpoint
#[derive(Debug, Clone, Serialize)]
pub struct SelectHubResponse {
    pub narrative: String,
    #[serde(rename = "usedFallback")]
    pub used_fallback: bool,
    pub recommendations: Vec<Recommendation>,
}

/// Response for the venue selection endpoint
#[derive(Debug, Clone, Serialize)]
pub struct SelectVenueResponse {
    pub recommendations: Vec<Recommendation>,
}

/// Reference hub listing
#[derive(Debug, Clone, Serialize)]
pub struct HubListResponse {
    pub hubs: Vec<Hub>,
    pub count: usize,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}
