use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// A WGS84 point in decimal degrees
///
/// `(0, 0)` is reserved as the "unresolved" sentinel and never names a real
/// participant location.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    pub const UNRESOLVED: Coordinate = Coordinate { lat: 0.0, lng: 0.0 };

    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// False for the `(0, 0)` sentinel
    #[inline]
    pub fn is_resolved(&self) -> bool {
        !(self.lat == 0.0 && self.lng == 0.0)
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.5},{:.5}", self.lat, self.lng)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantStatus {
    Pending,
    Ready,
}

/// Where a participant's start or end point comes from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LocationSource {
    /// A known hub from the reference dataset
    Station { id: String },
    /// A device-reported position
    Live { location: Coordinate },
    /// A user-picked point with an optional human label
    Custom {
        location: Coordinate,
        #[serde(default)]
        label: String,
    },
}

/// Group member as submitted by the caller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    pub id: String,
    pub name: String,
    pub status: ParticipantStatus,
    pub start: LocationSource,
    /// `None` means the member returns to where they started
    #[serde(default)]
    pub end: Option<LocationSource>,
}

impl Participant {
    pub fn is_active(&self) -> bool {
        self.status == ParticipantStatus::Ready
    }
}

/// Participant with both endpoints flattened to coordinates
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedParticipant {
    pub id: String,
    pub name: String,
    pub start_location: Coordinate,
    pub start_label: String,
    pub end_location: Coordinate,
    pub end_label: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TravelMode {
    Transit,
    Walking,
}

impl TravelMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TravelMode::Transit => "transit",
            TravelMode::Walking => "walking",
        }
    }
}

/// One cell of a routing matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegResult {
    pub minutes: u32,
    pub ok: bool,
}

impl LegResult {
    /// A successful lookup; never reported as 0 since 0 is the failure sentinel
    pub fn ok(minutes: u32) -> Self {
        Self {
            minutes: minutes.max(1),
            ok: true,
        }
    }

    pub fn failed() -> Self {
        Self { minutes: 0, ok: false }
    }
}

/// Per-participant travel for one candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TravelLeg {
    pub outbound_minutes: u32,
    pub return_minutes: u32,
    /// False when either direction could not be routed
    pub complete: bool,
}

impl TravelLeg {
    #[inline]
    pub fn round_trip(&self) -> u32 {
        self.outbound_minutes + self.return_minutes
    }
}

/// A hub or venue under consideration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: String,
    pub name: String,
    pub center: Coordinate,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredCandidate {
    #[serde(flatten)]
    pub candidate: Candidate,
    pub travel_legs: BTreeMap<String, TravelLeg>,
    pub total_minutes: u32,
    pub worst_case_minutes: u32,
    pub fairness_score: f64,
    /// Participants whose legs to this candidate could not be routed
    pub missing_participants: Vec<String>,
}

impl ScoredCandidate {
    pub fn penalty(&self) -> f64 {
        self.fairness_score - self.total_minutes as f64
    }

    pub fn is_complete(&self) -> bool {
        self.missing_participants.is_empty()
    }
}

/// Aggregate figures shown alongside a recommendation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TravelSummary {
    pub avg_minutes: f64,
    pub max_minutes: u32,
    pub penalty: f64,
    pub worst_participant: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    #[serde(flatten)]
    pub scored: ScoredCandidate,
    pub rationale: String,
    pub rank: usize,
    pub is_winner: bool,
    pub summary: TravelSummary,
}

/// Known transit hub from the reference dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hub {
    pub id: String,
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    #[serde(default)]
    pub zone: String,
    #[serde(default)]
    pub lines: Vec<String>,
}

impl Hub {
    pub fn center(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lng)
    }

    pub fn to_candidate(&self) -> Candidate {
        let mut description = String::new();
        if !self.zone.is_empty() {
            description.push_str(&format!("Zone {}", self.zone));
        }
        if !self.lines.is_empty() {
            if !description.is_empty() {
                description.push_str(" · ");
            }
            description.push_str(&self.lines.join(", "));
        }

        Candidate {
            id: self.id.clone(),
            name: self.name.clone(),
            center: self.center(),
            description,
        }
    }
}

/// Outcome of the AI judging step
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Judgement {
    pub winner: String,
    /// Reason per candidate name, as returned by the judge
    pub rationales: HashMap<String, String>,
}

/// Fairness penalty parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringParams {
    /// Round trips at or under this many minutes carry no penalty
    pub penalty_threshold_minutes: u32,
    /// Penalty added per minute over the threshold
    pub penalty_per_minute: f64,
}

impl Default for ScoringParams {
    fn default() -> Self {
        Self {
            penalty_threshold_minutes: 90,
            penalty_per_minute: 5.0,
        }
    }
}

/// Knobs for the hub selection pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionParams {
    pub max_scout_attempts: u32,
    pub scout_backoff_ms: u64,
    pub min_matched_candidates: usize,
    pub fallback_shortlist_size: usize,
    pub max_scored_candidates: usize,
    pub judge_pool_size: usize,
    pub max_recommendations: usize,
    /// Squared-degree distance under which two candidates count as the same place
    pub dedup_threshold_deg_sq: f64,
    pub suggestion_timeout_secs: u64,
}

impl Default for SelectionParams {
    fn default() -> Self {
        Self {
            max_scout_attempts: 3,
            scout_backoff_ms: 1000,
            min_matched_candidates: 3,
            fallback_shortlist_size: 15,
            max_scored_candidates: 5,
            judge_pool_size: 5,
            max_recommendations: 3,
            dedup_threshold_deg_sq: 0.00001,
            suggestion_timeout_secs: 20,
        }
    }
}

/// Knobs for the venue pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct VenueParams {
    pub default_radius_meters: u32,
    pub default_tags: Vec<String>,
    pub max_results: usize,
    pub enrich_top: usize,
    pub enrich_timeout_secs: u64,
}

impl Default for VenueParams {
    fn default() -> Self {
        Self {
            default_radius_meters: 800,
            default_tags: vec!["pub".to_string(), "bar".to_string()],
            max_results: 10,
            enrich_top: 3,
            enrich_timeout_secs: 10,
        }
    }
}
