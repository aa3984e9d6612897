//! Interfaces to the external collaborators the selectors depend on.
//!
//! Every gateway absorbs its own failures: implementations log and return a
//! sentinel (`LegResult::failed()`, an empty list, `None`) instead of an error,
//! so the selection pipeline never has to unwind on an upstream outage.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Candidate, Coordinate, Hub, Judgement, LegResult, ScoredCandidate, TravelMode};

/// Travel durations between points
#[async_trait]
pub trait RoutingGateway: Send + Sync {
    /// Rows follow `origins`, columns follow `destinations`. The grid always
    /// has that shape; unroutable cells are `LegResult::failed()`.
    async fn matrix(
        &self,
        origins: &[Coordinate],
        destinations: &[Coordinate],
        mode: TravelMode,
    ) -> Vec<Vec<LegResult>>;

    /// Single-leg lookup in minutes
    async fn duration(&self, from: Coordinate, to: Coordinate, mode: TravelMode) -> Option<u32> {
        self.matrix(&[from], &[to], mode)
            .await
            .first()
            .and_then(|row| row.first())
            .filter(|cell| cell.ok)
            .map(|cell| cell.minutes)
    }
}

/// Venue search and description
#[async_trait]
pub trait PlaceGateway: Send + Sync {
    /// At most ten venues around `center`
    async fn search_nearby(&self, center: Coordinate, radius_meters: u32, tags: &[String]) -> Vec<Candidate>;

    /// One-line description; always returns something printable
    async fn enrich(&self, candidate: &Candidate) -> String;

    /// Short human label for a coordinate
    async fn reverse_label(&self, location: Coordinate) -> Option<String>;
}

/// Generative suggestions and adjudication
#[async_trait]
pub trait SuggestionGateway: Send + Sync {
    /// Hub names proposed for the group; empty on any failure
    async fn suggest_hubs(&self, context: &str, meeting_time: &str) -> Vec<String>;

    /// Winner and per-candidate reasons; `None` on any failure
    async fn judge_candidates(&self, candidates: &[ScoredCandidate], context: &str) -> Option<Judgement>;
}

/// Errors from the hub reference store
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrateError(#[from] sqlx::migrate::MigrateError),

    #[error("Failed to read seed file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid seed file: {0}")]
    ParseError(#[from] toml::de::Error),
}

/// Reference dataset of known transit hubs
#[async_trait]
pub trait HubDirectory: Send + Sync {
    async fn hub(&self, id: &str) -> Result<Option<Hub>, DirectoryError>;

    /// Every known hub, in a stable order
    async fn all_hubs(&self) -> Result<Vec<Hub>, DirectoryError>;
}

/// Last-resort venue description when nothing better is available
pub fn generic_venue_summary(name: &str) -> String {
    format!("{} is a short walk from the station.", name)
}
