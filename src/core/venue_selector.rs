use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tracing::Instrument;
use uuid::Uuid;

use crate::core::geo::haversine_meters;
use crate::core::resolve::LocationResolver;
use crate::core::scoring::{summarize_travel, CandidateScorer};
use crate::models::{Candidate, Coordinate, Participant, Recommendation, VenueParams};
use crate::services::{generic_venue_summary, HubDirectory, PlaceGateway};

/// Picks venues within walking distance of a confirmed hub
///
/// Linear: search → radius filter → symmetric scoring → enrich the top few.
/// No retries and no AI step.
pub struct VenueSelector {
    places: Arc<dyn PlaceGateway>,
    resolver: LocationResolver,
    scorer: CandidateScorer,
    params: VenueParams,
}

impl VenueSelector {
    pub fn new(
        directory: Arc<dyn HubDirectory>,
        places: Arc<dyn PlaceGateway>,
        scorer: CandidateScorer,
        params: VenueParams,
    ) -> Self {
        Self {
            resolver: LocationResolver::new(directory, places.clone()),
            places,
            scorer,
            params,
        }
    }

    pub fn params(&self) -> &VenueParams {
        &self.params
    }

    /// Venues near `hub_center`, best fairness score first
    ///
    /// Empty `tags` and a zero radius fall back to the configured defaults.
    /// An empty search, no ready members or an unresolved hub all yield an
    /// empty list.
    pub async fn select_venue(
        &self,
        hub_center: Coordinate,
        members: &[Participant],
        tags: &[String],
        radius_meters: u32,
    ) -> Vec<Recommendation> {
        let run_id = Uuid::new_v4();
        self.run(hub_center, members, tags, radius_meters)
            .instrument(tracing::info_span!("select_venue", %run_id))
            .await
    }

    async fn run(
        &self,
        hub_center: Coordinate,
        members: &[Participant],
        tags: &[String],
        radius_meters: u32,
    ) -> Vec<Recommendation> {
        if !hub_center.is_resolved() {
            tracing::warn!("Venue search skipped: hub location is unresolved");
            return Vec::new();
        }

        let active = self.resolver.resolve_active(members).await;
        if active.is_empty() {
            tracing::info!("No ready members with a usable location");
            return Vec::new();
        }

        let radius = if radius_meters == 0 {
            self.params.default_radius_meters
        } else {
            radius_meters
        };
        let tags: &[String] = if tags.is_empty() { &self.params.default_tags } else { tags };

        let mut venues = self.places.search_nearby(hub_center, radius, tags).await;
        let found = venues.len();
        venues.retain(|v| v.center.is_resolved() && haversine_meters(hub_center, v.center) <= radius as f64);
        venues.truncate(self.params.max_results);

        tracing::info!(
            "Venue search around {} ({}m, {:?}): {} found, {} within radius",
            hub_center,
            radius,
            tags,
            found,
            venues.len()
        );

        if venues.is_empty() {
            return Vec::new();
        }

        // Venues are a short hop from the hub, so the return leg mirrors the outbound one
        let scored = self.scorer.score(&venues, &active, true).await;

        let top = self.params.enrich_top.min(scored.len());
        let summaries = join_all(scored[..top].iter().map(|s| self.enrich(&s.candidate))).await;

        scored
            .into_iter()
            .enumerate()
            .map(|(i, scored)| {
                let rationale = match summaries.get(i) {
                    Some(summary) => summary.clone(),
                    None if !scored.candidate.description.trim().is_empty() => scored.candidate.description.clone(),
                    None => generic_venue_summary(&scored.candidate.name),
                };
                let summary = summarize_travel(&scored, &active);
                Recommendation {
                    scored,
                    rationale,
                    rank: i + 1,
                    is_winner: i == 0,
                    summary,
                }
            })
            .collect()
    }

    async fn enrich(&self, candidate: &Candidate) -> String {
        let timeout = Duration::from_secs(self.params.enrich_timeout_secs);
        match tokio::time::timeout(timeout, self.places.enrich(candidate)).await {
            Ok(summary) if !summary.trim().is_empty() => summary,
            Ok(_) => generic_venue_summary(&candidate.name),
            Err(_) => {
                tracing::warn!("Enrichment for {} timed out", candidate.name);
                if candidate.description.trim().is_empty() {
                    generic_venue_summary(&candidate.name)
                } else {
                    candidate.description.clone()
                }
            }
        }
    }
}
