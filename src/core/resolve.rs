use std::sync::Arc;

use crate::models::{Coordinate, LocationSource, Participant, ResolvedParticipant};
use crate::services::{HubDirectory, PlaceGateway};

/// Turns tagged location sources into flat coordinate/label pairs
#[derive(Clone)]
pub struct LocationResolver {
    directory: Arc<dyn HubDirectory>,
    places: Arc<dyn PlaceGateway>,
}

impl LocationResolver {
    pub fn new(directory: Arc<dyn HubDirectory>, places: Arc<dyn PlaceGateway>) -> Self {
        Self { directory, places }
    }

    /// Resolve one source; `(UNRESOLVED, "")` when nothing usable is found
    pub async fn resolve(&self, source: &LocationSource) -> (Coordinate, String) {
        match source {
            LocationSource::Station { id } => match self.directory.hub(id).await {
                Ok(Some(hub)) => (hub.center(), hub.name),
                Ok(None) => {
                    tracing::warn!("Unknown station id {}", id);
                    (Coordinate::UNRESOLVED, String::new())
                }
                Err(e) => {
                    tracing::warn!("Station lookup for {} failed: {}", id, e);
                    (Coordinate::UNRESOLVED, String::new())
                }
            },
            LocationSource::Live { location } => (*location, self.label_for(*location, "").await),
            LocationSource::Custom { location, label } => (*location, self.label_for(*location, label).await),
        }
    }

    async fn label_for(&self, location: Coordinate, given: &str) -> String {
        let given = given.trim();
        if !given.is_empty() {
            return given.to_string();
        }
        if !location.is_resolved() {
            return String::new();
        }
        match self.places.reverse_label(location).await {
            Some(label) => label,
            None => format!("Pinned location ({})", location),
        }
    }

    /// Ready participants with a usable start point
    ///
    /// A member whose start cannot be resolved is left out; an unresolvable
    /// end falls back to the start.
    pub async fn resolve_active(&self, members: &[Participant]) -> Vec<ResolvedParticipant> {
        let mut resolved = Vec::new();

        for member in members.iter().filter(|m| m.is_active()) {
            let (start_location, start_label) = self.resolve(&member.start).await;
            if !start_location.is_resolved() {
                tracing::warn!("Leaving out {}: start location could not be resolved", member.name);
                continue;
            }

            let (end_location, end_label) = match &member.end {
                Some(end) => match self.resolve(end).await {
                    (location, label) if location.is_resolved() => (location, label),
                    _ => {
                        tracing::debug!("End location for {} unresolved, assuming same as start", member.name);
                        (start_location, start_label.clone())
                    }
                },
                None => (start_location, start_label.clone()),
            };

            resolved.push(ResolvedParticipant {
                id: member.id.clone(),
                name: member.name.clone(),
                start_location,
                start_label,
                end_location,
                end_label,
            });
        }

        resolved
    }
}
