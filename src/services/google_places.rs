use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

use crate::models::{Candidate, Coordinate};
use crate::services::{generic_venue_summary, PlaceGateway};

/// Hard cap on venues per search
pub const MAX_PLACES: usize = 10;
/// Shortest review text considered descriptive
const MIN_REVIEW_CHARS: usize = 40;
/// Longest review excerpt used as a summary
const MAX_SUMMARY_CHARS: usize = 160;

/// Errors that can occur when talking to the places backend
#[derive(Debug, Error)]
pub enum PlacesError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error: {0}")]
    ApiError(String),

    #[error("Missing places API key")]
    MissingCredentials,
}

#[derive(Debug, Default, Deserialize)]
struct LocalizedText {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    latitude: f64,
    longitude: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Place {
    id: String,
    #[serde(default)]
    display_name: Option<LocalizedText>,
    #[serde(default)]
    location: Option<LatLng>,
    #[serde(default)]
    editorial_summary: Option<LocalizedText>,
}

#[derive(Debug, Default, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    places: Vec<Place>,
}

#[derive(Debug, Default, Deserialize)]
struct Review {
    #[serde(default)]
    text: Option<LocalizedText>,
}

/// The subset of place details used for enrichment
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceDetails {
    #[serde(default)]
    editorial_summary: Option<LocalizedText>,
    #[serde(default)]
    reviews: Vec<Review>,
    #[serde(default)]
    rating: Option<f64>,
    #[serde(default)]
    user_rating_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeResult>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    formatted_address: String,
}

/// Cut `text` to `max_chars` characters, ending with an ellipsis when shortened
fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{}…", cut.trim_end())
}

/// Best available one-line description for a venue
///
/// Curated summary, then the longest substantive review, then a rating
/// sentence, then a generic line.
pub fn summarize_details(name: &str, details: &PlaceDetails) -> String {
    if let Some(summary) = details
        .editorial_summary
        .as_ref()
        .map(|s| s.text.trim())
        .filter(|s| !s.is_empty())
    {
        return summary.to_string();
    }

    let best_review = details
        .reviews
        .iter()
        .filter_map(|r| r.text.as_ref())
        .map(|t| t.text.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|t| t.chars().count() >= MIN_REVIEW_CHARS)
        .max_by_key(|t| t.chars().count());
    if let Some(review) = best_review {
        return format!("\"{}\"", truncate_chars(&review, MAX_SUMMARY_CHARS));
    }

    match (details.rating, details.user_rating_count) {
        (Some(rating), Some(count)) if count > 0 => format!("Rated {:.1} stars by {} visitors.", rating, count),
        (Some(rating), _) => format!("Rated {:.1} stars.", rating),
        _ => generic_venue_summary(name),
    }
}

/// Google Places (New) and Geocoding client
pub struct GooglePlacesClient {
    places_base_url: String,
    geocode_base_url: String,
    api_key: Option<String>,
    client: Client,
    max_results: usize,
    warned_missing_key: AtomicBool,
}

impl GooglePlacesClient {
    pub fn new(
        places_base_url: String,
        geocode_base_url: String,
        api_key: Option<String>,
        max_results: usize,
        timeout: Duration,
    ) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            places_base_url,
            geocode_base_url,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            client,
            max_results: max_results.clamp(1, MAX_PLACES),
            warned_missing_key: AtomicBool::new(false),
        }
    }

    fn key(&self) -> Result<&str, PlacesError> {
        match self.api_key.as_deref() {
            Some(key) => Ok(key),
            None => {
                if !self.warned_missing_key.swap(true, Ordering::Relaxed) {
                    tracing::warn!("No places API key configured; venue search and enrichment are disabled");
                }
                Err(PlacesError::MissingCredentials)
            }
        }
    }

    pub async fn search(
        &self,
        center: Coordinate,
        radius_meters: u32,
        tags: &[String],
    ) -> Result<Vec<Candidate>, PlacesError> {
        let key = self.key()?;
        let url = format!("{}/v1/places:searchNearby", self.places_base_url.trim_end_matches('/'));

        let payload = json!({
            "includedTypes": tags,
            "maxResultCount": self.max_results,
            "rankPreference": "POPULARITY",
            "locationRestriction": {
                "circle": {
                    "center": { "latitude": center.lat, "longitude": center.lng },
                    "radius": radius_meters as f64,
                }
            }
        });

        let response = self
            .client
            .post(&url)
            .header("X-Goog-Api-Key", key)
            .header(
                "X-Goog-FieldMask",
                "places.id,places.displayName,places.location,places.editorialSummary",
            )
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(PlacesError::ApiError(format!("Nearby search failed: {}", response.status())));
        }

        let body: SearchResponse = response.json().await?;

        Ok(body
            .places
            .into_iter()
            .filter_map(|place| {
                let location = place.location?;
                let name = place.display_name.map(|n| n.text).filter(|n| !n.trim().is_empty())?;
                Some(Candidate {
                    id: place.id,
                    name,
                    center: Coordinate::new(location.latitude, location.longitude),
                    description: place.editorial_summary.map(|s| s.text).unwrap_or_default(),
                })
            })
            .take(self.max_results)
            .collect())
    }

    pub async fn details(&self, place_id: &str) -> Result<PlaceDetails, PlacesError> {
        let key = self.key()?;
        let url = format!(
            "{}/v1/places/{}",
            self.places_base_url.trim_end_matches('/'),
            urlencoding::encode(place_id)
        );

        let response = self
            .client
            .get(&url)
            .header("X-Goog-Api-Key", key)
            .header("X-Goog-FieldMask", "editorialSummary,reviews,rating,userRatingCount")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(PlacesError::ApiError(format!("Place details failed: {}", response.status())));
        }

        Ok(response.json().await?)
    }

    pub async fn reverse_geocode(&self, location: Coordinate) -> Result<Option<String>, PlacesError> {
        let key = self.key()?;
        let url = format!(
            "{}/maps/api/geocode/json?latlng={:.6},{:.6}&key={}",
            self.geocode_base_url.trim_end_matches('/'),
            location.lat,
            location.lng,
            urlencoding::encode(key)
        );

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(PlacesError::ApiError(format!("Reverse geocode failed: {}", response.status())));
        }

        let body: GeocodeResponse = response.json().await?;
        if body.status != "OK" {
            return Ok(None);
        }

        // First address component is the most specific ("12 Acre Lane")
        Ok(body
            .results
            .first()
            .and_then(|r| r.formatted_address.split(',').next())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()))
    }
}

#[async_trait]
impl PlaceGateway for GooglePlacesClient {
    async fn search_nearby(&self, center: Coordinate, radius_meters: u32, tags: &[String]) -> Vec<Candidate> {
        match self.search(center, radius_meters, tags).await {
            Ok(places) => places,
            Err(PlacesError::MissingCredentials) => Vec::new(),
            Err(e) => {
                tracing::warn!("Venue search near {} failed: {}", center, e);
                Vec::new()
            }
        }
    }

    async fn enrich(&self, candidate: &Candidate) -> String {
        match self.details(&candidate.id).await {
            Ok(details) => summarize_details(&candidate.name, &details),
            Err(e) => {
                if !matches!(e, PlacesError::MissingCredentials) {
                    tracing::warn!("Enrichment for {} failed: {}", candidate.name, e);
                }
                if candidate.description.trim().is_empty() {
                    generic_venue_summary(&candidate.name)
                } else {
                    candidate.description.clone()
                }
            }
        }
    }

    async fn reverse_label(&self, location: Coordinate) -> Option<String> {
        match self.reverse_geocode(location).await {
            Ok(label) => label,
            Err(PlacesError::MissingCredentials) => None,
            Err(e) => {
                tracing::debug!("Reverse lookup for {} failed: {}", location, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn details(json: serde_json::Value) -> PlaceDetails {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_summary_prefers_editorial() {
        let d = details(serde_json::json!({
            "editorialSummary": {"text": "Victorian pub with a beer garden."},
            "reviews": [{"text": {"text": "Great place, would come back again for the ales and pies."}}],
            "rating": 4.5
        }));
        assert_eq!(summarize_details("The Crown", &d), "Victorian pub with a beer garden.");
    }

    #[test]
    fn test_summary_uses_longest_substantive_review() {
        let long = "a".repeat(200);
        let d = details(serde_json::json!({
            "reviews": [
                {"text": {"text": "Nice."}},
                {"text": {"text": "Friendly staff and a decent range of cask ales on tap."}},
                {"text": {"text": long}}
            ]
        }));
        let summary = summarize_details("The Crown", &d);
        assert!(summary.starts_with("\"aaaa"));
        assert!(summary.ends_with("…\""));
        assert_eq!(summary.chars().count(), MAX_SUMMARY_CHARS + 3);
    }

    #[test]
    fn test_summary_ignores_short_reviews() {
        let d = details(serde_json::json!({
            "reviews": [{"text": {"text": "Nice."}}],
            "rating": 4.26,
            "userRatingCount": 812
        }));
        assert_eq!(summarize_details("The Crown", &d), "Rated 4.3 stars by 812 visitors.");
    }

    #[test]
    fn test_summary_generic_fallback() {
        assert_eq!(
            summarize_details("The Crown", &PlaceDetails::default()),
            "The Crown is a short walk from the station."
        );
    }

    #[test]
    fn test_client_caps_results() {
        let client = GooglePlacesClient::new(
            "https://places.test".to_string(),
            "https://maps.test".to_string(),
            None,
            50,
            Duration::from_secs(5),
        );
        assert_eq!(client.max_results, MAX_PLACES);
    }
}
