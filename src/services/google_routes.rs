use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;

use crate::models::{Coordinate, LegResult, TravelMode};
use crate::services::RoutingGateway;

/// Distance Matrix limits per request
const MAX_SIDE: usize = 25;
const MAX_ELEMENTS: usize = 100;

/// Errors that can occur when talking to the routing backend
#[derive(Debug, Error)]
pub enum RoutingError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error: {0}")]
    ApiError(String),

    #[error("Missing routing API key")]
    MissingCredentials,

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Deserialize)]
struct MatrixResponse {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    rows: Vec<MatrixRow>,
}

#[derive(Debug, Deserialize)]
struct MatrixRow {
    #[serde(default)]
    elements: Vec<MatrixElement>,
}

#[derive(Debug, Deserialize)]
struct MatrixElement {
    status: String,
    #[serde(default)]
    duration: Option<TextValue>,
}

#[derive(Debug, Deserialize)]
struct TextValue {
    value: u64,
}

/// Google Distance Matrix client
///
/// Splits large matrices into requests within the backend's element limits
/// and reports each cell independently.
pub struct GoogleRoutingClient {
    base_url: String,
    api_key: Option<String>,
    client: Client,
    warned_missing_key: AtomicBool,
}

impl GoogleRoutingClient {
    pub fn new(base_url: String, api_key: Option<String>, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            client,
            warned_missing_key: AtomicBool::new(false),
        }
    }

    pub fn has_credentials(&self) -> bool {
        self.api_key.is_some()
    }

    fn join_points(points: &[Coordinate]) -> String {
        points
            .iter()
            .map(|p| format!("{:.6},{:.6}", p.lat, p.lng))
            .collect::<Vec<_>>()
            .join("|")
    }

    /// One Distance Matrix request; callers keep it within the element limits
    pub async fn fetch_matrix(
        &self,
        origins: &[Coordinate],
        destinations: &[Coordinate],
        mode: TravelMode,
    ) -> Result<Vec<Vec<LegResult>>, RoutingError> {
        let api_key = self.api_key.as_deref().ok_or(RoutingError::MissingCredentials)?;

        let url = format!(
            "{}/maps/api/distancematrix/json?origins={}&destinations={}&mode={}&departure_time=now&key={}",
            self.base_url.trim_end_matches('/'),
            urlencoding::encode(&Self::join_points(origins)),
            urlencoding::encode(&Self::join_points(destinations)),
            mode.as_str(),
            urlencoding::encode(api_key)
        );

        tracing::debug!(
            "Requesting {} matrix {}x{}",
            mode.as_str(),
            origins.len(),
            destinations.len()
        );

        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(RoutingError::ApiError(format!(
                "Distance matrix request failed: {}",
                response.status()
            )));
        }

        let body: MatrixResponse = response.json().await?;

        if body.status != "OK" {
            return Err(RoutingError::ApiError(format!(
                "{}{}",
                body.status,
                body.error_message.map(|m| format!(": {}", m)).unwrap_or_default()
            )));
        }

        if body.rows.len() != origins.len() {
            return Err(RoutingError::InvalidResponse(format!(
                "expected {} rows, got {}",
                origins.len(),
                body.rows.len()
            )));
        }

        Ok(body
            .rows
            .into_iter()
            .map(|row| {
                (0..destinations.len())
                    .map(|j| match row.elements.get(j) {
                        Some(MatrixElement {
                            status,
                            duration: Some(duration),
                        }) if status == "OK" => LegResult::ok(duration.value.div_ceil(60) as u32),
                        _ => LegResult::failed(),
                    })
                    .collect()
            })
            .collect())
    }
}

/// Split an `rows x cols` matrix into request-sized blocks
///
/// Each block is `(row_offset, row_len, col_offset, col_len)`.
pub(crate) fn plan_blocks(rows: usize, cols: usize) -> Vec<(usize, usize, usize, usize)> {
    let col_chunk = cols.clamp(1, MAX_SIDE);
    let row_chunk = (MAX_ELEMENTS / col_chunk).clamp(1, MAX_SIDE);

    let mut blocks = Vec::new();
    for row_offset in (0..rows).step_by(row_chunk) {
        for col_offset in (0..cols).step_by(col_chunk) {
            blocks.push((
                row_offset,
                row_chunk.min(rows - row_offset),
                col_offset,
                col_chunk.min(cols - col_offset),
            ));
        }
    }
    blocks
}

#[async_trait]
impl RoutingGateway for GoogleRoutingClient {
    async fn matrix(
        &self,
        origins: &[Coordinate],
        destinations: &[Coordinate],
        mode: TravelMode,
    ) -> Vec<Vec<LegResult>> {
        let mut grid = vec![vec![LegResult::failed(); destinations.len()]; origins.len()];
        if origins.is_empty() || destinations.is_empty() {
            return grid;
        }

        if self.api_key.is_none() {
            if !self.warned_missing_key.swap(true, Ordering::Relaxed) {
                tracing::warn!("No routing API key configured; every travel time will be unknown");
            }
            return grid;
        }

        let blocks = plan_blocks(origins.len(), destinations.len());
        let results = join_all(blocks.iter().map(|&(r0, rn, c0, cn)| {
            self.fetch_matrix(&origins[r0..r0 + rn], &destinations[c0..c0 + cn], mode)
        }))
        .await;

        for (&(r0, _, c0, _), result) in blocks.iter().zip(results) {
            match result {
                Ok(block) => {
                    for (i, row) in block.into_iter().enumerate() {
                        for (j, cell) in row.into_iter().enumerate() {
                            grid[r0 + i][c0 + j] = cell;
                        }
                    }
                }
                Err(e) => tracing::warn!("{} matrix block at ({}, {}) failed: {}", mode.as_str(), r0, c0, e),
            }
        }

        grid
    }
}
