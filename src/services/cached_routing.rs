use std::sync::Arc;

use async_trait::async_trait;

use crate::models::{Coordinate, LegResult, TravelMode};
use crate::services::cache::{CacheError, CacheKey, CacheManager};
use crate::services::RoutingGateway;

/// Routing gateway that remembers successful legs
///
/// Only the rows and columns holding at least one uncached cell are sent to
/// the wrapped gateway. Failed cells are never cached.
pub struct CachedRouting {
    inner: Arc<dyn RoutingGateway>,
    cache: Arc<CacheManager>,
}

impl CachedRouting {
    pub fn new(inner: Arc<dyn RoutingGateway>, cache: Arc<CacheManager>) -> Self {
        Self { inner, cache }
    }

    async fn lookup(&self, key: &str) -> Option<u32> {
        match self.cache.get::<u32>(key).await {
            Ok(minutes) => Some(minutes),
            Err(CacheError::CacheMiss(_)) => None,
            Err(e) => {
                tracing::debug!("Route cache read failed for {}: {}", key, e);
                None
            }
        }
    }
}

#[async_trait]
impl RoutingGateway for CachedRouting {
    async fn matrix(
        &self,
        origins: &[Coordinate],
        destinations: &[Coordinate],
        mode: TravelMode,
    ) -> Vec<Vec<LegResult>> {
        let mut grid = vec![vec![LegResult::failed(); destinations.len()]; origins.len()];
        let mut missing_rows = Vec::new();
        let mut missing_cols = Vec::new();

        for (i, &from) in origins.iter().enumerate() {
            for (j, &to) in destinations.iter().enumerate() {
                match self.lookup(&CacheKey::route(mode, from, to)).await {
                    Some(minutes) => grid[i][j] = LegResult::ok(minutes),
                    None => {
                        if !missing_rows.contains(&i) {
                            missing_rows.push(i);
                        }
                        if !missing_cols.contains(&j) {
                            missing_cols.push(j);
                        }
                    }
                }
            }
        }

        if missing_rows.is_empty() {
            tracing::debug!("{} matrix {}x{} served from cache", mode.as_str(), origins.len(), destinations.len());
            return grid;
        }
        missing_cols.sort_unstable();

        let sub_origins: Vec<Coordinate> = missing_rows.iter().map(|&i| origins[i]).collect();
        let sub_destinations: Vec<Coordinate> = missing_cols.iter().map(|&j| destinations[j]).collect();
        let fetched = self.inner.matrix(&sub_origins, &sub_destinations, mode).await;

        for (si, &i) in missing_rows.iter().enumerate() {
            for (sj, &j) in missing_cols.iter().enumerate() {
                let Some(cell) = fetched.get(si).and_then(|row| row.get(sj)).copied() else {
                    continue;
                };
                // A cell can be in a fetched row and column yet already be cached
                if grid[i][j].ok || !cell.ok {
                    continue;
                }
                grid[i][j] = cell;
                let key = CacheKey::route(mode, origins[i], destinations[j]);
                if let Err(e) = self.cache.set(&key, &cell.minutes).await {
                    tracing::debug!("Route cache write failed for {}: {}", key, e);
                }
            }
        }

        grid
    }
}
