use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;

use crate::models::{
    Candidate, Coordinate, LegResult, ResolvedParticipant, ScoredCandidate, ScoringParams, TravelLeg,
    TravelMode, TravelSummary,
};
use crate::services::RoutingGateway;

/// Convex penalty on the worst single round trip
///
/// penalty(w) = 0                              if w <= threshold
///            = per_minute * (w - threshold)   otherwise
#[inline]
pub fn calculate_penalty(worst_case_minutes: u32, params: &ScoringParams) -> f64 {
    if worst_case_minutes <= params.penalty_threshold_minutes {
        return 0.0;
    }
    (worst_case_minutes - params.penalty_threshold_minutes) as f64 * params.penalty_per_minute
}

/// Fold per-participant legs into a scored candidate
///
/// `legs` is index-aligned with `members`. Incomplete legs are left out of the
/// totals and their participants are listed in `missing_participants`.
/// Returns `None` when nothing could be routed (total of zero).
pub fn aggregate_legs(
    candidate: Candidate,
    members: &[ResolvedParticipant],
    legs: &[TravelLeg],
    params: &ScoringParams,
) -> Option<ScoredCandidate> {
    let mut travel_legs = BTreeMap::new();
    let mut missing_participants = Vec::new();
    let mut total_minutes = 0u32;
    let mut worst_case_minutes = 0u32;

    for (member, leg) in members.iter().zip(legs) {
        travel_legs.insert(member.id.clone(), *leg);
        if !leg.complete {
            missing_participants.push(member.id.clone());
            continue;
        }
        let round_trip = leg.round_trip();
        total_minutes += round_trip;
        worst_case_minutes = worst_case_minutes.max(round_trip);
    }

    if total_minutes == 0 {
        return None;
    }

    let fairness_score = total_minutes as f64 + calculate_penalty(worst_case_minutes, params);

    Some(ScoredCandidate {
        candidate,
        travel_legs,
        total_minutes,
        worst_case_minutes,
        fairness_score,
        missing_participants,
    })
}

/// Stable ascending sort: fully routed candidates first, then by fairness score
pub fn rank_candidates(scored: &mut [ScoredCandidate]) {
    scored.sort_by(|a, b| {
        a.missing_participants
            .len()
            .cmp(&b.missing_participants.len())
            .then_with(|| {
                a.fairness_score
                    .partial_cmp(&b.fairness_score)
                    .unwrap_or(Ordering::Equal)
            })
    });
}

/// Headline figures for one scored candidate
///
/// The average covers routed members only; the worst-affected member is the
/// first one (in member order) with the longest routed round trip.
pub fn summarize_travel(scored: &ScoredCandidate, members: &[ResolvedParticipant]) -> TravelSummary {
    let routed: Vec<(&ResolvedParticipant, u32)> = members
        .iter()
        .filter_map(|m| {
            scored
                .travel_legs
                .get(&m.id)
                .filter(|leg| leg.complete)
                .map(|leg| (m, leg.round_trip()))
        })
        .collect();

    let avg_minutes = if routed.is_empty() {
        0.0
    } else {
        let avg = scored.total_minutes as f64 / routed.len() as f64;
        (avg * 10.0).round() / 10.0
    };

    let mut worst: Option<(&ResolvedParticipant, u32)> = None;
    for &(member, round_trip) in &routed {
        if worst.map_or(true, |(_, longest)| round_trip > longest) {
            worst = Some((member, round_trip));
        }
    }

    TravelSummary {
        avg_minutes,
        max_minutes: scored.worst_case_minutes,
        penalty: scored.penalty(),
        worst_participant: worst.map(|(m, _)| m.name.clone()),
    }
}

/// Cell-wise fastest successful result across modes
fn fastest_of(grids: Vec<Vec<Vec<LegResult>>>, rows: usize, cols: usize) -> Vec<Vec<LegResult>> {
    let mut best = vec![vec![LegResult::failed(); cols]; rows];
    for grid in grids {
        for (i, row) in grid.into_iter().enumerate().take(rows) {
            for (j, cell) in row.into_iter().enumerate().take(cols) {
                let current = &mut best[i][j];
                if cell.ok && (!current.ok || cell.minutes < current.minutes) {
                    *current = cell;
                }
            }
        }
    }
    best
}

/// Computes travel matrices and fairness scores for candidate meeting points
#[derive(Clone)]
pub struct CandidateScorer {
    routing: Arc<dyn RoutingGateway>,
    params: ScoringParams,
    modes: Vec<TravelMode>,
    timeout: Duration,
}

impl CandidateScorer {
    pub fn new(routing: Arc<dyn RoutingGateway>, params: ScoringParams) -> Self {
        Self {
            routing,
            params,
            modes: vec![TravelMode::Transit, TravelMode::Walking],
            timeout: Duration::from_secs(15),
        }
    }

    pub fn with_modes(mut self, modes: Vec<TravelMode>) -> Self {
        if !modes.is_empty() {
            self.modes = modes;
        }
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn params(&self) -> &ScoringParams {
        &self.params
    }

    /// Score every candidate for the given members, best first
    ///
    /// With `symmetric_return` the return leg reuses the outbound duration;
    /// otherwise a second matrix is routed from each candidate to each
    /// member's end location, concurrently with the outbound one.
    pub async fn score(
        &self,
        candidates: &[Candidate],
        members: &[ResolvedParticipant],
        symmetric_return: bool,
    ) -> Vec<ScoredCandidate> {
        if candidates.is_empty() || members.is_empty() {
            return Vec::new();
        }

        let starts: Vec<Coordinate> = members.iter().map(|m| m.start_location).collect();
        let ends: Vec<Coordinate> = members.iter().map(|m| m.end_location).collect();
        let centers: Vec<Coordinate> = candidates.iter().map(|c| c.center).collect();

        let (outbound, inbound) = tokio::join!(
            self.fastest_matrix(&starts, &centers),
            async {
                if symmetric_return {
                    None
                } else {
                    Some(self.fastest_matrix(&centers, &ends).await)
                }
            }
        );

        let mut scored: Vec<ScoredCandidate> = candidates
            .iter()
            .enumerate()
            .filter_map(|(j, candidate)| {
                let legs: Vec<TravelLeg> = (0..members.len())
                    .map(|i| {
                        let out = outbound[i][j];
                        let ret = match &inbound {
                            Some(grid) => grid[j][i],
                            None => out,
                        };
                        TravelLeg {
                            outbound_minutes: out.minutes,
                            return_minutes: ret.minutes,
                            complete: out.ok && ret.ok,
                        }
                    })
                    .collect();

                let result = aggregate_legs(candidate.clone(), members, &legs, &self.params);
                if result.is_none() {
                    tracing::debug!("Dropping {}: no leg could be routed", candidate.name);
                }
                result
            })
            .collect();

        rank_candidates(&mut scored);

        tracing::debug!(
            "Scored {}/{} candidates for {} members (symmetric_return={})",
            scored.len(),
            candidates.len(),
            members.len(),
            symmetric_return
        );

        scored
    }

    /// Route every configured mode and keep the fastest success per cell
    async fn fastest_matrix(&self, origins: &[Coordinate], destinations: &[Coordinate]) -> Vec<Vec<LegResult>> {
        let grids = join_all(
            self.modes
                .iter()
                .map(|mode| self.bounded_matrix(origins, destinations, *mode)),
        )
        .await;
        fastest_of(grids, origins.len(), destinations.len())
    }

    /// One matrix under the deadline; shape-checked so index alignment holds
    async fn bounded_matrix(
        &self,
        origins: &[Coordinate],
        destinations: &[Coordinate],
        mode: TravelMode,
    ) -> Vec<Vec<LegResult>> {
        let rows = origins.len();
        let cols = destinations.len();

        let grid = match tokio::time::timeout(self.timeout, self.routing.matrix(origins, destinations, mode)).await {
            Ok(grid) => grid,
            Err(_) => {
                tracing::warn!("{} matrix ({}x{}) timed out after {:?}", mode.as_str(), rows, cols, self.timeout);
                return vec![vec![LegResult::failed(); cols]; rows];
            }
        };

        if grid.len() != rows || grid.iter().any(|row| row.len() != cols) {
            tracing::warn!("{} matrix came back with the wrong shape, padding failed cells", mode.as_str());
        }

        (0..rows)
            .map(|i| {
                (0..cols)
                    .map(|j| {
                        grid.get(i)
                            .and_then(|row| row.get(j))
                            .copied()
                            .unwrap_or_else(LegResult::failed)
                    })
                    .collect()
            })
            .collect()
    }
}
