use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn, Instrument};
use uuid::Uuid;

use crate::core::geo::centroid;
use crate::core::matching::{dedup_nearby, match_suggestions, names_match, proximity_shortlist};
use crate::core::resolve::LocationResolver;
use crate::core::retry::{retry_until, RetryOutcome, RetryPolicy, Sleeper, TokioSleeper};
use crate::core::scoring::{summarize_travel, CandidateScorer};
use crate::models::{
    Candidate, Coordinate, Hub, Judgement, Participant, Recommendation, ResolvedParticipant, ScoredCandidate,
    SelectionParams,
};
use crate::services::{HubDirectory, PlaceGateway, SuggestionGateway};

/// Annotation carried by the narrative whenever the proximity fallback ran
pub const FALLBACK_NOTE: &str = "standard optimization used";
/// Rationale for options the judge did not explain
pub const DEFAULT_RATIONALE: &str = "Strategic option.";
/// Rationale for the top-scored option when no judgement is available
pub const BEST_BALANCE_RATIONALE: &str = "Best balance of total travel time and fairness.";

/// Pipeline stages, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    ResolvingLocations,
    BuildingContext,
    Scouting(u32),
    MathFallback,
    Scoring,
    Deduplicating,
    Judging,
    Formatting,
    Done,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::ResolvingLocations => write!(f, "resolving_locations"),
            Stage::BuildingContext => write!(f, "building_context"),
            Stage::Scouting(attempt) => write!(f, "scouting[{}]", attempt),
            Stage::MathFallback => write!(f, "math_fallback"),
            Stage::Scoring => write!(f, "scoring"),
            Stage::Deduplicating => write!(f, "deduplicating"),
            Stage::Judging => write!(f, "judging"),
            Stage::Formatting => write!(f, "formatting"),
            Stage::Done => write!(f, "done"),
        }
    }
}

/// Result of a hub selection run
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HubSelection {
    pub narrative: String,
    pub recommendations: Vec<Recommendation>,
    pub used_fallback: bool,
}

impl HubSelection {
    fn empty(narrative: impl Into<String>) -> Self {
        Self {
            narrative: narrative.into(),
            recommendations: Vec::new(),
            used_fallback: false,
        }
    }
}

/// Picks a fair transit hub for a group
///
/// # Pipeline Stages
/// 1. Resolve member locations
/// 2. Build the text context for the scout and judge
/// 3. Scout: AI hub suggestions, retried up to `max_scout_attempts`
/// 4. Fall back to the hubs nearest the group centroid if the scout under-delivers
/// 5. Score the shortlist with full outbound and return matrices
/// 6. Drop near-duplicate hubs
/// 7. Judge: AI adjudication over the top scored candidates
/// 8. Format ranked recommendations
pub struct HubSelector {
    directory: Arc<dyn HubDirectory>,
    suggestions: Arc<dyn SuggestionGateway>,
    resolver: LocationResolver,
    scorer: CandidateScorer,
    sleeper: Arc<dyn Sleeper>,
    params: SelectionParams,
}

impl HubSelector {
    pub fn new(
        directory: Arc<dyn HubDirectory>,
        places: Arc<dyn PlaceGateway>,
        suggestions: Arc<dyn SuggestionGateway>,
        scorer: CandidateScorer,
        params: SelectionParams,
    ) -> Self {
        Self {
            resolver: LocationResolver::new(directory.clone(), places),
            directory,
            suggestions,
            scorer,
            sleeper: Arc::new(TokioSleeper),
            params,
        }
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    fn enter(&self, stage: Stage) {
        info!(%stage, "hub selection stage");
    }

    /// Rank up to `max_recommendations` hubs for the ready members
    ///
    /// Never fails: degraded runs come back with fewer (possibly zero)
    /// recommendations and a narrative that says why.
    pub async fn select_hub(&self, members: &[Participant], meeting_time: &str) -> HubSelection {
        let run_id = Uuid::new_v4();
        self.run(members, meeting_time)
            .instrument(tracing::info_span!("select_hub", %run_id))
            .await
    }

    async fn run(&self, members: &[Participant], meeting_time: &str) -> HubSelection {
        self.enter(Stage::ResolvingLocations);
        let active = self.resolver.resolve_active(members).await;
        if active.is_empty() {
            info!("No ready members with a usable location");
            return HubSelection::empty("No ready participants with a usable location; nothing to optimise.");
        }

        let hubs = match self.directory.all_hubs().await {
            Ok(hubs) => hubs,
            Err(e) => {
                warn!("Failed to load reference hubs: {}", e);
                Vec::new()
            }
        };
        if hubs.is_empty() {
            return HubSelection::empty("No reference hubs are available; nothing to optimise.");
        }

        self.enter(Stage::BuildingContext);
        let context = build_context(&active, meeting_time);

        let scouting = self.scout(&context, meeting_time, &hubs).await;
        let used_fallback = !scouting.accepted;
        let shortlist = if used_fallback {
            self.enter(Stage::MathFallback);
            let points: Vec<Coordinate> = active
                .iter()
                .flat_map(|m| [m.start_location, m.end_location])
                .collect();
            let center = centroid(&points);
            info!(
                "Scout matched {} hubs after {} attempts, falling back to the {} hubs nearest {}",
                scouting.value.len(),
                scouting.attempts,
                self.params.fallback_shortlist_size,
                center
            );
            proximity_shortlist(&hubs, center, self.params.fallback_shortlist_size)
        } else {
            scouting.value.clone()
        };

        let mut narrative = if used_fallback {
            format!(
                "AI scout matched only {} known hubs after {} attempts; {}: shortlisted the {} hubs nearest the group's centre.",
                scouting.value.len(),
                scouting.attempts,
                FALLBACK_NOTE,
                shortlist.len()
            )
        } else {
            format!(
                "AI scout matched {} known hubs on attempt {}.",
                shortlist.len(),
                scouting.attempts
            )
        };

        self.enter(Stage::Scoring);
        let candidates: Vec<Candidate> = shortlist
            .iter()
            .take(self.params.max_scored_candidates)
            .map(Hub::to_candidate)
            .collect();
        let scored = self.scorer.score(&candidates, &active, false).await;

        if scored.is_empty() {
            warn!("None of the {} shortlisted hubs could be routed", candidates.len());
            narrative.push_str(" No shortlisted hub could be routed for this group, so there is no recommendation.");
            return HubSelection {
                narrative,
                recommendations: Vec::new(),
                used_fallback,
            };
        }

        self.enter(Stage::Deduplicating);
        let accepted = dedup_nearby(
            &scored,
            self.params.dedup_threshold_deg_sq,
            self.params.max_recommendations,
        );
        narrative.push_str(&format!(
            " Scored {} candidates and kept {} distinct options.",
            scored.len(),
            accepted.len()
        ));

        self.enter(Stage::Judging);
        let pool = &scored[..scored.len().min(self.params.judge_pool_size)];
        let judgement = self.judge(pool, &context).await;

        self.enter(Stage::Formatting);
        let recommendations = format_recommendations(accepted, &active, judgement.as_ref());

        match (recommendations.iter().find(|r| r.is_winner), &judgement) {
            (Some(winner), _) => narrative.push_str(&format!(" Judge picked {}.", winner.scored.candidate.name)),
            (None, Some(j)) => {
                let verdict = recommendations
                    .iter()
                    .find(|r| names_match(&r.scored.candidate.name, &j.winner));
                match verdict {
                    Some(r) if !r.scored.is_complete() => narrative.push_str(&format!(
                        " Judge favoured {}, but not everyone could be routed there; options ranked by fairness score.",
                        r.scored.candidate.name
                    )),
                    _ => narrative.push_str(&format!(
                        " Judge favoured {}, which was merged into a nearby option; options ranked by fairness score.",
                        j.winner
                    )),
                }
            }
            (None, None) => narrative.push_str(" Judge unavailable; options ranked by fairness score."),
        }

        let missing = missing_names(&recommendations, &active);
        if !missing.is_empty() {
            narrative.push_str(&format!(
                " Travel times could not be computed for: {}.",
                missing.join(", ")
            ));
        }

        self.enter(Stage::Done);
        info!(
            "Hub selection produced {} recommendations (fallback={})",
            recommendations.len(),
            used_fallback
        );

        HubSelection {
            narrative,
            recommendations,
            used_fallback,
        }
    }

    async fn scout(&self, context: &str, meeting_time: &str, hubs: &[Hub]) -> RetryOutcome<Vec<Hub>> {
        let policy = RetryPolicy::new(
            self.params.max_scout_attempts,
            Duration::from_millis(self.params.scout_backoff_ms),
        );
        let timeout = Duration::from_secs(self.params.suggestion_timeout_secs);
        let min_matches = self.params.min_matched_candidates;

        retry_until(
            policy,
            self.sleeper.as_ref(),
            |attempt| async move {
                self.enter(Stage::Scouting(attempt));
                let names = match tokio::time::timeout(timeout, self.suggestions.suggest_hubs(context, meeting_time)).await {
                    Ok(names) => names,
                    Err(_) => {
                        warn!("Scout attempt {} timed out after {:?}", attempt, timeout);
                        Vec::new()
                    }
                };
                let matched = match_suggestions(&names, hubs);
                info!(
                    "Scout attempt {}: {} suggestions, {} matched known hubs",
                    attempt,
                    names.len(),
                    matched.len()
                );
                matched
            },
            |matched| matched.len() >= min_matches,
        )
        .await
    }

    async fn judge(&self, pool: &[ScoredCandidate], context: &str) -> Option<Judgement> {
        let timeout = Duration::from_secs(self.params.suggestion_timeout_secs);
        match tokio::time::timeout(timeout, self.suggestions.judge_candidates(pool, context)).await {
            Ok(Some(judgement)) => {
                let names: Vec<&str> = pool.iter().map(|c| c.candidate.name.as_str()).collect();
                if find_named(&names, &judgement.winner).is_some() {
                    Some(judgement)
                } else {
                    warn!("Judge picked '{}', which is not on the shortlist", judgement.winner);
                    None
                }
            }
            Ok(None) => {
                warn!("Judge returned no usable verdict");
                None
            }
            Err(_) => {
                warn!("Judge timed out after {:?}", timeout);
                None
            }
        }
    }
}

/// Plain-text description of the group handed to the scout and judge
pub fn build_context(members: &[ResolvedParticipant], meeting_time: &str) -> String {
    let mut context = String::new();
    if !meeting_time.trim().is_empty() {
        context.push_str(&format!("Meeting time: {}\n", meeting_time.trim()));
    }
    context.push_str(&format!("Participants ({}):\n", members.len()));
    for m in members {
        context.push_str(&format!(
            "- {} starts at {} ({}) and finishes at {} ({})\n",
            m.name, m.start_label, m.start_location, m.end_label, m.end_location
        ));
    }
    context
}

/// Index of the entry named `name`: exact (case-insensitive) first, then containment
fn find_named(names: &[&str], name: &str) -> Option<usize> {
    names
        .iter()
        .position(|n| n.trim().eq_ignore_ascii_case(name.trim()))
        .or_else(|| names.iter().position(|n| names_match(n, name)))
}

fn rationale_from(judgement: &Judgement, name: &str) -> Option<String> {
    // sorted so containment matches do not depend on hash order
    let mut keys: Vec<&str> = judgement.rationales.keys().map(String::as_str).collect();
    keys.sort_unstable();
    find_named(&keys, name).map(|i| judgement.rationales[keys[i]].clone())
}

/// Attach rationales, promote the judged winner, and number the ranks
///
/// A winner that is missing legs is only promoted when no accepted candidate
/// is fully routed; otherwise score order stands and nobody is flagged.
pub fn format_recommendations(
    accepted: Vec<ScoredCandidate>,
    members: &[ResolvedParticipant],
    judgement: Option<&Judgement>,
) -> Vec<Recommendation> {
    let names: Vec<&str> = accepted.iter().map(|c| c.candidate.name.as_str()).collect();
    let any_complete = accepted.iter().any(ScoredCandidate::is_complete);
    let winner_idx = judgement
        .and_then(|j| find_named(&names, &j.winner))
        .filter(|&idx| accepted[idx].is_complete() || !any_complete);
    let headline = winner_idx.unwrap_or(0);

    let mut recommendations: Vec<Recommendation> = accepted
        .into_iter()
        .enumerate()
        .map(|(i, scored)| {
            let is_winner = winner_idx == Some(i);
            let rationale = judgement
                .and_then(|j| rationale_from(j, &scored.candidate.name))
                .unwrap_or_else(|| {
                    if i == headline {
                        BEST_BALANCE_RATIONALE.to_string()
                    } else {
                        DEFAULT_RATIONALE.to_string()
                    }
                });
            let summary = summarize_travel(&scored, members);
            Recommendation {
                scored,
                rationale,
                rank: 0,
                is_winner,
                summary,
            }
        })
        .collect();

    if let Some(idx) = winner_idx {
        let winner = recommendations.remove(idx);
        recommendations.insert(0, winner);
    }
    for (i, rec) in recommendations.iter_mut().enumerate() {
        rec.rank = i + 1;
    }

    recommendations
}

fn missing_names(recommendations: &[Recommendation], members: &[ResolvedParticipant]) -> Vec<String> {
    members
        .iter()
        .filter(|m| {
            recommendations
                .iter()
                .any(|r| r.scored.missing_participants.contains(&m.id))
        })
        .map(|m| m.name.clone())
        .collect()
}
