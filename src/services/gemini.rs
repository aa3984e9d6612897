use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

use crate::core::parsing::{parse_judgement, parse_suggestions};
use crate::models::{Judgement, ScoredCandidate};
use crate::services::SuggestionGateway;

/// Errors that can occur when talking to the generative backend
#[derive(Debug, Error)]
pub enum SuggestionError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error: {0}")]
    ApiError(String),

    #[error("Missing generative API key")]
    MissingCredentials,

    #[error("Empty response from model")]
    EmptyResponse,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<GeneratedCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeneratedCandidate {
    #[serde(default)]
    content: Option<GeneratedContent>,
}

#[derive(Debug, Deserialize)]
struct GeneratedContent {
    #[serde(default)]
    parts: Vec<GeneratedPart>,
}

#[derive(Debug, Deserialize)]
struct GeneratedPart {
    #[serde(default)]
    text: String,
}

/// Prompt asking for hub names
pub fn scout_prompt(context: &str, meeting_time: &str, count: usize) -> String {
    let when = if meeting_time.trim().is_empty() {
        "an unspecified time".to_string()
    } else {
        meeting_time.trim().to_string()
    };
    format!(
        "You are helping a group of friends find a fair place to meet at {when}.\n\
         {context}\n\
         Suggest {count} transit stations where the group could meet so that nobody's round trip \
         is much longer than anyone else's. Prefer well-connected interchanges.\n\
         Respond with a JSON array of station names only, for example [\"Bank\", \"Waterloo\"]."
    )
}

/// Prompt asking the model to pick and justify a winner
pub fn judge_prompt(candidates: &[ScoredCandidate], context: &str) -> String {
    let mut listing = String::new();
    for c in candidates {
        listing.push_str(&format!(
            "- {}: total {} min, longest round trip {} min, fairness score {:.0}",
            c.candidate.name, c.total_minutes, c.worst_case_minutes, c.fairness_score
        ));
        if !c.missing_participants.is_empty() {
            listing.push_str(&format!(" (no route for {} member(s))", c.missing_participants.len()));
        }
        listing.push('\n');
    }

    format!(
        "{context}\n\
         These meeting stations were scored by round-trip travel time (lower fairness score is better):\n\
         {listing}\
         Pick the fairest option for the group and give a one-sentence reason for every option.\n\
         Respond with JSON: {{\"winner\": \"<station name>\", \"reasons\": {{\"<station name>\": \"<reason>\"}}}}"
    )
}

/// Gemini `generateContent` client
pub struct GeminiClient {
    base_url: String,
    model: String,
    api_key: Option<String>,
    suggestion_count: usize,
    client: Client,
    warned_missing_key: AtomicBool,
}

impl GeminiClient {
    pub fn new(
        base_url: String,
        model: String,
        api_key: Option<String>,
        suggestion_count: usize,
        timeout: Duration,
    ) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url,
            model,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            suggestion_count: suggestion_count.max(1),
            client,
            warned_missing_key: AtomicBool::new(false),
        }
    }

    /// Send one prompt and return the concatenated text parts
    pub async fn generate(&self, prompt: &str) -> Result<String, SuggestionError> {
        let Some(api_key) = self.api_key.as_deref() else {
            if !self.warned_missing_key.swap(true, Ordering::Relaxed) {
                tracing::warn!("No generative API key configured; scouting and judging are disabled");
            }
            return Err(SuggestionError::MissingCredentials);
        };

        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url.trim_end_matches('/'),
            self.model,
            urlencoding::encode(api_key)
        );

        let payload = json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "temperature": 0.4
            }
        });

        let response = self.client.post(&url).json(&payload).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_else(|_| "Unable to read body".to_string());
            return Err(SuggestionError::ApiError(format!("{}: {}", status, body)));
        }

        let body: GenerateResponse = response.json().await?;
        let text: String = body
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| content.parts.into_iter().map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(SuggestionError::EmptyResponse);
        }
        Ok(text)
    }
}

#[async_trait]
impl SuggestionGateway for GeminiClient {
    async fn suggest_hubs(&self, context: &str, meeting_time: &str) -> Vec<String> {
        let prompt = scout_prompt(context, meeting_time, self.suggestion_count);
        match self.generate(&prompt).await {
            Ok(text) => {
                let names = parse_suggestions(&text);
                tracing::debug!("Scout returned {} names", names.len());
                names
            }
            Err(SuggestionError::MissingCredentials) => Vec::new(),
            Err(e) => {
                tracing::warn!("Scout request failed: {}", e);
                Vec::new()
            }
        }
    }

    async fn judge_candidates(&self, candidates: &[ScoredCandidate], context: &str) -> Option<Judgement> {
        if candidates.is_empty() {
            return None;
        }
        let prompt = judge_prompt(candidates, context);
        match self.generate(&prompt).await {
            Ok(text) => {
                let judgement = parse_judgement(&text);
                if judgement.is_none() {
                    tracing::warn!("Judge response could not be parsed");
                }
                judgement
            }
            Err(SuggestionError::MissingCredentials) => None,
            Err(e) => {
                tracing::warn!("Judge request failed: {}", e);
                None
            }
        }
    }
}
