use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::models::{ScoringParams, SelectionParams, TravelMode, VenueParams};

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub routing: RoutingSettings,
    #[serde(default)]
    pub places: PlacesSettings,
    #[serde(default)]
    pub suggestion: SuggestionSettings,
    #[serde(default)]
    pub scoring: ScoringSettings,
    #[serde(default)]
    pub selection: SelectionSettings,
    #[serde(default)]
    pub database: DatabaseSettings,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub hubs: HubSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub workers: Option<usize>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workers: None,
        }
    }
}

fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }

#[derive(Debug, Clone, Deserialize)]
pub struct RoutingSettings {
    pub api_key: Option<String>,
    #[serde(default = "default_maps_base_url")]
    pub base_url: String,
    #[serde(default = "default_routing_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_modes")]
    pub modes: Vec<TravelMode>,
}

impl Default for RoutingSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_maps_base_url(),
            timeout_secs: default_routing_timeout(),
            modes: default_modes(),
        }
    }
}

fn default_maps_base_url() -> String { "https://maps.googleapis.com".to_string() }
fn default_routing_timeout() -> u64 { 15 }
fn default_modes() -> Vec<TravelMode> { vec![TravelMode::Transit, TravelMode::Walking] }

#[derive(Debug, Clone, Deserialize)]
pub struct PlacesSettings {
    pub api_key: Option<String>,
    #[serde(default = "default_places_base_url")]
    pub base_url: String,
    #[serde(default = "default_maps_base_url")]
    pub geocode_base_url: String,
    #[serde(default = "default_places_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    #[serde(default = "default_radius")]
    pub default_radius_meters: u32,
    #[serde(default = "default_tags")]
    pub default_tags: Vec<String>,
    #[serde(default = "default_enrich_top")]
    pub enrich_top: usize,
}

impl Default for PlacesSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_places_base_url(),
            geocode_base_url: default_maps_base_url(),
            timeout_secs: default_places_timeout(),
            max_results: default_max_results(),
            default_radius_meters: default_radius(),
            default_tags: default_tags(),
            enrich_top: default_enrich_top(),
        }
    }
}

fn default_places_base_url() -> String { "https://places.googleapis.com".to_string() }
fn default_places_timeout() -> u64 { 10 }
fn default_max_results() -> usize { 10 }
fn default_radius() -> u32 { 800 }
fn default_tags() -> Vec<String> { vec!["pub".to_string(), "bar".to_string()] }
fn default_enrich_top() -> usize { 3 }

#[derive(Debug, Clone, Deserialize)]
pub struct SuggestionSettings {
    pub api_key: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_gemini_base_url")]
    pub base_url: String,
    #[serde(default = "default_suggestion_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_suggestion_count")]
    pub suggestion_count: usize,
}

impl Default for SuggestionSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            base_url: default_gemini_base_url(),
            timeout_secs: default_suggestion_timeout(),
            suggestion_count: default_suggestion_count(),
        }
    }
}

fn default_model() -> String { "gemini-1.5-flash".to_string() }
fn default_gemini_base_url() -> String { "https://generativelanguage.googleapis.com".to_string() }
fn default_suggestion_timeout() -> u64 { 20 }
fn default_suggestion_count() -> usize { 6 }

#[derive(Debug, Clone, Deserialize)]
pub struct ScoringSettings {
    #[serde(default = "default_penalty_threshold")]
    pub penalty_threshold_minutes: u32,
    #[serde(default = "default_penalty_per_minute")]
    pub penalty_per_minute: f64,
    #[serde(default = "default_dedup_threshold")]
    pub dedup_threshold_deg_sq: f64,
}

impl Default for ScoringSettings {
    fn default() -> Self {
        Self {
            penalty_threshold_minutes: default_penalty_threshold(),
            penalty_per_minute: default_penalty_per_minute(),
            dedup_threshold_deg_sq: default_dedup_threshold(),
        }
    }
}

fn default_penalty_threshold() -> u32 { 90 }
fn default_penalty_per_minute() -> f64 { 5.0 }
fn default_dedup_threshold() -> f64 { 0.00001 }

#[derive(Debug, Clone, Deserialize)]
pub struct SelectionSettings {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
    #[serde(default = "default_min_matches")]
    pub min_matches: usize,
    #[serde(default = "default_fallback_shortlist")]
    pub fallback_shortlist_size: usize,
    #[serde(default = "default_max_scored")]
    pub max_scored: usize,
    #[serde(default = "default_judge_pool")]
    pub judge_pool_size: usize,
    #[serde(default = "default_max_recommendations")]
    pub max_recommendations: usize,
}

impl Default for SelectionSettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_ms: default_backoff_ms(),
            min_matches: default_min_matches(),
            fallback_shortlist_size: default_fallback_shortlist(),
            max_scored: default_max_scored(),
            judge_pool_size: default_judge_pool(),
            max_recommendations: default_max_recommendations(),
        }
    }
}

fn default_max_attempts() -> u32 { 3 }
fn default_backoff_ms() -> u64 { 1000 }
fn default_min_matches() -> usize { 3 }
fn default_fallback_shortlist() -> usize { 15 }
fn default_max_scored() -> usize { 5 }
fn default_judge_pool() -> usize { 5 }
fn default_max_recommendations() -> usize { 3 }

/// PostgreSQL hub directory; unused when `url` is unset
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatabaseSettings {
    pub url: Option<String>,
    pub max_connections: Option<u32>,
    pub min_connections: Option<u32>,
    pub acquire_timeout_secs: Option<u64>,
    pub idle_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheSettings {
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,
    pub redis_url: Option<String>,
    pub ttl_secs: Option<u64>,
    pub l1_cache_size: Option<u64>,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
            redis_url: None,
            ttl_secs: None,
            l1_cache_size: None,
        }
    }
}

fn default_cache_enabled() -> bool { true }

#[derive(Debug, Clone, Deserialize)]
pub struct HubSettings {
    #[serde(default = "default_seed_file")]
    pub seed_file: Option<String>,
    /// Copy the seed file into the database on startup
    #[serde(default)]
    pub seed_database: bool,
}

impl Default for HubSettings {
    fn default() -> Self {
        Self {
            seed_file: default_seed_file(),
            seed_database: false,
        }
    }
}

fn default_seed_file() -> Option<String> { Some("data/hubs.toml".to_string()) }

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Local overrides (config/local.toml)
    /// 4. Environment variables (prefixed with FAIRMEET__)
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g. FAIRMEET__SERVER__PORT -> server.port
            .add_source(env_source())
            .build()?;

        let settings = apply_credential_env(settings)?;
        settings.try_deserialize()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(env_source())
            .build()?;

        let settings = apply_credential_env(settings)?;
        settings.try_deserialize()
    }

    pub fn scoring_params(&self) -> ScoringParams {
        ScoringParams {
            penalty_threshold_minutes: self.scoring.penalty_threshold_minutes,
            // NaN and negative rates collapse to no penalty
            penalty_per_minute: self.scoring.penalty_per_minute.max(0.0),
        }
    }

    pub fn selection_params(&self) -> SelectionParams {
        SelectionParams {
            max_scout_attempts: self.selection.max_attempts.max(1),
            scout_backoff_ms: self.selection.backoff_ms,
            min_matched_candidates: self.selection.min_matches,
            fallback_shortlist_size: self.selection.fallback_shortlist_size,
            max_scored_candidates: self.selection.max_scored,
            judge_pool_size: self.selection.judge_pool_size,
            max_recommendations: self.selection.max_recommendations,
            dedup_threshold_deg_sq: self.scoring.dedup_threshold_deg_sq,
            suggestion_timeout_secs: self.suggestion.timeout_secs,
        }
    }

    pub fn venue_params(&self) -> VenueParams {
        VenueParams {
            default_radius_meters: self.places.default_radius_meters,
            default_tags: self.places.default_tags.clone(),
            max_results: self.places.max_results,
            enrich_top: self.places.enrich_top,
            enrich_timeout_secs: self.places.timeout_secs,
        }
    }

    pub fn routing_timeout(&self) -> Duration {
        Duration::from_secs(self.routing.timeout_secs)
    }
}

fn env_source() -> Environment {
    Environment::with_prefix("FAIRMEET")
        .prefix_separator("__")
        .separator("__")
        .list_separator(",")
        .with_list_parse_key("routing.modes")
        .with_list_parse_key("places.default_tags")
        .try_parsing(true)
}

/// Fill API keys from the conventional unprefixed variables
///
/// `GOOGLE_MAPS_API_KEY` covers routing, places and geocoding,
/// `GEMINI_API_KEY` covers suggestions. Prefixed settings win.
fn apply_credential_env(settings: Config) -> Result<Config, ConfigError> {
    use std::env;

    let maps_key = env::var("GOOGLE_MAPS_API_KEY").ok().filter(|k| !k.is_empty());
    let gemini_key = env::var("GEMINI_API_KEY").ok().filter(|k| !k.is_empty());
    let database_url = env::var("DATABASE_URL").ok().filter(|u| !u.is_empty());

    let mut builder = Config::builder().add_source(settings.clone());

    if let Some(key) = maps_key {
        for field in ["routing.api_key", "places.api_key"] {
            if settings.get_string(field).is_err() {
                builder = builder.set_override(field, key.clone())?;
            }
        }
    }
    if let Some(key) = gemini_key {
        if settings.get_string("suggestion.api_key").is_err() {
            builder = builder.set_override("suggestion.api_key", key)?;
        }
    }
    if let Some(url) = database_url {
        if settings.get_string("database.url").is_err() {
            builder = builder.set_override("database.url", url)?;
        }
    }

    builder.build()
}
