use actix_cors::Cors;
use actix_web::{error, http::StatusCode, middleware, web, App, HttpResponse, HttpServer};
use fairmeet::config::{LoggingSettings, Settings};
use fairmeet::core::{CandidateScorer, HubSelector, VenueSelector};
use fairmeet::routes::{self, AppState};
use fairmeet::services::{
    CacheManager, CachedRouting, GeminiClient, GooglePlacesClient, GoogleRoutingClient, HubDirectory,
    PlaceGateway, PostgresHubDirectory, RoutingGateway, StaticHubDirectory, SuggestionGateway,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// JSON error response for JSON payload errors
#[derive(Debug, serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

impl std::fmt::Display for JsonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

impl std::error::Error for JsonError {}

impl error::ResponseError for JsonError {
    fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::BAD_REQUEST)
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(self)
    }
}

/// Handle JSON payload errors
pub fn handle_json_payload_error(err: error::JsonPayloadError, req: &actix_web::HttpRequest) -> actix_web::Error {
    tracing::info!("JSON payload error on {}: {}", req.path(), err);
    JsonError {
        error: "invalid_json".to_string(),
        message: format!("Invalid JSON: {}", err),
        status_code: 400,
    }
    .into()
}

/// Handle query payload errors
pub fn handle_query_payload_error(err: error::QueryPayloadError, _req: &actix_web::HttpRequest) -> actix_web::Error {
    JsonError {
        error: "invalid_query".to_string(),
        message: format!("Invalid query: {}", err),
        status_code: 400,
    }
    .into()
}

/// `RUST_LOG` wins over the configured level when set
fn init_logging(logging: &LoggingSettings) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    match logging.format.as_str() {
        "pretty" => subscriber.pretty().init(),
        "compact" => subscriber.compact().init(),
        _ => subscriber.json().init(),
    }
}

async fn build_directory(
    settings: &Settings,
) -> std::io::Result<(Arc<dyn HubDirectory>, Option<Arc<PostgresHubDirectory>>)> {
    let seed = match settings.hubs.seed_file.as_deref() {
        Some(path) => match StaticHubDirectory::load(path) {
            Ok(directory) => Some(directory),
            Err(e) => {
                warn!("Failed to load hub seed file {}: {}", path, e);
                None
            }
        },
        None => None,
    };

    if let Some(url) = settings.database.url.as_deref() {
        let postgres = PostgresHubDirectory::from_settings(
            url,
            settings.database.max_connections,
            settings.database.min_connections,
            settings.database.acquire_timeout_secs,
            settings.database.idle_timeout_secs,
        )
        .await
        .map_err(|e| {
            error!("Failed to connect to PostgreSQL: {}", e);
            std::io::Error::other(format!("PostgreSQL connection error: {}", e))
        })?;

        if settings.hubs.seed_database {
            if let Some(seed) = &seed {
                if let Err(e) = postgres.upsert_hubs(seed.hubs()).await {
                    warn!("Failed to seed stations table: {}", e);
                }
            }
        }

        info!("Hub directory: PostgreSQL");
        let postgres = Arc::new(postgres);
        return Ok((postgres.clone() as Arc<dyn HubDirectory>, Some(postgres)));
    }

    let directory = seed.unwrap_or_default();
    if directory.is_empty() {
        warn!("Hub directory is empty; hub selection will return no recommendations");
    } else {
        info!("Hub directory: {} hubs from seed file", directory.len());
    }
    Ok((Arc::new(directory), None))
}

async fn build_routing(settings: &Settings) -> Arc<dyn RoutingGateway> {
    let google: Arc<dyn RoutingGateway> = Arc::new(GoogleRoutingClient::new(
        settings.routing.base_url.clone(),
        settings.routing.api_key.clone(),
        settings.routing_timeout(),
    ));

    if !settings.cache.enabled {
        info!("Route cache disabled");
        return google;
    }

    let ttl = settings.cache.ttl_secs.unwrap_or(900);
    let l1_size = settings.cache.l1_cache_size.unwrap_or(10_000);

    let cache = match CacheManager::new(settings.cache.redis_url.as_deref(), l1_size, ttl).await {
        Ok(cache) => cache,
        Err(e) => {
            warn!("Failed to connect to Redis ({}), using in-memory route cache only", e);
            CacheManager::in_memory(l1_size, ttl)
        }
    };

    info!("Route cache initialized (L1: {} entries, TTL: {}s): {:?}", l1_size, ttl, cache.stats());

    Arc::new(CachedRouting::new(google, Arc::new(cache)))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    let settings = Settings::load();
    let logging = settings.as_ref().map(|s| s.logging.clone()).unwrap_or_default();
    init_logging(&logging);

    let settings = settings.map_err(|e| {
        error!("Failed to load configuration: {}", e);
        std::io::Error::other(format!("Configuration error: {}", e))
    })?;

    info!("Starting Fairmeet selection service...");

    let (directory, postgres) = build_directory(&settings).await?;
    let routing = build_routing(&settings).await;

    let places: Arc<dyn PlaceGateway> = Arc::new(GooglePlacesClient::new(
        settings.places.base_url.clone(),
        settings.places.geocode_base_url.clone(),
        settings.places.api_key.clone(),
        settings.places.max_results,
        Duration::from_secs(settings.places.timeout_secs),
    ));

    let suggestions: Arc<dyn SuggestionGateway> = Arc::new(GeminiClient::new(
        settings.suggestion.base_url.clone(),
        settings.suggestion.model.clone(),
        settings.suggestion.api_key.clone(),
        settings.suggestion.suggestion_count,
        Duration::from_secs(settings.suggestion.timeout_secs),
    ));

    let scorer = CandidateScorer::new(routing, settings.scoring_params())
        .with_modes(settings.routing.modes.clone())
        .with_timeout(settings.routing_timeout());

    info!("Scorer initialized with {:?}", scorer.params());

    let hub_selector = HubSelector::new(
        directory.clone(),
        places.clone(),
        suggestions,
        scorer.clone(),
        settings.selection_params(),
    );
    let venue_selector = VenueSelector::new(directory.clone(), places, scorer, settings.venue_params());

    let app_state = AppState {
        directory,
        hub_selector: Arc::new(hub_selector),
        venue_selector: Arc::new(venue_selector),
        postgres,
    };

    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().error_handler(handle_json_payload_error))
            .app_data(web::QueryConfig::default().error_handler(handle_query_payload_error))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await
}
