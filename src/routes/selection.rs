use actix_web::{web, HttpResponse, Responder};
use std::sync::Arc;
use validator::Validate;

use crate::core::{HubSelector, VenueSelector};
use crate::models::{
    ErrorResponse, HealthResponse, HubListResponse, SelectHubRequest, SelectHubResponse,
    SelectVenueRequest, SelectVenueResponse,
};
use crate::services::{HubDirectory, PostgresHubDirectory};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub directory: Arc<dyn HubDirectory>,
    pub hub_selector: Arc<HubSelector>,
    pub venue_selector: Arc<VenueSelector>,
    /// Present when hubs come from PostgreSQL; checked by `/health`
    pub postgres: Option<Arc<PostgresHubDirectory>>,
}

/// Configure all selection routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check))
        .route("/hubs", web::get().to(list_hubs))
        .route("/hubs/select", web::post().to(select_hub))
        .route("/venues/select", web::post().to(select_venue));
}

fn error_response(status: actix_web::http::StatusCode, error: &str, message: String) -> HttpResponse {
    HttpResponse::build(status).json(ErrorResponse {
        error: error.to_string(),
        message,
        status_code: status.as_u16(),
    })
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let healthy = match &state.postgres {
        Some(pg) => pg.health_check().await.unwrap_or(false),
        None => true,
    };

    let status = if healthy { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

/// Reference hub listing
///
/// GET /api/v1/hubs
async fn list_hubs(state: web::Data<AppState>) -> impl Responder {
    match state.directory.all_hubs().await {
        Ok(hubs) => HttpResponse::Ok().json(HubListResponse {
            count: hubs.len(),
            hubs,
        }),
        Err(e) => {
            tracing::error!("Failed to load hubs: {}", e);
            error_response(
                actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to load hubs",
                e.to_string(),
            )
        }
    }
}

/// Pick a meeting hub
///
/// POST /api/v1/hubs/select
///
/// Request body:
/// ```json
/// {
///   "members": [
///     {"id": "a", "name": "Ana", "status": "ready", "start": {"type": "station", "id": "waterloo"}}
///   ],
///   "meetingTime": "Friday 19:00"
/// }
/// ```
async fn select_hub(state: web::Data<AppState>, req: web::Json<SelectHubRequest>) -> impl Responder {
    if let Err(errors) = req.validate() {
        tracing::info!("Validation failed for select_hub request: {:?}", errors);
        return error_response(
            actix_web::http::StatusCode::BAD_REQUEST,
            "Validation failed",
            errors.to_string(),
        );
    }

    tracing::info!("Selecting hub for {} members", req.members.len());

    let selection = state.hub_selector.select_hub(&req.members, &req.meeting_time).await;

    tracing::info!(
        "Returning {} hub recommendations (fallback: {})",
        selection.recommendations.len(),
        selection.used_fallback
    );

    HttpResponse::Ok().json(SelectHubResponse {
        narrative: selection.narrative,
        used_fallback: selection.used_fallback,
        recommendations: selection.recommendations,
    })
}

/// Pick a venue near a confirmed hub
///
/// POST /api/v1/venues/select
///
/// Request body:
/// ```json
/// {
///   "hubId": "bank",
///   "members": [...],
///   "tags": ["pub"],
///   "radiusMeters": 600
/// }
/// ```
async fn select_venue(state: web::Data<AppState>, req: web::Json<SelectVenueRequest>) -> impl Responder {
    if let Err(errors) = req.validate() {
        tracing::info!("Validation failed for select_venue request: {:?}", errors);
        return error_response(
            actix_web::http::StatusCode::BAD_REQUEST,
            "Validation failed",
            errors.to_string(),
        );
    }

    let center = match (&req.hub_id, req.hub) {
        (Some(hub_id), _) => match state.directory.hub(hub_id).await {
            Ok(Some(hub)) => hub.center(),
            Ok(None) => {
                return error_response(
                    actix_web::http::StatusCode::NOT_FOUND,
                    "Hub not found",
                    format!("No hub with id '{}'", hub_id),
                );
            }
            Err(e) => {
                tracing::error!("Failed to look up hub {}: {}", hub_id, e);
                return error_response(
                    actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to look up hub",
                    e.to_string(),
                );
            }
        },
        (None, Some(hub)) => hub,
        (None, None) => {
            return error_response(
                actix_web::http::StatusCode::BAD_REQUEST,
                "Validation failed",
                "Either hubId or hub must be provided".to_string(),
            );
        }
    };

    if !center.is_resolved() {
        return error_response(
            actix_web::http::StatusCode::BAD_REQUEST,
            "Validation failed",
            "Hub location is unresolved".to_string(),
        );
    }

    let tags = req.tags.clone().unwrap_or_default();
    let recommendations = state
        .venue_selector
        .select_venue(center, &req.members, &tags, req.radius_meters.unwrap_or(0))
        .await;

    tracing::info!("Returning {} venue recommendations near {}", recommendations.len(), center);

    HttpResponse::Ok().json(SelectVenueResponse { recommendations })
}
