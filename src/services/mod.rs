// Service exports
pub mod cache;
pub mod cached_routing;
pub mod gateway;
pub mod gemini;
pub mod google_places;
pub mod google_routes;
pub mod postgres;
pub mod static_hubs;

pub use cache::{CacheError, CacheKey, CacheManager, CacheStats};
pub use cached_routing::CachedRouting;
pub use gateway::{
    generic_venue_summary, DirectoryError, HubDirectory, PlaceGateway, RoutingGateway, SuggestionGateway,
};
pub use gemini::{GeminiClient, SuggestionError};
pub use google_places::{GooglePlacesClient, PlacesError};
pub use google_routes::{GoogleRoutingClient, RoutingError};
pub use postgres::PostgresHubDirectory;
pub use static_hubs::StaticHubDirectory;
