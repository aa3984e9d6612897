// Route exports
pub mod selection;

use actix_web::web;

pub use selection::AppState;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .configure(selection::configure),
    );
}
