// Route exports
pub mod error;
pub mod health;
pub mod matches;

use actix_web::web;

pub use error::ApiError;

/// Largest request body accepted by any route
pub const MAX_BODY_BYTES: usize = 64 * 1024;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .configure(health::configure)
            .configure(matches::configure),
    );
}
