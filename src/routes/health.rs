use actix_web::{web, HttpResponse, Responder};

use crate::models::HealthResponse;
use crate::state::AppState;

/// Configure health and metrics routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check))
        .route("/metrics", web::get().to(metrics));
}

/// Health check endpoint
///
/// The process only serves once the model has loaded, so reaching this
/// handler means the scorer is available.
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        model_identifier: state.matcher.scorer().model_identifier().to_string(),
        timestamp: chrono::Utc::now(),
    })
}

/// Operations metrics endpoint
///
/// GET /api/v1/metrics
async fn metrics(state: web::Data<AppState>) -> impl Responder {
    let snapshot = state.monitor.snapshot(state.host.sample());
    HttpResponse::Ok().json(snapshot)
}
