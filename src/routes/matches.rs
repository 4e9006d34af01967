use actix_web::http::header::AUTHORIZATION;
use actix_web::{web, HttpRequest, HttpResponse};
use std::time::Instant;
use validator::Validate;

use crate::core::{bearer_token, Admission, AuthClaims, AuthError};
use crate::models::{ExplainMatchRequest, ExplainMatchResponse, ModelInfoResponse};
use crate::routes::error::ApiError;
use crate::state::AppState;

/// Configure all match-related routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/matches/explain", web::post().to(explain_match))
        .route("/model", web::get().to(model_info));
}

/// Verify the request's bearer token
pub(crate) fn authorize(state: &AppState, http_req: &HttpRequest) -> Result<AuthClaims, ApiError> {
    let token = http_req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(bearer_token)
        .ok_or(ApiError::MissingCredentials)?;

    state
        .auth
        .verify(token, chrono::Utc::now().timestamp())
        .map_err(|e| {
            match &e {
                AuthError::TokenExpired => tracing::info!("Rejected expired token on {}", http_req.path()),
                AuthError::InvalidToken(reason) => {
                    tracing::info!("Rejected invalid token on {}: {}", http_req.path(), reason)
                }
            }
            ApiError::Unauthorized(e)
        })
}

/// Explain-match endpoint
///
/// POST /api/v1/matches/explain
///
/// Request body:
/// ```json
/// {
///   "rfq_identifier": "string",
///   "supplier_identifier": "string",
///   "feature_overrides": { "price": 70000, "lead_time": 12 }
/// }
/// ```
///
/// The body is parsed only after the caller is authenticated and admitted.
async fn explain_match(
    state: web::Data<AppState>,
    body: web::Bytes,
    http_req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let started = Instant::now();
    let result = handle_explain_match(&state, &body, &http_req);

    match &result {
        Ok(_) => state.monitor.record_success(started.elapsed()),
        Err(e) => match e.kind() {
            Some(kind) => {
                if let ApiError::Explanation(_) | ApiError::Internal(_) = e {
                    tracing::error!("explain-match failed ({}): {}", kind.as_str(), e);
                }
                state.monitor.record_error(kind)
            }
            None => state.monitor.record_rate_limited(),
        },
    }

    result
}

fn handle_explain_match(
    state: &AppState,
    body: &[u8],
    http_req: &HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let claims = authorize(state, http_req)?;

    if let Admission::Rejected { retry_after } = state.limiter.check(&claims.subject, Instant::now()) {
        tracing::info!("Rate limited client {} (retry after {:?})", claims.subject, retry_after);
        return Err(ApiError::RateLimited { retry_after });
    }

    let req: ExplainMatchRequest = serde_json::from_slice(body).map_err(|e| {
        tracing::info!("Malformed explain-match body from {}: {}", claims.subject, e);
        ApiError::Validation(format!("invalid request body: {}", e))
    })?;

    if let Err(errors) = req.validate() {
        tracing::info!("Validation failed for explain-match request: {}", errors);
        return Err(ApiError::Validation(errors.to_string()));
    }

    tracing::info!(
        "Explaining match for rfq {} (supplier {:?}, client {})",
        req.rfq_identifier,
        req.supplier_identifier,
        claims.subject
    );

    let raw = state.matcher.resolve_features(req.feature_overrides.as_ref());
    let explanation = state.matcher.explain_match(&raw)?;

    tracing::debug!(
        "Explained rfq {}: score {:.4}, baseline {:.4}, top feature {:?}",
        req.rfq_identifier,
        explanation.score,
        explanation.baseline,
        explanation.attributions.first().map(|a| &a.name)
    );

    Ok(HttpResponse::Ok().json(ExplainMatchResponse {
        request_id: uuid::Uuid::new_v4().to_string(),
        rfq_identifier: req.rfq_identifier,
        supplier_identifier: req.supplier_identifier,
        score: explanation.score,
        baseline: explanation.baseline,
        feature_importance: explanation.attributions.into_iter().map(Into::into).collect(),
        model_identifier: explanation.model_identifier,
    }))
}

/// Loaded model endpoint
///
/// GET /api/v1/model
async fn model_info(state: web::Data<AppState>, http_req: HttpRequest) -> Result<HttpResponse, ApiError> {
    let started = Instant::now();
    if let Err(e) = authorize(&state, &http_req) {
        if let Some(kind) = e.kind() {
            state.monitor.record_error(kind);
        }
        return Err(e);
    }

    let scorer = state.matcher.scorer();
    let response = HttpResponse::Ok().json(ModelInfoResponse {
        model_identifier: scorer.model_identifier().to_string(),
        baseline: scorer.baseline(),
        features: scorer.schema().descriptors().to_vec(),
    });
    state.monitor.record_success(started.elapsed());
    Ok(response)
}
