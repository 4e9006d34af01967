use actix_web::http::{header, StatusCode};
use actix_web::{HttpResponse, ResponseError};
use std::time::Duration;
use thiserror::Error;

use crate::core::{AuthError, ErrorKind, FeatureError, MatchError};
use crate::models::ErrorResponse;

/// Uniform client-facing message for every authentication failure
pub const AUTH_FAILED_MESSAGE: &str = "invalid or expired credentials";

/// Request failures as seen by the HTTP boundary
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Features(#[from] FeatureError),

    #[error("authentication failed: {0}")]
    Unauthorized(#[from] AuthError),

    #[error("missing bearer token")]
    MissingCredentials,

    #[error("rate limit exceeded, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("explanation failed: {0}")]
    Explanation(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<MatchError> for ApiError {
    fn from(err: MatchError) -> Self {
        match err {
            MatchError::Features(e) => ApiError::Features(e),
            MatchError::Scoring(e) => ApiError::Internal(e.to_string()),
            MatchError::Explain(e) => ApiError::Explanation(e.to_string()),
        }
    }
}

impl ApiError {
    /// Monitor category; `None` for admission-control outcomes
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            ApiError::Validation(_) | ApiError::Features(_) => Some(ErrorKind::SchemaMismatch),
            ApiError::Unauthorized(_) | ApiError::MissingCredentials => Some(ErrorKind::Unauthorized),
            ApiError::RateLimited { .. } => None,
            ApiError::Explanation(_) => Some(ErrorKind::ExplanationFailed),
            ApiError::Internal(_) => Some(ErrorKind::Internal),
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "validation_failed",
            ApiError::Features(FeatureError::SchemaMismatch { .. }) => "schema_mismatch",
            ApiError::Features(_) => "invalid_feature",
            ApiError::Unauthorized(_) | ApiError::MissingCredentials => "unauthorized",
            ApiError::RateLimited { .. } => "rate_limited",
            ApiError::Explanation(_) => "explanation_failed",
            ApiError::Internal(_) => "internal_error",
        }
    }

    /// Client-facing message; auth and server-side details stay in the logs
    fn public_message(&self) -> String {
        match self {
            ApiError::Unauthorized(_) | ApiError::MissingCredentials => AUTH_FAILED_MESSAGE.to_string(),
            ApiError::Explanation(_) | ApiError::Internal(_) => {
                "the match could not be explained".to_string()
            }
            ApiError::RateLimited { .. } => "rate limit exceeded".to_string(),
            other => other.to_string(),
        }
    }

    /// Whole seconds for the `Retry-After` header, rounded up
    pub fn retry_after_secs(retry_after: Duration) -> u64 {
        let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
        secs.max(1)
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::Features(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) | ApiError::MissingCredentials => StatusCode::UNAUTHORIZED,
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Explanation(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let mut builder = HttpResponse::build(status);

        match self {
            ApiError::RateLimited { retry_after } => {
                builder.insert_header((
                    header::RETRY_AFTER,
                    Self::retry_after_secs(*retry_after).to_string(),
                ));
            }
            ApiError::Unauthorized(_) | ApiError::MissingCredentials => {
                builder.insert_header((header::WWW_AUTHENTICATE, "Bearer"));
            }
            _ => {}
        }

        builder.json(ErrorResponse {
            error: self.error_code().to_string(),
            message: self.public_message(),
            status_code: status.as_u16(),
        })
    }
}
