// Model exports
pub mod requests;
pub mod responses;

pub use requests::ExplainMatchRequest;
pub use responses::{
    ErrorResponse, ExplainMatchResponse, FeatureImportance, HealthResponse, ModelInfoResponse,
};
