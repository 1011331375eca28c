//! Route definitions

use crate::{handlers, openapi, AppState};
use axum::{
    routing::{get, post},
    Router,
};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Grants
        .route("/uploads/grant", post(handlers::issue_upload_grant))
        .route("/content/grants", post(handlers::issue_content_grants))
        // Paths the first browser client was written against
        .route("/get-presigned-url", post(handlers::issue_upload_grant))
        .route("/get-signed-urls", post(handlers::issue_content_grants))
        // Documentation
        .route("/openapi.json", get(openapi::openapi_json))
}
