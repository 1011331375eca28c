//! OpenAPI document for the edgepass API

use axum::response::Json;
use utoipa::OpenApi;

use crate::handlers::{
    ContentFile, ContentGrantsRequest, ContentGrantsResponse, HealthResponse, UploadGrantRequest,
    UploadGrantResponse,
};
use crate::ErrorResponse;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Edgepass API",
        version = "0.1.0",
        description = "Time-limited signed URLs for uploads and tiered content",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server")
    ),
    paths(
        crate::handlers::health_check,
        crate::handlers::issue_upload_grant,
        crate::handlers::issue_content_grants,
    ),
    components(
        schemas(
            HealthResponse,
            UploadGrantRequest,
            UploadGrantResponse,
            ContentGrantsRequest,
            ContentGrantsResponse,
            ContentFile,
            ErrorResponse,
        )
    ),
    tags(
        (name = "Health", description = "Health check endpoints"),
        (name = "Uploads", description = "Presigned upload grants"),
        (name = "Content", description = "Signed content listing"),
    )
)]
pub struct ApiDoc;

/// Serve the OpenAPI document
pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documents_every_grant_route() {
        let openapi = ApiDoc::openapi();
        assert_eq!(openapi.info.title, "Edgepass API");

        for path in ["/api/health", "/api/uploads/grant", "/api/content/grants"] {
            assert!(openapi.paths.paths.contains_key(path), "{}", path);
        }
    }

    #[test]
    fn serializes_to_json() {
        let json = ApiDoc::openapi().to_pretty_json().unwrap();
        assert!(json.contains("UploadGrantResponse"));
        assert!(json.contains("X-User-Id"));
    }
}
