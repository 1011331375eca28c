//! Upload grant handlers

use super::types::{UploadGrantRequest, UploadGrantResponse};
use crate::{error::ApiError, extract::ApiJson, AppState, ErrorResponse};
use axum::{extract::State, response::Json};
use tracing::info;

/// Issue a presigned upload URL
#[utoipa::path(
    post,
    path = "/api/uploads/grant",
    tag = "Uploads",
    summary = "Issue upload grant",
    description = "Presign a single PUT of `filename` to the upload bucket. The URL expires after one hour and only accepts the returned content type.",
    request_body = UploadGrantRequest,
    responses(
        (status = 200, description = "Upload grant issued", body = UploadGrantResponse),
        (status = 400, description = "Missing or invalid filename", body = ErrorResponse),
        (status = 500, description = "Grant could not be issued", body = ErrorResponse)
    )
)]
pub async fn issue_upload_grant(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<UploadGrantRequest>,
) -> Result<Json<UploadGrantResponse>, ApiError> {
    let grant = state
        .application
        .issue_upload_grant(request.filename.as_deref(), request.content_type.as_deref())?;

    info!(key = %grant.key, "Upload grant issued");

    Ok(Json(grant.into()))
}
