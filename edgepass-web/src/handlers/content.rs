//! Content grant handlers

use super::types::{ContentGrantsRequest, ContentGrantsResponse};
use crate::{auth::Caller, error::ApiError, extract::ApiJson, AppState, ErrorResponse};
use axum::{extract::State, response::Json};
use edgepass_applications::TierResolver;
use tracing::info;

/// List content visible to a tier with signed edge URLs
#[utoipa::path(
    post,
    path = "/api/content/grants",
    tag = "Content",
    summary = "Issue content grants",
    description = "List every object visible to `tier` and sign an expiring edge URL for each. Premium sees regular content first, then premium content. When `X-User-Id` is present the tier may not exceed the account's tier.",
    request_body = ContentGrantsRequest,
    params(
        ("X-User-Id" = Option<String>, Header, description = "Authenticated username forwarded by the proxy")
    ),
    responses(
        (status = 200, description = "Signed content listing", body = ContentGrantsResponse),
        (status = 400, description = "Missing or invalid tier", body = ErrorResponse),
        (status = 401, description = "Unknown account or tier above the account's", body = ErrorResponse),
        (status = 500, description = "Content could not be listed", body = ErrorResponse)
    )
)]
pub async fn issue_content_grants(
    State(state): State<AppState>,
    caller: Caller,
    ApiJson(request): ApiJson<ContentGrantsRequest>,
) -> Result<Json<ContentGrantsResponse>, ApiError> {
    let tier = TierResolver::parse_tier(request.tier.as_deref())?;

    let entries = match caller.username() {
        Some(username) => state.application.list_for_user(username, Some(tier)).await?,
        None => state.application.list_accessible_content(tier).await?,
    };

    info!(%tier, user = ?caller.username(), count = entries.len(), "Content grants issued");

    Ok(Json(ContentGrantsResponse {
        success: true,
        files: entries.into_iter().map(Into::into).collect(),
    }))
}
