//! Request and response bodies

use chrono::{DateTime, Utc};
use edgepass_core::{ContentEntry, UploadGrant};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Health check response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    #[schema(example = "healthy")]
    pub status: String,
    pub timestamp: DateTime<Utc>,
    #[schema(example = "0.1.0")]
    pub version: String,
}

/// Upload grant request
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadGrantRequest {
    /// Object key to upload to, used verbatim
    #[schema(example = "avatar.png")]
    pub filename: Option<String>,
    /// Defaults to `application/octet-stream`
    #[schema(example = "image/png")]
    pub content_type: Option<String>,
}

/// Presigned upload grant
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadGrantResponse {
    #[schema(example = true)]
    pub success: bool,
    /// PUT here with exactly `contentType` before `expiresAt`
    pub url: String,
    #[schema(example = "avatar.png")]
    pub key: String,
    #[schema(example = "image/png")]
    pub content_type: String,
    pub expires_at: DateTime<Utc>,
}

impl From<UploadGrant> for UploadGrantResponse {
    fn from(grant: UploadGrant) -> Self {
        Self {
            success: true,
            url: grant.url,
            key: grant.key,
            content_type: grant.content_type,
            expires_at: grant.expires_at,
        }
    }
}

/// Content listing request
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ContentGrantsRequest {
    /// `Regular` or `Premium`, case-insensitive
    #[serde(alias = "accountType")]
    #[schema(example = "Regular")]
    pub tier: Option<String>,
}

/// One signed content file
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ContentFile {
    #[schema(example = "a.png")]
    pub name: String,
    /// Edge URL carrying `Policy`, `Signature` and `Key-Pair-Id`
    pub url: String,
}

impl From<ContentEntry> for ContentFile {
    fn from(entry: ContentEntry) -> Self {
        Self {
            name: entry.name,
            url: entry.url,
        }
    }
}

/// Signed content listing
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ContentGrantsResponse {
    #[schema(example = true)]
    pub success: bool,
    pub files: Vec<ContentFile>,
}
