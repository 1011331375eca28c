//! Upload grant issuance

use chrono::{DateTime, Duration, SubsecRound, Utc};
use edgepass_core::{
    EdgepassError, EdgepassResult, UploadAuthorizer, UploadBoundaryConfig, UploadGrant,
    DEFAULT_CONTENT_TYPE, DEFAULT_GRANT_EXPIRY_SECS,
};
use std::sync::Arc;
use tracing::{debug, info};

const COMPONENT: &str = "upload_issuer";

/// Longest object key the upload boundary accepts, in bytes
pub const MAX_OBJECT_NAME_BYTES: usize = 1024;

/// Issues single-object write grants against the upload boundary.
///
/// Issuance is stateless: the returned URL is the whole grant. No
/// uniqueness check is made, so a second upload under the same name
/// overwrites the first at the boundary.
#[derive(Clone)]
pub struct UploadIssuer {
    authorizer: Arc<dyn UploadAuthorizer>,
    expires_secs: u64,
    default_content_type: String,
}

impl std::fmt::Debug for UploadIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadIssuer")
            .field("bucket", &self.authorizer.bucket())
            .field("expires_secs", &self.expires_secs)
            .field("default_content_type", &self.default_content_type)
            .finish()
    }
}

impl UploadIssuer {
    pub fn new(authorizer: Arc<dyn UploadAuthorizer>) -> Self {
        Self {
            authorizer,
            expires_secs: DEFAULT_GRANT_EXPIRY_SECS,
            default_content_type: DEFAULT_CONTENT_TYPE.to_string(),
        }
    }

    pub fn from_config(authorizer: Arc<dyn UploadAuthorizer>, config: &UploadBoundaryConfig) -> Self {
        Self {
            authorizer,
            expires_secs: config.expires_secs,
            default_content_type: config.default_content_type.clone(),
        }
    }

    pub fn with_expiry(mut self, expires_secs: u64) -> Self {
        self.expires_secs = expires_secs;
        self
    }

    pub fn expires_secs(&self) -> u64 {
        self.expires_secs
    }

    /// Issue a grant for one PUT of `object_name`, valid from now
    pub fn issue(
        &self,
        object_name: Option<&str>,
        content_type: Option<&str>,
    ) -> EdgepassResult<UploadGrant> {
        self.issue_at(object_name, content_type, Utc::now().trunc_subsecs(0))
    }

    /// Issue a grant as of `issued_at`
    pub fn issue_at(
        &self,
        object_name: Option<&str>,
        content_type: Option<&str>,
        issued_at: DateTime<Utc>,
    ) -> EdgepassResult<UploadGrant> {
        let key = validate_object_name(object_name)?;
        let content_type = content_type
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(&self.default_content_type);

        let url = self
            .authorizer
            .authorize_put(key, content_type, issued_at, self.expires_secs)
            .map_err(|e| {
                match e {
                    EdgepassError::IssuanceFailure { .. } => e,
                    other => EdgepassError::issuance(
                        "could not authorize upload",
                        COMPONENT,
                        Some(other),
                    ),
                }
                .in_operation("issue_upload_grant")
            })?;

        let expires_at = i64::try_from(self.expires_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .and_then(|horizon| issued_at.checked_add_signed(horizon))
            .ok_or_else(|| {
                EdgepassError::issuance(
                    format!("grant expiry of {}s is out of range", self.expires_secs),
                    COMPONENT,
                    None::<std::io::Error>,
                )
                .in_operation("issue_upload_grant")
            })?;

        let location = &url[..url::Position::AfterPath];
        debug!(bucket = self.authorizer.bucket(), key, location, "Presigned upload URL");
        info!(bucket = self.authorizer.bucket(), key, content_type, %expires_at, "Issued upload grant");

        Ok(UploadGrant {
            bucket: self.authorizer.bucket().to_string(),
            key: key.to_string(),
            content_type: content_type.to_string(),
            url: url.to_string(),
            issued_at,
            expires_at,
        })
    }
}

/// Object names are used verbatim as keys; only emptiness and length are checked
fn validate_object_name(object_name: Option<&str>) -> EdgepassResult<&str> {
    let name = object_name.unwrap_or_default();

    if name.trim().is_empty() {
        return Err(EdgepassError::invalid_request(
            "Filename is required",
            Some("filename"),
            COMPONENT,
        ));
    }
    if name.len() > MAX_OBJECT_NAME_BYTES {
        return Err(EdgepassError::invalid_request(
            format!("Filename must be at most {} bytes", MAX_OBJECT_NAME_BYTES),
            Some("filename"),
            COMPONENT,
        ));
    }

    Ok(name)
}
