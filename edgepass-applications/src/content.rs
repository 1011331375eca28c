//! Tiered content listing with signed read grants

use crate::auth::TierResolver;
use chrono::{DateTime, Duration, SubsecRound, Utc};
use edgepass_core::performance::measure_async;
use edgepass_core::{
    ContentBoundaryConfig, ContentEntry, ContentObject, EdgepassError, EdgepassResult,
    GatewayConfig, ObjectLister, ReadGrant, ReadSigner, SigningFailurePolicy, Tier,
    DEFAULT_GRANT_EXPIRY_SECS,
};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{debug, info, warn};

const COMPONENT: &str = "content_gateway";

/// Lists everything visible to a tier and signs a read grant per object.
///
/// Listing is an eager snapshot: every prefix is fully drained before any
/// signing starts. Results keep listing order (Regular prefix first)
/// whatever the signing concurrency.
#[derive(Clone)]
pub struct ContentGateway {
    lister: Arc<dyn ObjectLister>,
    signer: Arc<dyn ReadSigner>,
    content: ContentBoundaryConfig,
    expires_secs: u64,
    failure_policy: SigningFailurePolicy,
    concurrency: usize,
}

impl std::fmt::Debug for ContentGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentGateway")
            .field("bucket", &self.content.bucket)
            .field("expires_secs", &self.expires_secs)
            .field("failure_policy", &self.failure_policy)
            .field("concurrency", &self.concurrency)
            .finish_non_exhaustive()
    }
}

impl ContentGateway {
    pub fn new(
        lister: Arc<dyn ObjectLister>,
        signer: Arc<dyn ReadSigner>,
        content: ContentBoundaryConfig,
    ) -> Self {
        Self {
            lister,
            signer,
            content,
            expires_secs: DEFAULT_GRANT_EXPIRY_SECS,
            failure_policy: SigningFailurePolicy::default(),
            concurrency: 1,
        }
    }

    pub fn with_expiry(mut self, expires_secs: u64) -> Self {
        self.expires_secs = expires_secs;
        self
    }

    pub fn with_gateway_config(mut self, gateway: &GatewayConfig) -> Self {
        self.failure_policy = gateway.signing_failure_policy;
        self.concurrency = gateway.signing_concurrency.max(1);
        self
    }

    pub fn with_failure_policy(mut self, policy: SigningFailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn failure_policy(&self) -> SigningFailurePolicy {
        self.failure_policy
    }

    /// `{name, url}` for every object visible to `tier`, grants expiring
    /// one configured horizon from now
    pub async fn list_accessible_content(&self, tier: Tier) -> EdgepassResult<Vec<ContentEntry>> {
        let expires_at = self.expiry_from(Utc::now().trunc_subsecs(0))?;
        measure_async(
            "list_accessible_content",
            self.list_accessible_content_until(tier, expires_at),
        )
        .await
    }

    fn expiry_from(&self, now: DateTime<Utc>) -> EdgepassResult<DateTime<Utc>> {
        i64::try_from(self.expires_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .and_then(|horizon| now.checked_add_signed(horizon))
            .ok_or_else(|| {
                EdgepassError::listing(
                    format!("grant expiry of {}s is out of range", self.expires_secs),
                    COMPONENT,
                    None::<std::io::Error>,
                )
                .in_operation("list_accessible_content")
            })
    }

    /// Same as [`Self::list_accessible_content`] with a fixed expiry
    pub async fn list_accessible_content_until(
        &self,
        tier: Tier,
        expires_at: DateTime<Utc>,
    ) -> EdgepassResult<Vec<ContentEntry>> {
        let objects = self.enumerate(tier).await?;
        let listed = objects.len();

        let signed = self.sign_all(objects, expires_at).await;

        let mut entries = Vec::with_capacity(listed);
        for (object, result) in signed {
            match result {
                Ok(grant) => entries.push(ContentEntry {
                    name: object.name().to_string(),
                    url: grant.url,
                }),
                Err(e) => match self.failure_policy {
                    SigningFailurePolicy::BestEffort => {
                        let e = e.in_operation("list_accessible_content");
                        warn!(
                            key = %object.key,
                            prefix = self.content.prefix_for(object.tier),
                            error_id = ?e.context().map(|c| c.error_id.as_str()),
                            error = %e,
                            "Omitting object whose read grant could not be signed"
                        );
                    }
                    SigningFailurePolicy::FailFast => {
                        let err = EdgepassError::listing(
                            format!("could not sign read grant for {}", object.key),
                            COMPONENT,
                            Some(e),
                        )
                        .in_operation("list_accessible_content");
                        return Err(err);
                    }
                },
            }
        }

        info!(
            %tier,
            listed,
            returned = entries.len(),
            omitted = listed - entries.len(),
            "Listed accessible content"
        );

        Ok(entries)
    }

    /// Snapshot of every object under the prefixes `tier` may see
    async fn enumerate(&self, tier: Tier) -> EdgepassResult<Vec<ContentObject>> {
        let mut objects = Vec::new();

        for (published, prefix) in TierResolver::visible_prefixes(tier, &self.content) {
            let keys = self.lister.list_all(prefix).await.map_err(|e| {
                match e {
                    EdgepassError::ListingFailure { .. } => e,
                    other => EdgepassError::listing(
                        format!("could not list {}", prefix),
                        COMPONENT,
                        Some(other),
                    ),
                }
                .in_operation("list_accessible_content")
            })?;

            debug!(prefix, count = keys.len(), "Enumerated prefix");

            objects.extend(
                keys.into_iter()
                    // `folder/` placeholders name no object
                    .filter(|key| !key.ends_with('/'))
                    // a key under a longer prefix belongs to that prefix's tier
                    .filter(|key| self.content.tier_of(key) == Some(published))
                    .map(|key| ContentObject::new(key, published)),
            );
        }

        Ok(objects)
    }

    async fn sign_all(
        &self,
        objects: Vec<ContentObject>,
        expires_at: DateTime<Utc>,
    ) -> Vec<(ContentObject, EdgepassResult<ReadGrant>)> {
        stream::iter(objects.into_iter().map(|object| {
            let signer = Arc::clone(&self.signer);
            async move {
                let key = object.key.clone();
                let result = tokio::task::spawn_blocking(move || signer.sign_read(&key, expires_at))
                    .await
                    .unwrap_or_else(|e| {
                        Err(EdgepassError::signing(
                            "signing task failed",
                            COMPONENT,
                            Some(e),
                        ))
                    });
                (object, result)
            }
        }))
        .buffered(self.concurrency)
        .collect()
        .await
    }
}
