//! Composition of the three components over one immutable configuration

use crate::auth::{MemoryIdentityStore, TierResolver};
use crate::content::ContentGateway;
use crate::upload::UploadIssuer;
use edgepass_core::{
    ContentEntry, EdgepassConfig, EdgepassResult, Identity, IdentityStore, ObjectLister,
    ReadSigner, Tier, UploadAuthorizer, UploadGrant,
};
use edgepass_storage::{EdgeSigner, HttpClientConfig, S3ObjectLister, S3Presigner};
use std::sync::Arc;
use tracing::info;

/// Main edgepass application service
#[derive(Debug, Clone)]
pub struct EdgepassApplication {
    config: Arc<EdgepassConfig>,
    tiers: TierResolver,
    uploads: UploadIssuer,
    content: ContentGateway,
}

/// Builder for [`EdgepassApplication`].
///
/// Collaborators left unset are built from the configuration: SigV4
/// presigning for uploads, `ListObjectsV2` for listing, the edge key file
/// for read signing and the seeded in-memory identity store.
pub struct EdgepassApplicationBuilder {
    config: EdgepassConfig,
    identity_store: Option<Arc<dyn IdentityStore>>,
    upload_authorizer: Option<Arc<dyn UploadAuthorizer>>,
    object_lister: Option<Arc<dyn ObjectLister>>,
    read_signer: Option<Arc<dyn ReadSigner>>,
    http: HttpClientConfig,
}

impl EdgepassApplicationBuilder {
    pub fn new(config: EdgepassConfig) -> Self {
        Self {
            config,
            identity_store: None,
            upload_authorizer: None,
            object_lister: None,
            read_signer: None,
            http: HttpClientConfig::default(),
        }
    }

    pub fn identity_store(mut self, store: Arc<dyn IdentityStore>) -> Self {
        self.identity_store = Some(store);
        self
    }

    pub fn upload_authorizer(mut self, authorizer: Arc<dyn UploadAuthorizer>) -> Self {
        self.upload_authorizer = Some(authorizer);
        self
    }

    pub fn object_lister(mut self, lister: Arc<dyn ObjectLister>) -> Self {
        self.object_lister = Some(lister);
        self
    }

    pub fn read_signer(mut self, signer: Arc<dyn ReadSigner>) -> Self {
        self.read_signer = Some(signer);
        self
    }

    /// HTTP settings for the production lister
    pub fn http_client(mut self, http: HttpClientConfig) -> Self {
        self.http = http;
        self
    }

    pub fn build(self) -> EdgepassResult<EdgepassApplication> {
        let config = self.config;

        let identity_store = match self.identity_store {
            Some(store) => store,
            None => Arc::new(MemoryIdentityStore::from_records(
                config.identities.iter().cloned(),
            )),
        };
        let upload_authorizer = match self.upload_authorizer {
            Some(authorizer) => authorizer,
            None => Arc::new(S3Presigner::from_upload_config(&config.upload)?),
        };
        let object_lister = match self.object_lister {
            Some(lister) => lister,
            None => Arc::new(S3ObjectLister::from_config(&config.content, &self.http)?),
        };
        let read_signer = match self.read_signer {
            Some(signer) => signer,
            None => Arc::new(EdgeSigner::from_config(&config.edge)?),
        };

        info!(
            upload_bucket = %config.upload.bucket,
            content_bucket = %config.content.bucket,
            edge_domain = %config.edge.domain,
            failure_policy = ?config.gateway.signing_failure_policy,
            "Edgepass application initialized"
        );

        Ok(EdgepassApplication::with_components(
            config,
            identity_store,
            upload_authorizer,
            object_lister,
            read_signer,
        ))
    }
}

impl EdgepassApplication {
    /// Build every collaborator from `config`
    pub fn from_config(config: EdgepassConfig) -> EdgepassResult<Self> {
        EdgepassApplicationBuilder::new(config).build()
    }

    pub fn builder(config: EdgepassConfig) -> EdgepassApplicationBuilder {
        EdgepassApplicationBuilder::new(config)
    }

    /// Compose the components from injected collaborators
    pub fn with_components(
        config: EdgepassConfig,
        identity_store: Arc<dyn IdentityStore>,
        upload_authorizer: Arc<dyn UploadAuthorizer>,
        object_lister: Arc<dyn ObjectLister>,
        read_signer: Arc<dyn ReadSigner>,
    ) -> Self {
        let tiers = TierResolver::new(identity_store);
        let uploads = UploadIssuer::from_config(upload_authorizer, &config.upload);
        let content = ContentGateway::new(object_lister, read_signer, config.content.clone())
            .with_expiry(config.edge.expires_secs)
            .with_gateway_config(&config.gateway);

        Self {
            config: Arc::new(config),
            tiers,
            uploads,
            content,
        }
    }

    pub fn config(&self) -> &EdgepassConfig {
        &self.config
    }

    pub fn tier_resolver(&self) -> &TierResolver {
        &self.tiers
    }

    pub fn issue_upload_grant(
        &self,
        object_name: Option<&str>,
        content_type: Option<&str>,
    ) -> EdgepassResult<UploadGrant> {
        self.uploads.issue(object_name, content_type)
    }

    pub async fn list_accessible_content(&self, tier: Tier) -> EdgepassResult<Vec<ContentEntry>> {
        self.content.list_accessible_content(tier).await
    }

    /// Listing for an already authenticated identity
    pub async fn list_for_identity(
        &self,
        identity: Option<&Identity>,
    ) -> EdgepassResult<Vec<ContentEntry>> {
        let tier = self.tiers.resolve(identity)?;
        self.content.list_accessible_content(tier).await
    }

    /// Listing for `username` as looked up in the identity store.
    ///
    /// With `requested`, the listing is scoped to that tier, which must not
    /// exceed the stored one; otherwise the stored tier is used.
    pub async fn list_for_user(
        &self,
        username: &str,
        requested: Option<Tier>,
    ) -> EdgepassResult<Vec<ContentEntry>> {
        let tier = match requested {
            Some(requested) => self.tiers.authorize(username, requested).await?,
            None => self.tiers.resolve_username(username).await?,
        };
        self.content.list_accessible_content(tier).await
    }
}
