//! Configuration management
//!
//! Loaded once at startup (TOML file, environment, or both) and shared
//! read-only afterwards.

use crate::error::{EdgepassError, EdgepassResult, ErrorContext};
use crate::logging::LoggingConfig;
use crate::types::{SigningFailurePolicy, StoredIdentity, Tier};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Grants expire one hour after issuance
pub const DEFAULT_GRANT_EXPIRY_SECS: u64 = 3600;
/// Upper bound for any grant expiry; SigV4 refuses longer presigned URLs
pub const MAX_GRANT_EXPIRY_SECS: u64 = 604_800;
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";
pub const DEFAULT_REGION: &str = "us-east-1";

/// Top-level service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgepassConfig {
    pub upload: UploadBoundaryConfig,
    pub content: ContentBoundaryConfig,
    pub edge: EdgeConfig,
    pub gateway: GatewayConfig,
    pub logging: LoggingConfig,
    /// Seed records for the in-memory identity store
    pub identities: Vec<StoredIdentity>,
}

/// Private bucket receiving presigned uploads
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadBoundaryConfig {
    pub bucket: String,
    pub region: String,
    /// Custom S3-compatible endpoint; AWS when unset
    pub endpoint: Option<String>,
    pub access_key_id: String,
    pub secret_access_key: String,
    /// Force path-style URLs; derived from the endpoint when unset
    pub path_style: Option<bool>,
    pub expires_secs: u64,
    pub default_content_type: String,
}

impl Default for UploadBoundaryConfig {
    fn default() -> Self {
        Self {
            bucket: "ase-uploads".to_string(),
            region: DEFAULT_REGION.to_string(),
            endpoint: None,
            access_key_id: String::new(),
            secret_access_key: String::new(),
            path_style: None,
            expires_secs: DEFAULT_GRANT_EXPIRY_SECS,
            default_content_type: DEFAULT_CONTENT_TYPE.to_string(),
        }
    }
}

/// Bucket mirrored by the edge, enumerated per tier prefix
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentBoundaryConfig {
    pub bucket: String,
    pub region: String,
    pub endpoint: Option<String>,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub path_style: Option<bool>,
    pub regular_prefix: String,
    pub premium_prefix: String,
    /// `max-keys` per listing request
    pub page_size: u32,
}

impl Default for ContentBoundaryConfig {
    fn default() -> Self {
        Self {
            bucket: "ase-content".to_string(),
            region: DEFAULT_REGION.to_string(),
            endpoint: None,
            access_key_id: String::new(),
            secret_access_key: String::new(),
            path_style: None,
            regular_prefix: "regular/".to_string(),
            premium_prefix: "premium/".to_string(),
            page_size: 1000,
        }
    }
}

impl ContentBoundaryConfig {
    /// Prefix holding content published for `tier`
    pub fn prefix_for(&self, tier: Tier) -> &str {
        match tier {
            Tier::Regular => &self.regular_prefix,
            Tier::Premium => &self.premium_prefix,
        }
    }

    /// Tier owning `key`, by longest matching prefix
    pub fn tier_of(&self, key: &str) -> Option<Tier> {
        [Tier::Regular, Tier::Premium]
            .into_iter()
            .filter(|tier| key.starts_with(self.prefix_for(*tier)))
            .max_by_key(|tier| self.prefix_for(*tier).len())
    }
}

/// Content edge and its signing credential
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgeConfig {
    /// Bare host name, e.g. `d111111abcdef8.cloudfront.net`
    pub domain: String,
    /// Public key identifier the edge uses to verify signatures
    pub key_pair_id: String,
    /// PEM-encoded RSA private key
    pub private_key_path: PathBuf,
    pub expires_secs: u64,
}

impl Default for EdgeConfig {
    fn default() -> Self {
        Self {
            domain: String::new(),
            key_pair_id: String::new(),
            private_key_path: PathBuf::from("private_key.pem"),
            expires_secs: DEFAULT_GRANT_EXPIRY_SECS,
        }
    }
}

/// Listing behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub signing_failure_policy: SigningFailurePolicy,
    /// Objects signed in parallel per listing; 1 signs sequentially
    pub signing_concurrency: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            signing_failure_policy: SigningFailurePolicy::BestEffort,
            signing_concurrency: 1,
        }
    }
}

impl EdgepassConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> EdgepassResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| EdgepassError::Config {
            message: format!("Failed to read config file: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config").with_operation("read_file"),
        })?;

        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> EdgepassResult<Self> {
        toml::from_str(content).map_err(|e| EdgepassError::Config {
            message: format!("Failed to parse config: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config").with_operation("parse_toml"),
        })
    }

    /// Defaults overlaid with the process environment
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    /// Overlay values from the process environment
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Overlay values from any variable source
    pub fn apply_overrides<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let set = |target: &mut String, name: &str| {
            if let Some(value) = var(name).filter(|v| !v.is_empty()) {
                *target = value;
            }
        };

        set(&mut self.upload.bucket, "UPLOADS_BUCKET_NAME");
        set(&mut self.content.bucket, "CONTENT_BUCKET_NAME");
        set(&mut self.edge.domain, "CLOUDFRONT_DOMAIN");
        set(&mut self.edge.key_pair_id, "CLOUDFRONT_KEY_PAIR_ID");

        if let Some(path) = var("PRIVATE_KEY_PATH").filter(|v| !v.is_empty()) {
            self.edge.private_key_path = PathBuf::from(path);
        }

        for (region, access_key_id, secret, endpoint) in [
            (
                &mut self.upload.region,
                &mut self.upload.access_key_id,
                &mut self.upload.secret_access_key,
                &mut self.upload.endpoint,
            ),
            (
                &mut self.content.region,
                &mut self.content.access_key_id,
                &mut self.content.secret_access_key,
                &mut self.content.endpoint,
            ),
        ] {
            set(region, "AWS_REGION");
            set(access_key_id, "AWS_ACCESS_KEY_ID");
            set(secret, "AWS_SECRET_ACCESS_KEY");
            if let Some(value) = var("S3_ENDPOINT").filter(|v| !v.is_empty()) {
                *endpoint = Some(value);
            }
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> EdgepassResult<()> {
        if self.upload.bucket.trim().is_empty() {
            return Err(crate::config_error!("upload.bucket must not be empty", "config"));
        }
        if self.content.bucket.trim().is_empty() {
            return Err(crate::config_error!("content.bucket must not be empty", "config"));
        }
        if self.upload.region.trim().is_empty() || self.content.region.trim().is_empty() {
            return Err(crate::config_error!("region must not be empty", "config"));
        }
        for (name, expires_secs) in [
            ("upload.expires_secs", self.upload.expires_secs),
            ("edge.expires_secs", self.edge.expires_secs),
        ] {
            if expires_secs == 0 || expires_secs > MAX_GRANT_EXPIRY_SECS {
                return Err(crate::config_error!(
                    format!(
                        "{} must be between 1 and {}",
                        name, MAX_GRANT_EXPIRY_SECS
                    ),
                    "config"
                ));
            }
        }
        if self.edge.domain.trim().is_empty() {
            return Err(crate::config_error!("edge.domain must not be empty", "config"));
        }
        if self.edge.domain.contains("://") || self.edge.domain.contains('/') {
            return Err(crate::config_error!(
                "edge.domain must be a bare host name without scheme or path",
                "config"
            ));
        }
        if self.edge.key_pair_id.trim().is_empty() {
            return Err(crate::config_error!(
                "edge.key_pair_id must not be empty",
                "config"
            ));
        }
        for (name, prefix) in [
            ("content.regular_prefix", &self.content.regular_prefix),
            ("content.premium_prefix", &self.content.premium_prefix),
        ] {
            if prefix.is_empty() || !prefix.ends_with('/') {
                return Err(crate::config_error!(
                    format!("{} must be non-empty and end with '/'", name),
                    "config"
                ));
            }
        }
        let (regular, premium) = (&self.content.regular_prefix, &self.content.premium_prefix);
        if regular.starts_with(premium.as_str()) || premium.starts_with(regular.as_str()) {
            return Err(crate::config_error!(
                "regular and premium prefixes must not contain one another",
                "config"
            ));
        }
        if self.content.page_size == 0 {
            return Err(crate::config_error!(
                "content.page_size must be greater than 0",
                "config"
            ));
        }
        if self.gateway.signing_concurrency == 0 {
            return Err(crate::config_error!(
                "gateway.signing_concurrency must be greater than 0",
                "config"
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn valid() -> EdgepassConfig {
        let mut config = EdgepassConfig::default();
        config.edge.domain = "d111111abcdef8.cloudfront.net".to_string();
        config.edge.key_pair_id = "K2JCJMDEHXQW5F".to_string();
        config
    }

    #[test]
    fn defaults_follow_deployment_conventions() {
        let config = EdgepassConfig::default();
        assert_eq!(config.upload.bucket, "ase-uploads");
        assert_eq!(config.content.bucket, "ase-content");
        assert_eq!(config.upload.expires_secs, 3600);
        assert_eq!(config.edge.expires_secs, 3600);
        assert_eq!(config.upload.default_content_type, "application/octet-stream");
        assert_eq!(config.content.prefix_for(Tier::Regular), "regular/");
        assert_eq!(config.content.prefix_for(Tier::Premium), "premium/");
        assert_eq!(
            config.gateway.signing_failure_policy,
            SigningFailurePolicy::BestEffort
        );
    }

    #[test]
    fn validate_accepts_complete_config() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn validate_rejects_bad_edge_domain() {
        let mut config = valid();
        config.edge.domain = "https://cdn.example.com".to_string();
        assert!(config.validate().is_err());

        config.edge.domain = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_overlapping_or_unterminated_prefixes() {
        let mut config = valid();
        config.content.premium_prefix = "regular/".to_string();
        assert!(config.validate().is_err());

        let mut config = valid();
        config.content.regular_prefix = "regular".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_nested_prefixes() {
        let mut config = valid();
        config.content.regular_prefix = "content/".to_string();
        config.content.premium_prefix = "content/premium/".to_string();
        assert!(config.validate().is_err());

        let mut config = valid();
        config.content.regular_prefix = "media/regular/".to_string();
        config.content.premium_prefix = "media/".to_string();
        assert!(config.validate().is_err());

        let mut config = valid();
        config.content.regular_prefix = "media/regular/".to_string();
        config.content.premium_prefix = "media/premium/".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_bounds_grant_expiry() {
        let mut config = valid();
        config.edge.expires_secs = MAX_GRANT_EXPIRY_SECS;
        assert!(config.validate().is_ok());

        config.edge.expires_secs = 20_000_000_000_000;
        assert!(matches!(
            config.validate(),
            Err(EdgepassError::Config { .. })
        ));

        let mut config = valid();
        config.upload.expires_secs = MAX_GRANT_EXPIRY_SECS + 1;
        assert!(config.validate().is_err());

        config.upload.expires_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn keys_belong_to_the_longest_matching_prefix() {
        let content = ContentBoundaryConfig {
            regular_prefix: "content/".to_string(),
            premium_prefix: "content/premium/".to_string(),
            ..Default::default()
        };

        assert_eq!(content.tier_of("content/a.png"), Some(Tier::Regular));
        assert_eq!(
            content.tier_of("content/premium/secret.mp4"),
            Some(Tier::Premium)
        );
        assert_eq!(content.tier_of("elsewhere/x"), None);
    }

    #[test]
    fn validate_rejects_zero_concurrency() {
        let mut config = valid();
        config.gateway.signing_concurrency = 0;
        assert!(matches!(
            config.validate(),
            Err(EdgepassError::Config { .. })
        ));
    }

    #[test]
    fn overrides_apply_to_both_boundaries() {
        let vars: HashMap<&str, &str> = [
            ("UPLOADS_BUCKET_NAME", "my-uploads"),
            ("CONTENT_BUCKET_NAME", "my-content"),
            ("CLOUDFRONT_DOMAIN", "cdn.example.com"),
            ("CLOUDFRONT_KEY_PAIR_ID", "KPID"),
            ("PRIVATE_KEY_PATH", "/etc/edgepass/key.pem"),
            ("AWS_REGION", "us-west-2"),
            ("AWS_ACCESS_KEY_ID", "AKIDEXAMPLE"),
            ("AWS_SECRET_ACCESS_KEY", "secret"),
        ]
        .into_iter()
        .collect();

        let mut config = EdgepassConfig::default();
        config.apply_overrides(|name| vars.get(name).map(|v| v.to_string()));

        assert_eq!(config.upload.bucket, "my-uploads");
        assert_eq!(config.content.bucket, "my-content");
        assert_eq!(config.edge.domain, "cdn.example.com");
        assert_eq!(config.edge.key_pair_id, "KPID");
        assert_eq!(
            config.edge.private_key_path,
            PathBuf::from("/etc/edgepass/key.pem")
        );
        assert_eq!(config.upload.region, "us-west-2");
        assert_eq!(config.content.region, "us-west-2");
        assert_eq!(config.content.access_key_id, "AKIDEXAMPLE");
        assert!(config.upload.endpoint.is_none());
    }

    #[test]
    fn parses_partial_toml() {
        let config = EdgepassConfig::from_toml_str(
            r#"
            [edge]
            domain = "cdn.example.com"
            key_pair_id = "KPID"

            [gateway]
            signing_failure_policy = "fail_fast"
            signing_concurrency = 4
            "#,
        )
        .unwrap();

        assert_eq!(config.edge.domain, "cdn.example.com");
        assert_eq!(config.edge.expires_secs, 3600);
        assert_eq!(config.upload.bucket, "ase-uploads");
        assert_eq!(
            config.gateway.signing_failure_policy,
            SigningFailurePolicy::FailFast
        );
        assert_eq!(config.gateway.signing_concurrency, 4);
    }

    #[test]
    fn parses_seed_identities() {
        let config = EdgepassConfig::from_toml_str(
            r#"
            [[identities]]
            username = "alice"
            tier = "Premium"

            [[identities]]
            username = "bob"
            password_verifier = "$argon2id$..."
            tier = "Regular"
            "#,
        )
        .unwrap();

        assert_eq!(config.identities.len(), 2);
        assert_eq!(config.identities[0].tier, Some(Tier::Premium));
        assert!(config.identities[0].password_verifier.is_empty());
        assert_eq!(config.identities[1].username, "bob");
    }
}
