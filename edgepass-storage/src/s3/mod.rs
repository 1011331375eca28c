//! S3-compatible object storage boundary
//!
//! [`BucketAddress`] resolves bucket and object URLs, [`S3Presigner`] turns
//! them into SigV4 query-presigned requests and [`S3ObjectLister`] uses those
//! to enumerate a bucket.

mod list;
mod presign;

pub use list::{parse_list_response, S3ObjectLister};
pub use presign::{S3Presigner, MAX_PRESIGN_EXPIRY_SECS};

use edgepass_core::{EdgepassError, EdgepassResult, ErrorContext};
use url::{Host, Url};

/// Access key pair for SigV4 signing
#[derive(Clone, PartialEq, Eq)]
pub struct S3Credentials {
    access_key_id: String,
    secret_access_key: String,
}

impl S3Credentials {
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
        }
    }

    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }

    pub(crate) fn secret_access_key(&self) -> &str {
        &self.secret_access_key
    }

    pub fn is_complete(&self) -> bool {
        !self.access_key_id.is_empty() && !self.secret_access_key.is_empty()
    }
}

impl std::fmt::Debug for S3Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .finish()
    }
}

/// Endpoint, region and bucket of one S3 boundary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketAddress {
    bucket: String,
    region: String,
    endpoint: Url,
    path_style: bool,
}

impl BucketAddress {
    /// Resolve a bucket address.
    ///
    /// Without an explicit endpoint the regional AWS endpoint is used.
    /// Path-style addressing defaults on for IP and localhost endpoints,
    /// since `{bucket}.{host}` would not resolve there.
    pub fn new(
        bucket: impl Into<String>,
        region: impl Into<String>,
        endpoint: Option<&str>,
        path_style: Option<bool>,
    ) -> EdgepassResult<Self> {
        let bucket = bucket.into();
        let region = region.into();

        if bucket.is_empty() {
            return Err(edgepass_core::config_error!(
                "bucket name must not be empty",
                "bucket_address"
            ));
        }

        let endpoint = match endpoint {
            Some(endpoint) => endpoint.to_string(),
            None => format!("https://s3.{}.amazonaws.com", region),
        };
        let endpoint = Url::parse(&endpoint).map_err(|e| EdgepassError::Config {
            message: format!("Invalid S3 endpoint '{}': {}", endpoint, e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("bucket_address").with_operation("parse_endpoint"),
        })?;
        if endpoint.host_str().is_none() {
            return Err(edgepass_core::config_error!(
                "S3 endpoint has no host",
                "bucket_address"
            ));
        }

        let path_style = path_style.unwrap_or_else(|| is_path_style_default(&endpoint));

        Ok(Self {
            bucket,
            region,
            endpoint,
            path_style,
        })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn path_style(&self) -> bool {
        self.path_style
    }

    /// URL of the bucket root, used for listing
    pub fn bucket_url(&self) -> EdgepassResult<Url> {
        self.build_url("")
    }

    /// URL of one object; each key segment is percent-encoded, `/` is kept
    pub fn object_url(&self, key: &str) -> EdgepassResult<Url> {
        self.build_url(&encode_key_path(key))
    }

    fn build_url(&self, encoded_path: &str) -> EdgepassResult<Url> {
        let mut url = self.endpoint.clone();
        url.set_query(None);

        if self.path_style {
            url.set_path(&format!("/{}/{}", self.bucket, encoded_path));
        } else {
            let host = self.endpoint.host_str().unwrap_or_default();
            url.set_host(Some(&format!("{}.{}", self.bucket, host)))
                .map_err(|e| EdgepassError::Config {
                    message: format!("Invalid bucket host: {}", e),
                    source: Some(Box::new(e)),
                    context: ErrorContext::new("bucket_address").with_operation("build_url"),
                })?;
            url.set_path(&format!("/{}", encoded_path));
        }

        Ok(url)
    }
}

/// Percent-encode an object key for use as a URL path, keeping `/`
pub fn encode_key_path(key: &str) -> String {
    key.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// `host[:port]` as it must appear in the signed `host` header
pub(crate) fn host_header(url: &Url) -> EdgepassResult<String> {
    let host = url
        .host_str()
        .ok_or_else(|| edgepass_core::config_error!("URL missing host", "bucket_address"))?;

    Ok(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}

fn is_path_style_default(endpoint: &Url) -> bool {
    match endpoint.host() {
        Some(Host::Ipv4(_)) | Some(Host::Ipv6(_)) => true,
        Some(Host::Domain(domain)) => domain == "localhost",
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_virtual_hosted_urls_for_aws() {
        let address = BucketAddress::new("ase-uploads", "us-west-2", None, None).unwrap();
        assert!(!address.path_style());

        let url = address.object_url("avatar.png").unwrap();
        assert_eq!(
            url.as_str(),
            "https://ase-uploads.s3.us-west-2.amazonaws.com/avatar.png"
        );
    }

    #[test]
    fn builds_path_style_urls_for_local_endpoints() {
        let address =
            BucketAddress::new("ase-content", "us-east-1", Some("http://127.0.0.1:9000"), None)
                .unwrap();
        assert!(address.path_style());

        let url = address.object_url("regular/a b.png").unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:9000/ase-content/regular/a%20b.png");
        assert_eq!(host_header(&url).unwrap(), "127.0.0.1:9000");

        let url = address.bucket_url().unwrap();
        assert_eq!(url.path(), "/ase-content/");
    }

    #[test]
    fn encodes_reserved_characters_per_segment() {
        assert_eq!(encode_key_path("premium/a+b=c.png"), "premium/a%2Bb%3Dc.png");
        assert_eq!(encode_key_path("x/y/z"), "x/y/z");
    }

    #[test]
    fn rejects_bad_configuration() {
        assert!(BucketAddress::new("", "us-east-1", None, None).is_err());
        assert!(BucketAddress::new("b", "us-east-1", Some("not a url"), None).is_err());
    }

    #[test]
    fn debug_output_redacts_secret() {
        let creds = S3Credentials::new("AKIDEXAMPLE", "wJalrXUtnFEMI");
        let debug = format!("{:?}", creds);
        assert!(debug.contains("AKIDEXAMPLE"));
        assert!(!debug.contains("wJalrXUtnFEMI"));
    }
}
