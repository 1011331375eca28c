//! AWS Signature Version 4 query-string presigning

use super::{host_header, BucketAddress, S3Credentials};
use chrono::{DateTime, Utc};
use edgepass_core::{
    ContentBoundaryConfig, EdgepassError, EdgepassResult, UploadAuthorizer, UploadBoundaryConfig,
};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use url::Url;

/// SigV4 refuses presigned URLs valid for longer than seven days
pub const MAX_PRESIGN_EXPIRY_SECS: u64 = 604_800;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";
const UNSIGNED_PAYLOAD: &str = "UNSIGNED-PAYLOAD";
const SERVICE: &str = "s3";
const COMPONENT: &str = "s3_presigner";

/// Presigns requests against one bucket with a static key pair
#[derive(Debug, Clone)]
pub struct S3Presigner {
    address: BucketAddress,
    credentials: S3Credentials,
}

impl S3Presigner {
    pub fn new(address: BucketAddress, credentials: S3Credentials) -> Self {
        Self {
            address,
            credentials,
        }
    }

    /// Build a presigner for the upload boundary
    pub fn from_upload_config(config: &UploadBoundaryConfig) -> EdgepassResult<Self> {
        Self::from_parts(
            &config.bucket,
            &config.region,
            config.endpoint.as_deref(),
            config.path_style,
            &config.access_key_id,
            &config.secret_access_key,
        )
    }

    /// Build a presigner for the content boundary, used to sign listings
    pub fn from_content_config(config: &ContentBoundaryConfig) -> EdgepassResult<Self> {
        Self::from_parts(
            &config.bucket,
            &config.region,
            config.endpoint.as_deref(),
            config.path_style,
            &config.access_key_id,
            &config.secret_access_key,
        )
    }

    fn from_parts(
        bucket: &str,
        region: &str,
        endpoint: Option<&str>,
        path_style: Option<bool>,
        access_key_id: &str,
        secret_access_key: &str,
    ) -> EdgepassResult<Self> {
        let address = BucketAddress::new(bucket, region, endpoint, path_style)?;
        Ok(Self::new(
            address,
            S3Credentials::new(access_key_id, secret_access_key),
        ))
    }

    pub fn address(&self) -> &BucketAddress {
        &self.address
    }

    /// Presign a `GET` on the bucket root with extra query parameters
    pub fn presign_bucket_get(
        &self,
        params: &[(&str, &str)],
        issued_at: DateTime<Utc>,
        expires_in_secs: u64,
    ) -> EdgepassResult<Url> {
        let url = self.address.bucket_url()?;
        self.presign("GET", url, params, &[], issued_at, expires_in_secs)
    }

    /// Presign `method` on `url`.
    ///
    /// `headers` become signed headers alongside `host`; the client must send
    /// them with exactly these values.
    pub fn presign(
        &self,
        method: &str,
        url: Url,
        params: &[(&str, &str)],
        headers: &[(&str, &str)],
        issued_at: DateTime<Utc>,
        expires_in_secs: u64,
    ) -> EdgepassResult<Url> {
        if !self.credentials.is_complete() {
            return Err(EdgepassError::issuance(
                "boundary credentials are not configured",
                COMPONENT,
                None::<std::io::Error>,
            )
            .in_operation("presign"));
        }
        if expires_in_secs == 0 || expires_in_secs > MAX_PRESIGN_EXPIRY_SECS {
            return Err(EdgepassError::issuance(
                format!(
                    "expiry of {}s is outside 1..={}s",
                    expires_in_secs, MAX_PRESIGN_EXPIRY_SECS
                ),
                COMPONENT,
                None::<std::io::Error>,
            )
            .in_operation("presign"));
        }

        let timestamp = issued_at.format("%Y%m%dT%H%M%SZ").to_string();
        let date = &timestamp[0..8];
        let scope = format!("{}/{}/{}/aws4_request", date, self.address.region(), SERVICE);

        let mut signed_headers: Vec<(String, String)> =
            vec![("host".to_string(), host_header(&url)?)];
        for (name, value) in headers {
            signed_headers.push((name.to_lowercase(), value.trim().to_string()));
        }
        signed_headers.sort_by(|a, b| a.0.cmp(&b.0));

        let signed_header_names = signed_headers
            .iter()
            .map(|(name, _)| name.as_str())
            .collect::<Vec<_>>()
            .join(";");

        let mut query: Vec<(String, String)> = vec![
            ("X-Amz-Algorithm".into(), ALGORITHM.into()),
            ("X-Amz-Content-Sha256".into(), UNSIGNED_PAYLOAD.into()),
            (
                "X-Amz-Credential".into(),
                format!("{}/{}", self.credentials.access_key_id(), scope),
            ),
            ("X-Amz-Date".into(), timestamp.clone()),
            ("X-Amz-Expires".into(), expires_in_secs.to_string()),
            ("X-Amz-SignedHeaders".into(), signed_header_names.clone()),
        ];
        for (key, value) in params {
            query.push((key.to_string(), value.to_string()));
        }
        query.sort();

        let canonical_query = query
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");

        let canonical_headers = signed_headers
            .iter()
            .map(|(name, value)| format!("{}:{}\n", name, value))
            .collect::<String>();

        let canonical_request = format!(
            "{}\n{}\n{}\n{}\n{}\n{}",
            method,
            url.path(),
            canonical_query,
            canonical_headers,
            signed_header_names,
            UNSIGNED_PAYLOAD
        );

        let string_to_sign = format!(
            "{}\n{}\n{}\n{}",
            ALGORITHM,
            timestamp,
            scope,
            hex_encode(&Sha256::digest(canonical_request.as_bytes()))
        );

        let signing_key = derive_signing_key(
            self.credentials.secret_access_key(),
            date,
            self.address.region(),
        );
        let signature = hex_encode(&hmac_sha256(&signing_key, string_to_sign.as_bytes()));

        let mut url = url;
        url.set_query(Some(&format!(
            "{}&X-Amz-Signature={}",
            canonical_query, signature
        )));

        Ok(url)
    }
}

impl UploadAuthorizer for S3Presigner {
    fn bucket(&self) -> &str {
        self.address.bucket()
    }

    fn authorize_put(
        &self,
        key: &str,
        content_type: &str,
        issued_at: DateTime<Utc>,
        expires_in_secs: u64,
    ) -> EdgepassResult<Url> {
        let url = self.address.object_url(key).map_err(|e| {
            EdgepassError::issuance("could not build object URL", COMPONENT, Some(e))
        })?;

        self.presign(
            "PUT",
            url,
            &[],
            &[("content-type", content_type)],
            issued_at,
            expires_in_secs,
        )
    }
}

/// kSigning = HMAC(HMAC(HMAC(HMAC("AWS4" + secret, date), region), service), "aws4_request")
fn derive_signing_key(secret_key: &str, date: &str, region: &str) -> Vec<u8> {
    let date_key = hmac_sha256(format!("AWS4{}", secret_key).as_bytes(), date.as_bytes());
    let region_key = hmac_sha256(&date_key, region.as_bytes());
    let service_key = hmac_sha256(&region_key, SERVICE.as_bytes());
    hmac_sha256(&service_key, b"aws4_request")
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = Hmac::<Sha256>::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|byte| format!("{:02x}", byte)).collect()
}
