//! `ListObjectsV2` enumeration of the content boundary

use super::S3Presigner;
use crate::client::{create_http_client, HttpClientConfig};
use async_trait::async_trait;
use chrono::Utc;
use edgepass_core::{
    ContentBoundaryConfig, EdgepassError, EdgepassResult, ListPage, ObjectLister,
};
use serde::Deserialize;
use tracing::debug;

const COMPONENT: &str = "s3_lister";

/// Listing requests are signed for this long; they are sent immediately.
const LIST_REQUEST_EXPIRY_SECS: u64 = 300;

#[derive(Debug, Deserialize)]
#[serde(rename = "ListBucketResult")]
struct ListBucketResult {
    #[serde(rename = "IsTruncated", default)]
    is_truncated: bool,
    #[serde(rename = "Contents", default)]
    contents: Vec<Contents>,
    #[serde(rename = "NextContinuationToken")]
    next_continuation_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Contents {
    #[serde(rename = "Key")]
    key: String,
}

/// `<Error>` body S3 returns for bucket-level failures
#[derive(Debug, Deserialize)]
#[serde(rename = "Error")]
struct S3ErrorBody {
    #[serde(rename = "Code")]
    code: String,
    #[serde(rename = "Message")]
    message: Option<String>,
}

/// Lists a bucket through presigned `GET ?list-type=2` requests
#[derive(Debug, Clone)]
pub struct S3ObjectLister {
    client: reqwest::Client,
    presigner: S3Presigner,
    page_size: u32,
}

impl S3ObjectLister {
    pub fn new(client: reqwest::Client, presigner: S3Presigner, page_size: u32) -> Self {
        Self {
            client,
            presigner,
            page_size: page_size.clamp(1, 1000),
        }
    }

    pub fn from_config(
        config: &ContentBoundaryConfig,
        http: &HttpClientConfig,
    ) -> EdgepassResult<Self> {
        let presigner = S3Presigner::from_content_config(config)?;
        let client = create_http_client(http)?;
        Ok(Self::new(client, presigner, config.page_size))
    }
}

#[async_trait]
impl ObjectLister for S3ObjectLister {
    async fn list_page(
        &self,
        prefix: &str,
        continuation_token: Option<&str>,
    ) -> EdgepassResult<ListPage> {
        let max_keys = self.page_size.to_string();
        let mut params = vec![
            ("list-type", "2"),
            ("max-keys", max_keys.as_str()),
            ("prefix", prefix),
        ];
        if let Some(token) = continuation_token {
            params.push(("continuation-token", token));
        }

        let url = self
            .presigner
            .presign_bucket_get(&params, Utc::now(), LIST_REQUEST_EXPIRY_SECS)
            .map_err(|e| {
                EdgepassError::listing("could not sign listing request", COMPONENT, Some(e))
                    .in_operation("list_page")
            })?;

        debug!(
            bucket = self.presigner.address().bucket(),
            prefix,
            continued = continuation_token.is_some(),
            "Listing objects"
        );

        let response = self.client.get(url).send().await.map_err(|e| {
            EdgepassError::listing("listing request failed", COMPONENT, Some(e))
                .in_operation("list_page")
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            EdgepassError::listing("could not read listing response", COMPONENT, Some(e))
                .in_operation("list_page")
        })?;

        if !status.is_success() {
            let detail = match quick_xml::de::from_str::<S3ErrorBody>(&body) {
                Ok(error) => format!("{}: {}", error.code, error.message.unwrap_or_default()),
                Err(_) => format!("HTTP {}", status),
            };
            return Err(EdgepassError::listing(
                format!("bucket rejected listing: {}", detail),
                COMPONENT,
                None::<std::io::Error>,
            )
            .in_operation("list_page"));
        }

        parse_list_response(&body)
    }
}

/// Parse a `ListObjectsV2` XML body.
///
/// `<Error>` documents and bodies without a `ListBucketResult` root are
/// listing failures; quick-xml would otherwise deserialize them as empty.
pub fn parse_list_response(xml: &str) -> EdgepassResult<ListPage> {
    if let Ok(error) = quick_xml::de::from_str::<S3ErrorBody>(xml) {
        return Err(EdgepassError::listing(
            format!("{}: {}", error.code, error.message.unwrap_or_default()),
            COMPONENT,
            None::<std::io::Error>,
        )
        .in_operation("parse_list_response"));
    }

    if !xml.contains("<ListBucketResult") {
        return Err(EdgepassError::listing(
            "unexpected listing response: missing ListBucketResult element",
            COMPONENT,
            None::<std::io::Error>,
        )
        .in_operation("parse_list_response"));
    }

    let result: ListBucketResult = quick_xml::de::from_str(xml).map_err(|e| {
        EdgepassError::listing("could not parse listing XML", COMPONENT, Some(e))
            .in_operation("parse_list_response")
    })?;

    Ok(ListPage {
        keys: result.contents.into_iter().map(|c| c.key).collect(),
        is_truncated: result.is_truncated,
        next_continuation_token: result.next_continuation_token,
    })
}
