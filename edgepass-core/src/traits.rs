//! Collaborator traits the grant issuers are written against
//!
//! Production adapters live in `edgepass-storage`; tests inject fakes.

use crate::error::EdgepassResult;
use crate::types::*;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use url::Url;

/// Username to identity lookup, backed by whatever user table the deployment has
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Returns `None` for unknown usernames
    async fn lookup(&self, username: &str) -> EdgepassResult<Option<StoredIdentity>>;
}

/// Boundary-native time-boxed write authorization
pub trait UploadAuthorizer: Send + Sync {
    /// Bucket the authorizations target
    fn bucket(&self) -> &str;

    /// Produce a URL allowing one PUT of `key` with exactly `content_type`
    /// until `issued_at + expires_in_secs`.
    fn authorize_put(
        &self,
        key: &str,
        content_type: &str,
        issued_at: DateTime<Utc>,
        expires_in_secs: u64,
    ) -> EdgepassResult<Url>;
}

/// Enumeration of object keys under a prefix
#[async_trait]
pub trait ObjectLister: Send + Sync {
    /// Fetch one page of keys starting at `continuation_token`
    async fn list_page(
        &self,
        prefix: &str,
        continuation_token: Option<&str>,
    ) -> EdgepassResult<ListPage>;

    /// Drain every page into one snapshot, preserving listing order
    async fn list_all(&self, prefix: &str) -> EdgepassResult<Vec<String>> {
        let mut keys = Vec::new();
        let mut token: Option<String> = None;

        loop {
            let page = self.list_page(prefix, token.as_deref()).await?;
            keys.extend(page.keys);

            if !page.is_truncated {
                break;
            }

            match page.next_continuation_token {
                Some(next) if token.as_deref() == Some(next.as_str()) => {
                    return Err(crate::EdgepassError::listing(
                        format!("listing repeated continuation token {}", next),
                        "object_lister",
                        None::<std::io::Error>,
                    )
                    .in_operation("list_all"));
                }
                Some(next) => token = Some(next),
                None => {
                    return Err(crate::EdgepassError::listing(
                        "listing reported truncation without a continuation token",
                        "object_lister",
                        None::<std::io::Error>,
                    )
                    .in_operation("list_all"));
                }
            }
        }

        Ok(keys)
    }
}

/// Produces signed read authorizations for edge objects
pub trait ReadSigner: Send + Sync {
    fn sign_read(&self, key: &str, expires_at: DateTime<Utc>) -> EdgepassResult<ReadGrant>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct PagedLister {
        pages: Vec<ListPage>,
        calls: Mutex<Vec<Option<String>>>,
    }

    #[async_trait]
    impl ObjectLister for PagedLister {
        async fn list_page(
            &self,
            _prefix: &str,
            continuation_token: Option<&str>,
        ) -> EdgepassResult<ListPage> {
            let mut calls = self.calls.lock().unwrap();
            let index = calls.len();
            calls.push(continuation_token.map(str::to_string));
            Ok(self.pages[index].clone())
        }
    }

    #[tokio::test]
    async fn list_all_drains_every_page_in_order() {
        let lister = PagedLister {
            pages: vec![
                ListPage {
                    keys: vec!["p/1".into(), "p/2".into()],
                    is_truncated: true,
                    next_continuation_token: Some("t1".into()),
                },
                ListPage {
                    keys: vec!["p/3".into()],
                    is_truncated: false,
                    next_continuation_token: None,
                },
            ],
            calls: Mutex::new(Vec::new()),
        };

        let keys = lister.list_all("p/").await.unwrap();
        assert_eq!(keys, vec!["p/1", "p/2", "p/3"]);
        assert_eq!(
            *lister.calls.lock().unwrap(),
            vec![None, Some("t1".to_string())]
        );
    }

    #[tokio::test]
    async fn truncated_page_without_token_is_a_listing_failure() {
        let lister = PagedLister {
            pages: vec![ListPage {
                keys: vec!["p/1".into()],
                is_truncated: true,
                next_continuation_token: None,
            }],
            calls: Mutex::new(Vec::new()),
        };

        let err = lister.list_all("p/").await.unwrap_err();
        assert!(matches!(err, crate::EdgepassError::ListingFailure { .. }));
    }

    #[tokio::test]
    async fn repeated_continuation_token_is_a_listing_failure() {
        let stuck = ListPage {
            keys: vec!["p/1".into()],
            is_truncated: true,
            next_continuation_token: Some("t1".into()),
        };
        let lister = PagedLister {
            pages: vec![stuck.clone(), stuck.clone(), stuck],
            calls: Mutex::new(Vec::new()),
        };

        let err = lister.list_all("p/").await.unwrap_err();
        assert!(matches!(err, crate::EdgepassError::ListingFailure { .. }));
        assert_eq!(
            *lister.calls.lock().unwrap(),
            vec![None, Some("t1".to_string())]
        );
    }
}
