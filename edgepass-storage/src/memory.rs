//! In-process object listing for development and tests

use async_trait::async_trait;
use edgepass_core::{EdgepassError, EdgepassResult, ListPage, ObjectLister};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

/// Keys held in memory and listed in lexicographic order, paged like S3
#[derive(Debug)]
pub struct MemoryObjectLister {
    keys: RwLock<BTreeSet<String>>,
    page_size: usize,
    unavailable: AtomicBool,
}

impl Default for MemoryObjectLister {
    fn default() -> Self {
        Self::new(1000)
    }
}

impl MemoryObjectLister {
    pub fn new(page_size: usize) -> Self {
        Self {
            keys: RwLock::new(BTreeSet::new()),
            page_size: page_size.max(1),
            unavailable: AtomicBool::new(false),
        }
    }

    pub fn with_keys<I, S>(page_size: usize, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut lister = Self::new(page_size);
        lister.keys = RwLock::new(keys.into_iter().map(Into::into).collect());
        lister
    }

    pub async fn insert(&self, key: impl Into<String>) {
        self.keys.write().await.insert(key.into());
    }

    pub async fn remove(&self, key: &str) -> bool {
        self.keys.write().await.remove(key)
    }

    /// Make every subsequent listing fail until reset
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }
}

#[async_trait]
impl ObjectLister for MemoryObjectLister {
    async fn list_page(
        &self,
        prefix: &str,
        continuation_token: Option<&str>,
    ) -> EdgepassResult<ListPage> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(EdgepassError::listing(
                "object listing is unavailable",
                "memory_lister",
                None::<std::io::Error>,
            )
            .in_operation("list_page"));
        }

        let offset = match continuation_token {
            Some(token) => token.parse::<usize>().map_err(|e| {
                EdgepassError::listing("invalid continuation token", "memory_lister", Some(e))
                    .in_operation("list_page")
            })?,
            None => 0,
        };

        let keys = self.keys.read().await;
        let matching: Vec<&String> = keys.iter().filter(|k| k.starts_with(prefix)).collect();

        let end = (offset + self.page_size).min(matching.len());
        let page: Vec<String> = matching
            .get(offset..end)
            .unwrap_or_default()
            .iter()
            .map(|k| k.to_string())
            .collect();
        let is_truncated = end < matching.len();

        Ok(ListPage {
            keys: page,
            is_truncated,
            next_continuation_token: is_truncated.then(|| end.to_string()),
        })
    }
}
