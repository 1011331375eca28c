//! In-memory identity store
//!
//! Stands in for the deployment's user table. Seeded from configuration or
//! by tests; the verifier is stored opaquely and never checked here.

use async_trait::async_trait;
use edgepass_core::{EdgepassResult, IdentityStore, StoredIdentity, Tier};
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
pub struct MemoryIdentityStore {
    identities: RwLock<HashMap<String, StoredIdentity>>,
}

impl MemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed from `(username, password_verifier, tier)` tuples
    pub fn with_identities<I, U, V>(identities: I) -> Self
    where
        I: IntoIterator<Item = (U, V, Option<Tier>)>,
        U: Into<String>,
        V: Into<String>,
    {
        Self::from_records(identities.into_iter().map(|(username, verifier, tier)| {
            StoredIdentity {
                username: username.into(),
                password_verifier: verifier.into(),
                tier,
            }
        }))
    }

    pub fn from_records(records: impl IntoIterator<Item = StoredIdentity>) -> Self {
        let identities = records
            .into_iter()
            .map(|record| (record.username.clone(), record))
            .collect();

        Self {
            identities: RwLock::new(identities),
        }
    }

    /// Insert or replace a record, returning the previous one
    pub async fn upsert(&self, record: StoredIdentity) -> Option<StoredIdentity> {
        self.identities
            .write()
            .await
            .insert(record.username.clone(), record)
    }

    pub async fn len(&self) -> usize {
        self.identities.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.identities.read().await.is_empty()
    }
}

#[async_trait]
impl IdentityStore for MemoryIdentityStore {
    async fn lookup(&self, username: &str) -> EdgepassResult<Option<StoredIdentity>> {
        Ok(self.identities.read().await.get(username).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn looks_up_seeded_identities() {
        let store = MemoryIdentityStore::with_identities([
            ("alice", "v1", Some(Tier::Premium)),
            ("bob", "v2", Some(Tier::Regular)),
        ]);

        let alice = store.lookup("alice").await.unwrap().unwrap();
        assert_eq!(alice.tier, Some(Tier::Premium));
        assert_eq!(alice.password_verifier, "v1");
        assert!(store.lookup("carol").await.unwrap().is_none());
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn upsert_replaces_existing_records() {
        let store = MemoryIdentityStore::new();
        assert!(store.is_empty().await);

        let record = StoredIdentity {
            username: "alice".to_string(),
            password_verifier: String::new(),
            tier: Some(Tier::Regular),
        };
        assert!(store.upsert(record.clone()).await.is_none());

        let upgraded = StoredIdentity {
            tier: Some(Tier::Premium),
            ..record
        };
        let previous = store.upsert(upgraded).await.unwrap();
        assert_eq!(previous.tier, Some(Tier::Regular));
        assert_eq!(
            store.lookup("alice").await.unwrap().unwrap().tier,
            Some(Tier::Premium)
        );
    }
}
