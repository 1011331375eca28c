//! Identity to tier mapping

use edgepass_core::{
    ContentBoundaryConfig, EdgepassError, EdgepassResult, Identity, IdentityStore, Tier,
};
use std::sync::Arc;
use tracing::{debug, warn};

const COMPONENT: &str = "tier_resolver";

/// Resolves the tier a caller's grants are scoped to.
///
/// Missing or untiered identities are `Unauthorized`; they are never
/// quietly downgraded to `Regular`.
#[derive(Clone)]
pub struct TierResolver {
    store: Arc<dyn IdentityStore>,
}

impl std::fmt::Debug for TierResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TierResolver").finish_non_exhaustive()
    }
}

impl TierResolver {
    pub fn new(store: Arc<dyn IdentityStore>) -> Self {
        Self { store }
    }

    /// Tier of an already authenticated identity
    pub fn resolve(&self, identity: Option<&Identity>) -> EdgepassResult<Tier> {
        let identity = identity
            .ok_or_else(|| EdgepassError::unauthorized("Identity is required", COMPONENT))?;

        identity.tier.ok_or_else(|| {
            warn!(username = %identity.username, "Identity has no account tier");
            EdgepassError::unauthorized("Account has no tier", COMPONENT)
        })
    }

    /// Look `username` up in the identity store and resolve its tier
    pub async fn resolve_username(&self, username: &str) -> EdgepassResult<Tier> {
        let username = username.trim();
        if username.is_empty() {
            return Err(EdgepassError::unauthorized("Identity is required", COMPONENT));
        }

        let stored = self
            .store
            .lookup(username)
            .await
            .map_err(|e| e.in_operation("resolve_username"))?;

        let Some(stored) = stored else {
            debug!(username, "Unknown identity");
            return Err(EdgepassError::unauthorized("Unknown identity", COMPONENT));
        };

        self.resolve(Some(&stored.identity()))
    }

    /// Confirm `username` may act at `requested`; returns the requested tier
    pub async fn authorize(&self, username: &str, requested: Tier) -> EdgepassResult<Tier> {
        let actual = self.resolve_username(username).await?;

        if !actual.includes(requested) {
            warn!(username, %requested, %actual, "Requested tier exceeds account tier");
            return Err(EdgepassError::unauthorized(
                "Account tier does not permit this content",
                COMPONENT,
            ));
        }

        Ok(requested)
    }

    /// Parse a caller-supplied tier name; missing or unknown is `InvalidRequest`
    pub fn parse_tier(value: Option<&str>) -> EdgepassResult<Tier> {
        let value = value.map(str::trim).filter(|v| !v.is_empty()).ok_or_else(|| {
            EdgepassError::invalid_request("Account type is required", Some("tier"), COMPONENT)
        })?;

        value.parse::<Tier>().map_err(|_| {
            EdgepassError::invalid_request("Invalid account type", Some("tier"), COMPONENT)
        })
    }

    /// Prefixes visible to `tier`, Regular first
    pub fn visible_prefixes(tier: Tier, content: &ContentBoundaryConfig) -> Vec<(Tier, &str)> {
        [Tier::Regular, Tier::Premium]
            .into_iter()
            .filter(|published| tier.includes(*published))
            .map(|published| (published, content.prefix_for(published)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::MemoryIdentityStore;

    fn resolver() -> TierResolver {
        TierResolver::new(Arc::new(MemoryIdentityStore::with_identities([
            ("alice", "", Some(Tier::Premium)),
            ("bob", "", Some(Tier::Regular)),
            ("eve", "", None),
        ])))
    }

    #[test]
    fn resolves_identity_tier() {
        let identity = Identity::new("alice", Tier::Premium);
        assert_eq!(resolver().resolve(Some(&identity)).unwrap(), Tier::Premium);
    }

    #[test]
    fn missing_identity_is_unauthorized() {
        let err = resolver().resolve(None).unwrap_err();
        assert!(matches!(err, EdgepassError::Unauthorized { .. }));
        assert!(err.is_client_error());
    }

    #[test]
    fn untiered_identity_is_not_downgraded() {
        let identity = Identity {
            username: "eve".to_string(),
            tier: None,
        };
        let err = resolver().resolve(Some(&identity)).unwrap_err();
        assert!(matches!(err, EdgepassError::Unauthorized { .. }));
    }

    #[tokio::test]
    async fn resolves_usernames_through_the_store() {
        let resolver = resolver();
        assert_eq!(resolver.resolve_username("alice").await.unwrap(), Tier::Premium);
        assert_eq!(resolver.resolve_username("bob").await.unwrap(), Tier::Regular);

        for username in ["eve", "mallory", "  "] {
            let err = resolver.resolve_username(username).await.unwrap_err();
            assert!(matches!(err, EdgepassError::Unauthorized { .. }), "{}", username);
        }
    }

    #[tokio::test]
    async fn authorize_allows_equal_or_lower_tiers() {
        let resolver = resolver();
        assert_eq!(
            resolver.authorize("alice", Tier::Regular).await.unwrap(),
            Tier::Regular
        );
        assert_eq!(
            resolver.authorize("alice", Tier::Premium).await.unwrap(),
            Tier::Premium
        );

        let err = resolver.authorize("bob", Tier::Premium).await.unwrap_err();
        assert!(matches!(err, EdgepassError::Unauthorized { .. }));
    }

    #[test]
    fn parses_tier_names() {
        assert_eq!(TierResolver::parse_tier(Some("Regular")).unwrap(), Tier::Regular);
        assert_eq!(TierResolver::parse_tier(Some(" premium ")).unwrap(), Tier::Premium);

        for value in [None, Some(""), Some("   "), Some("Gold")] {
            let err = TierResolver::parse_tier(value).unwrap_err();
            assert!(matches!(err, EdgepassError::InvalidRequest { .. }), "{:?}", value);
        }
        assert_eq!(
            TierResolver::parse_tier(None).unwrap_err().public_message(),
            "Account type is required"
        );
    }

    #[test]
    fn premium_sees_both_prefixes_regular_first() {
        let content = ContentBoundaryConfig::default();

        assert_eq!(
            TierResolver::visible_prefixes(Tier::Regular, &content),
            vec![(Tier::Regular, "regular/")]
        );
        assert_eq!(
            TierResolver::visible_prefixes(Tier::Premium, &content),
            vec![(Tier::Regular, "regular/"), (Tier::Premium, "premium/")]
        );
    }
}
