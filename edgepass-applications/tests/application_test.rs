//! End-to-end flows through the application facade

use edgepass_applications::{EdgepassApplication, MemoryIdentityStore};
use edgepass_core::{EdgepassConfig, EdgepassError, Identity, StoredIdentity, Tier};
use edgepass_storage::{EdgeSigner, MemoryObjectLister};
use rsa::pkcs1::{EncodeRsaPrivateKey, LineEnding};
use rsa::RsaPrivateKey;
use std::sync::{Arc, LazyLock};

static TEST_KEY: LazyLock<RsaPrivateKey> = LazyLock::new(|| {
    let mut rng = rand::thread_rng();
    RsaPrivateKey::new(&mut rng, 1024).expect("generate test key")
});

fn config() -> EdgepassConfig {
    let mut config = EdgepassConfig::default();
    config.edge.domain = "cdn.example.com".to_string();
    config.edge.key_pair_id = "KPID".to_string();
    config.upload.access_key_id = "AKIDEXAMPLE".to_string();
    config.upload.secret_access_key = "wJalrXUtnFEMI".to_string();
    config.identities = vec![
        StoredIdentity {
            username: "alice".to_string(),
            password_verifier: String::new(),
            tier: Some(Tier::Premium),
        },
        StoredIdentity {
            username: "bob".to_string(),
            password_verifier: String::new(),
            tier: Some(Tier::Regular),
        },
    ];
    config
}

fn application() -> EdgepassApplication {
    let lister = MemoryObjectLister::with_keys(
        100,
        ["regular/a.png", "regular/b.png", "premium/p.mp4"],
    );

    EdgepassApplication::builder(config())
        .object_lister(Arc::new(lister))
        .read_signer(Arc::new(EdgeSigner::new(
            TEST_KEY.clone(),
            "cdn.example.com",
            "KPID",
        )))
        .build()
        .unwrap()
}

#[tokio::test]
async fn issues_sigv4_upload_grants_from_config() {
    let grant = application()
        .issue_upload_grant(Some("avatar.png"), None)
        .unwrap();

    assert_eq!(grant.key, "avatar.png");
    assert_eq!(grant.bucket, "ase-uploads");
    assert_eq!(grant.content_type, "application/octet-stream");
    assert_eq!((grant.expires_at - grant.issued_at).num_seconds(), 3600);
    assert!(grant
        .url
        .starts_with("https://ase-uploads.s3.us-east-1.amazonaws.com/avatar.png?"));
    assert!(grant.url.contains("X-Amz-SignedHeaders=content-type%3Bhost"));
    assert!(grant.url.contains("X-Amz-Expires=3600"));
}

#[tokio::test]
async fn upload_without_credentials_is_an_issuance_failure() {
    let mut config = config();
    config.upload.access_key_id.clear();
    let app = EdgepassApplication::builder(config)
        .object_lister(Arc::new(MemoryObjectLister::default()))
        .read_signer(Arc::new(EdgeSigner::new(TEST_KEY.clone(), "cdn.example.com", "KPID")))
        .build()
        .unwrap();

    let err = app.issue_upload_grant(Some("a.png"), None).unwrap_err();
    assert!(matches!(err, EdgepassError::IssuanceFailure { .. }));
}

#[tokio::test]
async fn premium_listing_is_a_superset_of_regular() {
    let app = application();

    let regular = app.list_accessible_content(Tier::Regular).await.unwrap();
    let premium = app.list_accessible_content(Tier::Premium).await.unwrap();

    assert_eq!(regular.len(), 2);
    assert_eq!(premium.len(), 3);
    for entry in &regular {
        assert!(premium.iter().any(|p| p.name == entry.name));
    }
    assert_eq!(premium.last().unwrap().name, "p.mp4");
}

#[tokio::test]
async fn lists_for_identities_and_users() {
    let app = application();

    let entries = app
        .list_for_identity(Some(&Identity::new("carol", Tier::Regular)))
        .await
        .unwrap();
    assert_eq!(entries.len(), 2);

    assert!(matches!(
        app.list_for_identity(None).await.unwrap_err(),
        EdgepassError::Unauthorized { .. }
    ));

    assert_eq!(app.list_for_user("alice", None).await.unwrap().len(), 3);
    assert_eq!(
        app.list_for_user("alice", Some(Tier::Regular))
            .await
            .unwrap()
            .len(),
        2
    );
    assert!(matches!(
        app.list_for_user("bob", Some(Tier::Premium)).await.unwrap_err(),
        EdgepassError::Unauthorized { .. }
    ));
    assert!(matches!(
        app.list_for_user("nobody", None).await.unwrap_err(),
        EdgepassError::Unauthorized { .. }
    ));
}

#[tokio::test]
async fn injected_identity_store_replaces_seeded_one() {
    let store = MemoryIdentityStore::with_identities([("zed", "", Some(Tier::Premium))]);
    let app = EdgepassApplication::builder(config())
        .identity_store(Arc::new(store))
        .object_lister(Arc::new(MemoryObjectLister::default()))
        .read_signer(Arc::new(EdgeSigner::new(TEST_KEY.clone(), "cdn.example.com", "KPID")))
        .build()
        .unwrap();

    assert_eq!(
        app.tier_resolver().resolve_username("zed").await.unwrap(),
        Tier::Premium
    );
    assert!(app.tier_resolver().resolve_username("alice").await.is_err());
}

#[tokio::test]
async fn from_config_loads_the_edge_key_file() {
    let dir = tempfile::tempdir().unwrap();
    let key_path = dir.path().join("private_key.pem");
    std::fs::write(
        &key_path,
        TEST_KEY.to_pkcs1_pem(LineEnding::LF).unwrap().as_bytes(),
    )
    .unwrap();

    let mut config = config();
    config.edge.private_key_path = key_path;
    let app = EdgepassApplication::from_config(config).unwrap();
    assert_eq!(app.config().edge.domain, "cdn.example.com");

    let mut missing = self::config();
    missing.edge.private_key_path = dir.path().join("absent.pem");
    assert!(matches!(
        EdgepassApplication::from_config(missing).unwrap_err(),
        EdgepassError::Config { .. }
    ));
}
