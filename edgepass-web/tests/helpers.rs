//! Integration test helpers
//!
//! Spawns the full router (CORS, tracing, body limit) on a random port with
//! in-memory collaborators.

#![allow(dead_code)]

use edgepass_applications::{EdgepassApplication, MemoryIdentityStore};
use edgepass_core::{EdgepassConfig, Tier};
use edgepass_storage::{EdgeSigner, EdgeVerifier, MemoryObjectLister};
use edgepass_web::{EdgepassServer, WebConfig};
use rsa::RsaPrivateKey;
use std::sync::{Arc, LazyLock};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

pub const EDGE_DOMAIN: &str = "cdn.example.com";
pub const KEY_PAIR_ID: &str = "K2JCJMDEHXQW5F";

// Tracing is initialized once per test binary
static TRACING: LazyLock<()> = LazyLock::new(|| {
    let level = if std::env::var("TEST_LOG").is_ok() {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_test_writer()
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();
});

static TEST_KEY: LazyLock<RsaPrivateKey> = LazyLock::new(|| {
    let mut rng = rand::thread_rng();
    RsaPrivateKey::new(&mut rng, 1024).expect("generate test key")
});

/// A running server plus a client pointed at it
pub struct TestApp {
    pub address: String,
    pub api_client: reqwest::Client,
    pub lister: Arc<MemoryObjectLister>,
    shutdown: Option<oneshot::Sender<()>>,
}

impl Drop for TestApp {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}

impl TestApp {
    pub fn verifier(&self) -> EdgeVerifier {
        EdgeSigner::new(TEST_KEY.clone(), EDGE_DOMAIN, KEY_PAIR_ID).verifier()
    }

    pub async fn post_json<Body>(&self, path: &str, body: &Body) -> reqwest::Response
    where
        Body: serde::Serialize,
    {
        self.api_client
            .post(format!("{}{}", &self.address, path))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn post_as<Body>(&self, user: &str, path: &str, body: &Body) -> reqwest::Response
    where
        Body: serde::Serialize,
    {
        self.api_client
            .post(format!("{}{}", &self.address, path))
            .header("X-User-Id", user)
            .json(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.api_client
            .get(format!("{}{}", &self.address, path))
            .send()
            .await
            .expect("Failed to execute request.")
    }
}

fn test_config() -> EdgepassConfig {
    let mut config = EdgepassConfig::default();
    config.edge.domain = EDGE_DOMAIN.to_string();
    config.edge.key_pair_id = KEY_PAIR_ID.to_string();
    config.upload.access_key_id = "AKIDEXAMPLE".to_string();
    config.upload.secret_access_key = "wJalrXUtnFEMI".to_string();
    config
}

/// Start the app with the given content keys
pub async fn spawn_app(keys: &[&str]) -> TestApp {
    LazyLock::force(&TRACING);

    let lister = Arc::new(MemoryObjectLister::with_keys(2, keys.iter().copied()));
    let application = EdgepassApplication::builder(test_config())
        .identity_store(Arc::new(MemoryIdentityStore::with_identities([
            ("alice", "", Some(Tier::Premium)),
            ("bob", "", Some(Tier::Regular)),
        ])))
        .object_lister(lister.clone())
        .read_signer(Arc::new(EdgeSigner::new(
            TEST_KEY.clone(),
            EDGE_DOMAIN,
            KEY_PAIR_ID,
        )))
        .build()
        .expect("build application");

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let server = EdgepassServer::new(WebConfig::default(), application);
    tokio::spawn(async move {
        server
            .serve(listener, async move {
                let _ = shutdown_rx.await;
            })
            .await
            .expect("server error");
    });

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        api_client: reqwest::Client::new(),
        lister,
        shutdown: Some(shutdown_tx),
    }
}
