//! Canned-policy signed URLs for the content edge
//!
//! The edge verifies a URL by recomputing the RSA signature over the policy
//! document with the public key registered under `Key-Pair-Id`, then checks
//! the requested resource and the current time against the policy.

use crate::s3::encode_key_path;
use base64::{
    alphabet::Alphabet,
    engine::{general_purpose::PAD, GeneralPurpose},
    Engine,
};
use chrono::{DateTime, TimeZone, Utc};
use edgepass_core::{EdgeConfig, EdgepassError, EdgepassResult, ErrorContext, ReadGrant, ReadSigner};
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs1v15::{Signature, SigningKey, VerifyingKey};
use rsa::pkcs8::DecodePrivateKey;
use rsa::signature::{SignatureEncoding, Signer, Verifier};
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::path::Path;
use thiserror::Error;
use tracing::debug;
use url::Url;

const COMPONENT: &str = "edge_signer";

/// Single-statement canned policy; field order is significant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyDocument {
    #[serde(rename = "Statement")]
    statement: Vec<PolicyStatement>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct PolicyStatement {
    #[serde(rename = "Resource")]
    resource: String,
    #[serde(rename = "Condition")]
    condition: PolicyCondition,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct PolicyCondition {
    #[serde(rename = "DateLessThan")]
    date_less_than: EpochTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct EpochTime {
    #[serde(rename = "AWS:EpochTime")]
    epoch_time: i64,
}

impl PolicyDocument {
    pub fn new(resource: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            statement: vec![PolicyStatement {
                resource: resource.into(),
                condition: PolicyCondition {
                    date_less_than: EpochTime {
                        epoch_time: expires_at.timestamp(),
                    },
                },
            }],
        }
    }

    pub fn resource(&self) -> Option<&str> {
        self.statement.first().map(|s| s.resource.as_str())
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.statement.first().and_then(|s| {
            Utc.timestamp_opt(s.condition.date_less_than.epoch_time, 0)
                .single()
        })
    }

    /// Compact JSON, byte-for-byte what gets signed
    pub fn to_json(&self) -> EdgepassResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// `https://{domain}/{key}` with the key percent-encoded per segment
pub fn resource_url(domain: &str, key: &str) -> String {
    format!("https://{}/{}", domain, encode_key_path(key))
}

/// Standard base64 with `+` as `-` and `/` as `~`
const EDGE_ALPHABET: Alphabet =
    match Alphabet::new("ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-~") {
        Ok(alphabet) => alphabet,
        Err(_) => panic!("edge base64 alphabet is invalid"),
    };

const EDGE_ENGINE: GeneralPurpose = GeneralPurpose::new(&EDGE_ALPHABET, PAD);

/// Padding character the edge expects in place of `=`
const EDGE_PAD: char = '_';

/// Base64 with `+`, `=` and `/` swapped for characters that survive query strings
pub fn encode_edge_base64(bytes: &[u8]) -> String {
    let mut encoded = EDGE_ENGINE.encode(bytes);
    let unpadded = encoded.trim_end_matches('=').len();
    let padding = encoded.len() - unpadded;
    encoded.truncate(unpadded);
    encoded.extend(std::iter::repeat(EDGE_PAD).take(padding));
    encoded
}

pub fn decode_edge_base64(encoded: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let unpadded = encoded.trim_end_matches(EDGE_PAD);
    let padding = encoded.len() - unpadded.len();
    let mut padded = String::with_capacity(encoded.len());
    padded.push_str(unpadded);
    padded.extend(std::iter::repeat('=').take(padding));
    EDGE_ENGINE.decode(padded)
}

/// Signs read grants with an RSA private key registered at the edge
#[derive(Clone)]
pub struct EdgeSigner {
    domain: String,
    key_pair_id: String,
    signing_key: SigningKey<Sha256>,
    public_key: RsaPublicKey,
}

impl std::fmt::Debug for EdgeSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EdgeSigner")
            .field("domain", &self.domain)
            .field("key_pair_id", &self.key_pair_id)
            .finish_non_exhaustive()
    }
}

impl EdgeSigner {
    pub fn new(
        private_key: RsaPrivateKey,
        domain: impl Into<String>,
        key_pair_id: impl Into<String>,
    ) -> Self {
        let public_key = RsaPublicKey::from(&private_key);
        Self {
            domain: domain.into(),
            key_pair_id: key_pair_id.into(),
            signing_key: SigningKey::<Sha256>::new(private_key),
            public_key,
        }
    }

    /// Accepts PKCS#1 (`BEGIN RSA PRIVATE KEY`) or PKCS#8 (`BEGIN PRIVATE KEY`)
    pub fn from_pem(
        pem: &str,
        domain: impl Into<String>,
        key_pair_id: impl Into<String>,
    ) -> EdgepassResult<Self> {
        let private_key = RsaPrivateKey::from_pkcs1_pem(pem)
            .or_else(|_| RsaPrivateKey::from_pkcs8_pem(pem))
            .map_err(|e| EdgepassError::Config {
                message: "edge private key is not a PKCS#1 or PKCS#8 RSA PEM".to_string(),
                source: Some(Box::new(e)),
                context: ErrorContext::new(COMPONENT).with_operation("load_key"),
            })?;

        Ok(Self::new(private_key, domain, key_pair_id))
    }

    pub fn from_key_file(
        path: impl AsRef<Path>,
        domain: impl Into<String>,
        key_pair_id: impl Into<String>,
    ) -> EdgepassResult<Self> {
        let path = path.as_ref();
        let pem = std::fs::read_to_string(path).map_err(|e| EdgepassError::Config {
            message: format!("could not read edge private key {}", path.display()),
            source: Some(Box::new(e)),
            context: ErrorContext::new(COMPONENT).with_operation("load_key"),
        })?;

        Self::from_pem(&pem, domain, key_pair_id)
    }

    pub fn from_config(config: &EdgeConfig) -> EdgepassResult<Self> {
        Self::from_key_file(
            &config.private_key_path,
            config.domain.clone(),
            config.key_pair_id.clone(),
        )
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn key_pair_id(&self) -> &str {
        &self.key_pair_id
    }

    pub fn public_key(&self) -> &RsaPublicKey {
        &self.public_key
    }

    /// A verifier for URLs this signer produces
    pub fn verifier(&self) -> EdgeVerifier {
        EdgeVerifier::new(
            self.public_key.clone(),
            self.domain.clone(),
            self.key_pair_id.clone(),
        )
    }
}

impl ReadSigner for EdgeSigner {
    fn sign_read(&self, key: &str, expires_at: DateTime<Utc>) -> EdgepassResult<ReadGrant> {
        let resource = resource_url(&self.domain, key);
        let policy_document = PolicyDocument::new(resource.clone(), expires_at).to_json()?;

        let signature = self
            .signing_key
            .try_sign(policy_document.as_bytes())
            .map_err(|e| EdgepassError::signing("could not sign policy", COMPONENT, Some(e)))?;

        let signature = encode_edge_base64(&signature.to_bytes());
        let url = format!(
            "{}?Policy={}&Signature={}&Key-Pair-Id={}",
            resource,
            encode_edge_base64(policy_document.as_bytes()),
            signature,
            urlencoding::encode(&self.key_pair_id)
        );

        debug!(key, resource = %resource, expires_at = %expires_at, "Signed read grant");

        Ok(ReadGrant {
            object_key: key.to_string(),
            policy_document,
            signature,
            key_pair_id: self.key_pair_id.clone(),
            expires_at,
            url,
        })
    }
}

/// Why an edge URL would be refused
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerificationError {
    #[error("Not a URL: {0}")]
    InvalidUrl(String),

    #[error("Missing query parameter {0}")]
    MissingParameter(&'static str),

    #[error("{0} is not valid edge base64")]
    Encoding(&'static str),

    #[error("Signed for key pair {actual}, expected {expected}")]
    KeyPairMismatch { expected: String, actual: String },

    #[error("Signature does not match policy")]
    BadSignature,

    #[error("Malformed policy: {0}")]
    MalformedPolicy(String),

    #[error("Policy covers {policy}, URL requests {requested}")]
    ResourceMismatch { policy: String, requested: String },

    #[error("Policy expired at {0}")]
    Expired(DateTime<Utc>),
}

/// Checks signed URLs the way the edge does
#[derive(Debug, Clone)]
pub struct EdgeVerifier {
    domain: String,
    key_pair_id: String,
    verifying_key: VerifyingKey<Sha256>,
}

impl EdgeVerifier {
    pub fn new(
        public_key: RsaPublicKey,
        domain: impl Into<String>,
        key_pair_id: impl Into<String>,
    ) -> Self {
        Self {
            domain: domain.into(),
            key_pair_id: key_pair_id.into(),
            verifying_key: VerifyingKey::<Sha256>::new(public_key),
        }
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Verify `url` as of `now`, returning the policy it carries
    pub fn verify_url(
        &self,
        url: &str,
        now: DateTime<Utc>,
    ) -> Result<PolicyDocument, VerificationError> {
        let parsed = Url::parse(url).map_err(|e| VerificationError::InvalidUrl(e.to_string()))?;

        let param = |name: &'static str| {
            parsed
                .query_pairs()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.into_owned())
                .ok_or(VerificationError::MissingParameter(name))
        };
        let encoded_policy = param("Policy")?;
        let encoded_signature = param("Signature")?;
        let key_pair_id = param("Key-Pair-Id")?;

        if key_pair_id != self.key_pair_id {
            return Err(VerificationError::KeyPairMismatch {
                expected: self.key_pair_id.clone(),
                actual: key_pair_id,
            });
        }

        let policy_bytes = decode_edge_base64(&encoded_policy)
            .map_err(|_| VerificationError::Encoding("Policy"))?;
        let signature_bytes = decode_edge_base64(&encoded_signature)
            .map_err(|_| VerificationError::Encoding("Signature"))?;

        let signature = Signature::try_from(signature_bytes.as_slice())
            .map_err(|_| VerificationError::BadSignature)?;
        self.verifying_key
            .verify(&policy_bytes, &signature)
            .map_err(|_| VerificationError::BadSignature)?;

        let policy: PolicyDocument = serde_json::from_slice(&policy_bytes)
            .map_err(|e| VerificationError::MalformedPolicy(e.to_string()))?;
        let resource = policy
            .resource()
            .ok_or_else(|| VerificationError::MalformedPolicy("no statement".to_string()))?;
        let expires_at = policy
            .expires_at()
            .ok_or_else(|| VerificationError::MalformedPolicy("bad epoch time".to_string()))?;

        let mut requested = parsed.clone();
        requested.set_query(None);
        if requested.as_str() != resource
            || requested.host_str() != Some(self.domain.as_str())
        {
            return Err(VerificationError::ResourceMismatch {
                policy: resource.to_string(),
                requested: requested.to_string(),
            });
        }

        if now >= expires_at {
            return Err(VerificationError::Expired(expires_at));
        }

        Ok(policy)
    }
}
