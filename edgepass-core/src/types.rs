//! Core data type definitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Coarse access class deciding which content prefixes a grant may target.
///
/// Ordered so that `Premium > Regular`: a higher tier sees everything a
/// lower tier sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Tier {
    Regular,
    Premium,
}

impl Tier {
    /// Whether holders of this tier may see content published for `other`
    pub fn includes(&self, other: Tier) -> bool {
        *self >= other
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Regular => "Regular",
            Tier::Premium => "Premium",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "regular" => Ok(Tier::Regular),
            "premium" => Ok(Tier::Premium),
            _ => Err(format!("Unknown tier: {}", s)),
        }
    }
}

/// An already authenticated caller, as handed to us per request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub username: String,
    /// `None` for accounts the identity store knows but never tiered
    pub tier: Option<Tier>,
}

impl Identity {
    pub fn new(username: impl Into<String>, tier: Tier) -> Self {
        Self {
            username: username.into(),
            tier: Some(tier),
        }
    }
}

/// Identity store record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredIdentity {
    pub username: String,
    /// Opaque password verifier; never interpreted here
    #[serde(default)]
    pub password_verifier: String,
    pub tier: Option<Tier>,
}

impl StoredIdentity {
    pub fn identity(&self) -> Identity {
        Identity {
            username: self.username.clone(),
            tier: self.tier,
        }
    }
}

/// A time-boxed write authorization for exactly one object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadGrant {
    pub bucket: String,
    pub key: String,
    pub content_type: String,
    /// Presigned PUT URL; carries the whole authorization
    pub url: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// An object found under a tier prefix at listing time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentObject {
    pub key: String,
    pub tier: Tier,
}

impl ContentObject {
    pub fn new(key: impl Into<String>, tier: Tier) -> Self {
        Self {
            key: key.into(),
            tier,
        }
    }

    /// Final path segment of the key
    pub fn name(&self) -> &str {
        display_name(&self.key)
    }
}

/// Final path segment after the last `/`
pub fn display_name(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or(key)
}

/// A signed read authorization for one edge object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadGrant {
    pub object_key: String,
    /// Serialized policy document exactly as signed
    pub policy_document: String,
    /// Encoded signature over `policy_document`
    pub signature: String,
    pub key_pair_id: String,
    pub expires_at: DateTime<Utc>,
    /// Resource URL with `Policy`, `Signature` and `Key-Pair-Id` attached
    pub url: String,
}

/// One entry of a content listing response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentEntry {
    pub name: String,
    pub url: String,
}

/// One page of a boundary listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListPage {
    pub keys: Vec<String>,
    pub is_truncated: bool,
    pub next_continuation_token: Option<String>,
}

/// What to do when one object in a listing cannot be signed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SigningFailurePolicy {
    /// Drop the object, log it, keep going
    #[default]
    BestEffort,
    /// Fail the whole listing
    FailFast,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn premium_includes_regular() {
        assert!(Tier::Premium.includes(Tier::Regular));
        assert!(Tier::Premium.includes(Tier::Premium));
        assert!(Tier::Regular.includes(Tier::Regular));
        assert!(!Tier::Regular.includes(Tier::Premium));
    }

    #[test]
    fn tier_parses_case_insensitively() {
        assert_eq!("Premium".parse::<Tier>(), Ok(Tier::Premium));
        assert_eq!("regular".parse::<Tier>(), Ok(Tier::Regular));
        assert_eq!(" REGULAR ".parse::<Tier>(), Ok(Tier::Regular));
        assert!("gold".parse::<Tier>().is_err());
        assert!("".parse::<Tier>().is_err());
    }

    #[test]
    fn display_name_is_last_segment() {
        assert_eq!(display_name("regular/a.png"), "a.png");
        assert_eq!(display_name("premium/videos/intro.mp4"), "intro.mp4");
        assert_eq!(display_name("top.txt"), "top.txt");
        assert_eq!(ContentObject::new("regular/b.pdf", Tier::Regular).name(), "b.pdf");
    }
}
