use std::collections::BTreeMap;

use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

/// Votes cast by one account, keyed by host version then plugin version.
/// `true` means "works", `false` means "broken".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VoteTable(BTreeMap<String, BTreeMap<String, bool>>);

impl VoteTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, host_version: &str, plugin_version: &str) -> Option<bool> {
        self.0
            .get(host_version)
            .and_then(|row| row.get(plugin_version))
            .copied()
    }

    #[must_use]
    pub fn contains(&self, host_version: &str, plugin_version: &str) -> bool {
        self.get(host_version, plugin_version).is_some()
    }

    pub fn insert(&mut self, host_version: &str, plugin_version: &str, compatible: bool) {
        self.0
            .entry(host_version.to_string())
            .or_default()
            .insert(plugin_version.to_string(), compatible);
    }

    /// Register a host version row even if it carries no votes yet.
    pub fn ensure_host(&mut self, host_version: &str) {
        self.0.entry(host_version.to_string()).or_default();
    }

    /// Number of recorded votes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.values().map(BTreeMap::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Directory account credentials.
#[derive(Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    #[serde(serialize_with = "serialize_secret")]
    pub password: Secret<String>,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: Secret::new(password.into()),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Serialize a `Secret<String>` by exposing its inner value. Only used for
/// fields that must round-trip through the option store.
pub fn serialize_secret<S: serde::Serializer>(
    secret: &Secret<String>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

/// A single compatibility vote to submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteRequest {
    pub slug: String,
    pub plugin_version: String,
    pub host_version: String,
    pub compatible: bool,
    /// When false, an existing vote for the same version pair aborts the
    /// submission with [`crate::Error::AlreadyVoted`].
    pub allow_overwrite: bool,
}
