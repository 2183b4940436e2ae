//! Option values that expire on their own.

use std::sync::Arc;

use {
    serde::{Deserialize, Serialize, de::DeserializeOwned},
    tracing::debug,
};

use crate::{
    Result,
    store::{OptionStore, load_option, save_option},
};

#[derive(Debug, Serialize, Deserialize)]
struct Entry {
    value: serde_json::Value,
    expires_at: u64,
}

/// A single expiring value stored under a fixed key.
///
/// Expiry is checked on read against the caller's clock; an expired entry is
/// removed and reads as absent.
pub struct Transient {
    store: Arc<dyn OptionStore>,
    key: String,
}

impl Transient {
    pub fn new(store: Arc<dyn OptionStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    pub async fn get<T: DeserializeOwned>(&self, now: u64) -> Result<Option<T>> {
        let Some(entry) = load_option::<Entry>(self.store.as_ref(), &self.key).await? else {
            return Ok(None);
        };
        if entry.expires_at <= now {
            debug!(key = %self.key, expires_at = entry.expires_at, now, "transient expired");
            self.store.delete(&self.key).await?;
            return Ok(None);
        }
        Ok(serde_json::from_value(entry.value).ok())
    }

    pub async fn set<T: Serialize>(&self, value: &T, ttl_secs: u64, now: u64) -> Result<()> {
        let entry = Entry {
            value: serde_json::to_value(value)?,
            expires_at: now.saturating_add(ttl_secs),
        };
        save_option(self.store.as_ref(), &self.key, &entry).await
    }

    pub async fn delete(&self) -> Result<()> {
        self.store.delete(&self.key).await
    }
}
