//! Key/value option store the host would otherwise provide.

use {
    async_trait::async_trait,
    serde::{Serialize, de::DeserializeOwned},
    tracing::warn,
};

use crate::Result;

/// Persistence backend for named JSON values.
#[async_trait]
pub trait OptionStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>>;
    async fn set(&self, key: &str, value: serde_json::Value) -> Result<()>;
    /// Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;
}

/// Read `key` and decode it as `T`. A value that no longer decodes is
/// logged and treated as absent, so a schema change never wedges the service.
pub async fn load_option<T: DeserializeOwned>(
    store: &dyn OptionStore,
    key: &str,
) -> Result<Option<T>> {
    let Some(value) = store.get(key).await? else {
        return Ok(None);
    };
    match serde_json::from_value(value) {
        Ok(decoded) => Ok(Some(decoded)),
        Err(e) => {
            warn!(key, error = %e, "stored option failed to decode, ignoring it");
            Ok(None)
        },
    }
}

/// Encode `value` and write it whole under `key`.
pub async fn save_option<T: Serialize + Sync>(
    store: &dyn OptionStore,
    key: &str,
    value: &T,
) -> Result<()> {
    store.set(key, serde_json::to_value(value)?).await
}
