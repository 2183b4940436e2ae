//! In-memory option store for tests and dry runs.

use std::{collections::HashMap, sync::Mutex};

use async_trait::async_trait;

use crate::{Result, store::OptionStore};

/// Option store backed by a `HashMap`. Nothing is persisted.
#[derive(Default)]
pub struct InMemoryOptionStore {
    options: Mutex<HashMap<String, serde_json::Value>>,
}

impl InMemoryOptionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn keys(&self) -> Vec<String> {
        let options = self.options.lock().unwrap_or_else(|e| e.into_inner());
        let mut keys: Vec<String> = options.keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl OptionStore for InMemoryOptionStore {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>> {
        let options = self.options.lock().unwrap_or_else(|e| e.into_inner());
        Ok(options.get(key).cloned())
    }

    async fn set(&self, key: &str, value: serde_json::Value) -> Result<()> {
        let mut options = self.options.lock().unwrap_or_else(|e| e.into_inner());
        options.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut options = self.options.lock().unwrap_or_else(|e| e.into_inner());
        options.remove(key);
        Ok(())
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, serde_json::json};

    #[tokio::test]
    async fn roundtrip_and_delete() {
        let store = InMemoryOptionStore::new();
        store.set("b", json!(2)).await.unwrap();
        store.set("a", json!(1)).await.unwrap();
        assert_eq!(store.keys(), vec!["a", "b"]);

        store.delete("a").await.unwrap();
        assert!(store.get("a").await.unwrap().is_none());
        assert_eq!(store.get("b").await.unwrap(), Some(json!(2)));
    }
}
