//! JSON file-backed option store with atomic writes.

use std::{collections::BTreeMap, path::PathBuf};

use {
    async_trait::async_trait,
    tokio::{fs, sync::Mutex},
    tracing::debug,
};

use crate::{Result, store::OptionStore};

type Options = BTreeMap<String, serde_json::Value>;

/// All options in a single JSON object. The file holds the directory
/// password, so it is written with mode 0600.
pub struct FileOptionStore {
    path: PathBuf,
    /// Serializes read-modify-write cycles within this process.
    write_lock: Mutex<()>,
}

impl FileOptionStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    async fn load_all(&self) -> Result<Options> {
        if !fs::try_exists(&self.path).await.unwrap_or(false) {
            return Ok(Options::new());
        }
        let data = fs::read_to_string(&self.path).await?;
        if data.trim().is_empty() {
            return Ok(Options::new());
        }
        Ok(serde_json::from_str(&data)?)
    }

    /// Atomic write: write to temp, rename over target, keep `.bak`.
    async fn atomic_write(&self, options: &Options) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(options)?;
        let tmp = self.path.with_extension("json.tmp");

        fs::write(&tmp, json.as_bytes()).await?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o600)).await?;
        }

        if fs::try_exists(&self.path).await.unwrap_or(false) {
            let bak = self.path.with_extension("json.bak");
            let _ = fs::rename(&self.path, &bak).await;
        }

        fs::rename(&tmp, &self.path).await?;
        debug!(path = %self.path.display(), keys = options.len(), "options written");
        Ok(())
    }
}

#[async_trait]
impl OptionStore for FileOptionStore {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>> {
        let options = self.load_all().await?;
        Ok(options.get(key).cloned())
    }

    async fn set(&self, key: &str, value: serde_json::Value) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut options = self.load_all().await?;
        options.insert(key.to_string(), value);
        self.atomic_write(&options).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut options = self.load_all().await?;
        if options.remove(key).is_none() {
            return Ok(());
        }
        self.atomic_write(&options).await
    }
}
