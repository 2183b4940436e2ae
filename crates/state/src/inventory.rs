//! Where the host's installed plugins come from.

use std::{
    collections::HashSet,
    path::{Path, PathBuf},
    sync::RwLock,
};

use {
    async_trait::async_trait,
    serde::{Deserialize, Serialize},
    tracing::debug,
};

use crate::{Error, Result, registry::InstalledPlugin};

/// Snapshot of the host: its version and every installed plugin.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    pub host_version: String,
    #[serde(default)]
    pub plugins: Vec<InventoryPlugin>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryPlugin {
    /// Install path such as `akismet/akismet.php`.
    pub id: String,
    pub version: String,
    #[serde(default)]
    pub active: bool,
}

impl Inventory {
    pub fn installed(&self) -> Vec<InstalledPlugin> {
        self.plugins
            .iter()
            .map(|p| InstalledPlugin::new(p.id.clone(), p.version.clone()))
            .collect()
    }

    pub fn active_ids(&self) -> HashSet<String> {
        self.plugins
            .iter()
            .filter(|p| p.active)
            .map(|p| p.id.clone())
            .collect()
    }

    pub fn find(&self, id: &str) -> Option<&InventoryPlugin> {
        self.plugins.iter().find(|p| p.id == id)
    }
}

#[async_trait]
pub trait InventorySource: Send + Sync {
    async fn snapshot(&self) -> Result<Inventory>;
}

/// Reads the inventory from a TOML or JSON file on every snapshot, so edits
/// are picked up by the next run.
pub struct FileInventory {
    path: PathBuf,
}

impl FileInventory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl InventorySource for FileInventory {
    async fn snapshot(&self) -> Result<Inventory> {
        let raw = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            Error::message(format!(
                "failed to read inventory {}: {e}",
                self.path.display()
            ))
        })?;
        let inventory = parse_inventory(&self.path, &raw)?;
        debug!(
            path = %self.path.display(),
            host_version = %inventory.host_version,
            plugins = inventory.plugins.len(),
            "inventory loaded"
        );
        Ok(inventory)
    }
}

fn parse_inventory(path: &Path, raw: &str) -> Result<Inventory> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => Ok(serde_json::from_str(raw)?),
        Some("toml") | None => Ok(toml::from_str(raw)?),
        Some(other) => Err(Error::message(format!(
            "unsupported inventory format: .{other}"
        ))),
    }
}

/// In-memory inventory that can be changed between snapshots.
#[derive(Default)]
pub struct MemoryInventory {
    inventory: RwLock<Inventory>,
}

impl MemoryInventory {
    pub fn new(inventory: Inventory) -> Self {
        Self {
            inventory: RwLock::new(inventory),
        }
    }

    pub fn update(&self, f: impl FnOnce(&mut Inventory)) {
        let mut inventory = self.inventory.write().unwrap_or_else(|e| e.into_inner());
        f(&mut inventory);
    }
}

#[async_trait]
impl InventorySource for MemoryInventory {
    async fn snapshot(&self) -> Result<Inventory> {
        Ok(self
            .inventory
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone())
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, tempfile::TempDir};

    const TOML_INVENTORY: &str = r#"
host_version = "6.4.2"

[[plugins]]
id = "akismet/akismet.php"
version = "5.3"
active = true

[[plugins]]
id = "hello.php"
version = "1.7.2"
"#;

    #[tokio::test]
    async fn reads_toml_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("inventory.toml");
        std::fs::write(&path, TOML_INVENTORY).unwrap();

        let inventory = FileInventory::new(&path).snapshot().await.unwrap();
        assert_eq!(inventory.host_version, "6.4.2");
        assert_eq!(inventory.plugins.len(), 2);
        assert!(inventory.active_ids().contains("akismet/akismet.php"));
        assert!(!inventory.find("hello.php").unwrap().active);
        assert_eq!(inventory.installed()[1], InstalledPlugin::new("hello.php", "1.7.2"));
    }

    #[tokio::test]
    async fn reads_json_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("inventory.json");
        std::fs::write(
            &path,
            r#"{"host_version":"6.5","plugins":[{"id":"a/a.php","version":"1.0","active":true}]}"#,
        )
        .unwrap();

        let inventory = FileInventory::new(&path).snapshot().await.unwrap();
        assert_eq!(inventory.host_version, "6.5");
        assert_eq!(inventory.active_ids().len(), 1);
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let err = FileInventory::new(tmp.path().join("nope.toml"))
            .snapshot()
            .await
            .unwrap_err();
        assert!(err.to_string().contains("nope.toml"));
    }

    #[test]
    fn rejects_unknown_extension() {
        let err = parse_inventory(Path::new("inventory.ini"), "").unwrap_err();
        assert!(matches!(err, Error::Message { .. }));
    }

    #[tokio::test]
    async fn memory_inventory_reflects_updates() {
        let source = MemoryInventory::new(Inventory {
            host_version: "6.4".into(),
            plugins: Vec::new(),
        });
        source.update(|inv| {
            inv.plugins.push(InventoryPlugin {
                id: "a/a.php".into(),
                version: "1.0".into(),
                active: true,
            })
        });
        assert_eq!(source.snapshot().await.unwrap().plugins.len(), 1);
    }
}
