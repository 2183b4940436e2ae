//! Persistence of the plugin registry under a single option key.

use std::sync::Arc;

use tracing::debug;

use crate::{
    Result,
    registry::Registry,
    store::{OptionStore, load_option, save_option},
};

pub const PLUGIN_LIST_KEY: &str = "compat_plugin_list";

/// The registry plus the store it came from. Loaded once on construction;
/// every save writes the whole registry.
pub struct PluginStorage {
    store: Arc<dyn OptionStore>,
    registry: Registry,
}

impl PluginStorage {
    pub async fn load(store: Arc<dyn OptionStore>) -> Result<Self> {
        let registry = load_option(store.as_ref(), PLUGIN_LIST_KEY)
            .await?
            .unwrap_or_default();
        Ok(Self { store, registry })
    }

    pub async fn save(&self) -> Result<()> {
        debug!(plugins = self.registry.len(), "saving plugin list");
        save_option(self.store.as_ref(), PLUGIN_LIST_KEY, &self.registry).await
    }

    pub async fn delete(&mut self) -> Result<()> {
        self.registry = Registry::default();
        self.store.delete(PLUGIN_LIST_KEY).await
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }
}
