//! Typed mapping from plugin identifier to [`PluginRecord`].

use std::collections::{BTreeMap, HashSet};

use {
    serde::{Deserialize, Serialize},
    tracing::{debug, info},
};

use crate::record::PluginRecord;

/// One entry of the host's installed-plugins listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledPlugin {
    pub id: String,
    pub version: String,
}

impl InstalledPlugin {
    pub fn new(id: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            version: version.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Registry {
    records: BTreeMap<String, PluginRecord>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bring the registry in line with what the host reports.
    ///
    /// Records for uninstalled plugins are dropped, new plugins get a fresh
    /// record, and existing records pick up version and activation changes.
    /// Returns whether anything changed; a second call with the same inputs
    /// returns `false`.
    pub fn reconcile(
        &mut self,
        host_version: &str,
        installed: &[InstalledPlugin],
        active_ids: &HashSet<String>,
        now: u64,
    ) -> bool {
        let installed_ids: HashSet<&str> = installed.iter().map(|p| p.id.as_str()).collect();
        let before = self.records.len();
        self.records.retain(|id, _| installed_ids.contains(id.as_str()));
        let mut changed = self.records.len() != before;
        if changed {
            debug!(removed = before - self.records.len(), "dropped uninstalled plugins");
        }

        for plugin in installed {
            let active = active_ids.contains(&plugin.id);
            match self.records.get_mut(&plugin.id) {
                Some(record) => {
                    if record.set_versions(&plugin.version, host_version) {
                        debug!(
                            plugin = %plugin.id,
                            version = %plugin.version,
                            host_version,
                            "plugin version changed"
                        );
                        changed = true;
                    }
                    changed |= record.set_active(active, now);
                },
                None => {
                    info!(
                        plugin = %plugin.id,
                        version = %plugin.version,
                        active,
                        "tracking new plugin"
                    );
                    self.records.insert(
                        plugin.id.clone(),
                        PluginRecord::new(&plugin.id, &plugin.version, host_version, active, now),
                    );
                    changed = true;
                },
            }
        }
        changed
    }

    /// Returns `false` for unknown plugins and for no-op transitions.
    pub fn set_active(&mut self, id: &str, active: bool, now: u64) -> bool {
        self.records
            .get_mut(id)
            .is_some_and(|record| record.set_active(active, now))
    }

    /// Returns `false` if the plugin is unknown.
    pub fn record_vote(
        &mut self,
        id: &str,
        host_version: &str,
        plugin_version: &str,
        compatible: bool,
    ) -> bool {
        match self.records.get_mut(id) {
            Some(record) => {
                record.set_vote(host_version, plugin_version, compatible);
                true
            },
            None => false,
        }
    }

    /// Forget every cached vote, e.g. after switching directory accounts.
    pub fn clear_all_votes(&mut self) {
        for record in self.records.values_mut() {
            record.votes = None;
        }
    }

    pub fn get(&self, id: &str) -> Option<&PluginRecord> {
        self.records.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut PluginRecord> {
        self.records.get_mut(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.records.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PluginRecord)> {
        self.records.iter().map(|(id, record)| (id.as_str(), record))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut PluginRecord)> {
        self.records
            .iter_mut()
            .map(|(id, record)| (id.as_str(), record))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
