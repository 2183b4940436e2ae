//! Config schema types (directory endpoints, poll schedule, storage, inventory).

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReporterConfig {
    pub directory: DirectoryConfig,
    pub poll: PollConfig,
    pub storage: StorageConfig,
    pub inventory: InventoryConfig,
}

/// Remote plugin directory endpoints and HTTP client settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectoryConfig {
    /// Scheme and host of the directory site, without a trailing slash.
    pub base_url: String,
    /// Path of the login form action.
    pub login_path: String,
    /// Path template of a plugin's directory page. `{slug}` is replaced by
    /// the percent-encoded plugin slug.
    pub plugin_page_path: String,
    /// Path sent as the `Referer` header on form posts.
    pub referer_path: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            base_url: "http://wordpress.org".into(),
            login_path: "/support/bb-login.php".into(),
            plugin_page_path: "/extend/plugins/{slug}/".into(),
            referer_path: "/extend/plugins/".into(),
            timeout_secs: 30,
            user_agent: concat!("compat-reporter/", env!("CARGO_PKG_VERSION")).into(),
        }
    }
}

impl DirectoryConfig {
    #[must_use]
    pub fn login_url(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), self.login_path)
    }

    #[must_use]
    pub fn referer_url(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), self.referer_path)
    }

    /// Build the directory page URL from an already percent-encoded slug.
    #[must_use]
    pub fn plugin_page_url(&self, encoded_slug: &str) -> String {
        format!(
            "{}{}",
            self.base_url.trim_end_matches('/'),
            self.plugin_page_path.replace("{slug}", encoded_slug)
        )
    }
}

/// Poll job timing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    /// Delay before the first run after the service starts. Defaults to 5 seconds.
    pub initial_delay_secs: u64,
    /// Interval between runs. Defaults to one day.
    pub interval_secs: u64,
    /// How long the in-progress marker survives a crashed run. Defaults to 10 minutes.
    pub marker_ttl_secs: u64,
    /// Delay before the run triggered by a settings change. Defaults to 10 seconds.
    pub settings_change_delay_secs: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            initial_delay_secs: 5,
            interval_secs: 24 * 60 * 60,
            marker_ttl_secs: 10 * 60,
            settings_change_delay_secs: 10,
        }
    }
}

/// Where the option store lives.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path of the JSON option store. Defaults to `<data_dir>/options.json`.
    pub path: Option<PathBuf>,
}

/// Where the installed-plugin inventory is read from.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InventoryConfig {
    /// Path of the inventory file. Defaults to `<data_dir>/inventory.toml`.
    pub path: Option<PathBuf>,
}
