use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::{Error, Result, env_subst::substitute_env, schema::ReporterConfig};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "compat-reporter.toml",
    "compat-reporter.yaml",
    "compat-reporter.yml",
    "compat-reporter.json",
];

const APP_NAME: &str = "compat-reporter";

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> Result<ReporterConfig> {
    let raw = std::fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./compat-reporter.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/compat-reporter/compat-reporter.{toml,yaml,yml,json}` (user-global)
///
/// Returns `ReporterConfig::default()` if no config file is found or the
/// file cannot be parsed.
pub fn discover_and_load() -> ReporterConfig {
    if let Some(path) = find_config_file() {
        debug!(path = %path.display(), "loading config");
        match load_config(&path) {
            Ok(cfg) => return cfg,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            },
        }
    } else {
        debug!("no config file found, using defaults");
    }
    ReporterConfig::default()
}

fn find_config_file() -> Option<PathBuf> {
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }

    let config_dir = config_dir()?;
    CONFIG_FILENAMES
        .iter()
        .map(|name| config_dir.join(name))
        .find(|p| p.exists())
}

/// Returns the user-global config directory (`~/.config/compat-reporter/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", APP_NAME).map(|d| d.config_dir().to_path_buf())
}

/// Returns the data directory holding the option store and the default
/// inventory file. Falls back to `./.compat-reporter` when no home directory
/// can be determined.
pub fn data_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", APP_NAME)
        .map(|d| d.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".compat-reporter"))
}

impl ReporterConfig {
    /// Option store path, defaulting to `<data_dir>/options.json`.
    #[must_use]
    pub fn storage_path(&self) -> PathBuf {
        self.storage
            .path
            .clone()
            .unwrap_or_else(|| data_dir().join("options.json"))
    }

    /// Inventory path, defaulting to `<data_dir>/inventory.toml`.
    #[must_use]
    pub fn inventory_path(&self) -> PathBuf {
        self.inventory
            .path
            .clone()
            .unwrap_or_else(|| data_dir().join("inventory.toml"))
    }
}

fn parse_config(raw: &str, path: &Path) -> Result<ReporterConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        other => Err(Error::unsupported_format(other)),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("compat-reporter.toml");
        std::fs::write(
            &path,
            r#"
            [directory]
            base_url = "http://localhost:9999"

            [storage]
            path = "/tmp/compat/options.json"
            "#,
        )
        .unwrap();

        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.directory.base_url, "http://localhost:9999");
        assert_eq!(
            cfg.storage_path(),
            PathBuf::from("/tmp/compat/options.json")
        );
        assert_eq!(cfg.poll.interval_secs, 86_400);
    }

    #[test]
    fn loads_yaml_and_json() {
        let dir = tempfile::tempdir().unwrap();

        let yaml = dir.path().join("compat-reporter.yaml");
        std::fs::write(&yaml, "poll:\n  initial_delay_secs: 1\n").unwrap();
        assert_eq!(load_config(&yaml).unwrap().poll.initial_delay_secs, 1);

        let json = dir.path().join("compat-reporter.json");
        std::fs::write(&json, r#"{"poll": {"marker_ttl_secs": 60}}"#).unwrap();
        assert_eq!(load_config(&json).unwrap().poll.marker_ttl_secs, 60);
    }

    #[test]
    fn rejects_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("compat-reporter.ini");
        std::fs::write(&path, "").unwrap();
        let err = load_config(&path).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat { .. }));
    }

    #[test]
    fn missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, Error::Read { .. }));
    }
}
