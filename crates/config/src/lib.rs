//! Configuration loading for the compatibility reporter.
//!
//! Config files: `compat-reporter.toml`, `compat-reporter.yaml`, or `compat-reporter.json`
//! Searched in `./` then `~/.config/compat-reporter/`.
//!
//! Supports `${ENV_VAR}` substitution in all string values.

pub mod env_subst;
pub mod error;
pub mod loader;
pub mod schema;

pub use {
    error::{Error, Result},
    loader::{config_dir, data_dir, discover_and_load, load_config},
    schema::{DirectoryConfig, InventoryConfig, PollConfig, ReporterConfig, StorageConfig},
};
