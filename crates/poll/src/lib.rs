//! The reporter: reconciles installed plugins, pulls existing votes from the
//! directory and casts "works" votes once a plugin has survived its trial
//! period. [`PollScheduler`] runs it periodically.

pub mod error;
pub mod reporter;
pub mod service;
pub mod types;

pub use {
    error::{Error, Result},
    reporter::{DirectoryFactory, Reporter},
    service::PollScheduler,
    types::{ConfigureReport, PluginStatus, RunOutcome, RunReport, StatusReport},
};
