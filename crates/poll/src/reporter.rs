//! One poll run plus the user-facing operations around it.

use std::sync::Arc;

use {
    compat_config::PollConfig,
    compat_directory::{
        CompatibilityDirectory, Credentials, Error as DirectoryError, VoteRequest,
    },
    compat_state::{
        Clock, ErrorInfo, InventorySource, OptionStore, PluginRecord, PluginStorage,
        SettingsStore, SettingsUpdate, Transient, ValidationMessage,
    },
    tokio::sync::Mutex,
    tracing::{debug, info, warn},
};

use crate::{
    Error, Result,
    types::{ConfigureReport, PluginStatus, RunOutcome, RunReport, StatusReport},
};

/// Transient key holding the start time of the run in progress.
pub const RUN_MARKER_KEY: &str = "compat_poll_started_at";

/// Builds a directory client for the given account.
pub type DirectoryFactory = Arc<
    dyn Fn(Option<Credentials>) -> compat_directory::Result<Arc<dyn CompatibilityDirectory>>
        + Send
        + Sync,
>;

pub struct Reporter {
    store: Arc<dyn OptionStore>,
    inventory: Arc<dyn InventorySource>,
    directory: DirectoryFactory,
    clock: Arc<dyn Clock>,
    marker_ttl_secs: u64,
    /// Serializes read-modify-write of the stored registry within this process.
    state_lock: Mutex<()>,
}

impl Reporter {
    pub fn new(
        store: Arc<dyn OptionStore>,
        inventory: Arc<dyn InventorySource>,
        directory: DirectoryFactory,
        clock: Arc<dyn Clock>,
        config: &PollConfig,
    ) -> Self {
        Self {
            store,
            inventory,
            directory,
            clock,
            marker_ttl_secs: config.marker_ttl_secs,
            state_lock: Mutex::new(()),
        }
    }

    fn run_marker(&self) -> Transient {
        Transient::new(Arc::clone(&self.store), RUN_MARKER_KEY)
    }

    /// Run one poll: reconcile, refresh stale directory data, auto-vote.
    ///
    /// At most one run proceeds at a time across processes sharing the store;
    /// the marker expires on its own if a run dies without clearing it.
    pub async fn check_and_vote(&self) -> Result<RunOutcome> {
        let now = self.clock.now();
        let marker = self.run_marker();
        if let Some(started_at) = marker.get::<u64>(now).await? {
            info!(started_at, "poll already in progress, skipping");
            return Ok(RunOutcome::AlreadyRunning { started_at });
        }
        marker.set(&now, self.marker_ttl_secs, now).await?;

        let outcome = self.poll(now).await;

        if let Err(e) = marker.delete().await {
            warn!(error = %e, "failed to clear poll marker");
        }
        outcome
    }

    async fn poll(&self, now: u64) -> Result<RunOutcome> {
        let _guard = self.state_lock.lock().await;
        let settings = SettingsStore::load(Arc::clone(&self.store)).await?.get().clone();
        let inventory = self.inventory.snapshot().await?;
        let mut plugins = PluginStorage::load(Arc::clone(&self.store)).await?;

        let changed = plugins.registry_mut().reconcile(
            &inventory.host_version,
            &inventory.installed(),
            &inventory.active_ids(),
            now,
        );
        debug!(changed, plugins = plugins.registry().len(), "registry reconciled");

        let Some(credentials) = settings.credentials.clone() else {
            plugins.save().await?;
            info!("no directory account configured, skipping directory checks");
            return Ok(RunOutcome::NoCredentials);
        };
        let directory = match (self.directory)(Some(credentials)) {
            Ok(directory) => directory,
            Err(e) => {
                plugins.save().await?;
                return Err(e.into());
            },
        };

        let mut report = RunReport::default();
        for (id, record) in plugins.registry_mut().iter_mut() {
            if needs_refresh(record, settings.check_period, now) {
                report.checked += 1;
                if let Err(e) = refresh_directory_data(record, directory.as_ref(), now).await {
                    report.errors += 1;
                    warn!(
                        plugin = %id,
                        slug = %record.slug,
                        code = e.code(),
                        error = %e,
                        "directory refresh failed"
                    );
                    continue;
                }
            }

            if !should_auto_vote(record, settings.trial_period, now) {
                continue;
            }
            match auto_vote(record, directory.as_ref()).await {
                Ok(true) => {
                    report.voted += 1;
                    info!(
                        plugin = %id,
                        slug = %record.slug,
                        version = %record.version(),
                        host_version = %record.host_version(),
                        "reported plugin as compatible"
                    );
                },
                Ok(false) => {
                    debug!(plugin = %id, "vote already on record, cached votes updated");
                },
                Err(e) => {
                    report.errors += 1;
                    warn!(
                        plugin = %id,
                        slug = %record.slug,
                        code = e.code(),
                        error = %e,
                        "automatic vote failed"
                    );
                },
            }
        }

        plugins.save().await?;
        info!(
            checked = report.checked,
            voted = report.voted,
            errors = report.errors,
            "poll finished"
        );
        Ok(RunOutcome::Completed(report))
    }

    /// Cast a user's explicit vote, replacing any earlier one.
    ///
    /// Logs in first and records the login outcome in the settings. Nothing
    /// is written to the registry unless the directory accepted the vote.
    pub async fn manual_vote(
        &self,
        plugin_id: &str,
        plugin_version: &str,
        compatible: bool,
    ) -> Result<()> {
        let _guard = self.state_lock.lock().await;
        let mut settings = SettingsStore::load(Arc::clone(&self.store)).await?;
        let credentials = settings
            .get()
            .credentials
            .clone()
            .ok_or(Error::NoCredentials)?;

        let mut plugins = PluginStorage::load(Arc::clone(&self.store)).await?;
        let slug = plugins
            .registry()
            .get(plugin_id)
            .map(|record| record.slug.clone())
            .ok_or_else(|| Error::unknown_plugin(plugin_id))?;
        let host_version = self.inventory.snapshot().await?.host_version;

        let directory = (self.directory)(Some(credentials.clone()))?;
        let login = directory.login(&credentials).await;
        settings.get_mut().login_error = login.as_ref().err().map(ErrorInfo::from);
        settings.save().await?;
        login?;

        let request = VoteRequest {
            slug,
            plugin_version: plugin_version.to_string(),
            host_version: host_version.clone(),
            compatible,
            allow_overwrite: true,
        };
        directory.submit_vote(&request).await?;

        plugins
            .registry_mut()
            .record_vote(plugin_id, &host_version, plugin_version, compatible);
        plugins.save().await?;
        info!(
            plugin = %plugin_id,
            version = %plugin_version,
            host_version = %host_version,
            compatible,
            "manual vote recorded"
        );
        Ok(())
    }

    pub async fn plugin_activated(&self, plugin_id: &str) -> Result<bool> {
        self.set_plugin_active(plugin_id, true).await
    }

    pub async fn plugin_deactivated(&self, plugin_id: &str) -> Result<bool> {
        self.set_plugin_active(plugin_id, false).await
    }

    /// Returns whether the plugin's activation state changed.
    async fn set_plugin_active(&self, plugin_id: &str, active: bool) -> Result<bool> {
        let _guard = self.state_lock.lock().await;
        let mut plugins = PluginStorage::load(Arc::clone(&self.store)).await?;
        if !plugins.registry().contains(plugin_id) {
            return Err(Error::unknown_plugin(plugin_id));
        }
        let changed = plugins
            .registry_mut()
            .set_active(plugin_id, active, self.clock.now());
        if changed {
            plugins.save().await?;
            info!(plugin = %plugin_id, active, "plugin activation changed");
        }
        Ok(changed)
    }

    /// Validate and store new settings.
    ///
    /// Complete credentials are verified by logging in. Switching to a
    /// different account drops every cached vote, since those belonged to the
    /// old account.
    pub async fn configure(&self, update: SettingsUpdate) -> Result<ConfigureReport> {
        let validated = update.validate();
        let mut report = ConfigureReport {
            messages: validated.messages.clone(),
            ..Default::default()
        };

        let _guard = self.state_lock.lock().await;
        let mut settings = SettingsStore::load(Arc::clone(&self.store)).await?;

        let mut login_error = None;
        if let Some(credentials) = &validated.credentials {
            let directory = (self.directory)(Some(credentials.clone()))?;
            match directory.login(credentials).await {
                Ok(()) => report.login_ok = true,
                Err(e) => {
                    warn!(
                        username = %credentials.username,
                        code = e.code(),
                        error = %e,
                        "directory login failed"
                    );
                    report
                        .messages
                        .push(ValidationMessage::new("username", e.code(), e.to_string()));
                    login_error = Some(ErrorInfo::from(&e));
                },
            }
        }

        let account_changed = validated.account_changed(settings.get());
        let changed = validated.differs_from(settings.get());

        if report.login_ok && account_changed {
            let mut plugins = PluginStorage::load(Arc::clone(&self.store)).await?;
            plugins.registry_mut().clear_all_votes();
            plugins.save().await?;
            report.votes_cleared = true;
            info!("directory account changed, cached votes cleared");
        }
        report.poll_requested = report.login_ok && changed;

        let current = settings.get_mut();
        current.credentials = validated.credentials;
        current.trial_period = validated.trial_period;
        current.login_error = login_error;
        settings.save().await?;

        info!(
            username = ?settings.get().username(),
            trial_period = settings.get().trial_period,
            login_ok = report.login_ok,
            poll_requested = report.poll_requested,
            "settings updated"
        );
        Ok(report)
    }

    pub async fn status(&self) -> Result<StatusReport> {
        let now = self.clock.now();
        let settings = SettingsStore::load(Arc::clone(&self.store)).await?;
        let plugins = PluginStorage::load(Arc::clone(&self.store)).await?;
        let run_started_at = self.run_marker().get::<u64>(now).await?;

        let settings = settings.get();
        Ok(StatusReport {
            username: settings.username().map(str::to_string),
            trial_period: settings.trial_period,
            check_period: settings.check_period,
            login_error: settings.login_error.clone(),
            run_started_at,
            plugins: plugins
                .registry()
                .iter()
                .map(|(id, record)| PluginStatus {
                    id: id.to_string(),
                    active: record.is_active(),
                    current_vote: record.vote(record.host_version(), record.version()),
                    record: record.clone(),
                })
                .collect(),
        })
    }

    /// Remove everything the reporter ever stored.
    pub async fn uninstall(&self) -> Result<()> {
        let _guard = self.state_lock.lock().await;
        SettingsStore::load(Arc::clone(&self.store))
            .await?
            .delete()
            .await?;
        PluginStorage::load(Arc::clone(&self.store))
            .await?
            .delete()
            .await?;
        self.run_marker().delete().await?;
        info!("stored settings and plugin data removed");
        Ok(())
    }
}

/// Unknown directory status is always resolved; listed plugins are
/// refreshed once `check_period` has passed. Unlisted plugins are not asked
/// again until they are uninstalled and reinstalled.
fn needs_refresh(record: &PluginRecord, check_period: u64, now: u64) -> bool {
    match record.in_directory {
        None => true,
        Some(true) => record.time_since_last_check(now) > check_period,
        Some(false) => false,
    }
}

fn should_auto_vote(record: &PluginRecord, trial_period: u64, now: u64) -> bool {
    record.time_active(now).is_some_and(|t| t > trial_period)
        && record.in_directory == Some(true)
        && !record.has_vote_for_current_version()
}

/// `NotInDirectory` is an answer, not a failure: it marks the plugin as
/// unlisted. Any other error is kept on the record and returned.
async fn refresh_directory_data(
    record: &mut PluginRecord,
    directory: &dyn CompatibilityDirectory,
    now: u64,
) -> std::result::Result<(), DirectoryError> {
    record.last_checked_at = now;
    record.last_error = None;

    match directory.fetch_votes(&record.slug).await {
        Ok(votes) => {
            record.votes = Some(votes);
            record.in_directory = Some(true);
            Ok(())
        },
        Err(DirectoryError::NotInDirectory { .. }) => {
            record.in_directory = Some(false);
            Ok(())
        },
        Err(e) => {
            record.last_error = Some(ErrorInfo::from(&e));
            Err(e)
        },
    }
}

/// Vote "works" for the record's current versions without overwriting an
/// existing vote. Returns `false` when a vote was already on record, in which
/// case the cache is replaced with what the directory reported.
async fn auto_vote(
    record: &mut PluginRecord,
    directory: &dyn CompatibilityDirectory,
) -> std::result::Result<bool, DirectoryError> {
    let request = VoteRequest {
        slug: record.slug.clone(),
        plugin_version: record.version().to_string(),
        host_version: record.host_version().to_string(),
        compatible: true,
        allow_overwrite: false,
    };

    match directory.submit_vote(&request).await {
        Ok(()) => {
            record.set_vote(&request.host_version, &request.plugin_version, true);
            Ok(true)
        },
        Err(DirectoryError::AlreadyVoted { existing }) => {
            record.votes = Some(existing);
            Ok(false)
        },
        Err(e) => {
            record.last_error = Some(ErrorInfo::from(&e));
            Err(e)
        },
    }
}
