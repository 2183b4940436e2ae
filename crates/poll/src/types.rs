use {
    compat_state::{ErrorInfo, PluginRecord, ValidationMessage},
    serde::Serialize,
};

/// Counters for one completed poll run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// Plugins whose directory data was refreshed.
    pub checked: usize,
    pub voted: usize,
    pub errors: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RunOutcome {
    /// Another run holds the marker.
    AlreadyRunning { started_at: u64 },
    /// Registry reconciled, nothing else possible without an account.
    NoCredentials,
    Completed(RunReport),
}

/// What happened when new settings were applied.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConfigureReport {
    pub messages: Vec<ValidationMessage>,
    /// The new account was verified against the directory.
    pub login_ok: bool,
    pub votes_cleared: bool,
    /// A poll should run soon to pick up votes for the new settings.
    pub poll_requested: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PluginStatus {
    pub id: String,
    pub active: bool,
    /// The account's vote for the record's current plugin and host version.
    pub current_vote: Option<bool>,
    #[serde(flatten)]
    pub record: PluginRecord,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub username: Option<String>,
    pub trial_period: u64,
    pub check_period: u64,
    pub login_error: Option<ErrorInfo>,
    /// Start time of a run in progress, if any.
    pub run_started_at: Option<u64>,
    pub plugins: Vec<PluginStatus>,
}
