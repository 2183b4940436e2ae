//! The persisted settings bag and its validation.

use std::{fmt, sync::Arc};

use {
    compat_directory::Credentials,
    secrecy::ExposeSecret,
    serde::{Deserialize, Serialize},
    tracing::debug,
};

use crate::{
    DAY_IN_SECONDS, Result,
    record::ErrorInfo,
    store::{OptionStore, load_option, save_option},
};

pub const SETTINGS_KEY: &str = "compat_settings";

const MIN_TRIAL_PERIOD: u64 = DAY_IN_SECONDS;
const MAX_TRIAL_PERIOD: u64 = 30 * DAY_IN_SECONDS;

/// Missing fields fall back to their defaults when loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// `None` when no account is configured; never half-filled.
    pub credentials: Option<Credentials>,
    /// Outcome of the last explicit login, cleared when a login succeeds.
    pub login_error: Option<ErrorInfo>,
    /// Seconds a plugin must stay active before it is voted "works".
    pub trial_period: u64,
    /// Seconds between directory refreshes of a listed plugin.
    pub check_period: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            credentials: None,
            login_error: None,
            trial_period: TrialPeriod::OneWeek.as_secs(),
            check_period: DAY_IN_SECONDS,
        }
    }
}

impl Settings {
    pub fn username(&self) -> Option<&str> {
        self.credentials.as_ref().map(|c| c.username.as_str())
    }
}

/// Loads the settings bag once and writes it back whole.
pub struct SettingsStore {
    store: Arc<dyn OptionStore>,
    settings: Settings,
}

impl SettingsStore {
    pub async fn load(store: Arc<dyn OptionStore>) -> Result<Self> {
        let settings = load_option(store.as_ref(), SETTINGS_KEY)
            .await?
            .unwrap_or_default();
        Ok(Self { store, settings })
    }

    pub async fn save(&self) -> Result<()> {
        debug!(username = ?self.settings.username(), "saving settings");
        save_option(self.store.as_ref(), SETTINGS_KEY, &self.settings).await
    }

    pub async fn delete(&mut self) -> Result<()> {
        self.settings = Settings::default();
        self.store.delete(SETTINGS_KEY).await
    }

    pub fn get(&self) -> &Settings {
        &self.settings
    }

    pub fn get_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }
}

/// Trial period choices offered to users.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrialPeriod {
    OneDay,
    TwoDays,
    ThreeDays,
    FourDays,
    FiveDays,
    SixDays,
    OneWeek,
    TwoWeeks,
    ThreeWeeks,
    OneMonth,
}

impl TrialPeriod {
    pub const ALL: [Self; 10] = [
        Self::OneDay,
        Self::TwoDays,
        Self::ThreeDays,
        Self::FourDays,
        Self::FiveDays,
        Self::SixDays,
        Self::OneWeek,
        Self::TwoWeeks,
        Self::ThreeWeeks,
        Self::OneMonth,
    ];

    pub fn days(self) -> u64 {
        match self {
            Self::OneDay => 1,
            Self::TwoDays => 2,
            Self::ThreeDays => 3,
            Self::FourDays => 4,
            Self::FiveDays => 5,
            Self::SixDays => 6,
            Self::OneWeek => 7,
            Self::TwoWeeks => 14,
            Self::ThreeWeeks => 21,
            Self::OneMonth => 30,
        }
    }

    pub fn as_secs(self) -> u64 {
        self.days() * DAY_IN_SECONDS
    }

    pub fn from_days(days: u64) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.days() == days)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::OneDay => "1 day",
            Self::TwoDays => "2 days",
            Self::ThreeDays => "3 days",
            Self::FourDays => "4 days",
            Self::FiveDays => "5 days",
            Self::SixDays => "6 days",
            Self::OneWeek => "1 week",
            Self::TwoWeeks => "2 weeks",
            Self::ThreeWeeks => "3 weeks",
            Self::OneMonth => "1 month",
        }
    }
}

impl fmt::Display for TrialPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Round a trial period down to whole days and clamp it to 1..=30 days.
pub fn normalize_trial_period(secs: u64) -> u64 {
    (secs / DAY_IN_SECONDS * DAY_IN_SECONDS).clamp(MIN_TRIAL_PERIOD, MAX_TRIAL_PERIOD)
}

/// Raw settings as submitted by the user.
#[derive(Debug, Clone, Default)]
pub struct SettingsUpdate {
    pub username: String,
    pub password: String,
    /// Seconds.
    pub trial_period: u64,
}

/// A problem with one submitted field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationMessage {
    pub field: &'static str,
    pub code: String,
    pub message: String,
}

impl ValidationMessage {
    pub fn new(field: &'static str, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field,
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Settings after local validation, before the account is verified remotely.
#[derive(Debug, Clone)]
pub struct ValidatedSettings {
    pub credentials: Option<Credentials>,
    pub trial_period: u64,
    pub messages: Vec<ValidationMessage>,
}

impl SettingsUpdate {
    /// Trim the credentials, drop them both if either is empty, and
    /// normalize the trial period.
    pub fn validate(self) -> ValidatedSettings {
        let username = self.username.trim();
        let password = self.password.trim();
        let mut messages = Vec::new();

        if username.is_empty() {
            messages.push(ValidationMessage::new(
                "username",
                "empty-username",
                "Username must not be empty.",
            ));
        }
        if password.is_empty() {
            messages.push(ValidationMessage::new(
                "password",
                "empty-password",
                "Password must not be empty.",
            ));
        }
        let credentials = messages
            .is_empty()
            .then(|| Credentials::new(username, password));

        ValidatedSettings {
            credentials,
            trial_period: normalize_trial_period(self.trial_period),
            messages,
        }
    }
}

impl ValidatedSettings {
    /// Whether applying these settings would switch directory accounts.
    pub fn account_changed(&self, current: &Settings) -> bool {
        self.credentials.as_ref().map(|c| c.username.as_str()) != current.username()
    }

    /// Whether anything the poll job depends on differs from `current`.
    pub fn differs_from(&self, current: &Settings) -> bool {
        let password_changed = match (&self.credentials, &current.credentials) {
            (Some(new), Some(old)) => new.password.expose_secret() != old.password.expose_secret(),
            (None, None) => false,
            _ => true,
        };
        self.account_changed(current)
            || password_changed
            || self.trial_period != current.trial_period
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, crate::InMemoryOptionStore, rstest::rstest};

    #[test]
    fn defaults() {
        let settings = Settings::default();
        assert!(settings.credentials.is_none());
        assert_eq!(settings.trial_period, 7 * DAY_IN_SECONDS);
        assert_eq!(settings.check_period, DAY_IN_SECONDS);
    }

    #[rstest]
    #[case(0, DAY_IN_SECONDS)]
    #[case(DAY_IN_SECONDS - 1, DAY_IN_SECONDS)]
    #[case(3 * DAY_IN_SECONDS + 500, 3 * DAY_IN_SECONDS)]
    #[case(30 * DAY_IN_SECONDS, 30 * DAY_IN_SECONDS)]
    #[case(45 * DAY_IN_SECONDS, 30 * DAY_IN_SECONDS)]
    fn trial_period_is_floored_and_clamped(#[case] input: u64, #[case] expected: u64) {
        assert_eq!(normalize_trial_period(input), expected);
    }

    #[test]
    fn partial_credentials_are_cleared() {
        let validated = SettingsUpdate {
            username: "  alice ".into(),
            password: "   ".into(),
            trial_period: 2 * DAY_IN_SECONDS,
        }
        .validate();
        assert!(validated.credentials.is_none());
        assert_eq!(validated.messages.len(), 1);
        assert_eq!(validated.messages[0].field, "password");
        assert_eq!(validated.messages[0].code, "empty-password");

        let validated = SettingsUpdate::default().validate();
        assert!(validated.credentials.is_none());
        assert_eq!(validated.messages.len(), 2);
    }

    #[test]
    fn credentials_are_trimmed() {
        let validated = SettingsUpdate {
            username: " alice ".into(),
            password: " s3cret\n".into(),
            trial_period: 7 * DAY_IN_SECONDS,
        }
        .validate();
        let credentials = validated.credentials.unwrap();
        assert_eq!(credentials.username, "alice");
        assert_eq!(credentials.password.expose_secret(), "s3cret");
        assert!(validated.messages.is_empty());
    }

    #[test]
    fn change_detection() {
        let mut current = Settings::default();
        let same_empty = SettingsUpdate {
            trial_period: current.trial_period,
            ..Default::default()
        }
        .validate();
        assert!(!same_empty.differs_from(&current));

        current.credentials = Some(Credentials::new("alice", "pw"));
        let new_password = SettingsUpdate {
            username: "alice".into(),
            password: "pw2".into(),
            trial_period: current.trial_period,
        }
        .validate();
        assert!(!new_password.account_changed(&current));
        assert!(new_password.differs_from(&current));

        let other_account = SettingsUpdate {
            username: "bob".into(),
            password: "pw".into(),
            trial_period: current.trial_period,
        }
        .validate();
        assert!(other_account.account_changed(&current));
    }

    #[test]
    fn trial_period_choices() {
        assert_eq!(TrialPeriod::from_days(14), Some(TrialPeriod::TwoWeeks));
        assert_eq!(TrialPeriod::from_days(8), None);
        assert_eq!(TrialPeriod::OneMonth.as_secs(), 30 * DAY_IN_SECONDS);
        assert_eq!(TrialPeriod::OneWeek.to_string(), "1 week");
    }

    #[tokio::test]
    async fn store_merges_defaults_and_persists() {
        let store: Arc<dyn OptionStore> = Arc::new(InMemoryOptionStore::new());
        store
            .set(SETTINGS_KEY, serde_json::json!({ "trial_period": 172_800 }))
            .await
            .unwrap();

        let mut settings = SettingsStore::load(store.clone()).await.unwrap();
        assert_eq!(settings.get().trial_period, 172_800);
        assert_eq!(settings.get().check_period, DAY_IN_SECONDS);

        settings.get_mut().credentials = Some(Credentials::new("alice", "pw"));
        settings.save().await.unwrap();

        let reloaded = SettingsStore::load(store.clone()).await.unwrap();
        let credentials = reloaded.get().credentials.clone().unwrap();
        assert_eq!(credentials.username, "alice");
        assert_eq!(credentials.password.expose_secret(), "pw");

        settings.delete().await.unwrap();
        assert!(store.get(SETTINGS_KEY).await.unwrap().is_none());
    }

    #[test]
    fn debug_redacts_password() {
        let settings = Settings {
            credentials: Some(Credentials::new("alice", "hunter2")),
            ..Default::default()
        };
        let debug = format!("{settings:?}");
        assert!(debug.contains("alice"));
        assert!(!debug.contains("hunter2"));
    }
}
