//! What the reporter remembers about one installed plugin.

use std::path::Path;

use {
    compat_directory::VoteTable,
    serde::{Deserialize, Serialize},
};

/// Stable copy of a directory error, kept on the record that caused it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub code: String,
    pub message: String,
}

impl From<&compat_directory::Error> for ErrorInfo {
    fn from(err: &compat_directory::Error) -> Self {
        Self {
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

/// Per-plugin state.
///
/// A plugin is active exactly when `activated_at` is set, so the two can never
/// disagree. The timestamp is stamped on a false→true transition and cleared
/// on true→false; repeating the current state leaves it alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginRecord {
    pub slug: String,
    version: String,
    host_version: String,
    #[serde(default)]
    activated_at: Option<u64>,
    /// 0 means never checked.
    #[serde(default)]
    pub last_checked_at: u64,
    /// `None` until the directory has been asked.
    #[serde(default)]
    pub in_directory: Option<bool>,
    #[serde(default)]
    pub votes: Option<VoteTable>,
    #[serde(default)]
    pub last_error: Option<ErrorInfo>,
}

impl PluginRecord {
    pub fn new(plugin_id: &str, version: &str, host_version: &str, active: bool, now: u64) -> Self {
        Self {
            slug: slug_from_plugin_id(plugin_id),
            version: version.to_string(),
            host_version: host_version.to_string(),
            activated_at: active.then_some(now),
            last_checked_at: 0,
            in_directory: None,
            votes: None,
            last_error: None,
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn host_version(&self) -> &str {
        &self.host_version
    }

    pub fn is_active(&self) -> bool {
        self.activated_at.is_some()
    }

    pub fn activated_at(&self) -> Option<u64> {
        self.activated_at
    }

    /// Returns whether the activation state changed.
    pub fn set_active(&mut self, active: bool, now: u64) -> bool {
        match (active, self.activated_at) {
            (true, None) => {
                self.activated_at = Some(now);
                true
            },
            (false, Some(_)) => {
                self.activated_at = None;
                true
            },
            _ => false,
        }
    }

    /// Record the observed plugin and host versions. Any change makes the
    /// cached directory data stale: the next run re-fetches it.
    pub fn set_versions(&mut self, version: &str, host_version: &str) -> bool {
        if self.version == version && self.host_version == host_version {
            return false;
        }
        self.version = version.to_string();
        self.host_version = host_version.to_string();
        self.last_checked_at = 0;
        self.last_error = None;
        true
    }

    /// Seconds since activation, `None` while inactive.
    pub fn time_active(&self, now: u64) -> Option<u64> {
        self.activated_at.map(|at| now.saturating_sub(at))
    }

    pub fn time_since_last_check(&self, now: u64) -> u64 {
        now.saturating_sub(self.last_checked_at)
    }

    pub fn vote(&self, host_version: &str, plugin_version: &str) -> Option<bool> {
        self.votes.as_ref()?.get(host_version, plugin_version)
    }

    pub fn has_vote(&self, host_version: &str, plugin_version: &str) -> bool {
        self.vote(host_version, plugin_version).is_some()
    }

    pub fn has_vote_for_current_version(&self) -> bool {
        self.has_vote(&self.host_version, &self.version)
    }

    pub fn set_vote(&mut self, host_version: &str, plugin_version: &str, compatible: bool) {
        self.votes
            .get_or_insert_with(VoteTable::new)
            .insert(host_version, plugin_version, compatible);
    }
}

/// Directory slug for a plugin identifier such as `akismet/akismet.php`.
///
/// The containing directory wins; single-file plugins fall back to the file
/// name without `.php`.
pub fn slug_from_plugin_id(plugin_id: &str) -> String {
    let path = Path::new(plugin_id);
    if let Some(dir) = path.parent().and_then(Path::to_str)
        && !dir.is_empty()
        && dir != "."
    {
        return dir.to_string();
    }
    let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or(plugin_id);
    file_name.strip_suffix(".php").unwrap_or(file_name).to_string()
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    #[rstest]
    #[case("akismet/akismet.php", "akismet")]
    #[case("hello.php", "hello")]
    #[case("./hello.php", "hello")]
    #[case("jetpack/jetpack.php", "jetpack")]
    #[case("readme", "readme")]
    fn slug_derivation(#[case] id: &str, #[case] slug: &str) {
        assert_eq!(slug_from_plugin_id(id), slug);
    }

    #[test]
    fn activation_stamps_and_clears_together() {
        let mut record = PluginRecord::new("a/a.php", "1.0", "6.4", false, 100);
        assert!(!record.is_active());
        assert_eq!(record.activated_at(), None);

        assert!(record.set_active(true, 200));
        assert_eq!(record.activated_at(), Some(200));

        // Repeating the current state keeps the original stamp.
        assert!(!record.set_active(true, 300));
        assert_eq!(record.activated_at(), Some(200));
        assert_eq!(record.time_active(500), Some(300));

        assert!(record.set_active(false, 400));
        assert_eq!(record.activated_at(), None);
        assert_eq!(record.time_active(500), None);
    }

    #[test]
    fn version_change_resets_check_but_keeps_activation() {
        let mut record = PluginRecord::new("a/a.php", "1.0", "6.4", true, 100);
        record.last_checked_at = 150;
        record.last_error = Some(ErrorInfo {
            code: "voting_failed".into(),
            message: "boom".into(),
        });
        record.set_vote("6.4", "1.0", true);

        assert!(!record.set_versions("1.0", "6.4"));
        assert_eq!(record.last_checked_at, 150);

        assert!(record.set_versions("1.1", "6.4"));
        assert_eq!(record.last_checked_at, 0);
        assert!(record.last_error.is_none());
        assert_eq!(record.activated_at(), Some(100));
        // Votes for the old version stay cached.
        assert!(record.has_vote("6.4", "1.0"));
        assert!(!record.has_vote_for_current_version());

        assert!(record.set_versions("1.1", "6.5"));
        assert_eq!(record.host_version(), "6.5");
    }

    #[test]
    fn vote_queries() {
        let mut record = PluginRecord::new("a/a.php", "2.0", "6.4", true, 0);
        assert_eq!(record.vote("6.4", "2.0"), None);
        record.set_vote("6.4", "2.0", false);
        assert_eq!(record.vote("6.4", "2.0"), Some(false));
        assert!(record.has_vote_for_current_version());
        assert_eq!(record.time_since_last_check(42), 42);
    }

    #[test]
    fn error_info_copies_code_and_message() {
        let info = ErrorInfo::from(&compat_directory::Error::NotInDirectory {
            slug: "gone".into(),
        });
        assert_eq!(info.code, "not_in_directory");
        assert!(info.message.contains("gone"));
    }

    #[test]
    fn deserializes_sparse_record() {
        let record: PluginRecord = serde_json::from_str(
            r#"{"slug":"a","version":"1.0","host_version":"6.4"}"#,
        )
        .unwrap();
        assert!(!record.is_active());
        assert_eq!(record.last_checked_at, 0);
        assert_eq!(record.in_directory, None);
    }
}
