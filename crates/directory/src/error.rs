use thiserror::Error;

use crate::types::VoteTable;

/// Why authentication against the directory failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    /// The login form was rejected.
    InvalidCredentials,
    /// An authenticated operation was attempted without stored credentials.
    NotLoggedIn,
}

impl AuthFailure {
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::InvalidCredentials => "invalid_credentials",
            Self::NotLoggedIn => "not_logged_in",
        }
    }

    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            Self::InvalidCredentials => "invalid username or password",
            Self::NotLoggedIn => "you must log in before you can do this",
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("{}", .failure.message())]
    Auth { failure: AuthFailure },

    #[error("{context}: {source}")]
    Network {
        context: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("plugin `{slug}` is not listed in the plugin directory")]
    NotInDirectory { slug: String },

    #[error("couldn't load the plugin's directory page (HTTP {status})")]
    FetchFailed { status: u16 },

    #[error("failed to parse the directory page: {message}")]
    UnknownPageFormat { message: String },

    #[error("the vote was not registered (HTTP {status}); the voting process may have changed")]
    VotingFailed { status: u16 },

    #[error("already voted on this host/plugin version combination")]
    AlreadyVoted { existing: VoteTable },

    #[error("invalid directory URL `{url}`: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

impl Error {
    #[must_use]
    pub fn invalid_credentials() -> Self {
        Self::Auth {
            failure: AuthFailure::InvalidCredentials,
        }
    }

    #[must_use]
    pub fn not_logged_in() -> Self {
        Self::Auth {
            failure: AuthFailure::NotLoggedIn,
        }
    }

    #[must_use]
    pub fn network(context: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            context: context.into(),
            source,
        }
    }

    #[must_use]
    pub fn unknown_page_format(message: impl Into<String>) -> Self {
        Self::UnknownPageFormat {
            message: message.into(),
        }
    }

    /// Stable machine-readable code, persisted alongside the message when an
    /// error is recorded on a plugin.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Auth { failure } => failure.code(),
            Self::Network { .. } | Self::FetchFailed { .. } => "http_request_failed",
            Self::NotInDirectory { .. } => "not_in_directory",
            Self::UnknownPageFormat { .. } => "unknown_page_format",
            Self::VotingFailed { .. } => "voting_failed",
            Self::AlreadyVoted { .. } => "already_voted",
            Self::InvalidUrl { .. } => "invalid_url",
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_codes() {
        assert_eq!(Error::invalid_credentials().code(), "invalid_credentials");
        assert_eq!(Error::not_logged_in().code(), "not_logged_in");
        assert_eq!(
            Error::invalid_credentials().to_string(),
            "invalid username or password"
        );
    }

    #[test]
    fn page_format_message() {
        let err = Error::unknown_page_format("no compatibility table");
        assert_eq!(err.code(), "unknown_page_format");
        assert!(err.to_string().contains("no compatibility table"));
    }
}
