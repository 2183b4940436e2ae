use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    State(#[from] compat_state::Error),

    #[error(transparent)]
    Directory(#[from] compat_directory::Error),

    #[error("no plugin directory account is configured")]
    NoCredentials,

    #[error("unknown plugin `{id}`")]
    UnknownPlugin { id: String },
}

impl Error {
    #[must_use]
    pub fn unknown_plugin(id: impl Into<String>) -> Self {
        Self::UnknownPlugin { id: id.into() }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
