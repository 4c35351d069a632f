use std::path::PathBuf;

use rio_matchers::PayloadError;

/// Failure of the append-only hook log. Always fatal.
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("cannot create logs dir {}: {source}", dir.display())]
    CreateDir {
        dir: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot write log {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot serialize log entry: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Failure while invoking a loaded matcher.
#[derive(Debug, thiserror::Error)]
pub enum MatcherError {
    #[error("{0:#}")]
    Failed(anyhow::Error),

    #[error("matcher panicked: {0}")]
    Panicked(String),
}

/// Errors that abort the whole evaluation.
#[derive(Debug, thiserror::Error)]
pub enum HookError {
    #[error("invalid JSON on stdin: {0}")]
    Input(#[source] serde_json::Error),

    #[error("validateUserPromptSubmitPayload: {0}")]
    Payload(#[from] PayloadError),

    #[error(transparent)]
    Log(#[from] LogError),
}

impl HookError {
    /// Whether the hook log can still record this error.
    #[must_use]
    pub fn is_loggable(&self) -> bool {
        !matches!(self, Self::Log(_))
    }
}
