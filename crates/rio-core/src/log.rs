use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use rio_matchers::{ActiveItem, Category, HookPayload, MatcherDescriptor, MatcherResult};
use serde::Serialize;
use serde_json::Value;
use tokio::io::AsyncWriteExt;

use crate::error::LogError;
use crate::output::HookOutput;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Info,
    Error,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredName<'a> {
    pub name: &'a str,
    pub match_count: u64,
    pub score: f64,
}

#[derive(Debug, Serialize)]
pub struct OutputItem<'a> {
    pub name: &'a str,
    pub category: Category,
    pub score: f64,
}

/// One structured record in the hook log.
#[derive(Debug, Serialize)]
#[serde(tag = "event", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum HookEvent<'a> {
    Payload {
        payload: &'a HookPayload,
    },
    MatchersDiscovered {
        count: usize,
        matchers: &'a [MatcherDescriptor],
    },
    MatcherLoadFailed {
        name: &'a str,
        matcher_path: &'a Path,
        error: String,
    },
    MatcherInvalid {
        name: &'a str,
        matcher_path: &'a Path,
        error: String,
    },
    MatcherExecutionFailed {
        name: &'a str,
        matcher_path: &'a Path,
        error: String,
    },
    MatcherResultInvalid {
        name: &'a str,
        matcher_path: &'a Path,
        error: String,
        returned_value: &'a Value,
    },
    MatcherExecuted {
        name: &'a str,
        result: &'a MatcherResult,
    },
    ScoresCalculated {
        max_match_count: u64,
        items: Vec<ScoredName<'a>>,
    },
    ItemsEvaluated {
        active_items: &'a [ActiveItem],
    },
    OutputGenerated {
        item_count: usize,
        items: Vec<OutputItem<'a>>,
        output: &'a HookOutput,
    },
    Error {
        message: String,
    },
}

impl HookEvent<'_> {
    #[must_use]
    pub fn level(&self) -> Level {
        match self {
            Self::MatcherLoadFailed { .. }
            | Self::MatcherInvalid { .. }
            | Self::MatcherExecutionFailed { .. }
            | Self::MatcherResultInvalid { .. }
            | Self::Error { .. } => Level::Error,
            _ => Level::Info,
        }
    }
}

#[derive(Serialize)]
struct LogEntry<'a> {
    timestamp: String,
    level: Level,
    #[serde(flatten)]
    event: &'a HookEvent<'a>,
}

/// `<dir>/<hook_name>-YYYY-MM-DD.log` for the UTC date of `now`.
#[must_use]
pub fn log_file_path(dir: &Path, hook_name: &str, now: DateTime<Utc>) -> PathBuf {
    dir.join(format!("{hook_name}-{}.log", now.format("%Y-%m-%d")))
}

/// Append-only JSON-lines log for one hook invocation.
#[derive(Debug)]
pub struct HookLog {
    dir: PathBuf,
    path: PathBuf,
    file: tokio::sync::Mutex<Option<tokio::fs::File>>,
}

impl HookLog {
    /// Log for `hook_name` under `dir`, dated today (UTC). Nothing is touched on
    /// disk until the first record.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, hook_name: &str) -> Self {
        let dir = dir.into();
        let path = log_file_path(&dir, hook_name, Utc::now());
        Self {
            dir,
            path,
            file: tokio::sync::Mutex::new(None),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one event.
    ///
    /// # Errors
    ///
    /// Returns [`LogError`] if the directory cannot be created or the line
    /// cannot be written. Callers treat this as fatal.
    pub async fn record(&self, event: &HookEvent<'_>) -> Result<(), LogError> {
        let entry = LogEntry {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            level: event.level(),
            event,
        };
        let mut line = serde_json::to_string(&entry)?;
        line.push('\n');

        let mut guard = self.file.lock().await;
        if guard.is_none() {
            tokio::fs::create_dir_all(&self.dir)
                .await
                .map_err(|source| LogError::CreateDir {
                    dir: self.dir.clone(),
                    source,
                })?;
            let file = tokio::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)
                .await
                .map_err(|source| self.write_error(source))?;
            *guard = Some(file);
        }

        if let Some(file) = guard.as_mut() {
            file.write_all(line.as_bytes())
                .await
                .map_err(|source| self.write_error(source))?;
            file.flush().await.map_err(|source| self.write_error(source))?;
        }
        Ok(())
    }

    fn write_error(&self, source: std::io::Error) -> LogError {
        LogError::Write {
            path: self.path.clone(),
            source,
        }
    }
}
