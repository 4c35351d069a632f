use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Config file consulted when neither `--config` nor `RIO_CONFIG` is given.
pub const DEFAULT_CONFIG_PATH: &str = ".claude/hooks/rio/config.toml";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub matchers: MatchersConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct MatchersConfig {
    /// Matcher unit paths, evaluated in this order.
    #[serde(default)]
    pub paths: Vec<PathBuf>,
}

fn default_log_dir() -> PathBuf {
    PathBuf::from(".claude/hooks/rio/logs")
}

fn default_hook_name() -> String {
    "hook-UserPromptSubmit-handler".into()
}

#[derive(Debug, Deserialize, Serialize)]
pub struct LogConfig {
    #[serde(default = "default_log_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_hook_name")]
    pub hook_name: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            dir: default_log_dir(),
            hook_name: default_hook_name(),
        }
    }
}
