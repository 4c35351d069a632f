use std::path::PathBuf;

use super::Config;

/// Split a newline-separated path list, dropping blank entries.
pub(crate) fn parse_path_list(raw: &str) -> Vec<PathBuf> {
    raw.lines()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(PathBuf::from)
        .collect()
}

/// Trim configured paths and drop the ones left blank.
pub(crate) fn clean_path_list(paths: Vec<PathBuf>) -> Vec<PathBuf> {
    paths
        .into_iter()
        .filter_map(|path| match path.to_str() {
            Some(s) => {
                let s = s.trim();
                (!s.is_empty()).then(|| PathBuf::from(s))
            }
            None => Some(path),
        })
        .collect()
}

impl Config {
    pub(crate) fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("MATCHER_PATHS") {
            self.matchers.paths = parse_path_list(&v);
        }
        if let Ok(v) = std::env::var("RIO_LOG_DIR") {
            if v.trim().is_empty() {
                tracing::warn!("ignoring empty RIO_LOG_DIR");
            } else {
                self.log.dir = PathBuf::from(v);
            }
        }
        if let Ok(v) = std::env::var("RIO_LOG_HOOK_NAME") {
            if v.trim().is_empty() {
                tracing::warn!("ignoring empty RIO_LOG_HOOK_NAME");
            } else {
                self.log.hook_name = v;
            }
        }
    }
}
