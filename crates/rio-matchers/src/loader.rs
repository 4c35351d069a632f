use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;

use crate::category::Category;
use crate::error::LoadError;
use crate::matcher::Matcher;

/// File-name marker shared by every matcher unit (`<name>.rio.matcher[.ext]`).
pub const MATCHER_SUFFIX: &str = ".rio.matcher";

const HOST_DIR: &str = ".claude";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatcherDescriptor {
    pub name: String,
    pub path: PathBuf,
    pub category: Category,
}

/// Strip the matcher suffix and its extension from a file name.
///
/// Names without the suffix are returned unchanged.
#[must_use]
pub fn strip_matcher_suffix(file_name: &str) -> &str {
    let Some(idx) = file_name.rfind(MATCHER_SUFFIX) else {
        return file_name;
    };
    let rest = &file_name[idx + MATCHER_SUFFIX.len()..];
    let extension_only = rest.is_empty()
        || rest
            .strip_prefix('.')
            .is_some_and(|ext| !ext.is_empty() && !ext.contains('.'));
    if extension_only {
        &file_name[..idx]
    } else {
        file_name
    }
}

fn under_host_dir(path: &Path, dir: &str) -> bool {
    let names: Vec<_> = path
        .components()
        .filter_map(|c| match c {
            Component::Normal(name) => Some(name),
            _ => None,
        })
        .collect();
    names
        .windows(2)
        .any(|pair| pair[0] == HOST_DIR && pair[1] == dir)
}

fn file_stem_name(path: &Path) -> String {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy())
        .unwrap_or_default();
    strip_matcher_suffix(&file_name).to_owned()
}

/// Infer the category and display name of a matcher from its path.
///
/// `.claude/agents/<name>.rio.matcher.*` is an agent and
/// `.claude/commands/<name>.rio.matcher.*` a command. Anything else is a skill
/// laid out as `<skill>/<subdir>/<file>`, named after `<skill>`.
#[must_use]
pub fn classify(path: &Path) -> MatcherDescriptor {
    let (category, name) = if under_host_dir(path, "agents") {
        (Category::Agent, file_stem_name(path))
    } else if under_host_dir(path, "commands") {
        (Category::Command, file_stem_name(path))
    } else {
        let skill = path
            .parent()
            .and_then(Path::parent)
            .and_then(Path::file_name)
            .map(|n| n.to_string_lossy().into_owned());
        (
            Category::Skill,
            skill.unwrap_or_else(|| file_stem_name(path)),
        )
    };

    MatcherDescriptor {
        name,
        path: path.to_path_buf(),
        category,
    }
}

/// Build one descriptor per path, preserving input order.
#[must_use]
pub fn build_descriptors<P: AsRef<Path>>(paths: &[P]) -> Vec<MatcherDescriptor> {
    paths.iter().map(|p| classify(p.as_ref())).collect()
}

/// Raw form of a loaded matcher unit, before adaptation.
pub enum MatcherExport {
    /// An explicitly registered in-process matcher.
    Callable(Arc<dyn Matcher>),
    /// An executable speaking the stdin/stdout protocol.
    Executable(PathBuf),
    /// A parsed TOML manifest.
    Manifest { path: PathBuf, table: toml::Table },
}

impl std::fmt::Debug for MatcherExport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Callable(_) => f.write_str("Callable(..)"),
            Self::Executable(path) => f.debug_tuple("Executable").field(path).finish(),
            Self::Manifest { path, table } => f
                .debug_struct("Manifest")
                .field("path", path)
                .field("keys", &table.keys().collect::<Vec<_>>())
                .finish(),
        }
    }
}

#[cfg(unix)]
fn is_executable(_path: &Path, metadata: &std::fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn is_executable(path: &Path, _metadata: &std::fs::Metadata) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| ["exe", "bat", "cmd"].contains(&e.to_ascii_lowercase().as_str()))
}

/// Resolves matcher paths to loadable units.
///
/// Explicit registrations take precedence over the filesystem.
#[derive(Default)]
pub struct MatcherLoader {
    registered: HashMap<PathBuf, Arc<dyn Matcher>>,
}

impl MatcherLoader {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an in-process matcher under `path`, replacing any previous one.
    pub fn register(&mut self, path: impl Into<PathBuf>, matcher: Arc<dyn Matcher>) {
        self.registered.insert(path.into(), matcher);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.registered.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.registered.is_empty()
    }

    /// Load the unit behind `path`.
    ///
    /// `.toml` files are parsed as manifests; other files must be executable.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError`] if the file is missing, unreadable, not valid TOML,
    /// or neither a manifest nor an executable.
    pub async fn load(&self, path: &Path) -> Result<MatcherExport, LoadError> {
        if let Some(matcher) = self.registered.get(path) {
            return Ok(MatcherExport::Callable(Arc::clone(matcher)));
        }

        let metadata = tokio::fs::metadata(path).await.map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                LoadError::NotFound {
                    path: path.to_path_buf(),
                }
            } else {
                LoadError::Io {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;
        if !metadata.is_file() {
            return Err(LoadError::Unsupported {
                path: path.to_path_buf(),
            });
        }

        if path.extension().is_some_and(|e| e == "toml") {
            let content =
                tokio::fs::read_to_string(path)
                    .await
                    .map_err(|source| LoadError::Io {
                        path: path.to_path_buf(),
                        source,
                    })?;
            let table = content
                .parse::<toml::Table>()
                .map_err(|source| LoadError::Manifest {
                    path: path.to_path_buf(),
                    source,
                })?;
            tracing::debug!("loaded matcher manifest {}", path.display());
            return Ok(MatcherExport::Manifest {
                path: path.to_path_buf(),
                table,
            });
        }

        if is_executable(path, &metadata) {
            tracing::debug!("loaded matcher executable {}", path.display());
            return Ok(MatcherExport::Executable(path.to_path_buf()));
        }

        Err(LoadError::Unsupported {
            path: path.to_path_buf(),
        })
    }
}
