use std::path::PathBuf;

/// Failure to load a matcher unit from disk.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("matcher not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("failed to read matcher {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse matcher manifest {}: {source}", path.display())]
    Manifest {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("unsupported matcher {}: expected an executable or a .toml manifest", path.display())]
    Unsupported { path: PathBuf },
}
