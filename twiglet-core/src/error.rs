//! Error types for twiglet-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from registry operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Underlying I/O failure while scanning or reading a component file.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parse error on load — includes file path and line context from serde_yaml.
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// A merged config did not have the shape of a component config.
    #[error("invalid component config {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Two views claim the same handle.
    #[error("duplicate handle {handle} (second definition at {path})")]
    DuplicateHandle { handle: String, path: PathBuf },

    /// No `*.info.yml` file was found in the theme directory.
    #[error("no *.info.yml found in {dir}")]
    InfoNotFound { dir: PathBuf },
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> RegistryError {
    RegistryError::Io {
        path: path.into(),
        source,
    }
}
