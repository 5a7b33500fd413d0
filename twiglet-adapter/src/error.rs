//! Error types for twiglet-adapter.

use std::path::PathBuf;

use thiserror::Error;
use twiglet_core::RegistryError;
use twiglet_engine::TemplateError;

/// All errors that can arise from rendering components through the adapter.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// A handle did not resolve to a component or variant.
    #[error("Unable to render '{handle}' - component not found.")]
    ComponentNotFound { handle: String },

    /// `render … with <expr>` evaluated to something other than a mapping.
    #[error("render arguments must be a mapping, got `{0}`")]
    InvalidArguments(String),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// Filesystem error while reading the adapter config file.
    #[error("config io error at {path}: {source}")]
    ConfigIo {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid adapter config at {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
}

impl AdapterError {
    /// The handle of a missing component, looking through errors raised
    /// inside nested `render` tags.
    pub fn missing_component(&self) -> Option<&str> {
        match self {
            AdapterError::ComponentNotFound { handle } => Some(handle),
            AdapterError::Template(inner) => inner
                .extension_source::<AdapterError>()
                .and_then(AdapterError::missing_component),
            _ => None,
        }
    }
}

/// Errors reading a portable-object translation catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog io error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid catalog syntax at line {line}: {message}")]
    Parse { line: usize, message: String },
}
