//! Adapter configuration.
//!
//! ```yaml
//! handle_prefix: "@"
//! import_context: true
//! text_domain: ""
//! catalog: languages/de.po
//! ```

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use twiglet_core::info::LibraryPaths;
use twiglet_core::ThemeInfo;

use crate::error::AdapterError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdapterConfig {
    /// Plain engine: no custom tags, filters, functions or `_self` injection.
    pub pristine: bool,
    #[serde(alias = "handlePrefix")]
    pub handle_prefix: String,
    /// Fill missing context keys from the rendered entity's own context.
    #[serde(alias = "importContext")]
    pub import_context: bool,
    /// Catalog partition (`msgctxt`) used by `trans` and `t`.
    pub text_domain: String,
    /// PO file loaded once when the adapter is built.
    pub catalog: Option<PathBuf>,
    /// Component library namespaces, usually taken from the theme info file.
    pub libraries: IndexMap<String, LibraryPaths>,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        AdapterConfig {
            pristine: false,
            handle_prefix: "@".to_string(),
            import_context: false,
            text_domain: String::new(),
            catalog: None,
            libraries: IndexMap::new(),
        }
    }
}

impl AdapterConfig {
    pub fn load_at(path: &Path) -> Result<Self, AdapterError> {
        let contents = std::fs::read_to_string(path).map_err(|e| AdapterError::ConfigIo {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: Option<AdapterConfig> =
            serde_yaml::from_str(&contents).map_err(|e| AdapterError::ConfigParse {
                path: path.to_path_buf(),
                source: e,
            })?;
        Ok(config.unwrap_or_default())
    }

    /// Register the component libraries a theme declares, keeping entries
    /// already configured.
    pub fn with_theme_info(mut self, info: ThemeInfo) -> Self {
        for (name, paths) in info.libraries {
            self.libraries.entry(name).or_insert(paths);
        }
        self
    }

    /// The configuration as exposed to templates under `_config`.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}
