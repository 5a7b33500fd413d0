//! Subcommand implementations and the library/adapter setup they share.

pub mod list;
pub mod render;
pub mod watch;

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use twiglet_adapter::{AdapterConfig, TwigAdapter};
use twiglet_core::{Library, ThemeInfo};
use twiglet_engine::{map_from_json, Map};

use crate::GlobalArgs;

/// Scan the component root named by `global`.
pub fn load_library(global: &GlobalArgs) -> Result<Library> {
    let root = global.root.canonicalize().unwrap_or_else(|_| global.root.clone());
    Library::load_at(&root)
        .with_context(|| format!("failed to load components from {}", global.root.display()))
}

/// Adapter configuration from `--config`, theme info and `--catalog`.
pub fn load_config(global: &GlobalArgs) -> Result<AdapterConfig> {
    let mut config = match &global.config {
        Some(path) => AdapterConfig::load_at(path)?,
        None => AdapterConfig::default(),
    };
    if let Some(theme) = &global.theme {
        let info = ThemeInfo::load_at(theme)
            .with_context(|| format!("failed to read theme info in {}", theme.display()))?;
        config = config.with_theme_info(info);
    }
    if let Some(catalog) = &global.catalog {
        config.catalog = Some(catalog.clone());
    }
    Ok(config)
}

pub fn build_adapter(global: &GlobalArgs) -> Result<TwigAdapter> {
    let library = load_library(global)?;
    let config = load_config(global)?;
    TwigAdapter::new(Arc::new(library), config).context("failed to set up the template adapter")
}

/// `--context` JSON as render overrides.
pub fn parse_context(raw: Option<&str>) -> Result<Map> {
    let Some(raw) = raw else {
        return Ok(Map::new());
    };
    let value: serde_json::Value = serde_json::from_str(raw).context("--context is not valid JSON")?;
    if !value.is_object() {
        bail!("--context must be a JSON object");
    }
    Ok(map_from_json(value))
}
