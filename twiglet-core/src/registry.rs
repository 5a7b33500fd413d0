//! Component library scanned from a directory tree.
//!
//! # Storage layout
//!
//! ```text
//! <root>/
//!   button/
//!     button.twig          (view — the component)
//!     button.config.yml    (label, context, variants; optional)
//!     button.data.yml      (pattern-library dummy data; optional)
//! ```
//!
//! Files named `<name>--<variant>.twig` are variant view files of another
//! tool's convention and are skipped; variants come from the config.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::config::{self, ComponentConfig, DEFAULT_VARIANT};
use crate::error::{io_err, RegistryError};
use crate::types::{Component, ContextMap, Entity, Handle, Variant, View};

const TEMPLATE_EXTENSION: &str = "twig";
const CONFIG_SUFFIXES: &[&str] = &[".config.yml", ".config.yaml", ".config.json"];
const DATA_SUFFIX: &str = ".data.yml";

// ---------------------------------------------------------------------------
// ComponentSource
// ---------------------------------------------------------------------------

/// Read-only access to a component registry.
pub trait ComponentSource: Send + Sync {
    /// Directory all view paths live under.
    fn root(&self) -> &Path;

    /// Resolve a handle (with or without sigil) to a component or variant.
    fn find(&self, handle: &str) -> Option<Entity<'_>>;

    /// Every template reachable under a handle.
    fn views(&self) -> &[View];

    /// Source text of a view.
    fn view_content(&self, view: &View) -> Result<String, RegistryError> {
        std::fs::read_to_string(&view.path).map_err(|e| io_err(&view.path, e))
    }
}

// ---------------------------------------------------------------------------
// Library
// ---------------------------------------------------------------------------

/// Slot of a handle inside [`Library::components`].
#[derive(Debug, Clone, Copy)]
enum Slot {
    Component(usize),
    Variant(usize, usize),
}

/// Components loaded from a directory tree.
#[derive(Debug, Clone)]
pub struct Library {
    root: PathBuf,
    components: Vec<Component>,
    views: Vec<View>,
    index: HashMap<String, Slot>,
}

impl Library {
    /// Scan `root` recursively for `.twig` views and their config files.
    pub fn load_at(root: &Path) -> Result<Self, RegistryError> {
        let mut files = Vec::new();
        collect_files(root, &mut files)?;
        files.sort();

        let mut components = Vec::new();
        for path in files {
            if path.extension().and_then(|s| s.to_str()) != Some(TEMPLATE_EXTENSION) {
                continue;
            }
            let Some(stem) = path.file_stem().map(|s| s.to_string_lossy().into_owned()) else {
                continue;
            };
            if stem.contains("--") {
                continue;
            }
            let config = load_component_config(&path, &stem)?;
            components.push(build_component(path, &stem, config));
        }
        Self::from_components(root.to_path_buf(), components)
    }

    /// Build a library from already-assembled components.
    pub fn from_components(root: PathBuf, components: Vec<Component>) -> Result<Self, RegistryError> {
        let mut index = HashMap::new();
        let mut views = Vec::new();
        for (ci, component) in components.iter().enumerate() {
            register(&mut index, &component.handle, Slot::Component(ci), &component.view_path)?;
            views.push(View {
                handle: component.handle.clone(),
                path: component.view_path.clone(),
            });
            for (vi, variant) in component.variants.iter().enumerate() {
                register(&mut index, &variant.handle, Slot::Variant(ci, vi), &component.view_path)?;
                views.push(View {
                    handle: variant.handle.clone(),
                    path: component.view_path.clone(),
                });
            }
        }
        Ok(Library {
            root,
            components,
            views,
            index,
        })
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    /// Every handle in registration order, components before their variants.
    pub fn handles(&self) -> impl Iterator<Item = &Handle> {
        self.views.iter().map(|v| &v.handle)
    }
}

impl ComponentSource for Library {
    fn root(&self) -> &Path {
        &self.root
    }

    fn find(&self, handle: &str) -> Option<Entity<'_>> {
        let handle = Handle::new(handle);
        match *self.index.get(handle.as_str())? {
            Slot::Component(ci) => Some(Entity::Component(&self.components[ci])),
            Slot::Variant(ci, vi) => {
                let parent = &self.components[ci];
                Some(Entity::Variant {
                    variant: &parent.variants[vi],
                    parent,
                })
            }
        }
    }

    fn views(&self) -> &[View] {
        &self.views
    }
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

fn register(
    index: &mut HashMap<String, Slot>,
    handle: &Handle,
    slot: Slot,
    path: &Path,
) -> Result<(), RegistryError> {
    if index.insert(handle.0.clone(), slot).is_some() {
        return Err(RegistryError::DuplicateHandle {
            handle: handle.0.clone(),
            path: path.to_path_buf(),
        });
    }
    Ok(())
}

fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), RegistryError> {
    let entries = std::fs::read_dir(dir).map_err(|e| io_err(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| io_err(dir, e))?;
        let path = entry.path();
        let meta = entry.metadata().map_err(|e| io_err(&path, e))?;
        if meta.is_dir() {
            collect_files(&path, out)?;
        } else if meta.is_file() {
            out.push(path);
        }
    }
    Ok(())
}

fn read_yaml(path: &Path) -> Result<Value, RegistryError> {
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    let value: Option<Value> = serde_yaml::from_str(&contents).map_err(|e| RegistryError::Parse {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(value.unwrap_or(Value::Null))
}

fn load_component_config(view: &Path, stem: &str) -> Result<ComponentConfig, RegistryError> {
    let dir = view.parent().unwrap_or(Path::new(""));
    let config_path = CONFIG_SUFFIXES
        .iter()
        .map(|suffix| dir.join(format!("{stem}{suffix}")))
        .find(|p| p.is_file());
    let data_path = Some(dir.join(format!("{stem}{DATA_SUFFIX}"))).filter(|p| p.is_file());

    let mut merged = match &config_path {
        Some(path) => read_yaml(path)?,
        None => Value::Null,
    };
    if let Some(path) = &data_path {
        merged = config::merge_config(merged, read_yaml(path)?);
    }
    if merged.is_null() {
        return Ok(ComponentConfig::default());
    }
    let origin = data_path.or(config_path).unwrap_or_else(|| view.to_path_buf());
    serde_json::from_value(merged).map_err(|e| RegistryError::Config {
        path: origin,
        source: e,
    })
}

fn build_component(view_path: PathBuf, stem: &str, config: ComponentConfig) -> Component {
    let name = config.handle.clone().unwrap_or_else(|| stem.to_string());
    let handle = Handle::new(&name);
    let label = config.label.clone().unwrap_or_else(|| title_case(stem));
    let default_name = config.default.as_deref().unwrap_or(DEFAULT_VARIANT);

    let mut variants: Vec<Variant> = config
        .variants
        .iter()
        .map(|vc| Variant {
            handle: handle.variant(&vc.name),
            name: vc.name.clone(),
            label: vc.label.clone().unwrap_or_else(|| title_case(&vc.name)),
            is_default: vc.name == default_name,
            context: merged_context(&config.context, &vc.context),
        })
        .collect();

    if !variants.iter().any(|v| v.is_default) {
        variants.insert(
            0,
            Variant {
                handle: handle.variant(default_name),
                name: default_name.to_string(),
                label: title_case(default_name),
                is_default: true,
                context: config.context.clone(),
            },
        );
    }

    Component {
        handle,
        name,
        label,
        view_path,
        context: config.context,
        variants,
    }
}

fn merged_context(component: &ContextMap, variant: &ContextMap) -> ContextMap {
    let mut merged = component.clone();
    config::deep_merge_map(&mut merged, variant.clone());
    merged
}

fn title_case(name: &str) -> String {
    let spaced = name.replace(['-', '_'], " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
