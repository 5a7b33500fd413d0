//! The adapter: one engine environment wired to a component registry.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use twiglet_core::ComponentSource;
use twiglet_engine::{Environment, Map, Scope, Value};

use crate::catalog::Catalog;
use crate::config::AdapterConfig;
use crate::context;
use crate::decorator::RenderDecorator;
use crate::error::AdapterError;
use crate::extensions;
use crate::loader::ComponentLoader;
use crate::tags::{apply_overrides, PluralTag, RenderTag, TransTag};

/// Host metadata for a render call.
#[derive(Debug, Clone, Default)]
pub struct RenderMeta {
    /// The entity being rendered, as the registry serializes it.
    pub self_entity: Option<serde_json::Value>,
    /// The entity a preview wraps, if any.
    pub target: Option<serde_json::Value>,
    pub env: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    ViewUpdated,
    ViewRemoved,
    WrapperUpdated,
    WrapperRemoved,
}

/// A template file changed on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub path: PathBuf,
}

pub struct TwigAdapter {
    env: Environment,
    source: Arc<dyn ComponentSource>,
    config: Arc<AdapterConfig>,
    decorator: RenderDecorator,
}

impl TwigAdapter {
    /// Build an adapter, loading the configured catalog if there is one.
    pub fn new(source: Arc<dyn ComponentSource>, config: AdapterConfig) -> Result<Self, AdapterError> {
        let catalog = match &config.catalog {
            Some(path) => {
                let catalog = Catalog::load_at(path)?;
                tracing::debug!(path = %path.display(), entries = catalog.len(), "loaded catalog");
                Some(catalog)
            }
            None => None,
        };
        Ok(Self::with_catalog(source, config, catalog))
    }

    pub fn with_catalog(source: Arc<dyn ComponentSource>, config: AdapterConfig, catalog: Option<Catalog>) -> Self {
        let config = Arc::new(config);
        let catalog = catalog.map(Arc::new);
        let decorator = RenderDecorator::new(Arc::clone(&source), Arc::clone(&config));
        let mut env = Environment::with_loader(ComponentLoader::new(
            Arc::clone(&source),
            &config.handle_prefix,
            config.libraries.clone(),
        ));
        if !config.pristine {
            env.add_tag(RenderTag::new(decorator.clone()));
            env.add_tag(TransTag::new(catalog.clone(), &config.text_domain));
            env.add_tag(PluralTag);
            extensions::register(&mut env, catalog, &config.text_domain);
        }
        TwigAdapter {
            env,
            source,
            config,
            decorator,
        }
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    /// For registering project-specific filters, functions and tags.
    pub fn env_mut(&mut self) -> &mut Environment {
        &mut self.env
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    pub fn source(&self) -> &dyn ComponentSource {
        self.source.as_ref()
    }

    /// Render `source`, the content of the view at `path`, with `context`.
    pub fn render(&self, path: &Path, source: &str, mut context: Map, meta: &RenderMeta) -> Result<String, AdapterError> {
        context::materialize(&mut context);
        self.inject(&mut context, meta);

        let self_handle = meta
            .self_entity
            .as_ref()
            .and_then(|entity| entity.get("handle"))
            .and_then(serde_json::Value::as_str);
        let name = match self_handle {
            Some(handle) => format!("{}{handle}", self.config.handle_prefix),
            None => relative_name(self.source.root(), path),
        };
        tracing::debug!(template = %name, "render");

        let template = self.env.compile_template(&name, source)?;
        let mut scope = Scope::new(context);
        Ok(self.decorator.render(&self.env, &template, &mut scope)?)
    }

    /// Render a component or variant from its own context, with `overrides`
    /// applied the way `render … with` applies them.
    pub fn render_handle(&self, handle: &str, overrides: Map) -> Result<String, AdapterError> {
        let handle = self.decorator.canonical_handle(handle);
        let entity = self
            .source
            .find(handle.as_str())
            .ok_or_else(|| AdapterError::ComponentNotFound {
                handle: handle.to_string(),
            })?;
        let meta = RenderMeta {
            self_entity: Some(entity.to_json()),
            ..RenderMeta::default()
        };
        let mut vars = context::from_context(entity.render_context());
        self.inject(&mut vars, &meta);

        let name = handle.with_prefix(&self.config.handle_prefix);
        tracing::debug!(template = %name, "render handle");
        let template = self.env.load_template(&name)?;

        let mut scope = Scope::new(vars);
        apply_overrides(&mut scope, overrides);
        Ok(self.decorator.render(&self.env, &template, &mut scope)?)
    }

    /// Evict every cached template backed by the changed file. Returns the
    /// number of entries removed.
    pub fn on_change(&self, event: &ChangeEvent) -> usize {
        let root = self.source.root();
        let absolute = if event.path.is_absolute() {
            event.path.clone()
        } else {
            root.join(&event.path)
        };
        let mut evicted = usize::from(self.env.invalidate(&relative_name(root, &absolute)));
        for view in self.source.views().iter().filter(|v| v.path == absolute) {
            if self.env.invalidate(&view.handle.with_prefix(&self.config.handle_prefix)) {
                evicted += 1;
            }
        }
        tracing::debug!(kind = ?event.kind, path = %event.path.display(), evicted, "template cache eviction");
        evicted
    }

    /// `_self`, `_target`, `_env` and `_config`, each only when absent.
    fn inject(&self, context: &mut Map, meta: &RenderMeta) {
        if self.config.pristine {
            return;
        }
        let entries = [
            ("_self", meta.self_entity.clone()),
            ("_target", meta.target.clone()),
            ("_env", meta.env.clone()),
            ("_config", Some(self.config.to_json())),
        ];
        for (key, value) in entries {
            if let Some(value) = value {
                context.entry(key.to_string()).or_insert_with(|| Value::from(value));
            }
        }
    }
}

fn relative_name(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .into_owned()
}
