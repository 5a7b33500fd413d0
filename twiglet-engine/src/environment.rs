//! Template environment: extension registry, loader and template cache.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use crate::builtins;
use crate::error::TemplateError;
use crate::eval;
use crate::expr::Expr;
use crate::parser::{self, Node, Template};
use crate::scope::Scope;
use crate::tag::Tag;
use crate::value::{Map, Value};

/// `value|name(args…)`.
pub type FilterFn = dyn Fn(&Value, &[Value]) -> Result<Value, TemplateError> + Send + Sync;

/// `name(args…)`.
pub type FunctionFn = dyn Fn(&Environment, &[Value]) -> Result<Value, TemplateError> + Send + Sync;

// ---------------------------------------------------------------------------
// Loader
// ---------------------------------------------------------------------------

/// Resolves a template name to its source text.
pub trait Loader: Send + Sync {
    /// `Ok(None)` when the name is unknown to this loader.
    fn load(&self, name: &str) -> Result<Option<String>, TemplateError>;
}

/// Loader over an in-memory name → source table.
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    templates: HashMap<String, String>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, source: &str) -> Self {
        self.insert(name, source);
        self
    }

    pub fn insert(&mut self, name: &str, source: &str) {
        self.templates.insert(name.to_string(), source.to_string());
    }
}

impl Loader for MemoryLoader {
    fn load(&self, name: &str) -> Result<Option<String>, TemplateError> {
        Ok(self.templates.get(name).cloned())
    }
}

// ---------------------------------------------------------------------------
// TemplateCache
// ---------------------------------------------------------------------------

/// Compiled templates keyed by name.
///
/// Entries live until they are explicitly invalidated.
#[derive(Debug, Default)]
pub struct TemplateCache {
    entries: RwLock<HashMap<String, Arc<Template>>>,
}

impl TemplateCache {
    pub fn get(&self, key: &str) -> Option<Arc<Template>> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.get(key).cloned()
    }

    pub fn insert(&self, key: &str, template: Arc<Template>) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), template);
    }

    /// Evict `key`; returns whether an entry was present.
    pub fn invalidate(&self, key: &str) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.remove(key).is_some()
    }

    pub fn clear(&self) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.clear();
    }

    pub fn contains(&self, key: &str) -> bool {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ---------------------------------------------------------------------------
// Environment
// ---------------------------------------------------------------------------

struct NoLoader;

impl Loader for NoLoader {
    fn load(&self, _name: &str) -> Result<Option<String>, TemplateError> {
        Ok(None)
    }
}

pub struct Environment {
    tags: HashMap<String, Arc<dyn Tag>>,
    filters: HashMap<String, Arc<FilterFn>>,
    functions: HashMap<String, Arc<FunctionFn>>,
    loader: Box<dyn Loader>,
    cache: TemplateCache,
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut tags: Vec<_> = self.tags.keys().collect();
        tags.sort();
        f.debug_struct("Environment")
            .field("tags", &tags)
            .field("filters", &self.filters.len())
            .field("functions", &self.functions.len())
            .field("cached", &self.cache.len())
            .finish()
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment {
    /// Environment with the built-in filters and functions and no loader.
    pub fn new() -> Self {
        let mut env = Environment {
            tags: HashMap::new(),
            filters: HashMap::new(),
            functions: HashMap::new(),
            loader: Box::new(NoLoader),
            cache: TemplateCache::default(),
        };
        builtins::register(&mut env);
        env
    }

    pub fn with_loader(loader: impl Loader + 'static) -> Self {
        let mut env = Self::new();
        env.set_loader(loader);
        env
    }

    pub fn set_loader(&mut self, loader: impl Loader + 'static) {
        self.loader = Box::new(loader);
    }

    pub fn add_tag(&mut self, tag: impl Tag + 'static) {
        self.tags.insert(tag.name().to_string(), Arc::new(tag));
    }

    pub fn add_filter<F>(&mut self, name: &str, filter: F)
    where
        F: Fn(&Value, &[Value]) -> Result<Value, TemplateError> + Send + Sync + 'static,
    {
        self.filters.insert(name.to_string(), Arc::new(filter));
    }

    pub fn add_function<F>(&mut self, name: &str, function: F)
    where
        F: Fn(&Environment, &[Value]) -> Result<Value, TemplateError> + Send + Sync + 'static,
    {
        self.functions.insert(name.to_string(), Arc::new(function));
    }

    pub fn has_tag(&self, name: &str) -> bool {
        self.tags.contains_key(name)
    }

    pub fn has_filter(&self, name: &str) -> bool {
        self.filters.contains_key(name)
    }

    pub fn has_function(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn cache(&self) -> &TemplateCache {
        &self.cache
    }

    /// Drop the cached compilation of `name`.
    pub fn invalidate(&self, name: &str) -> bool {
        self.cache.invalidate(name)
    }

    /// Compile without touching the cache.
    pub fn parse(&self, name: &str, source: &str) -> Result<Template, TemplateError> {
        parser::parse(&self.tags, name, source)
    }

    /// Compile precompiled source and cache it under `name`.
    pub fn compile_template(&self, name: &str, source: &str) -> Result<Arc<Template>, TemplateError> {
        let template = Arc::new(self.parse(name, source)?);
        self.cache.insert(name, Arc::clone(&template));
        Ok(template)
    }

    /// Cached template `name`, loading and compiling it on a miss.
    pub fn load_template(&self, name: &str) -> Result<Arc<Template>, TemplateError> {
        if let Some(template) = self.cache.get(name) {
            return Ok(template);
        }
        match self.loader.load(name)? {
            Some(source) => self.compile_template(name, &source),
            None => Err(TemplateError::NotFound {
                name: name.to_string(),
            }),
        }
    }

    pub fn render(&self, name: &str, vars: Map) -> Result<String, TemplateError> {
        let template = self.load_template(name)?;
        self.render_template(&template, &mut Scope::new(vars))
    }

    pub fn render_template(&self, template: &Template, scope: &mut Scope<'_>) -> Result<String, TemplateError> {
        self.render_nodes(&template.nodes, scope)
    }

    /// Render a statement sequence against `scope`.
    pub fn render_nodes(&self, nodes: &[Node], scope: &mut Scope<'_>) -> Result<String, TemplateError> {
        let mut out = String::new();
        eval::render_into(self, nodes, scope, &mut out)?;
        Ok(out)
    }

    pub fn eval(&self, expr: &Expr, scope: &Scope<'_>) -> Result<Value, TemplateError> {
        eval::eval(self, expr, scope)
    }

    pub fn apply_filter(&self, name: &str, value: &Value, args: &[Value]) -> Result<Value, TemplateError> {
        let filter = self
            .filters
            .get(name)
            .ok_or_else(|| TemplateError::UnknownFilter(name.to_string()))?;
        filter(value, args)
    }

    pub fn call_function(&self, name: &str, args: &[Value]) -> Result<Value, TemplateError> {
        let function = self
            .functions
            .get(name)
            .ok_or_else(|| TemplateError::UnknownFunction(name.to_string()))?;
        function(self, args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_hits_skip_the_loader() {
        let env = Environment::with_loader(MemoryLoader::new().with("a", "A"));
        assert_eq!(env.render("a", Map::new()).unwrap(), "A");
        assert!(env.cache().contains("a"));
        assert!(env.invalidate("a"));
        assert!(!env.invalidate("a"));
    }

    #[test]
    fn precompiled_source_shadows_the_loader() {
        let env = Environment::with_loader(MemoryLoader::new().with("a", "from loader"));
        env.compile_template("a", "inline").unwrap();
        assert_eq!(env.render("a", Map::new()).unwrap(), "inline");
    }

    #[test]
    fn missing_template_is_not_found() {
        let env = Environment::new();
        let err = env.render("nope.twig", Map::new()).unwrap_err();
        assert_eq!(err.to_string(), "Template nope.twig not found");
    }
}
