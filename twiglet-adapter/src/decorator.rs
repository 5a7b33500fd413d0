//! Render-context decorator.
//!
//! Every component render goes through [`RenderDecorator::render`] before
//! reaching the engine. It looks up the entity behind the template name and
//! adjusts the context so `_self` and the inherited classes always describe
//! the template actually being rendered, not the root caller.

use std::sync::Arc;

use twiglet_core::{ComponentSource, Entity, Handle};
use twiglet_engine::{map_from_json, Environment, Map, Scope, Template, TemplateError, Value};

use crate::attributes::{class_tokens, Attributes};
use crate::config::AdapterConfig;
use crate::context::{self, is_attributes_key};

#[derive(Clone)]
pub struct RenderDecorator {
    source: Arc<dyn ComponentSource>,
    config: Arc<AdapterConfig>,
}

impl RenderDecorator {
    pub fn new(source: Arc<dyn ComponentSource>, config: Arc<AdapterConfig>) -> Self {
        RenderDecorator { source, config }
    }

    pub fn source(&self) -> &dyn ComponentSource {
        self.source.as_ref()
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    /// Canonical `@` handle for a template name or handle written with the
    /// configured prefix.
    pub fn canonical_handle(&self, name: &str) -> Handle {
        let bare = name.strip_prefix(self.config.handle_prefix.as_str()).unwrap_or(name);
        Handle::new(bare)
    }

    /// The entity a template name refers to: a prefixed handle, or the path
    /// (relative to the source root) of a registered view.
    pub fn entity_for(&self, template_name: &str) -> Option<Entity<'_>> {
        if template_name.starts_with(self.config.handle_prefix.as_str()) {
            return self.source.find(self.canonical_handle(template_name).as_str());
        }
        let path = self.source.root().join(template_name);
        let view = self.source.views().iter().find(|v| v.path == path)?;
        self.source.find(view.handle.as_str())
    }

    /// Adjust `vars` for a render of `template_name`.
    pub fn decorate(&self, template_name: &str, vars: &mut Map) {
        if self.config.pristine {
            return;
        }
        let Some(entity) = self.entity_for(template_name) else {
            return;
        };
        inherit_default_classes(&entity, vars);
        if self.config.import_context {
            let defaults = context::from_context(entity.render_context());
            fill_defaults(vars, defaults);
        }
        vars.insert("_self".to_string(), Value::from(entity.to_json()));
    }

    /// Decorate the scope's own variables, then render.
    pub fn render(
        &self,
        env: &Environment,
        template: &Template,
        scope: &mut Scope<'_>,
    ) -> Result<String, TemplateError> {
        self.decorate(&template.name, scope.vars_mut());
        env.render_template(template, scope)
    }
}

/// Put the classes of the parent's default variant in front of a non-default
/// variant's own classes, for every attribute-named key of the default
/// context. Parent classes come first; the child's are appended.
fn inherit_default_classes(entity: &Entity<'_>, vars: &mut Map) {
    if entity.is_default() {
        return;
    }
    for (name, value) in &entity.default_variant().context {
        if !is_attributes_key(name) {
            continue;
        }
        let Some(class) = value.get("class") else {
            continue;
        };
        let tokens = class_tokens(&Value::from(class.clone()));
        if tokens.is_empty() {
            continue;
        }
        let mut attributes = vars
            .get(name)
            .map(Attributes::from_value)
            .unwrap_or_default();
        attributes.prepend_classes(tokens);
        vars.insert(name.clone(), attributes.into_value());
    }
}

/// Insert every key of `defaults` missing from `vars`, recursing into
/// mappings present on both sides.
pub fn fill_defaults(vars: &mut Map, defaults: Map) {
    for (key, default) in defaults {
        match (vars.get_mut(&key), default) {
            (None, default) => {
                vars.insert(key, default);
            }
            (Some(Value::Map(existing)), Value::Map(nested)) => fill_defaults(existing, nested),
            _ => {}
        }
    }
}

/// A JSON context as a materialized engine map.
pub fn json_context(value: serde_json::Value) -> Map {
    let mut map = map_from_json(value);
    context::materialize(&mut map);
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use twiglet_core::Library;

    fn write(dir: &std::path::Path, rel: &str, contents: &str) {
        let path = dir.join(rel);
        std::fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        std::fs::write(path, contents).expect("write");
    }

    fn decorator(config: AdapterConfig) -> (tempfile::TempDir, RenderDecorator) {
        let dir = tempfile::TempDir::new().expect("tempdir");
        write(dir.path(), "child/child.twig", "<div{{ attributes }}></div>");
        write(
            dir.path(),
            "child/child.config.yml",
            "context:\n  title: Default\n  attributes:\n    class: \"a b\"\nvariants:\n  - name: alt\n    context:\n      attributes:\n        class: c\n",
        );
        let lib = Library::load_at(dir.path()).expect("load");
        (dir, RenderDecorator::new(Arc::new(lib), Arc::new(config)))
    }

    #[test]
    fn non_default_variant_inherits_parent_classes_first() {
        let (_dir, decorator) = decorator(AdapterConfig::default());
        let mut vars = json_context(json!({"attributes": {"class": "c"}}));
        decorator.decorate("@child--alt", &mut vars);
        let attributes = context::attributes_of(&vars, "attributes").unwrap();
        assert_eq!(attributes.to_string(), r#" class="a b c""#);
        assert_eq!(vars["_self"].get_attr("handle"), Value::from("child--alt"));
    }

    #[test]
    fn inheritance_is_idempotent() {
        let (_dir, decorator) = decorator(AdapterConfig::default());
        let mut vars = json_context(json!({"attributes": {"class": "c"}}));
        decorator.decorate("@child--alt", &mut vars);
        decorator.decorate("@child--alt", &mut vars);
        let attributes = context::attributes_of(&vars, "attributes").unwrap();
        assert_eq!(attributes.classes(), ["a", "b", "c"]);
    }

    #[test]
    fn default_variant_is_left_alone() {
        let (_dir, decorator) = decorator(AdapterConfig::default());
        let mut vars = json_context(json!({"attributes": {"class": "x"}}));
        decorator.decorate("@child", &mut vars);
        let attributes = context::attributes_of(&vars, "attributes").unwrap();
        assert_eq!(attributes.to_string(), r#" class="x""#);
    }

    #[test]
    fn import_context_fills_missing_keys_only() {
        let config = AdapterConfig {
            import_context: true,
            ..AdapterConfig::default()
        };
        let (_dir, decorator) = decorator(config);
        let mut vars = json_context(json!({"extra": 1}));
        decorator.decorate("child/child.twig", &mut vars);
        assert_eq!(vars["title"], Value::from("Default"));
        assert_eq!(vars["extra"], Value::Int(1));
    }

    #[test]
    fn pristine_and_unknown_templates_are_untouched() {
        let config = AdapterConfig {
            pristine: true,
            ..AdapterConfig::default()
        };
        let (_dir, pristine) = decorator(config);
        let mut vars = Map::new();
        pristine.decorate("@child--alt", &mut vars);
        assert!(vars.is_empty());

        let (_dir, decorator) = decorator(AdapterConfig::default());
        decorator.decorate("page.twig", &mut vars);
        assert!(vars.is_empty());
    }

    #[test]
    fn fill_defaults_recurses_into_shared_maps() {
        let mut vars = map_from_json(json!({"card": {"title": "Mine"}}));
        fill_defaults(&mut vars, map_from_json(json!({"card": {"title": "Theirs", "body": "B"}, "n": 1})));
        assert_eq!(vars["card"].get_attr("title"), Value::from("Mine"));
        assert_eq!(vars["card"].get_attr("body"), Value::from("B"));
        assert_eq!(vars["n"], Value::Int(1));
    }
}
