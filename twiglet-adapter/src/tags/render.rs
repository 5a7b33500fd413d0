//! `{% render <handle> [with <args>] [only] %}`.
//!
//! ```twig
//! {% render '@button--primary' with {label: 'Buy', attributes: {class: 'wide'}} %}
//! {% render ignore missing '@teaser' only %}
//! ```
//!
//! Without `only` the component's default context is placed in a child
//! scope of the caller; with `only` it is rendered from that context alone
//! and the component must exist. `with` arguments only override keys the
//! inner context already defines, and attribute-named keys merge instead of
//! being replaced.

use std::any::Any;
use std::path::Path;
use std::sync::{Arc, OnceLock};

use regex::Regex;
use twiglet_engine::{Environment, Expr, Map, Node, Scope, SyntaxError, Tag, TagInstance, TemplateError, Value};

use crate::attributes::Attributes;
use crate::context::{self, is_attributes_key};
use crate::decorator::RenderDecorator;
use crate::error::AdapterError;

static RENDER_PATTERN: OnceLock<Regex> = OnceLock::new();

fn pattern() -> &'static Regex {
    RENDER_PATTERN.get_or_init(|| {
        Regex::new(r"^render\s+(ignore missing\s+)?(.+?)\s*(?:with\s+([\S\s]+?))?\s*(only)?$").unwrap()
    })
}

pub struct RenderTag {
    decorator: RenderDecorator,
}

impl RenderTag {
    pub fn new(decorator: RenderDecorator) -> Self {
        RenderTag { decorator }
    }
}

impl Tag for RenderTag {
    fn name(&self) -> &str {
        "render"
    }

    fn compile(&self, source: &str) -> Result<Arc<dyn TagInstance>, SyntaxError> {
        let captures = pattern()
            .captures(source)
            .ok_or_else(|| SyntaxError::new(format!("invalid render tag `{source}`")))?;
        let target = captures.get(2).map(|m| m.as_str().trim()).unwrap_or_default();
        let arguments = captures
            .get(3)
            .map(|m| Expr::parse(m.as_str().trim()))
            .transpose()?;
        Ok(Arc::new(RenderInstance {
            decorator: self.decorator.clone(),
            ignore_missing: captures.get(1).is_some(),
            target: Expr::parse(target)?,
            arguments,
            only: captures.get(4).is_some(),
        }))
    }
}

pub struct RenderInstance {
    decorator: RenderDecorator,
    ignore_missing: bool,
    target: Expr,
    arguments: Option<Expr>,
    only: bool,
}

impl std::fmt::Debug for RenderInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderInstance")
            .field("ignore_missing", &self.ignore_missing)
            .field("target", &self.target)
            .field("arguments", &self.arguments)
            .field("only", &self.only)
            .finish()
    }
}

impl RenderInstance {
    pub fn is_only(&self) -> bool {
        self.only
    }

    pub fn ignores_missing(&self) -> bool {
        self.ignore_missing
    }

    fn fail(&self, error: AdapterError) -> Result<String, TemplateError> {
        if self.ignore_missing {
            tracing::debug!(%error, "render ignored");
            return Ok(String::new());
        }
        Err(TemplateError::extension("render", error))
    }
}

impl TagInstance for RenderInstance {
    fn render(&self, env: &Environment, scope: &mut Scope<'_>, _body: &[Node]) -> Result<String, TemplateError> {
        let target = env.eval(&self.target, scope)?;
        let file = match &target {
            Value::Template(template) => template.name.clone(),
            other => other.to_string(),
        };
        let stem = Path::new(&file)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| file.clone());
        let handle = self.decorator.canonical_handle(&stem);

        let mut vars = match self.decorator.source().find(handle.as_str()) {
            Some(entity) => context::from_context(entity.render_context()),
            None if self.only => {
                return self.fail(AdapterError::ComponentNotFound {
                    handle: handle.to_string(),
                });
            }
            None => Map::new(),
        };
        context::materialize(&mut vars);
        tracing::debug!(%handle, only = self.only, "render");

        let mut inner = if self.only {
            Scope::new(vars)
        } else {
            scope.child_with(vars)
        };

        if let Some(arguments) = &self.arguments {
            match env.eval(arguments, scope)? {
                Value::Map(overrides) => apply_overrides(&mut inner, overrides),
                Value::Null => {}
                other => {
                    return Err(TemplateError::extension(
                        "render",
                        AdapterError::InvalidArguments(other.to_string()),
                    ))
                }
            }
        }

        let template = match target {
            Value::Template(template) => template,
            _ => match env.load_template(&file) {
                Ok(template) => template,
                Err(TemplateError::NotFound { name }) if name == file && self.ignore_missing => {
                    tracing::debug!(%name, "render ignored missing template");
                    return Ok(String::new());
                }
                Err(e) => return Err(e),
            },
        };
        self.decorator.render(env, &template, &mut inner)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Apply `with` arguments to the inner scope. Keys the scope does not define
/// and null values are ignored; attribute-named keys merge into the existing
/// attribute set, every other key is replaced.
pub fn apply_overrides(inner: &mut Scope<'_>, overrides: Map) {
    for (name, value) in overrides {
        if value.is_null() || !inner.contains(&name) {
            continue;
        }
        if is_attributes_key(&name) {
            let mut attributes = inner
                .get(&name)
                .map(Attributes::from_value)
                .unwrap_or_default();
            attributes.merge(&value);
            inner.set(name, attributes.into_value());
        } else {
            inner.set(name, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn captures(source: &str) -> Option<(bool, String, Option<String>, bool)> {
        let c = pattern().captures(source)?;
        Some((
            c.get(1).is_some(),
            c.get(2)?.as_str().to_string(),
            c.get(3).map(|m| m.as_str().to_string()),
            c.get(4).is_some(),
        ))
    }

    #[test]
    fn grammar_variants() {
        assert_eq!(captures("render '@a'"), Some((false, "'@a'".into(), None, false)));
        assert_eq!(captures("render '@a' only"), Some((false, "'@a'".into(), None, true)));
        assert_eq!(
            captures("render ignore missing '@a' with {x: 1} only"),
            Some((true, "'@a'".into(), Some("{x: 1}".into()), true))
        );
        assert_eq!(
            captures("render name ~ '--wide' with {\n  a: b\n}"),
            Some((false, "name ~ '--wide'".into(), Some("{\n  a: b\n}".into()), false))
        );
        assert_eq!(captures("render"), None);
    }

    #[test]
    fn overrides_skip_undefined_keys_and_nulls() {
        let root = Scope::new(twiglet_engine::map_from_json(serde_json::json!({"caller": "c"})));
        let mut inner = root.child_with(twiglet_engine::map_from_json(serde_json::json!({
            "title": "Default",
            "foo": "keep",
            "attributes": {"class": "a"}
        })));
        context::materialize(inner.vars_mut());
        let overrides = twiglet_engine::map_from_json(serde_json::json!({
            "title": "New",
            "foo": null,
            "unknown": 1,
            "caller": "override",
            "attributes": {"class": "b", "id": "x"}
        }));
        apply_overrides(&mut inner, overrides);
        assert_eq!(inner.get("title"), Some(&Value::from("New")));
        assert_eq!(inner.get("foo"), Some(&Value::from("keep")));
        assert!(inner.get("unknown").is_none());
        assert_eq!(inner.get("caller"), Some(&Value::from("override")));
        assert_eq!(root.get("caller"), Some(&Value::from("c")));
        assert_eq!(
            inner.get("attributes").map(Value::to_string).as_deref(),
            Some(r#" class="a b" id="x""#)
        );
    }
}
