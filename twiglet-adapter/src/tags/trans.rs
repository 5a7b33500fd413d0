//! `{% trans %}…{% plural <count> %}…{% endtrans %}`.
//!
//! The block body is read as data. Literal text and single-variable outputs
//! form the catalog source string (`Hello {{ name }}` -> `Hello %name%`).
//! When a `plural` marker is present, `<count> == 1` selects the part before
//! it, anything else the part after it. A catalog hit replaces the selected
//! statements with the translation, placeholders bound back to variables; a
//! miss renders the selected statements unchanged.

use std::any::Any;
use std::sync::{Arc, OnceLock};

use regex::Regex;
use twiglet_engine::{Environment, Expr, Node, Scope, SyntaxError, Tag, TagInstance, TemplateError, Value};

use crate::catalog::Catalog;

static TRANS_PATTERN: OnceLock<Regex> = OnceLock::new();
static PLURAL_PATTERN: OnceLock<Regex> = OnceLock::new();

fn trans_pattern() -> &'static Regex {
    TRANS_PATTERN.get_or_init(|| Regex::new(r"^trans(?:\s+with\s+([\S\s]+?))?\s*$").unwrap())
}

fn plural_pattern() -> &'static Regex {
    PLURAL_PATTERN.get_or_init(|| Regex::new(r"^plural\s+([\S\s]+?)\s*$").unwrap())
}

pub struct TransTag {
    catalog: Option<Arc<Catalog>>,
    domain: String,
}

impl TransTag {
    pub fn new(catalog: Option<Arc<Catalog>>, domain: &str) -> Self {
        TransTag {
            catalog,
            domain: domain.to_string(),
        }
    }
}

impl Tag for TransTag {
    fn name(&self) -> &str {
        "trans"
    }

    fn end_tag(&self) -> Option<&str> {
        Some("endtrans")
    }

    fn compile(&self, source: &str) -> Result<Arc<dyn TagInstance>, SyntaxError> {
        let captures = trans_pattern()
            .captures(source)
            .ok_or_else(|| SyntaxError::new(format!("invalid trans tag `{source}`")))?;
        let options = captures.get(1).map(|m| Expr::parse(m.as_str())).transpose()?;
        Ok(Arc::new(TransInstance {
            catalog: self.catalog.clone(),
            domain: self.domain.clone(),
            options,
        }))
    }
}

/// Marker separating the singular and plural parts of a `trans` block.
pub struct PluralTag;

impl Tag for PluralTag {
    fn name(&self) -> &str {
        "plural"
    }

    fn compile(&self, source: &str) -> Result<Arc<dyn TagInstance>, SyntaxError> {
        let captures = plural_pattern()
            .captures(source)
            .ok_or_else(|| SyntaxError::new("plural expects a count expression"))?;
        let count = Expr::parse(captures.get(1).map(|m| m.as_str()).unwrap_or_default())?;
        Ok(Arc::new(PluralInstance { count }))
    }
}

#[derive(Debug)]
pub struct PluralInstance {
    count: Expr,
}

impl PluralInstance {
    pub fn count(&self) -> &Expr {
        &self.count
    }
}

impl TagInstance for PluralInstance {
    fn render(&self, _env: &Environment, _scope: &mut Scope<'_>, _body: &[Node]) -> Result<String, TemplateError> {
        Ok(String::new())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub struct TransInstance {
    catalog: Option<Arc<Catalog>>,
    domain: String,
    options: Option<Expr>,
}

impl std::fmt::Debug for TransInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransInstance")
            .field("domain", &self.domain)
            .field("options", &self.options)
            .field("catalog", &self.catalog.is_some())
            .finish()
    }
}

impl TransInstance {
    /// `with {context: '…'}` overrides the configured domain.
    fn domain(&self, env: &Environment, scope: &Scope<'_>) -> Result<String, TemplateError> {
        let Some(options) = &self.options else {
            return Ok(self.domain.clone());
        };
        match env.eval(options, scope)?.get_attr("context") {
            Value::Null => Ok(self.domain.clone()),
            context => Ok(context.to_string()),
        }
    }
}

impl TagInstance for TransInstance {
    fn render(&self, env: &Environment, scope: &mut Scope<'_>, body: &[Node]) -> Result<String, TemplateError> {
        let block = TransBlock::extract(body);

        let (selected, source, plural) = match block.plural {
            Some((position, count)) => {
                if env.eval(count, scope)?.loose_eq(&Value::Int(1)) {
                    (&body[..position], &block.singular, false)
                } else {
                    (&body[position + 1..], &block.plural_source, true)
                }
            }
            None => (body, &block.singular, false),
        };
        // Only literal text: the translation is printed as is, `%` included.
        let is_raw = selected.iter().all(|node| matches!(node, Node::Raw(_)));

        let Some(catalog) = self.catalog.as_deref().filter(|_| !source.is_empty()) else {
            return env.render_nodes(selected, scope);
        };
        let domain = self.domain(env, scope)?;
        let translated = if plural {
            catalog.plural(&domain, source)
        } else {
            catalog.singular(&domain, source)
        };
        match translated {
            Some(translated) if is_raw => env.render_nodes(&[Node::Raw(translated.to_string())], scope),
            Some(translated) => env.render_nodes(&split_translation(translated, &block.vars), scope),
            None => {
                tracing::trace!(%domain, source = source.as_str(), "translation miss");
                env.render_nodes(selected, scope)
            }
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// What a `trans` body contributes to catalog lookups.
#[derive(Debug, Default)]
struct TransBlock<'a> {
    singular: String,
    plural_source: String,
    /// Placeholder variables in order of appearance, both parts.
    vars: Vec<String>,
    plural: Option<(usize, &'a Expr)>,
}

impl<'a> TransBlock<'a> {
    fn extract(body: &'a [Node]) -> Self {
        let mut block = TransBlock::default();
        for (position, node) in body.iter().enumerate() {
            let target = if block.plural.is_some() {
                &mut block.plural_source
            } else {
                &mut block.singular
            };
            match node {
                Node::Raw(text) => target.push_str(text),
                Node::Output(expr) => {
                    if let Some(name) = expr.as_var() {
                        target.push('%');
                        target.push_str(name);
                        target.push('%');
                        if !block.vars.iter().any(|v| v == name) {
                            block.vars.push(name.to_string());
                        }
                    }
                }
                Node::Tag(tag) if block.plural.is_none() => {
                    if let Some(marker) = tag.downcast::<PluralInstance>() {
                        block.plural = Some((position, marker.count()));
                    }
                }
                _ => {}
            }
        }
        block
    }
}

/// Statements for a translated string: `%name%` segments naming a recorded
/// variable become outputs, every other non-empty segment raw text.
fn split_translation(translated: &str, vars: &[String]) -> Vec<Node> {
    translated
        .split('%')
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            if vars.iter().any(|v| v == segment) {
                Node::Output(Expr::Var(segment.to_string()))
            } else {
                Node::Raw(segment.to_string())
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn env(catalog: Option<Catalog>) -> Environment {
        let mut env = Environment::new();
        env.add_tag(TransTag::new(catalog.map(Arc::new), ""));
        env.add_tag(PluralTag);
        env
    }

    #[test]
    fn extract_builds_placeholder_sources() {
        let env = env(None);
        let template = env
            .parse("t", "{% trans %}one {{ thing }}{% plural count %}{{ count }} {{ thing }}s{% endtrans %}")
            .unwrap();
        let tag = template.nodes[0].as_tag("trans").unwrap();
        let block = TransBlock::extract(&tag.body);
        assert_eq!(block.singular, "one %thing%");
        assert_eq!(block.plural_source, "%count% %thing%s");
        assert_eq!(block.vars, vec!["thing".to_string(), "count".to_string()]);
        assert_eq!(block.plural.map(|(p, _)| p), Some(2));
    }

    #[test]
    fn split_translation_rebinds_known_variables() {
        let nodes = split_translation("Bonjour %name%, 100%", &["name".to_string()]);
        assert_eq!(nodes.len(), 3);
        assert!(matches!(&nodes[0], Node::Raw(t) if t == "Bonjour "));
        assert!(matches!(&nodes[1], Node::Output(Expr::Var(n)) if n == "name"));
        assert!(matches!(&nodes[2], Node::Raw(t) if t == ", 100"));
    }

    #[test]
    fn without_catalog_the_block_renders_as_written() {
        let env = env(None);
        let template = env
            .compile_template("t", "{% trans %}Hi {{ name }}{% endtrans %}")
            .unwrap();
        let mut scope = Scope::new(twiglet_engine::map_from_json(serde_json::json!({"name": "Ana"})));
        assert_eq!(env.render_template(&template, &mut scope).unwrap(), "Hi Ana");
    }

    #[test]
    fn context_option_selects_the_domain() {
        let catalog = Catalog::parse("msgctxt \"shop\"\nmsgid \"Cart\"\nmsgstr \"Panier\"\n").unwrap();
        let env = env(Some(catalog));
        let template = env
            .compile_template("t", "{% trans %}Cart{% endtrans %}|{% trans with {context: 'shop'} %}Cart{% endtrans %}")
            .unwrap();
        let out = env.render_template(&template, &mut Scope::default()).unwrap();
        assert_eq!(out, "Cart|Panier");
    }

    #[test]
    fn literal_blocks_keep_percent_signs() {
        let catalog = Catalog::parse("msgid \"Save 10%\"\nmsgstr \"Sparen Sie 10%\"\n").unwrap();
        let env = env(Some(catalog));
        let template = env
            .compile_template("t", "{% trans %}Save 10%{% endtrans %}")
            .unwrap();
        let out = env.render_template(&template, &mut Scope::default()).unwrap();
        assert_eq!(out, "Sparen Sie 10%");
    }

    #[test]
    fn malformed_markers_are_syntax_errors() {
        let env = env(None);
        assert!(env.parse("t", "{% trans %}a{% plural %}b{% endtrans %}").is_err());
        assert!(env.parse("t", "{% trans foo %}a{% endtrans %}").is_err());
    }
}
