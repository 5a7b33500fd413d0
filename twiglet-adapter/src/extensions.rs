//! Filters and functions available to component templates.
//!
//! | Name          | Kind     | Result                                              |
//! |---------------|----------|-----------------------------------------------------|
//! | `t`, `trans`  | filter   | catalog translation, the input itself on a miss     |
//! | `field_value` | filter   | the input                                           |
//! | `without`     | filter   | a copy without the listed keys                      |
//! | `path`        | function | `#<route><query>`                                   |
//! | `url`         | function | `url://<route><query>`                              |
//! | `link`        | function | `<a href=…>` when a url is given, otherwise `<span>` |

use std::sync::Arc;

use twiglet_engine::{Environment, Map, TemplateError, Value};
use url::form_urlencoded::byte_serialize;

use crate::attributes::Attributes;
use crate::catalog::Catalog;

/// Register every filter and function on `env`.
pub fn register(env: &mut Environment, catalog: Option<Arc<Catalog>>, domain: &str) {
    for name in ["t", "trans"] {
        let catalog = catalog.clone();
        let domain = domain.to_string();
        env.add_filter(name, move |value, args| Ok(translate(catalog.as_deref(), &domain, value, args)));
    }
    env.add_filter("field_value", |value, _| Ok(value.clone()));
    env.add_filter("without", |value, args| Ok(without(value, args)));

    env.add_function("path", |_, args| Ok(Value::String(route("#", args))));
    env.add_function("url", |_, args| Ok(Value::String(route("url://", args))));
    env.add_function("link", |_, args| link(args));
}

fn translate(catalog: Option<&Catalog>, domain: &str, value: &Value, args: &[Value]) -> Value {
    let source = value.to_string();
    let mut text = match catalog.and_then(|c| c.singular(domain, &source)) {
        Some(translated) => translated.to_string(),
        None => {
            if catalog.is_some() {
                tracing::trace!(domain, source = source.as_str(), "translation miss");
            }
            source
        }
    };
    if let Some(Value::Map(placeholders)) = args.first() {
        for (placeholder, replacement) in placeholders {
            text = text.replace(placeholder.as_str(), &replacement.to_string());
        }
    }
    Value::String(text)
}

/// Keys to drop, from string arguments or sequences of them.
fn excluded_keys(args: &[Value]) -> Vec<String> {
    args.iter()
        .flat_map(|arg| match arg {
            Value::Array(items) => items.iter().map(Value::to_string).collect(),
            Value::Null => Vec::new(),
            other => vec![other.to_string()],
        })
        .collect()
}

fn without(value: &Value, args: &[Value]) -> Value {
    let excluded = excluded_keys(args);
    if let Some(mut copy) = Attributes::snapshot_of(value) {
        for key in &excluded {
            if key == "class" {
                let classes = copy.classes().to_vec();
                copy.remove_class(classes);
            } else {
                copy.remove_attribute(key);
            }
        }
        return copy.into_value();
    }
    match value {
        Value::Map(map) => {
            let mut copy = map.clone();
            for key in &excluded {
                copy.shift_remove(key);
            }
            Value::Map(copy)
        }
        other => other.clone(),
    }
}

fn route(scheme: &str, args: &[Value]) -> String {
    let target = args.first().map(Value::to_string).unwrap_or_default();
    let query = match args.get(1) {
        Some(Value::Map(query)) => query_string(query),
        _ => String::new(),
    };
    format!("{scheme}{target}{query}")
}

/// Form-encoded `key=value` pairs joined with `&`, keys sorted. Sequences
/// repeat their key and null values leave the key bare.
pub fn query_string(query: &Map) -> String {
    let mut keys: Vec<&String> = query.keys().collect();
    keys.sort();
    let mut pairs = Vec::new();
    for key in keys {
        let name: String = byte_serialize(key.as_bytes()).collect();
        match &query[key] {
            Value::Null => pairs.push(name),
            Value::Array(items) => {
                for item in items {
                    pairs.push(encode_pair(&name, item));
                }
            }
            value => pairs.push(encode_pair(&name, value)),
        }
    }
    pairs.join("&")
}

fn encode_pair(name: &str, value: &Value) -> String {
    let value: String = byte_serialize(value.to_string().as_bytes()).collect();
    format!("{name}={value}")
}

fn link(args: &[Value]) -> Result<Value, TemplateError> {
    let text = args
        .first()
        .map(Value::to_string)
        .ok_or_else(|| TemplateError::runtime("link() expects the link text"))?;
    let url = args.get(1).map(Value::to_string).unwrap_or_default();
    let mut attributes = args.get(2).map(Attributes::from_value).unwrap_or_default();
    let tag = if url.is_empty() {
        "span"
    } else {
        attributes.set_attribute("href", Value::String(url));
        "a"
    };
    Ok(Value::String(format!("<{tag}{attributes}>{text}</{tag}>")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::json;
    use twiglet_engine::{map_from_json, MemoryLoader};

    fn render(source: &str, vars: serde_json::Value) -> String {
        let catalog = Catalog::parse("msgid \"Read more\"\nmsgstr \"Weiterlesen\"\n").unwrap();
        let mut env = Environment::with_loader(MemoryLoader::new().with("t", source));
        register(&mut env, Some(Arc::new(catalog)), "");
        env.render("t", map_from_json(vars)).unwrap()
    }

    #[rstest]
    #[case("{{ 'Read more'|t }}", "Weiterlesen")]
    #[case("{{ 'Unknown'|trans }}", "Unknown")]
    #[case("{{ 'Hi @name'|t({'@name': 'Ana'}) }}", "Hi Ana")]
    #[case("{{ 'x'|field_value }}", "x")]
    #[case("{{ path('node/1') }}", "#node/1")]
    #[case("{{ path('search', {q: 'a b', page: 2}) }}", "#searchpage=2&q=a+b")]
    #[case("{{ url('home', {tag: ['x', 'y'], flag: null}) }}", "url://homeflag&tag=x&tag=y")]
    #[case("{{ link('Home', '/home', {class: 'nav'}) }}", r#"<a class="nav" href="/home">Home</a>"#)]
    #[case("{{ link('Plain') }}", "<span>Plain</span>")]
    fn boundary_surface(#[case] source: &str, #[case] expected: &str) {
        assert_eq!(render(source, json!({})), expected);
    }

    #[test]
    fn without_drops_keys_from_maps_and_attribute_sets() {
        let out = render(
            "{{ item|without('b', ['c'])|keys|join(',') }}",
            json!({"item": {"a": 1, "b": 2, "c": 3}}),
        );
        assert_eq!(out, "a");

        let mut attributes = Attributes::new();
        attributes.add_class(["x", "y"]).set_attribute("id", Value::from("i"));
        let original = attributes.into_value();
        let stripped = without(&original, &[Value::from("class")]);
        assert_eq!(stripped.to_string(), r#" id="i""#);
        assert!(Attributes::snapshot_of(&stripped).unwrap().classes().is_empty());
        assert_eq!(original.to_string(), r#" class="x y" id="i""#);
    }
}
