//! Built-in filters and functions.

use std::sync::Arc;

use crate::environment::Environment;
use crate::error::TemplateError;
use crate::value::Value;

pub(crate) fn register(env: &mut Environment) {
    env.add_filter("upper", |v, _| Ok(Value::String(v.to_string().to_uppercase())));
    env.add_filter("lower", |v, _| Ok(Value::String(v.to_string().to_lowercase())));
    env.add_filter("capitalize", |v, _| Ok(Value::String(capitalize(&v.to_string()))));
    env.add_filter("trim", |v, _| Ok(Value::String(v.to_string().trim().to_string())));
    env.add_filter("length", |v, _| Ok(Value::from(length(v))));
    env.add_filter("join", join);
    env.add_filter("default", |v, args| {
        Ok(if v.is_empty() {
            args.first().cloned().unwrap_or_default()
        } else {
            v.clone()
        })
    });
    env.add_filter("first", |v, _| Ok(first_or_last(v, true)));
    env.add_filter("last", |v, _| Ok(first_or_last(v, false)));
    env.add_filter("keys", |v, _| Ok(keys(v)));
    env.add_filter("merge", merge);
    env.add_filter("escape", |v, _| Ok(Value::String(escape_html(&v.to_string()))));
    env.add_filter("e", |v, _| Ok(Value::String(escape_html(&v.to_string()))));
    env.add_filter("raw", |v, _| Ok(v.clone()));
    env.add_filter("json_encode", |v, _| {
        serde_json::to_string(&v.to_json())
            .map(Value::String)
            .map_err(|e| TemplateError::runtime(e.to_string()))
    });

    env.add_function("range", |_, args| range(args));
    env.add_function("template_from_string", |env, args| {
        let source = args.first().map(Value::to_string).unwrap_or_default();
        let template = env.parse("template_from_string", &source)?;
        Ok(Value::Template(Arc::new(template)))
    });
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

fn length(value: &Value) -> usize {
    match value {
        Value::Null => 0,
        Value::Array(items) => items.len(),
        Value::Map(map) => map.len(),
        other => other.to_string().chars().count(),
    }
}

fn join(value: &Value, args: &[Value]) -> Result<Value, TemplateError> {
    let separator = args.first().map(Value::to_string).unwrap_or_default();
    let parts: Vec<String> = match value {
        Value::Array(items) => items.iter().map(Value::to_string).collect(),
        Value::Map(map) => map.values().map(Value::to_string).collect(),
        Value::Null => Vec::new(),
        other => vec![other.to_string()],
    };
    Ok(Value::String(parts.join(&separator)))
}

fn first_or_last(value: &Value, first: bool) -> Value {
    let items: Vec<Value> = match value {
        Value::Array(items) => items.clone(),
        Value::Map(map) => map.values().cloned().collect(),
        Value::String(s) => s.chars().map(|c| Value::String(c.to_string())).collect(),
        _ => Vec::new(),
    };
    let picked = if first { items.first() } else { items.last() };
    picked.cloned().unwrap_or_default()
}

fn keys(value: &Value) -> Value {
    match value {
        Value::Map(map) => Value::Array(map.keys().map(|k| Value::from(k.as_str())).collect()),
        Value::Array(items) => Value::Array((0..items.len()).map(Value::from).collect()),
        _ => Value::Array(Vec::new()),
    }
}

fn merge(value: &Value, args: &[Value]) -> Result<Value, TemplateError> {
    let other = args.first().cloned().unwrap_or_default();
    match (value, other) {
        (Value::Array(a), Value::Array(b)) => Ok(Value::Array(a.iter().cloned().chain(b).collect())),
        (Value::Map(a), Value::Map(b)) => {
            let mut merged = a.clone();
            merged.extend(b);
            Ok(Value::Map(merged))
        }
        (Value::Null, other) => Ok(other),
        (value, Value::Null) => Ok(value.clone()),
        (value, other) => Err(TemplateError::runtime(format!(
            "merge expects two sequences or two mappings, got `{value}` and `{other}`"
        ))),
    }
}

pub(crate) fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            c => out.push(c),
        }
    }
    out
}

fn range(args: &[Value]) -> Result<Value, TemplateError> {
    let bound = |i: usize| {
        args.get(i)
            .and_then(Value::as_i64)
            .ok_or_else(|| TemplateError::runtime("range() expects integer bounds"))
    };
    let (start, end) = (bound(0)?, bound(1)?);
    let step = args.get(2).and_then(Value::as_i64).unwrap_or(1).abs().max(1);
    let mut items = Vec::new();
    let mut i = start;
    if start <= end {
        while i <= end {
            items.push(Value::Int(i));
            i += step;
        }
    } else {
        while i >= end {
            items.push(Value::Int(i));
            i -= step;
        }
    }
    Ok(Value::Array(items))
}
