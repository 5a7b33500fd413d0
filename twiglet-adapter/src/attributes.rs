//! HTML element attribute set.
//!
//! A key/value store for the attributes of one element. Every attribute is a
//! single value except `class`, which is an ordered list of tokens that
//! `add_class`/`remove_class` edit and that is deduplicated when serialized.
//!
//! ```text
//! {class: "btn btn--primary", type: button, disabled: null}
//!   ->  ' class="btn btn--primary" type="button" disabled'
//! ```

use std::any::Any;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use indexmap::IndexMap;
use twiglet_engine::{Map, Object, TemplateError, Value};

/// Key the host adds to context mappings to remember key order; never an
/// attribute.
pub const BOOKKEEPING_KEY: &str = "_keys";

const CLASS: &str = "class";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attributes {
    classes: Vec<String>,
    storage: IndexMap<String, Value>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// A fresh set with `value` merged in.
    pub fn from_value(value: &Value) -> Self {
        let mut attributes = Self::new();
        attributes.merge(value);
        attributes
    }

    /// Class tokens in insertion order, duplicates included.
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// Every attribute except `class`.
    pub fn storage(&self) -> &IndexMap<String, Value> {
        &self.storage
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty() && self.storage.is_empty()
    }

    pub fn add_class<I, S>(&mut self, names: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.classes.extend(names.into_iter().map(Into::into));
        self
    }

    /// Append the class tokens held by a template value: a whitespace-separated
    /// string, a sequence of tokens, or a number. Anything else is ignored.
    pub fn add_class_value(&mut self, value: &Value) -> &mut Self {
        let tokens = class_tokens(value);
        self.add_class(tokens)
    }

    /// Put `tokens` in front of the current class list, unless the list
    /// already starts with them.
    pub fn prepend_classes(&mut self, tokens: Vec<String>) -> &mut Self {
        if self.classes.starts_with(&tokens) {
            return self;
        }
        let existing = std::mem::replace(&mut self.classes, tokens);
        self.classes.extend(existing);
        self
    }

    /// Remove every occurrence of each of `names`.
    pub fn remove_class<I, S>(&mut self, names: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names: Vec<S> = names.into_iter().collect();
        self.classes
            .retain(|class| !names.iter().any(|n| n.as_ref() == class));
        self
    }

    pub fn has_class(&self, name: &str) -> bool {
        self.classes.iter().any(|c| c == name)
    }

    pub fn set_attribute(&mut self, name: &str, value: Value) -> &mut Self {
        self.storage.insert(name.to_string(), value);
        self
    }

    pub fn remove_attribute(&mut self, name: &str) -> &mut Self {
        self.storage.shift_remove(name);
        self
    }

    pub fn get_attribute(&self, name: &str) -> Option<&Value> {
        self.storage.get(name)
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.storage.contains_key(name)
    }

    /// Merge another attribute set or a plain mapping into this one.
    ///
    /// From a set, class lists concatenate and values deep-merge with `source`
    /// winning. From a mapping, `class` feeds [`Attributes::add_class_value`]
    /// and every other key [`Attributes::set_attribute`]; [`BOOKKEEPING_KEY`]
    /// is skipped. Other values are ignored.
    pub fn merge(&mut self, source: &Value) -> &mut Self {
        if let Some(other) = Attributes::snapshot_of(source) {
            return self.merge_attributes(&other);
        }
        if let Value::Map(map) = source {
            for (name, value) in map {
                match name.as_str() {
                    BOOKKEEPING_KEY => {}
                    CLASS => {
                        self.add_class_value(value);
                    }
                    _ => {
                        self.set_attribute(name, value.clone());
                    }
                }
            }
        }
        self
    }

    pub fn merge_attributes(&mut self, other: &Attributes) -> &mut Self {
        self.classes.extend(other.classes.iter().cloned());
        for (name, value) in &other.storage {
            match (self.storage.get_mut(name), value) {
                (Some(Value::Map(dest)), Value::Map(src)) => deep_merge(dest, src),
                _ => {
                    self.storage.insert(name.clone(), value.clone());
                }
            }
        }
        self
    }

    /// Class tokens with duplicates removed, first occurrence wins.
    pub fn unique_classes(&self) -> Vec<&str> {
        let mut seen = Vec::with_capacity(self.classes.len());
        for class in &self.classes {
            if !seen.contains(&class.as_str()) {
                seen.push(class.as_str());
            }
        }
        seen
    }

    /// Wrap the set for templates. See [`SharedAttributes`].
    pub fn into_value(self) -> Value {
        Value::from_object(SharedAttributes(Arc::new(RwLock::new(self))))
    }

    /// A copy of the set `value` holds, if it holds one.
    pub fn snapshot_of(value: &Value) -> Option<Attributes> {
        value.downcast_object::<SharedAttributes>().map(SharedAttributes::snapshot)
    }

    pub fn to_json(&self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        if !self.classes.is_empty() {
            map.insert(
                CLASS.to_string(),
                serde_json::Value::from(self.unique_classes()),
            );
        }
        for (name, value) in &self.storage {
            map.insert(name.clone(), value.to_json());
        }
        serde_json::Value::Object(map)
    }
}

/// Whitespace-split class tokens of a template value.
pub fn class_tokens(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => s.split_whitespace().map(str::to_string).collect(),
        Value::Array(items) => items.iter().flat_map(class_tokens).collect(),
        Value::Int(_) | Value::Float(_) => vec![value.to_string()],
        _ => Vec::new(),
    }
}

fn deep_merge(dest: &mut Map, src: &Map) {
    for (key, value) in src {
        match (dest.get_mut(key), value) {
            (Some(Value::Map(d)), Value::Map(s)) => deep_merge(d, s),
            _ => {
                dest.insert(key.clone(), value.clone());
            }
        }
    }
}

fn escape_attribute(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Serialized markup: empty, or starting with a single space.
impl fmt::Display for Attributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let classes = self.unique_classes();
        if !classes.is_empty() {
            write!(f, " class=\"{}\"", escape_attribute(&classes.join(" ")))?;
        }
        for (name, value) in &self.storage {
            match value {
                Value::Null => write!(f, " {name}")?,
                value => write!(f, " {name}=\"{}\"", escape_attribute(&value.to_string()))?,
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Template-facing object
// ---------------------------------------------------------------------------

/// An attribute set as templates hold it. Clones of the value share the set,
/// and method calls edit it in place and return it again.
#[derive(Debug, Default)]
pub struct SharedAttributes(Arc<RwLock<Attributes>>);

impl SharedAttributes {
    fn read(&self) -> RwLockReadGuard<'_, Attributes> {
        self.0.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Attributes> {
        self.0.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// A detached copy of the current state.
    pub fn snapshot(&self) -> Attributes {
        self.read().clone()
    }

    fn handle(&self) -> Value {
        Value::from_object(SharedAttributes(Arc::clone(&self.0)))
    }

    fn edit(&self, edit: impl FnOnce(&mut Attributes)) -> Value {
        edit(&mut self.write());
        self.handle()
    }
}

impl fmt::Display for SharedAttributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.read(), f)
    }
}

fn arg(args: &[Value], index: usize, method: &str) -> Result<String, TemplateError> {
    args.get(index)
        .map(Value::to_string)
        .ok_or_else(|| TemplateError::runtime(format!("Attributes.{method}() is missing an argument")))
}

impl Object for SharedAttributes {
    fn type_name(&self) -> &'static str {
        "Attributes"
    }

    fn get_attr(&self, name: &str) -> Option<Value> {
        let attributes = self.read();
        match name {
            "class" | "classes" => Some(Value::Array(
                attributes.classes.iter().map(|c| Value::from(c.as_str())).collect(),
            )),
            "storage" => Some(Value::Map(
                attributes.storage.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            )),
            _ => attributes.storage.get(name).cloned(),
        }
    }

    fn call_method(&self, name: &str, args: &[Value]) -> Result<Value, TemplateError> {
        match name {
            "addClass" => Ok(self.edit(|a| {
                for value in args {
                    a.add_class_value(value);
                }
            })),
            "removeClass" => {
                let names: Vec<String> = args.iter().flat_map(class_tokens).collect();
                Ok(self.edit(|a| {
                    a.remove_class(&names);
                }))
            }
            "hasClass" => Ok(Value::Bool(self.read().has_class(&arg(args, 0, name)?))),
            "setAttribute" => {
                let attribute = arg(args, 0, name)?;
                let value = args.get(1).cloned().unwrap_or_default();
                Ok(self.edit(|a| {
                    a.set_attribute(&attribute, value);
                }))
            }
            "removeAttribute" => {
                let names: Vec<String> = args.iter().map(Value::to_string).collect();
                Ok(self.edit(|a| {
                    for attribute in &names {
                        a.remove_attribute(attribute);
                    }
                }))
            }
            "getAttribute" => Ok(self.read().get_attribute(&arg(args, 0, name)?).cloned().unwrap_or_default()),
            "hasAttribute" => Ok(Value::Bool(self.read().has_attribute(&arg(args, 0, name)?))),
            "getClass" => Ok(self.get_attr("class").unwrap_or_default()),
            "merge" => {
                // Sources are read before the write lock; one may be this set.
                let sources: Vec<Attributes> = args.iter().map(Attributes::from_value).collect();
                Ok(self.edit(|a| {
                    for source in &sources {
                        a.merge_attributes(source);
                    }
                }))
            }
            "toString" => Ok(Value::String(self.to_string())),
            _ => Err(TemplateError::runtime(format!("Attributes has no method `{name}`"))),
        }
    }

    fn to_json(&self) -> serde_json::Value {
        self.read().to_json()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
