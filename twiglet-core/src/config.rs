//! Component config files and their merge rules.
//!
//! A component `button/button.twig` is configured by a sibling
//! `button.config.yml` (shared with the application) and optionally a
//! `button.data.yml` holding pattern-library-only dummy data, merged on top
//! with [`merge_config`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::ContextMap;

/// Name of the default variant when a config does not choose one.
pub const DEFAULT_VARIANT: &str = "default";

/// Parsed `<name>.config.yml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComponentConfig {
    /// Overrides the handle derived from the file name.
    pub handle: Option<String>,
    pub label: Option<String>,
    pub context: ContextMap,
    /// Name of the default variant.
    pub default: Option<String>,
    pub variants: Vec<VariantConfig>,
}

/// One entry of the `variants` list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantConfig {
    pub name: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub context: ContextMap,
}

/// Deep-merge `overlay` into `base`: maps merge key by key, every other
/// value in `overlay` replaces the one in `base`.
pub fn deep_merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => deep_merge_map(base, overlay),
        (base, overlay) => *base = overlay,
    }
}

/// [`deep_merge`] for two maps.
pub fn deep_merge_map(base: &mut ContextMap, overlay: ContextMap) {
    for (key, value) in overlay {
        match base.get_mut(&key) {
            Some(existing) => deep_merge(existing, value),
            None => {
                base.insert(key, value);
            }
        }
    }
}

/// Merge a config `source` into `destination`.
///
/// Maps merge recursively with `source` winning, lists concatenate, except
/// `variants`: a source variant is merged into the destination variant of
/// the same `name`; source variants without a counterpart are dropped.
pub fn merge_config(destination: Value, source: Value) -> Value {
    match (destination, source) {
        (Value::Object(mut dest), Value::Object(src)) => {
            for (key, value) in src {
                match dest.get_mut(&key) {
                    Some(slot) => {
                        let current = std::mem::take(slot);
                        *slot = if key == "variants" {
                            merge_variants(current, value)
                        } else {
                            merge_config(current, value)
                        };
                    }
                    None => {
                        dest.insert(key, value);
                    }
                }
            }
            Value::Object(dest)
        }
        (Value::Array(mut dest), Value::Array(src)) => {
            dest.extend(src);
            Value::Array(dest)
        }
        (_, source) => source,
    }
}

fn merge_variants(destination: Value, source: Value) -> Value {
    let (mut dest, src) = match (destination, source) {
        (Value::Array(dest), Value::Array(src)) => (dest, src),
        (_, source) => return source,
    };
    for source_variant in src {
        let name = source_variant.get("name").cloned();
        for slot in dest.iter_mut() {
            if name.is_some() && slot.get("name") == name.as_ref() {
                let current = std::mem::take(slot);
                *slot = merge_config(current, source_variant.clone());
            }
        }
    }
    Value::Array(dest)
}

/// Merge two lists of maps by a key field.
///
/// Every element of `left` whose `key` matches an element of `right` is
/// deep-merged with it, the `left` values winning. Elements of `right`
/// without a match are ignored.
pub fn merge_by_key(left: Vec<Value>, right: &[Value], key: &str) -> Vec<Value> {
    left.into_iter()
        .map(|current| {
            let found = right
                .iter()
                .find(|candidate| candidate.get(key).is_some() && candidate.get(key) == current.get(key));
            match found {
                Some(found) => {
                    let mut merged = found.clone();
                    deep_merge(&mut merged, current);
                    merged
                }
                None => current,
            }
        })
        .collect()
}
