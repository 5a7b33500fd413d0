//! Context materializer: turns every `*attributes*` key of a render context
//! into an [`Attributes`] value.

use twiglet_core::ContextMap;
use twiglet_engine::{map_from_json, Map, Value};

use crate::attributes::Attributes;

/// Whether a context key holds HTML attributes (`attributes`,
/// `title_attributes`, `attributes_wrapper`, …).
pub fn is_attributes_key(name: &str) -> bool {
    name.contains("attributes")
}

/// Convert, recursively, every attribute-named value of `context` into an
/// attribute set. Mappings nested in mappings or sequences are visited too.
///
/// Re-materializing is a no-op in effect: an existing set is merged into a
/// fresh one with the same classes and storage.
pub fn materialize(context: &mut Map) {
    for (name, value) in context.iter_mut() {
        if is_attributes_key(name) {
            *value = Attributes::from_value(value).into_value();
        } else {
            materialize_value(value);
        }
    }
}

fn materialize_value(value: &mut Value) {
    match value {
        Value::Map(map) => materialize(map),
        Value::Array(items) => {
            for item in items {
                if let Value::Map(map) = item {
                    materialize(map);
                }
            }
        }
        _ => {}
    }
}

/// A materialized engine map built from a registry context.
pub fn from_context(context: &ContextMap) -> Map {
    let mut map = map_from_json(serde_json::Value::Object(context.clone()));
    materialize(&mut map);
    map
}

/// A copy of the attribute set stored under `name`, if there is one.
pub fn attributes_of(context: &Map, name: &str) -> Option<Attributes> {
    context.get(name).and_then(Attributes::snapshot_of)
}
