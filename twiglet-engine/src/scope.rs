//! Variable scopes.

use crate::value::{Map, Value};

/// A variable map chained to an optional parent.
///
/// Lookups fall back to the parent chain; writes always land in the
/// innermost map, so a child never mutates its caller.
#[derive(Debug, Default)]
pub struct Scope<'p> {
    vars: Map,
    parent: Option<&'p Scope<'p>>,
}

impl<'p> Scope<'p> {
    pub fn new(vars: Map) -> Self {
        Scope { vars, parent: None }
    }

    /// An empty scope chained to `self`.
    pub fn child(&self) -> Scope<'_> {
        self.child_with(Map::new())
    }

    /// A scope chained to `self` whose own variables are `vars`.
    pub fn child_with(&self, vars: Map) -> Scope<'_> {
        Scope {
            vars,
            parent: Some(self),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        match self.vars.get(name) {
            Some(value) => Some(value),
            None => self.parent.and_then(|p| p.get(name)),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Whether `name` is defined in this scope itself, ignoring parents.
    pub fn contains_own(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.vars.insert(name.into(), value);
    }

    /// Own variables, without the parent chain.
    pub fn vars(&self) -> &Map {
        &self.vars
    }

    pub fn vars_mut(&mut self) -> &mut Map {
        &mut self.vars
    }

    pub fn into_vars(self) -> Map {
        self.vars
    }

    /// Every visible variable; inner definitions shadow outer ones.
    pub fn flatten(&self) -> Map {
        let mut out = self.parent.map(Scope::flatten).unwrap_or_default();
        for (name, value) in &self.vars {
            out.insert(name.clone(), value.clone());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, i64)]) -> Map {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), Value::Int(*v)))
            .collect()
    }

    #[test]
    fn child_reads_through_but_writes_locally() {
        let root = Scope::new(map(&[("a", 1), ("b", 2)]));
        let mut child = root.child_with(map(&[("b", 20)]));
        child.set("c", Value::Int(3));
        assert_eq!(child.get("a"), Some(&Value::Int(1)));
        assert_eq!(child.get("b"), Some(&Value::Int(20)));
        assert!(child.contains_own("c"));
        assert!(!child.contains_own("a"));
        assert!(!root.contains("c"));
    }

    #[test]
    fn flatten_lets_inner_shadow_outer() {
        let root = Scope::new(map(&[("a", 1), ("b", 2)]));
        let child = root.child_with(map(&[("b", 20)]));
        let grandchild = child.child();
        let flat = grandchild.flatten();
        assert_eq!(flat.get("b"), Some(&Value::Int(20)));
        assert_eq!(flat.len(), 2);
    }
}
