//! Domain types for the component registry.
//!
//! All path fields use `PathBuf`; contexts are order-preserving JSON maps so
//! attribute order in rendered markup follows the config file.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Ordered context mapping as parsed from component config files.
pub type ContextMap = serde_json::Map<String, Value>;

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A sigil-prefixed identifier addressing a component or variant
/// (`@button`, `@button--primary`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Handle(pub String);

impl Handle {
    /// The sigil every canonical handle starts with.
    pub const SIGIL: char = '@';

    /// Canonical handle for `raw`, adding the sigil when it is missing.
    pub fn new(raw: &str) -> Self {
        if raw.starts_with(Self::SIGIL) {
            Self(raw.to_owned())
        } else {
            Self(format!("{}{raw}", Self::SIGIL))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The handle without its sigil.
    pub fn name(&self) -> &str {
        self.0.strip_prefix(Self::SIGIL).unwrap_or(&self.0)
    }

    /// The handle rendered with a host-specific prefix instead of `@`.
    pub fn with_prefix(&self, prefix: &str) -> String {
        format!("{prefix}{}", self.name())
    }

    /// Handle of the variant `variant` of this component.
    pub fn variant(&self, variant: &str) -> Handle {
        Handle(format!("{}--{variant}", self.0))
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for Handle {
    fn from(s: String) -> Self {
        Self::new(&s)
    }
}

impl From<&str> for Handle {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

// ---------------------------------------------------------------------------
// Domain structs
// ---------------------------------------------------------------------------

/// A named alternative rendering of a component.
#[derive(Debug, Clone, PartialEq)]
pub struct Variant {
    pub handle: Handle,
    pub name: String,
    pub label: String,
    pub is_default: bool,
    /// Component context deep-merged with the variant's own context.
    pub context: ContextMap,
}

/// A component backed by one template file.
#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    pub handle: Handle,
    pub name: String,
    pub label: String,
    /// Absolute path of the `.twig` view.
    pub view_path: PathBuf,
    pub context: ContextMap,
    /// Never empty; exactly one entry has `is_default` set.
    pub variants: Vec<Variant>,
}

impl Component {
    /// The default variant.
    pub fn default_variant(&self) -> &Variant {
        self.variants
            .iter()
            .find(|v| v.is_default)
            .unwrap_or(&self.variants[0])
    }

    pub fn variant(&self, name: &str) -> Option<&Variant> {
        self.variants.iter().find(|v| v.name == name)
    }
}

/// A template file reachable under a handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct View {
    pub handle: Handle,
    pub path: PathBuf,
}

// ---------------------------------------------------------------------------
// Entity accessor
// ---------------------------------------------------------------------------

/// Read-only view of a registry entry resolved from a handle.
#[derive(Debug, Clone, Copy)]
pub enum Entity<'a> {
    Component(&'a Component),
    Variant {
        variant: &'a Variant,
        parent: &'a Component,
    },
}

impl<'a> Entity<'a> {
    pub fn handle(&self) -> &'a Handle {
        match self {
            Entity::Component(c) => &c.handle,
            Entity::Variant { variant, .. } => &variant.handle,
        }
    }

    pub fn is_component(&self) -> bool {
        matches!(self, Entity::Component(_))
    }

    pub fn is_variant(&self) -> bool {
        matches!(self, Entity::Variant { .. })
    }

    /// Whether this entity renders as its component's default.
    /// A bare component stands for its default variant.
    pub fn is_default(&self) -> bool {
        match self {
            Entity::Component(_) => true,
            Entity::Variant { variant, .. } => variant.is_default,
        }
    }

    /// Owning component of a variant.
    pub fn parent(&self) -> Option<&'a Component> {
        match self {
            Entity::Component(_) => None,
            Entity::Variant { parent, .. } => Some(parent),
        }
    }

    /// The component this entity belongs to.
    pub fn component(&self) -> &'a Component {
        match self {
            Entity::Component(c) => c,
            Entity::Variant { parent, .. } => parent,
        }
    }

    /// The entity's own stored context.
    pub fn context(&self) -> &'a ContextMap {
        match self {
            Entity::Component(c) => &c.context,
            Entity::Variant { variant, .. } => &variant.context,
        }
    }

    /// Default variant of the owning component.
    pub fn default_variant(&self) -> &'a Variant {
        self.component().default_variant()
    }

    /// Context a render of this entity starts from: a variant's own
    /// context, or the default variant's context for a bare component.
    pub fn render_context(&self) -> &'a ContextMap {
        match self {
            Entity::Component(c) => &c.default_variant().context,
            Entity::Variant { variant, .. } => &variant.context,
        }
    }

    /// The variant this entity renders as.
    pub fn as_variant(&self) -> &'a Variant {
        match self {
            Entity::Component(c) => c.default_variant(),
            Entity::Variant { variant, .. } => variant,
        }
    }

    /// JSON description exposed to templates as `_self`.
    pub fn to_json(&self) -> Value {
        match self {
            Entity::Component(c) => json!({
                "handle": c.handle.name(),
                "name": c.name,
                "label": c.label,
                "isComponent": true,
                "isVariant": false,
                "context": c.context,
                "variants": c.variants.iter().map(|v| v.handle.name()).collect::<Vec<_>>(),
            }),
            Entity::Variant { variant, parent } => json!({
                "handle": variant.handle.name(),
                "name": variant.name,
                "label": variant.label,
                "isComponent": false,
                "isVariant": true,
                "isDefault": variant.is_default,
                "parent": parent.handle.name(),
                "context": variant.context,
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
