//! Twiglet core library — component registry, domain types, errors.
//!
//! Public API surface:
//! - [`types`] — handles, components, variants, views and the [`Entity`] accessor
//! - [`registry`] — [`Library`] scanning and the [`ComponentSource`] trait
//! - [`config`] — component config files and their merge rules
//! - [`info`] — theme info (`*.info.yml`) with component-library paths
//! - [`error`] — [`RegistryError`]

pub mod config;
pub mod error;
pub mod info;
pub mod registry;
pub mod types;

pub use error::RegistryError;
pub use info::ThemeInfo;
pub use registry::{ComponentSource, Library};
pub use types::{Component, ContextMap, Entity, Handle, Variant, View};
