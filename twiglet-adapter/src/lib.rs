//! # twiglet-adapter
//!
//! Renders components of a [`twiglet_core`] library through the
//! [`twiglet_engine`] template engine.
//!
//! - [`attributes`] — the HTML attribute set exposed to templates
//! - [`context`] — materializes `*attributes*` context keys
//! - [`tags`] — `render`, `trans` / `plural` / `endtrans`
//! - [`catalog`] — portable-object translation catalog
//! - [`extensions`] — `t`, `without`, `path`, `url`, `link` and friends
//! - [`loader`] — handle and path resolution for templates
//! - [`decorator`] — per-template `_self` and class inheritance
//! - [`adapter`] — [`TwigAdapter`], the render entry point
//!
//! ## Usage
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! use twiglet_adapter::{AdapterConfig, TwigAdapter};
//! use twiglet_core::Library;
//! use twiglet_engine::Map;
//!
//! let library = Library::load_at(Path::new("components"))?;
//! let adapter = TwigAdapter::new(Arc::new(library), AdapterConfig::default())?;
//! println!("{}", adapter.render_handle("@button--primary", Map::new())?);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod adapter;
pub mod attributes;
pub mod catalog;
pub mod config;
pub mod context;
pub mod decorator;
pub mod error;
pub mod extensions;
pub mod loader;
pub mod tags;

pub use adapter::{ChangeEvent, ChangeKind, RenderMeta, TwigAdapter};
pub use attributes::{Attributes, SharedAttributes};
pub use catalog::{Catalog, TranslationRecord};
pub use config::AdapterConfig;
pub use error::{AdapterError, CatalogError};
