//! Extension tags registered with the engine.

pub mod render;
pub mod trans;

pub use render::{apply_overrides, RenderInstance, RenderTag};
pub use trans::{PluralInstance, PluralTag, TransInstance, TransTag};
