//! `twiglet render` — one component or variant to stdout.

use anyhow::{Context, Result};
use clap::Args;

use super::{build_adapter, parse_context};
use crate::GlobalArgs;

/// Arguments for `twiglet render`.
#[derive(Args, Debug)]
pub struct RenderArgs {
    /// Component or variant handle, e.g. `@button--primary`.
    pub handle: String,

    /// JSON object overriding keys of the component context.
    #[arg(long)]
    pub context: Option<String>,
}

impl RenderArgs {
    pub fn run(self, global: &GlobalArgs) -> Result<()> {
        let adapter = build_adapter(global)?;
        let overrides = parse_context(self.context.as_deref())?;
        let html = adapter
            .render_handle(&self.handle, overrides)
            .with_context(|| format!("failed to render {}", self.handle))?;
        println!("{html}");
        Ok(())
    }
}
