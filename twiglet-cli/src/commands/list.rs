//! `twiglet list` — every handle in the library.

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};
use twiglet_core::{ComponentSource, Library};

use super::load_library;
use crate::GlobalArgs;

/// Arguments for `twiglet list`.
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize, Tabled)]
struct HandleRow {
    #[tabled(rename = "handle")]
    handle: String,
    #[tabled(rename = "kind")]
    kind: &'static str,
    #[tabled(rename = "label")]
    label: String,
    #[tabled(rename = "view")]
    view: String,
}

impl ListArgs {
    pub fn run(self, global: &GlobalArgs) -> Result<()> {
        let library = load_library(global)?;
        let rows = rows(&library);
        if self.json {
            println!("{}", serde_json::to_string_pretty(&rows)?);
            return Ok(());
        }
        if rows.is_empty() {
            println!("No components found under {}.", global.root.display());
            return Ok(());
        }
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
        Ok(())
    }
}

fn rows(library: &Library) -> Vec<HandleRow> {
    let mut rows = Vec::new();
    for component in library.components() {
        let view = component
            .view_path
            .strip_prefix(library.root())
            .unwrap_or(&component.view_path)
            .display()
            .to_string();
        rows.push(HandleRow {
            handle: component.handle.to_string(),
            kind: "component",
            label: component.label.clone(),
            view: view.clone(),
        });
        for variant in &component.variants {
            rows.push(HandleRow {
                handle: variant.handle.to_string(),
                kind: if variant.is_default { "default variant" } else { "variant" },
                label: variant.label.clone(),
                view: view.clone(),
            });
        }
    }
    rows
}
