//! `twiglet watch` — re-render on template changes.

use std::path::Path;
use std::sync::mpsc;

use anyhow::{Context, Result};
use clap::Args;
use notify::{recommended_watcher, Event, EventKind, RecursiveMode, Watcher};
use twiglet_adapter::{ChangeEvent, ChangeKind, TwigAdapter};
use twiglet_engine::Map;

use super::{build_adapter, parse_context};
use crate::GlobalArgs;

/// Arguments for `twiglet watch`.
#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Component or variant handle, e.g. `@button--primary`.
    pub handle: String,

    /// JSON object overriding keys of the component context.
    #[arg(long)]
    pub context: Option<String>,
}

impl WatchArgs {
    pub fn run(self, global: &GlobalArgs) -> Result<()> {
        let adapter = build_adapter(global)?;
        let overrides = parse_context(self.context.as_deref())?;
        render(&adapter, &self.handle, &overrides);

        let (tx, rx) = mpsc::channel::<notify::Result<Event>>();
        let mut watcher = recommended_watcher(move |event| {
            let _ = tx.send(event);
        })
        .context("failed to start file watcher")?;
        watcher
            .watch(&global.root, RecursiveMode::Recursive)
            .with_context(|| format!("failed to watch {}", global.root.display()))?;
        tracing::info!(root = %global.root.display(), handle = %self.handle, "watching for changes");

        for event in rx {
            let event = match event {
                Ok(event) => event,
                Err(err) => {
                    tracing::warn!(error = %err, "watcher event error");
                    continue;
                }
            };
            let Some(kind) = change_kind(&event.kind) else {
                continue;
            };
            let mut evicted = 0;
            for path in event.paths.iter().filter(|p| is_template(p)) {
                evicted += adapter.on_change(&ChangeEvent {
                    kind,
                    path: path.clone(),
                });
            }
            if evicted > 0 {
                render(&adapter, &self.handle, &overrides);
            }
        }
        Ok(())
    }
}

fn render(adapter: &TwigAdapter, handle: &str, overrides: &Map) {
    match adapter.render_handle(handle, overrides.clone()) {
        Ok(html) => println!("{html}"),
        Err(err) => tracing::error!(error = %err, handle, "render failed"),
    }
}

fn change_kind(kind: &EventKind) -> Option<ChangeKind> {
    match kind {
        EventKind::Create(_) | EventKind::Modify(_) => Some(ChangeKind::ViewUpdated),
        EventKind::Remove(_) => Some(ChangeKind::ViewRemoved),
        _ => None,
    }
}

fn is_template(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("twig")
}
