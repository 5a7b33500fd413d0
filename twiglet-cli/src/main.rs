//! Twiglet — render pattern-library components from the command line.
//!
//! # Usage
//!
//! ```text
//! twiglet [--root <dir>] [--theme <dir>] [--config <yaml>] [--catalog <po>] list [--json]
//! twiglet ... render <handle> [--context <json>]
//! twiglet ... watch <handle> [--context <json>]
//! ```

mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

use commands::{list::ListArgs, render::RenderArgs, watch::WatchArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "twiglet",
    version,
    about = "Render Twig components with their pattern-library context",
    long_about = None,
)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every command.
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Component library root.
    #[arg(long, global = true, default_value = ".")]
    pub root: PathBuf,

    /// Theme directory holding the `*.info.yml` file with component libraries.
    #[arg(long, global = true)]
    pub theme: Option<PathBuf>,

    /// Adapter configuration (YAML).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Translation catalog (.po); overrides the configured one.
    #[arg(long, global = true)]
    pub catalog: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List every component and variant handle.
    List(ListArgs),

    /// Render a component or variant to stdout.
    Render(RenderArgs),

    /// Re-render a component whenever a template under the root changes.
    Watch(WatchArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Commands::List(args) => args.run(&cli.global),
        Commands::Render(args) => args.run(&cli.global),
        Commands::Watch(args) => args.run(&cli.global),
    }
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
