//! Reflex command-line tool
//!
//! Walks through the singleton registry, the method resolution cache and
//! the interception engine on a handful of sample types, and measures the
//! cost of cached versus uncached dispatch.

use anyhow::Context;
use clap::{Parser, Subcommand};
use reflex_engine::EngineOptions;
use std::path::{Path, PathBuf};

mod commands;
mod fixtures;

#[derive(Parser)]
#[command(name = "reflex")]
#[command(about = "Runtime interception and dispatch caching", long_about = None)]
#[command(version)]
struct Cli {
    /// Engine options file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Exercise singletons, cached dispatch and proxies on sample types
    Demo,

    /// Time direct, uncached, cached and bound dispatch
    Bench {
        /// Calls per measurement
        #[arg(short = 'n', long, default_value_t = 100_000)]
        iterations: u64,
    },

    /// Print the effective engine options as TOML
    Config,
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_env("REFLEX_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .without_time()
        .compact()
        .with_writer(std::io::stderr)
        .init();
}

fn load_options(path: Option<&Path>) -> anyhow::Result<EngineOptions> {
    match path {
        Some(path) => EngineOptions::from_file(path)
            .with_context(|| format!("failed to load options from {}", path.display())),
        None => Ok(EngineOptions::default()),
    }
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let options = load_options(cli.config.as_deref())?;

    match cli.command {
        Commands::Demo => commands::demo::execute(options),
        Commands::Bench { iterations } => commands::bench::execute(options, iterations),
        Commands::Config => commands::config::execute(&options),
    }
}
