//! Lineage CLI entry point

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "lineage")]
#[command(about = "Find the Pug templates to recompile when others change", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Project base directory (defaults to current directory)
    #[arg(short, long, default_value = ".")]
    root: PathBuf,

    /// Do not read or write the inheritance cache
    #[arg(long)]
    no_cache: bool,

    /// Cache file location (relative paths resolve against the root)
    #[arg(long)]
    cache_path: Option<PathBuf>,

    /// Extension appended to extensionless extends/include targets
    #[arg(long)]
    extension: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print every template that must be recompiled after FILES changed
    Resolve {
        /// Changed template files
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Print the templates that depend on FILE
    Graph {
        file: PathBuf,
    },
    /// Delete the inheritance cache
    Clear,
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries the file list
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(format!("lineage={0},lineage_core={0},lineage_scanner={0},lineage_engine={0}", log_level)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let options = commands::Options {
        root: cli.root,
        no_cache: cli.no_cache,
        cache_path: cli.cache_path,
        extension: cli.extension,
    };

    match cli.command {
        Commands::Resolve { files } => commands::resolve(options, files).await,
        Commands::Graph { file } => commands::graph(options, file),
        Commands::Clear => commands::clear(options),
        Commands::Version => {
            println!("Lineage v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
