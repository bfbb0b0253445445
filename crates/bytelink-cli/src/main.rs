//! Bytelink command-line tool
//!
//! Bootstraps compiled guest modules, inspects the native import table and
//! reads files through the virtual file table.

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "bytelink")]
#[command(about = "Host runtime bridge for translated guest bytecode", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Bootstrap a compiled module (shared library)
    Run {
        /// Path to the module
        module: PathBuf,
        /// Bridge configuration (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// List the native import table
    Imports {
        /// Only show keys for this owner
        #[arg(short, long)]
        owner: Option<String>,
    },

    /// Read a path through the virtual file table and write it to stdout
    Cat {
        /// Path, resolved by the configured byte source
        path: String,
        /// Bridge configuration (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { module, config } => commands::run::execute(&module, config.as_deref()).await,
        Commands::Imports { owner } => commands::imports::execute(owner.as_deref()),
        Commands::Cat { path, config } => {
            tokio::task::spawn_blocking(move || commands::cat::execute(&path, config.as_deref())).await?
        }
    }
}
