//! The command line interface for the dispatch engine.
use crate::commands::handle_run_command;
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// The command line interface for the dispatch engine.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// The available commands.
    #[command(subcommand)]
    command: Commands,
}

/// The available commands.
#[derive(Subcommand)]
enum Commands {
    /// Run one dispatch interval from a directory of input CSV tables.
    Run {
        /// Directory containing the input CSV tables (§6).
        input_dir: PathBuf,
        /// Path to a `settings.toml` configuration file.
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Directory to write log files to. If omitted, logs only go to the terminal.
        #[arg(short, long)]
        log_dir: Option<PathBuf>,
    },
}

/// Parse CLI arguments and run the dispatch engine.
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { input_dir, config, log_dir } => {
            handle_run_command(&input_dir, config.as_deref(), log_dir.as_deref())
        }
    }
}
