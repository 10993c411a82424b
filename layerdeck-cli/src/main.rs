//! LayerDeck CLI - Command-line interface
//!
//! Replays recorded layer lifecycle events against a layer stack and manages
//! the stack configuration file.

mod commands;
mod error;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use commands::config::ConfigCommands;

#[derive(Parser)]
#[command(name = "layerdeck")]
#[command(about = "Map layer registry and style reconciliation", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a JSON Lines event script and print the resulting layer stack
    Replay {
        /// Event script, one JSON event per line
        script: PathBuf,

        /// Configuration file (default: ~/.layerdeck/config.ini)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Log directory (default: ~/.layerdeck/logs)
        #[arg(long)]
        log_dir: Option<PathBuf>,
    },

    /// Configuration management
    #[command(subcommand)]
    Config(ConfigCommands),
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Replay {
            script,
            config,
            log_dir,
        } => commands::replay::run(commands::replay::ReplayArgs {
            script,
            config,
            log_dir,
        }),
        Commands::Config(command) => commands::config::run(command),
    };

    if let Err(e) = result {
        e.exit();
    }
}
