//! Configuration management CLI commands.
//!
//! Provides `config show` and `config init`.

use std::path::{Path, PathBuf};

use clap::Subcommand;
use layerdeck::config::{config_file_path, StackConfig};

use crate::error::CliError;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Show the effective configuration
    Show {
        /// Configuration file (default: ~/.layerdeck/config.ini)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Write a configuration file with default values
    Init {
        /// Configuration file (default: ~/.layerdeck/config.ini)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Run a config subcommand.
pub fn run(command: ConfigCommands) -> Result<(), CliError> {
    match command {
        ConfigCommands::Show { config } => run_show(&resolve_path(config)),
        ConfigCommands::Init { config, force } => run_init(&resolve_path(config), force),
    }
}

/// Explicit path, or the default location.
pub fn resolve_path(path: Option<PathBuf>) -> PathBuf {
    path.unwrap_or_else(config_file_path)
}

fn run_show(path: &Path) -> Result<(), CliError> {
    let config = StackConfig::load_from(path)?;

    println!("Configuration: {}", path.display());
    if !path.exists() {
        println!("(file not found, showing defaults)");
    }
    println!();
    print!("{}", render(&config));

    Ok(())
}

fn run_init(path: &Path, force: bool) -> Result<(), CliError> {
    if path.exists() && !force {
        return Err(CliError::ConfigExists(path.display().to_string()));
    }

    StackConfig::default().save_to(path)?;
    println!("Wrote default configuration to {}", path.display());

    Ok(())
}

/// Human-readable listing of every setting, grouped by section.
pub fn render(config: &StackConfig) -> String {
    let anchor = config
        .services
        .preload_anchor
        .as_ref()
        .map(|id| id.to_string())
        .unwrap_or_else(|| "(not set)".to_string());

    let mut out = String::new();
    out.push_str("[base_layer]\n");
    out.push_str(&format!("  id = {}\n", config.base_layer.id));
    out.push_str(&format!("  source = {}\n", config.base_layer.source));
    out.push_str(&format!("  kind = {}\n", config.base_layer.kind));
    out.push('\n');
    out.push_str("[services]\n");
    out.push_str(&format!("  preload_anchor = {}\n", anchor));
    out.push('\n');
    out.push_str("[map]\n");
    out.push_str(&format!("  style = {}\n", config.map.style));
    out
}
