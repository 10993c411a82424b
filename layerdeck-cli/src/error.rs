//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use std::fmt;
use std::process;

use layerdeck::config::ConfigError;
use layerdeck::events::EventError;
use layerdeck::StackError;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Configuration file could not be read or written
    Config(ConfigError),
    /// Configuration file already exists
    ConfigExists(String),
    /// Event script could not be read or parsed
    Script(EventError),
    /// Layer stack could not be built
    Stack(StackError),
    /// Failed to start the async runtime
    Runtime(std::io::Error),
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        match self {
            CliError::Script(EventError::Parse { .. }) => {
                eprintln!();
                eprintln!("Event scripts hold one JSON object per line, for example:");
                eprintln!(
                    r#"  {{"event":"add_layer","module_id":"m1","layer_id":"L1","descriptor":{{"kind":"point","source":"a.csv"}}}}"#
                );
                eprintln!("Blank lines and lines starting with '#' are ignored.");
            }
            CliError::ConfigExists(_) => {
                eprintln!();
                eprintln!("Use --force to overwrite it.");
            }
            CliError::Stack(StackError::BaseLayerNotRenderable(_)) => {
                eprintln!();
                eprintln!("The [base_layer] kind must be a geometry, not 'text'.");
            }
            _ => {}
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(e) => write!(f, "Configuration error: {}", e),
            CliError::ConfigExists(path) => {
                write!(f, "Configuration file '{}' already exists", path)
            }
            CliError::Script(e) => write!(f, "Event script error: {}", e),
            CliError::Stack(e) => write!(f, "Failed to build layer stack: {}", e),
            CliError::Runtime(e) => write!(f, "Failed to start runtime: {}", e),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Config(e) => Some(e),
            CliError::Script(e) => Some(e),
            CliError::Stack(e) => Some(e),
            CliError::Runtime(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e)
    }
}

impl From<EventError> for CliError {
    fn from(e: EventError) -> Self {
        CliError::Script(e)
    }
}

impl From<StackError> for CliError {
    fn from(e: StackError) -> Self {
        CliError::Stack(e)
    }
}
