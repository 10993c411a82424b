//! CLI command implementations.
//!
//! # Command Modules
//!
//! - [`config`] - Configuration management (show, init)
//! - [`replay`] - Event script replay

pub mod config;
pub mod replay;
