//! CLI module
//!
//! Command-line interface for the provisioner.
//!
//! # Commands
//!
//! - `run` - Reconcile every server (the default)
//! - `validate` - Load and validate the document
//! - `check` - Report what already exists, read-only

mod commands;
mod runner;

pub use commands::{Cli, Commands, OutputFormat};
pub use runner::{RunSettings, Runner};
