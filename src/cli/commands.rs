//! CLI commands and argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Idempotent database, user and grant provisioner
#[derive(Parser, Debug)]
#[command(name = "db-provisioner")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Provisioning document (JSON or YAML); overrides CONFIG_PATH
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Keep running and re-provision whenever the document changes
    #[arg(short, long, global = true)]
    pub watch: bool,

    /// Seconds between config file polls in watch mode; overrides WATCH_INTERVAL_SECS
    #[arg(long, global = true)]
    pub interval: Option<u64>,

    /// Output format
    #[arg(short, long, global = true, default_value = "pretty")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Connection attempts per server
    #[arg(long, global = true)]
    pub max_attempts: Option<u32>,

    /// Seconds to wait between connection attempts
    #[arg(long, global = true)]
    pub retry_delay_secs: Option<u64>,

    /// Subcommand (defaults to `run`)
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// CLI subcommands
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// Reconcile every server with the document
    Run,

    /// Load and validate the document without connecting
    Validate,

    /// Connect and report which users and databases exist, changing nothing
    Check,
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output (one report per line)
    Json,
    /// Human-readable output
    Pretty,
}
