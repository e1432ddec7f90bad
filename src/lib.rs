// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::unused_self)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # db-provisioner
//!
//! Idempotent provisioning of users, databases, ownership and grants on
//! PostgreSQL and MySQL/MariaDB servers from a declarative document.
//!
//! ## Features
//!
//! - **Two engine families**: detected from the connection string scheme
//! - **Idempotent**: every run converges the servers; re-running is safe
//! - **Failure isolation**: an unreachable server or a failing grant never
//!   stops the rest of the run
//! - **Retrying connections**: fixed-delay retry with a liveness probe
//! - **Watch mode**: re-provision whenever the document changes
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use db_provisioner::{load_desired_state, Provisioner};
//!
//! #[tokio::main]
//! async fn main() -> db_provisioner::Result<()> {
//!     let state = load_desired_state("/config/config.json")?;
//!     let report = Provisioner::default().run(&state).await;
//!     println!("{}", db_provisioner::output::render_pretty(&report));
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  Provisioner::run(DesiredState) → RunReport                  │
//! └──────────────────────────────────────────────────────────────┘
//!                 │ per server, in order
//! ┌───────────────┴──────────┬───────────────────┬───────────────┐
//! │ connect_with_retry       │ reconcile         │ close         │
//! │ (RetryPolicy, probe)     │ (per grant steps) │               │
//! └──────────────────────────┴─────────┬─────────┴───────────────┘
//!                                      │
//! ┌────────────────────────────────────┴─────────────────────────┐
//! │  Dialect: PostgresDialect | MySqlDialect                     │
//! │  SqlSession: PgSession | MySqlSession | MemorySession        │
//! └──────────────────────────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types for the provisioner
pub mod error;

/// Desired-state model and process settings
pub mod config;

/// Template interpolation
pub mod template;

/// JSON/YAML document loader
pub mod loader;

/// Engine dialects
pub mod dialect;

/// Database sessions and connectors
pub mod session;

/// Connection retry
pub mod connection;

/// Per-server reconciliation
pub mod reconcile;

/// Run orchestration
pub mod engine;

/// Config file watching
pub mod watch;

/// Report rendering
pub mod output;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};

// Re-export commonly used types
pub use config::{DatabaseGrant, DesiredState, ProcessSettings, ServerTarget};
pub use connection::RetryPolicy;
pub use dialect::{Dialect, DialectFamily};
pub use engine::{Provisioner, RunReport};
pub use loader::{load_desired_state, load_desired_state_from_str};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
