//! Desired-state model and process settings
//!
//! This module contains the structures a provisioning document deserializes
//! into, their validation rules, and the environment-driven settings for the
//! process itself.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Default location of the provisioning document
pub const DEFAULT_CONFIG_PATH: &str = "/config/config.json";

/// Default interval between config file polls in watch mode
pub const DEFAULT_WATCH_INTERVAL: Duration = Duration::from_secs(10);

// ============================================================================
// Desired State
// ============================================================================

/// The full provisioning document: every server and what it should contain
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesiredState {
    /// Servers to reconcile, in order
    #[serde(default)]
    pub servers: Vec<ServerTarget>,
}

/// One managed database server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerTarget {
    /// Human label (empty means "use the position")
    #[serde(default)]
    pub name: String,

    /// Credentialed connection URL; its scheme picks the dialect
    #[serde(
        rename = "root_connection_string",
        alias = "connection_string",
        default
    )]
    pub connection_string: String,

    /// Databases, users and passwords to ensure on this server
    #[serde(default)]
    pub databases: Vec<DatabaseGrant>,
}

/// One desired (database, user, password) tuple
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseGrant {
    /// Database name
    #[serde(default)]
    pub database: String,

    /// User (role) that owns the database
    #[serde(default)]
    pub user: String,

    /// Password the user should have after reconciliation
    #[serde(default, skip_serializing)]
    pub password: String,
}

impl fmt::Debug for DatabaseGrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseGrant")
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"***")
            .finish()
    }
}

impl DatabaseGrant {
    /// Create a grant
    pub fn new(
        database: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            database: database.into(),
            user: user.into(),
            password: password.into(),
        }
    }

    /// Short `user@database` label for logs and reports
    pub fn label(&self) -> String {
        format!("{}@{}", self.user, self.database)
    }
}

impl ServerTarget {
    /// Create a server target
    pub fn new(name: impl Into<String>, connection_string: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            connection_string: connection_string.into(),
            databases: Vec::new(),
        }
    }

    /// Add a grant
    #[must_use]
    pub fn with_grant(mut self, grant: DatabaseGrant) -> Self {
        self.databases.push(grant);
        self
    }

    /// Name shown in logs and reports; `index` is 0-based
    pub fn display_name(&self, index: usize) -> String {
        if self.name.is_empty() {
            format!("Server {}", index + 1)
        } else {
            self.name.clone()
        }
    }

    /// Validate this server; `index` is 0-based and only used in messages
    pub fn validate(&self, index: usize) -> Result<()> {
        if self.connection_string.is_empty() {
            return Err(Error::config(format!(
                "server {index}: root connection string is required"
            )));
        }

        if self.databases.is_empty() {
            return Err(Error::config(format!(
                "server {index} ({}): at least one database configuration is required",
                self.name
            )));
        }

        for (entry, grant) in self.databases.iter().enumerate() {
            for (field, value) in [
                ("database", &grant.database),
                ("user", &grant.user),
                ("password", &grant.password),
            ] {
                if value.is_empty() {
                    return Err(Error::config(format!(
                        "server {index} ({}): database entry {entry}: {field} is required",
                        self.name
                    )));
                }
            }
        }

        Ok(())
    }
}

impl DesiredState {
    /// Create a desired state from servers
    pub fn new(servers: Vec<ServerTarget>) -> Self {
        Self { servers }
    }

    /// Validate the minimal document shape
    pub fn validate(&self) -> Result<()> {
        if self.servers.is_empty() {
            return Err(Error::config(
                "at least one server configuration is required",
            ));
        }

        for (index, server) in self.servers.iter().enumerate() {
            server.validate(index)?;
        }

        Ok(())
    }

    /// Total number of grants across all servers
    pub fn grant_count(&self) -> usize {
        self.servers.iter().map(|s| s.databases.len()).sum()
    }
}

// ============================================================================
// Process Settings
// ============================================================================

/// How the process should run, resolved from the environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessSettings {
    /// Path of the provisioning document
    pub config_path: PathBuf,
    /// Keep polling the document and re-run on change
    pub watch: bool,
    /// Poll interval in watch mode
    pub watch_interval: Duration,
}

impl Default for ProcessSettings {
    fn default() -> Self {
        Self {
            config_path: PathBuf::from(DEFAULT_CONFIG_PATH),
            watch: false,
            watch_interval: DEFAULT_WATCH_INTERVAL,
        }
    }
}

impl ProcessSettings {
    /// Read `CONFIG_PATH`, `WATCH_MODE` and `WATCH_INTERVAL_SECS`
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve settings through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let config_path = lookup("CONFIG_PATH")
            .filter(|p| !p.is_empty())
            .map_or(defaults.config_path, PathBuf::from);

        // Only the exact string "true" turns watch mode on
        let watch = lookup("WATCH_MODE").is_some_and(|v| v == "true");

        let watch_interval = lookup("WATCH_INTERVAL_SECS")
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map_or(defaults.watch_interval, Duration::from_secs);

        Self {
            config_path,
            watch,
            watch_interval,
        }
    }
}
