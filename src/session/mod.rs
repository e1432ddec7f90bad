//! SQL sessions
//!
//! A session is one live connection to a managed server. The reconciler only
//! ever talks to a server through [`SqlSession`], so the same dialect code runs
//! against `sqlx` connections in production and against `MemoryServer` in
//! tests.
//!
//! # Overview
//!
//! The session module provides:
//! - `SqlSession` - execute statements, check existence, quote literals
//! - `Connector` - opens sessions for a dialect family
//! - `SqlxConnector` - real PostgreSQL / MySQL connections
//! - `MemoryServer` / `MemoryConnector` - simulated servers (`testing` feature)

#[cfg(any(test, feature = "testing"))]
mod memory;
mod mysql;
mod postgres;

#[cfg(any(test, feature = "testing"))]
pub use memory::{MemoryConnector, MemoryServer, MemorySnapshot};
pub use mysql::MySqlSession;
pub use postgres::{parse_key_value_descriptor, PgSession};

use crate::dialect::DialectFamily;
use crate::error::Result;
use async_trait::async_trait;
use std::fmt;

// ============================================================================
// Statements
// ============================================================================

/// The administrative effect a statement has on the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Look up whether a user exists
    UserExists { user: String },
    /// Look up whether a database exists
    DatabaseExists { database: String },
    /// Create a user with a password
    CreateUser { user: String },
    /// Reset an existing user's password
    AlterPassword { user: String },
    /// Create a database
    CreateDatabase {
        database: String,
        owner: Option<String>,
        if_not_exists: bool,
    },
    /// Hand an existing database to a new owner
    AlterOwner { database: String, owner: String },
    /// Grant all privileges on a database
    Grant { database: String, user: String },
    /// Reload the privilege tables
    FlushPrivileges,
}

impl Action {
    /// Whether the statement text embeds a secret
    pub fn is_sensitive(&self) -> bool {
        matches!(self, Action::CreateUser { .. } | Action::AlterPassword { .. })
    }
}

/// A SQL statement plus the values bound to its placeholders
#[derive(Clone, PartialEq, Eq)]
pub struct Statement {
    /// SQL text
    pub sql: String,
    /// Bound parameter values, in placeholder order
    pub params: Vec<String>,
    /// What the statement does
    pub action: Action,
}

impl Statement {
    /// Create a statement without parameters
    pub fn new(sql: impl Into<String>, action: Action) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
            action,
        }
    }

    /// Bind a parameter value
    #[must_use]
    pub fn bind(mut self, value: impl Into<String>) -> Self {
        self.params.push(value.into());
        self
    }
}

impl fmt::Debug for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sql = if self.action.is_sensitive() {
            "<redacted>"
        } else {
            self.sql.as_str()
        };
        f.debug_struct("Statement")
            .field("sql", &sql)
            .field("params", &self.params)
            .field("action", &self.action)
            .finish()
    }
}

// ============================================================================
// Session Traits
// ============================================================================

/// One live connection to a managed server
#[async_trait]
pub trait SqlSession: Send {
    /// Liveness probe
    async fn ping(&mut self) -> Result<()>;

    /// Execute a statement, returning the number of affected rows
    async fn execute(&mut self, statement: &Statement) -> Result<u64>;

    /// Run an existence query
    async fn fetch_exists(&mut self, statement: &Statement) -> Result<bool>;

    /// Quote a value as a SQL string literal using the server's own quoting
    ///
    /// The value travels as a bound parameter; the server returns the literal.
    async fn quote_literal(&mut self, value: &str) -> Result<String>;

    /// Close the connection
    async fn close(self: Box<Self>) -> Result<()>;
}

/// Opens sessions to servers
#[async_trait]
pub trait Connector: Send + Sync {
    /// Open a session for `family` using an already normalized descriptor
    async fn open(&self, family: DialectFamily, descriptor: &str) -> Result<Box<dyn SqlSession>>;
}

/// Connector backed by real `sqlx` connections
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlxConnector;

#[async_trait]
impl Connector for SqlxConnector {
    async fn open(&self, family: DialectFamily, descriptor: &str) -> Result<Box<dyn SqlSession>> {
        match family {
            DialectFamily::Postgres => Ok(Box::new(PgSession::connect(descriptor).await?)),
            DialectFamily::MySql => Ok(Box::new(MySqlSession::connect(descriptor).await?)),
        }
    }
}
