//! Engine dialects
//!
//! PostgreSQL-family and MySQL-family servers disagree on what a database
//! owner is, on how a user is identified, and on which existence checks are
//! needed. Each family implements [`Dialect`]; the reconciler only sees the
//! trait, so a third family plugs in without touching it.
//!
//! # Overview
//!
//! The dialect module provides:
//! - `DialectFamily` - detection from a connection descriptor's scheme
//! - `Dialect` - the uniform reconciliation contract
//! - `PostgresDialect`, `MySqlDialect` - the two implementations
//! - `ident` - identifier quoting and validation

pub mod ident;
mod mysql;
mod postgres;

pub use mysql::MySqlDialect;
pub use postgres::PostgresDialect;

use crate::config::DatabaseGrant;
use crate::error::Result;
use crate::session::{Connector, SqlSession, Statement};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Scheme prefixes that select the MySQL family, checked in order
pub const MYSQL_SCHEMES: [&str; 2] = ["mariadb://", "mysql://"];

// ============================================================================
// Family Detection
// ============================================================================

/// Engine family of a managed server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DialectFamily {
    /// PostgreSQL and compatible servers
    #[default]
    Postgres,
    /// MySQL and MariaDB
    MySql,
}

impl DialectFamily {
    /// Classify a connection descriptor by its scheme prefix
    ///
    /// Matching is case-sensitive. Anything that is not a MySQL-family scheme,
    /// including descriptors without a scheme, is treated as PostgreSQL.
    pub fn detect(descriptor: &str) -> Self {
        if MYSQL_SCHEMES
            .iter()
            .any(|scheme| descriptor.starts_with(scheme))
        {
            Self::MySql
        } else {
            Self::Postgres
        }
    }

    /// Human-readable name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Postgres => "PostgreSQL",
            Self::MySql => "MariaDB/MySQL",
        }
    }
}

impl fmt::Display for DialectFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Get the dialect implementation for a family
pub fn for_family(family: DialectFamily) -> Arc<dyn Dialect> {
    match family {
        DialectFamily::Postgres => Arc::new(PostgresDialect),
        DialectFamily::MySql => Arc::new(MySqlDialect),
    }
}

/// Detect the family of a descriptor and return its dialect
pub fn for_descriptor(descriptor: &str) -> Arc<dyn Dialect> {
    for_family(DialectFamily::detect(descriptor))
}

// ============================================================================
// Outcomes
// ============================================================================

/// What happened to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserOutcome {
    /// The user did not exist and was created
    Created,
    /// The user existed and its password was reset
    PasswordUpdated,
}

/// What happened to the database
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatabaseOutcome {
    /// The database did not exist and was created
    Created,
    /// The database existed and its owner was (re)assigned
    OwnerUpdated,
    /// An idempotent create ran; the server does not say whether it was new
    Ensured,
}

// ============================================================================
// Dialect Trait
// ============================================================================

/// Engine-specific statements and existence semantics
#[async_trait]
pub trait Dialect: Send + Sync {
    /// Family this dialect implements
    fn family(&self) -> DialectFamily;

    /// Rewrite a descriptor into the form the driver expects
    fn normalize_descriptor(&self, descriptor: &str) -> String {
        descriptor.to_string()
    }

    /// Reject names that cannot be used as identifiers on this family
    fn validate_grant(&self, grant: &DatabaseGrant) -> Result<()>;

    /// Query answering whether `user` exists
    fn user_exists_query(&self, user: &str) -> Statement;

    /// Query answering whether `database` exists
    fn database_exists_query(&self, database: &str) -> Statement;

    /// Statement creating `user`; `password` is an already quoted literal
    fn create_user_statement(&self, user: &str, password: &str) -> Statement;

    /// Statement resetting the password of `user`; `password` is a quoted literal
    fn alter_password_statement(&self, user: &str, password: &str) -> Statement;

    /// Statement granting every privilege on `database` to `user`
    fn grant_statement(&self, database: &str, user: &str) -> Statement;

    /// Open a session to the server behind `descriptor`
    async fn connect(
        &self,
        connector: &dyn Connector,
        descriptor: &str,
    ) -> Result<Box<dyn SqlSession>> {
        let normalized = self.normalize_descriptor(descriptor);
        connector.open(self.family(), &normalized).await
    }

    /// Check whether a user exists
    async fn user_exists(&self, session: &mut dyn SqlSession, user: &str) -> Result<bool> {
        session.fetch_exists(&self.user_exists_query(user)).await
    }

    /// Check whether a database exists
    async fn database_exists(&self, session: &mut dyn SqlSession, database: &str) -> Result<bool> {
        session
            .fetch_exists(&self.database_exists_query(database))
            .await
    }

    /// Create the user, or reset its password when it already exists
    ///
    /// The password is always written; whether it already matches is never
    /// checked.
    async fn ensure_user(
        &self,
        session: &mut dyn SqlSession,
        user: &str,
        password: &str,
    ) -> Result<UserOutcome> {
        let exists = self.user_exists(session, user).await?;
        let literal = session.quote_literal(password).await?;

        if exists {
            debug!(user, "User exists, resetting password");
            session
                .execute(&self.alter_password_statement(user, &literal))
                .await?;
            Ok(UserOutcome::PasswordUpdated)
        } else {
            debug!(user, "Creating user");
            session
                .execute(&self.create_user_statement(user, &literal))
                .await?;
            Ok(UserOutcome::Created)
        }
    }

    /// Make sure the database exists and, where the family has owners, is
    /// owned by `owner`
    async fn ensure_database(
        &self,
        session: &mut dyn SqlSession,
        database: &str,
        owner: &str,
    ) -> Result<DatabaseOutcome>;

    /// Grant every privilege on `database` to `user`
    async fn grant_privileges(
        &self,
        session: &mut dyn SqlSession,
        database: &str,
        user: &str,
    ) -> Result<()> {
        session
            .execute(&self.grant_statement(database, user))
            .await?;
        Ok(())
    }

    /// Work that must follow the grants (nothing by default)
    async fn finalize(&self, _session: &mut dyn SqlSession) -> Result<()> {
        Ok(())
    }
}
