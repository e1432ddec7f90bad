//! MySQL / MariaDB dialect
//!
//! Accounts are host-scoped (always the `%` wildcard host here) and databases
//! have no owner; access comes only from grants, which need a privilege
//! reload afterwards.

use super::ident::{self, quote_mysql, MYSQL_MAX_DATABASE_CHARS, MYSQL_MAX_USER_CHARS};
use super::{DatabaseOutcome, Dialect, DialectFamily, MYSQL_SCHEMES};
use crate::config::DatabaseGrant;
use crate::error::Result;
use crate::session::{Action, SqlSession, Statement};
use async_trait::async_trait;
use tracing::debug;

/// Scheme the driver understands
const DRIVER_SCHEME: &str = "mysql://";

/// Character set for created databases
pub const CHARACTER_SET: &str = "utf8mb4";

/// Collation for created databases
pub const COLLATION: &str = "utf8mb4_unicode_ci";

/// MySQL and MariaDB servers
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlDialect;

impl MySqlDialect {
    /// `` `user`@`%` ``
    pub fn account(&self, user: &str) -> String {
        format!("{}@`%`", quote_mysql(user))
    }

    /// `CREATE DATABASE IF NOT EXISTS ... CHARACTER SET ... COLLATE ...`
    pub fn create_database_statement(&self, database: &str) -> Statement {
        Statement::new(
            format!(
                "CREATE DATABASE IF NOT EXISTS {} CHARACTER SET {CHARACTER_SET} COLLATE {COLLATION}",
                quote_mysql(database)
            ),
            Action::CreateDatabase {
                database: database.to_string(),
                owner: None,
                if_not_exists: true,
            },
        )
    }

    /// `FLUSH PRIVILEGES`
    pub fn flush_statement(&self) -> Statement {
        Statement::new("FLUSH PRIVILEGES", Action::FlushPrivileges)
    }
}

#[async_trait]
impl Dialect for MySqlDialect {
    fn family(&self) -> DialectFamily {
        DialectFamily::MySql
    }

    fn normalize_descriptor(&self, descriptor: &str) -> String {
        MYSQL_SCHEMES
            .iter()
            .find_map(|scheme| descriptor.strip_prefix(scheme))
            .map_or_else(
                || descriptor.to_string(),
                |rest| format!("{DRIVER_SCHEME}{rest}"),
            )
    }

    fn validate_grant(&self, grant: &DatabaseGrant) -> Result<()> {
        ident::validate(&grant.user, "user", MYSQL_MAX_USER_CHARS, ident::char_len)?;
        ident::validate(
            &grant.database,
            "database",
            MYSQL_MAX_DATABASE_CHARS,
            ident::char_len,
        )
    }

    fn user_exists_query(&self, user: &str) -> Statement {
        Statement::new(
            "SELECT COUNT(*) FROM mysql.user WHERE user = ? AND host = '%'",
            Action::UserExists {
                user: user.to_string(),
            },
        )
        .bind(user)
    }

    fn database_exists_query(&self, database: &str) -> Statement {
        Statement::new(
            "SELECT COUNT(*) FROM information_schema.schemata WHERE schema_name = ?",
            Action::DatabaseExists {
                database: database.to_string(),
            },
        )
        .bind(database)
    }

    fn create_user_statement(&self, user: &str, password: &str) -> Statement {
        Statement::new(
            format!("CREATE USER {} IDENTIFIED BY {password}", self.account(user)),
            Action::CreateUser {
                user: user.to_string(),
            },
        )
    }

    fn alter_password_statement(&self, user: &str, password: &str) -> Statement {
        Statement::new(
            format!("ALTER USER {} IDENTIFIED BY {password}", self.account(user)),
            Action::AlterPassword {
                user: user.to_string(),
            },
        )
    }

    fn grant_statement(&self, database: &str, user: &str) -> Statement {
        Statement::new(
            format!(
                "GRANT ALL PRIVILEGES ON {}.* TO {}",
                quote_mysql(database),
                self.account(user)
            ),
            Action::Grant {
                database: database.to_string(),
                user: user.to_string(),
            },
        )
    }

    async fn ensure_database(
        &self,
        session: &mut dyn SqlSession,
        database: &str,
        _owner: &str,
    ) -> Result<DatabaseOutcome> {
        // Row counts for IF NOT EXISTS differ across server versions
        session
            .execute(&self.create_database_statement(database))
            .await?;

        debug!(database, "Ensured database");
        Ok(DatabaseOutcome::Ensured)
    }

    async fn finalize(&self, session: &mut dyn SqlSession) -> Result<()> {
        session.execute(&self.flush_statement()).await?;
        Ok(())
    }
}
