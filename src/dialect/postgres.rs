//! PostgreSQL-family dialect
//!
//! Roles are global and databases have a first-class owner, so ensuring a
//! database means creating it with the owner or forcibly reassigning it.

use super::ident::{self, quote_postgres, POSTGRES_MAX_IDENTIFIER_BYTES};
use super::{DatabaseOutcome, Dialect, DialectFamily};
use crate::config::DatabaseGrant;
use crate::error::Result;
use crate::session::{Action, SqlSession, Statement};
use async_trait::async_trait;
use tracing::debug;

/// PostgreSQL and compatible servers
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDialect;

impl PostgresDialect {
    /// `CREATE DATABASE "db" OWNER "user"`
    pub fn create_database_statement(&self, database: &str, owner: &str) -> Statement {
        Statement::new(
            format!(
                "CREATE DATABASE {} OWNER {}",
                quote_postgres(database),
                quote_postgres(owner)
            ),
            Action::CreateDatabase {
                database: database.to_string(),
                owner: Some(owner.to_string()),
                if_not_exists: false,
            },
        )
    }

    /// `ALTER DATABASE "db" OWNER TO "user"`
    pub fn alter_owner_statement(&self, database: &str, owner: &str) -> Statement {
        Statement::new(
            format!(
                "ALTER DATABASE {} OWNER TO {}",
                quote_postgres(database),
                quote_postgres(owner)
            ),
            Action::AlterOwner {
                database: database.to_string(),
                owner: owner.to_string(),
            },
        )
    }
}

#[async_trait]
impl Dialect for PostgresDialect {
    fn family(&self) -> DialectFamily {
        DialectFamily::Postgres
    }

    fn validate_grant(&self, grant: &DatabaseGrant) -> Result<()> {
        ident::validate(
            &grant.user,
            "user",
            POSTGRES_MAX_IDENTIFIER_BYTES,
            ident::byte_len,
        )?;
        ident::validate(
            &grant.database,
            "database",
            POSTGRES_MAX_IDENTIFIER_BYTES,
            ident::byte_len,
        )
    }

    fn user_exists_query(&self, user: &str) -> Statement {
        Statement::new(
            "SELECT EXISTS(SELECT 1 FROM pg_roles WHERE rolname = $1)",
            Action::UserExists {
                user: user.to_string(),
            },
        )
        .bind(user)
    }

    fn database_exists_query(&self, database: &str) -> Statement {
        Statement::new(
            "SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)",
            Action::DatabaseExists {
                database: database.to_string(),
            },
        )
        .bind(database)
    }

    fn create_user_statement(&self, user: &str, password: &str) -> Statement {
        Statement::new(
            format!("CREATE USER {} WITH PASSWORD {password}", quote_postgres(user)),
            Action::CreateUser {
                user: user.to_string(),
            },
        )
    }

    fn alter_password_statement(&self, user: &str, password: &str) -> Statement {
        Statement::new(
            format!("ALTER USER {} WITH PASSWORD {password}", quote_postgres(user)),
            Action::AlterPassword {
                user: user.to_string(),
            },
        )
    }

    fn grant_statement(&self, database: &str, user: &str) -> Statement {
        Statement::new(
            format!(
                "GRANT ALL PRIVILEGES ON DATABASE {} TO {}",
                quote_postgres(database),
                quote_postgres(user)
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
        owner: &str,
    ) -> Result<DatabaseOutcome> {
        if self.database_exists(session, database).await? {
            debug!(database, owner, "Database exists, reassigning owner");
            session
                .execute(&self.alter_owner_statement(database, owner))
                .await?;
            Ok(DatabaseOutcome::OwnerUpdated)
        } else {
            debug!(database, owner, "Creating database");
            session
                .execute(&self.create_database_statement(database, owner))
                .await?;
            Ok(DatabaseOutcome::Created)
        }
    }
}
