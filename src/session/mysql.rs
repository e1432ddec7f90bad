//! MySQL / MariaDB session over a single `sqlx` connection

use super::{SqlSession, Statement};
use crate::error::{Error, Result};
use async_trait::async_trait;
use sqlx::{Connection, Executor, MySqlConnection};
use tracing::debug;

/// A live MySQL or MariaDB connection
pub struct MySqlSession {
    conn: MySqlConnection,
}

impl std::fmt::Debug for MySqlSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MySqlSession").finish_non_exhaustive()
    }
}

impl MySqlSession {
    /// Open a connection; `url` must use the `mysql://` scheme
    pub async fn connect(url: &str) -> Result<Self> {
        let conn = MySqlConnection::connect(url).await?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl SqlSession for MySqlSession {
    async fn ping(&mut self) -> Result<()> {
        self.conn.ping().await?;
        Ok(())
    }

    async fn execute(&mut self, statement: &Statement) -> Result<u64> {
        debug!(action = ?statement.action, "Executing statement");

        // Without parameters the text protocol is used, which accepts every
        // administrative statement
        let result = if statement.params.is_empty() {
            self.conn.execute(statement.sql.as_str()).await
        } else {
            let mut query = sqlx::query(&statement.sql);
            for param in &statement.params {
                query = query.bind(param.as_str());
            }
            query.execute(&mut self.conn).await
        };

        result
            .map(|r| r.rows_affected())
            .map_err(|e| Error::statement(e.to_string()))
    }

    async fn fetch_exists(&mut self, statement: &Statement) -> Result<bool> {
        debug!(action = ?statement.action, "Running existence query");

        let mut query = sqlx::query_scalar::<_, i64>(&statement.sql);
        for param in &statement.params {
            query = query.bind(param.as_str());
        }
        query
            .fetch_one(&mut self.conn)
            .await
            .map(|count| count > 0)
            .map_err(|e| Error::query(e.to_string()))
    }

    async fn quote_literal(&mut self, value: &str) -> Result<String> {
        sqlx::query_scalar::<_, String>("SELECT QUOTE(?)")
            .bind(value)
            .fetch_one(&mut self.conn)
            .await
            .map_err(|e| Error::query(format!("failed to quote literal: {e}")))
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.conn.close().await?;
        Ok(())
    }
}
