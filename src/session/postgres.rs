//! PostgreSQL session over a single `sqlx` connection

use super::{SqlSession, Statement};
use crate::error::{Error, Result};
use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgSslMode};
use sqlx::{Connection, Executor, PgConnection};
use std::iter::Peekable;
use std::str::Chars;
use tracing::debug;

/// A live PostgreSQL connection
pub struct PgSession {
    conn: PgConnection,
}

impl std::fmt::Debug for PgSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgSession").finish_non_exhaustive()
    }
}

impl PgSession {
    /// Open a connection from a URL or a `key=value` descriptor
    pub async fn connect(descriptor: &str) -> Result<Self> {
        let conn = if url::Url::parse(descriptor).is_ok() {
            PgConnection::connect(descriptor).await?
        } else {
            PgConnection::connect_with(&parse_key_value_descriptor(descriptor)?).await?
        };
        Ok(Self { conn })
    }
}

// ============================================================================
// Key/Value Descriptors
// ============================================================================

/// Build connect options from a `host=db user=root password=x dbname=postgres`
/// style descriptor
///
/// Values may be single-quoted, with `\'` and `\\` escapes. Keys that are
/// not set fall back to the `PG*` environment defaults.
pub fn parse_key_value_descriptor(descriptor: &str) -> Result<PgConnectOptions> {
    let mut options = PgConnectOptions::new();

    for (key, value) in key_value_pairs(descriptor)? {
        options = match key.as_str() {
            "host" | "hostaddr" => options.host(&value),
            "port" => options.port(value.parse().map_err(|_| {
                Error::config(format!("invalid port '{value}' in connection descriptor"))
            })?),
            "user" => options.username(&value),
            "password" => options.password(&value),
            "dbname" => options.database(&value),
            "sslmode" => options.ssl_mode(value.parse::<PgSslMode>().map_err(|_| {
                Error::config(format!("invalid sslmode '{value}' in connection descriptor"))
            })?),
            "sslrootcert" => options.ssl_root_cert(value.as_str()),
            "application_name" => options.application_name(&value),
            // Bounded by the retry policy's open timeout instead
            "connect_timeout" => options,
            other => {
                return Err(Error::config(format!(
                    "unsupported key '{other}' in connection descriptor"
                )))
            }
        };
    }

    Ok(options)
}

fn key_value_pairs(descriptor: &str) -> Result<Vec<(String, String)>> {
    let mut pairs = Vec::new();
    let mut chars = descriptor.chars().peekable();

    loop {
        skip_whitespace(&mut chars);
        if chars.peek().is_none() {
            return Ok(pairs);
        }

        let mut key = String::new();
        while let Some(c) = chars.next_if(|c| *c != '=' && !c.is_whitespace()) {
            key.push(c);
        }
        skip_whitespace(&mut chars);
        if key.is_empty() || chars.next() != Some('=') {
            return Err(Error::config(
                "expected key=value pairs in connection descriptor",
            ));
        }
        skip_whitespace(&mut chars);

        let mut value = String::new();
        if chars.next_if_eq(&'\'').is_some() {
            loop {
                match chars.next() {
                    Some('\'') => break,
                    Some('\\') => match chars.next() {
                        Some(c) => value.push(c),
                        None => return Err(unterminated(&key)),
                    },
                    Some(c) => value.push(c),
                    None => return Err(unterminated(&key)),
                }
            }
        } else {
            while let Some(c) = chars.next_if(|c| !c.is_whitespace()) {
                if c == '\\' {
                    if let Some(escaped) = chars.next() {
                        value.push(escaped);
                    }
                } else {
                    value.push(c);
                }
            }
        }

        pairs.push((key, value));
    }
}

fn skip_whitespace(chars: &mut Peekable<Chars<'_>>) {
    while chars.next_if(|c| c.is_whitespace()).is_some() {}
}

fn unterminated(key: &str) -> Error {
    Error::config(format!(
        "unterminated quoted value for '{key}' in connection descriptor"
    ))
}

#[async_trait]
impl SqlSession for PgSession {
    async fn ping(&mut self) -> Result<()> {
        self.conn.ping().await?;
        Ok(())
    }

    async fn execute(&mut self, statement: &Statement) -> Result<u64> {
        debug!(action = ?statement.action, "Executing statement");

        // Utility statements take no bind parameters; send them as simple queries
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

        let mut query = sqlx::query_scalar::<_, bool>(&statement.sql);
        for param in &statement.params {
            query = query.bind(param.as_str());
        }
        query
            .fetch_one(&mut self.conn)
            .await
            .map_err(|e| Error::query(e.to_string()))
    }

    async fn quote_literal(&mut self, value: &str) -> Result<String> {
        sqlx::query_scalar::<_, String>("SELECT quote_literal($1)")
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
