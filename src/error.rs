//! Error types for the provisioner
//!
//! One error hierarchy covers the whole crate. The variant decides the scope
//! of a failure: configuration errors end the process, connection errors skip
//! a server, query/statement errors fail a single grant.

use thiserror::Error;

/// The main error type for the provisioner
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Undefined variable in template: {variable}")]
    UndefinedVariable { variable: String },

    // ============================================================================
    // Connection Errors
    // ============================================================================
    #[error("Failed to connect after {attempts} attempts: {message}")]
    Connection { attempts: u32, message: String },

    #[error("Connection attempt failed: {message}")]
    ConnectAttempt { message: String },

    #[error("Liveness probe timed out after {timeout_ms}ms")]
    ProbeTimeout { timeout_ms: u64 },

    // ============================================================================
    // Reconciliation Errors
    // ============================================================================
    #[error("Query failed: {message}")]
    Query { message: String },

    #[error("Statement failed: {message}")]
    Statement { message: String },

    #[error("Invalid identifier '{name}': {reason}")]
    InvalidIdentifier { name: String, reason: String },

    #[error("Database driver error: {0}")]
    Driver(#[from] sqlx::Error),

    // ============================================================================
    // I/O Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an undefined variable error
    pub fn undefined_var(variable: impl Into<String>) -> Self {
        Self::UndefinedVariable {
            variable: variable.into(),
        }
    }

    /// Create a connection error after all attempts were used up
    pub fn connection(attempts: u32, message: impl Into<String>) -> Self {
        Self::Connection {
            attempts,
            message: message.into(),
        }
    }

    /// Create a single-attempt connection error
    pub fn connect_attempt(message: impl Into<String>) -> Self {
        Self::ConnectAttempt {
            message: message.into(),
        }
    }

    /// Create a query error
    pub fn query(message: impl Into<String>) -> Self {
        Self::Query {
            message: message.into(),
        }
    }

    /// Create a statement error
    pub fn statement(message: impl Into<String>) -> Self {
        Self::Statement {
            message: message.into(),
        }
    }

    /// Create an invalid identifier error
    pub fn invalid_identifier(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidIdentifier {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Whether this error means the configuration itself is unusable
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            Error::Config { .. }
                | Error::YamlParse(_)
                | Error::JsonParse(_)
                | Error::UndefinedVariable { .. }
        )
    }

    /// Whether a connection failed because its descriptor is unusable
    ///
    /// Another attempt with the same descriptor fails the same way.
    pub fn is_bad_descriptor(&self) -> bool {
        matches!(
            self,
            Error::Config { .. } | Error::Driver(sqlx::Error::Configuration(_))
        )
    }

    /// Check if this error is retryable
    ///
    /// Only connection-level failures are worth another attempt. A statement
    /// that the server rejected will be rejected again.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::ConnectAttempt { .. } | Error::ProbeTimeout { .. } | Error::Io(_) => true,
            Error::Driver(e) => is_retryable_driver_error(e),
            _ => false,
        }
    }
}

/// Check if a driver error is a transport problem rather than a SQL error
fn is_retryable_driver_error(error: &sqlx::Error) -> bool {
    matches!(
        error,
        sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed
    )
}

/// Result type alias for the provisioner
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", message.into(), inner))
        })
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", f(), inner))
        })
    }
}
