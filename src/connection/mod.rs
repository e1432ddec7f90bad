//! Connection establishment with retry
//!
//! Servers are often still starting when the provisioner runs (for example
//! alongside the database in the same deployment), so a connection is
//! attempted several times with a fixed pause in between. A connection only
//! counts once it has answered a liveness probe.
//!
//! # Overview
//!
//! The connection module provides:
//! - `RetryPolicy` - attempt count, inter-attempt delay and timeouts
//! - `connect_with_retry` - open a verified session or give up
//! - `redact_descriptor` - strip the password from a descriptor for display

use crate::dialect::Dialect;
use crate::error::{Error, Result};
use crate::session::{Connector, SqlSession};
use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default number of connection attempts per server
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Default pause between attempts
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Default bound on opening a connection and on the liveness probe
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Placeholder shown instead of a password
pub const REDACTED: &str = "***";

/// `password=...` pairs in key/value descriptors
static PASSWORD_PAIR_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(password\s*=\s*)('[^']*'|\S+)").expect("password regex is valid")
});

// ============================================================================
// Retry Policy
// ============================================================================

/// How hard to try before a server is skipped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Fixed pause between attempts
    pub delay: Duration,
    /// Bound on the liveness probe
    pub probe_timeout: Duration,
    /// Bound on opening the connection
    pub open_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay: DEFAULT_RETRY_DELAY,
            probe_timeout: DEFAULT_TIMEOUT,
            open_timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl RetryPolicy {
    /// Default attempts with no pause between them
    pub fn immediate() -> Self {
        Self {
            delay: Duration::ZERO,
            ..Self::default()
        }
    }

    /// Set the attempt count (at least one attempt is always made)
    #[must_use]
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Set the pause between attempts
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Set the liveness probe bound
    #[must_use]
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Set the connection open bound
    #[must_use]
    pub fn with_open_timeout(mut self, timeout: Duration) -> Self {
        self.open_timeout = timeout;
        self
    }

    /// Longest time a server can hold up a run while retrying
    ///
    /// Saturates at `Duration::MAX` for absurd policies.
    pub fn worst_case_wait(&self) -> Duration {
        let attempts = self.max_attempts.max(1);
        let per_attempt = self.open_timeout.saturating_add(self.probe_timeout);
        self.delay
            .saturating_mul(attempts - 1)
            .saturating_add(per_attempt.saturating_mul(attempts))
    }
}

// ============================================================================
// Connect
// ============================================================================

/// Open a session and verify it with a liveness probe, retrying on failure
///
/// Failures are retried with the policy's delay slept between attempts but
/// never after the last one. After the final attempt the last failure is
/// returned inside [`Error::Connection`]. A descriptor the driver cannot parse
/// ends the loop at once.
pub async fn connect_with_retry(
    dialect: &dyn Dialect,
    connector: &dyn Connector,
    descriptor: &str,
    policy: &RetryPolicy,
) -> Result<Box<dyn SqlSession>> {
    let max_attempts = policy.max_attempts.max(1);
    let redacted = redact_descriptor(descriptor);
    let mut last_error = String::new();

    for attempt in 1..=max_attempts {
        match try_connect(dialect, connector, descriptor, policy).await {
            Ok(session) => {
                info!(
                    descriptor = %redacted,
                    family = %dialect.family(),
                    attempt,
                    "Connected"
                );
                return Ok(session);
            }
            Err(e) => {
                warn!(
                    descriptor = %redacted,
                    retryable = e.is_retryable(),
                    "Connection attempt {}/{} failed: {}",
                    attempt,
                    max_attempts,
                    e
                );
                if e.is_bad_descriptor() {
                    return Err(Error::connection(attempt, e.to_string()));
                }
                last_error = e.to_string();
            }
        }

        if attempt < max_attempts && !policy.delay.is_zero() {
            debug!("Retrying in {:?}", policy.delay);
            tokio::time::sleep(policy.delay).await;
        }
    }

    Err(Error::connection(max_attempts, last_error))
}

/// One attempt: open within `open_timeout`, then probe within `probe_timeout`
async fn try_connect(
    dialect: &dyn Dialect,
    connector: &dyn Connector,
    descriptor: &str,
    policy: &RetryPolicy,
) -> Result<Box<dyn SqlSession>> {
    let mut session =
        match tokio::time::timeout(policy.open_timeout, dialect.connect(connector, descriptor))
            .await
        {
            Ok(result) => result?,
            Err(_) => {
                return Err(Error::connect_attempt(format!(
                    "opening the connection timed out after {}ms",
                    policy.open_timeout.as_millis()
                )))
            }
        };

    let probe = match tokio::time::timeout(policy.probe_timeout, session.ping()).await {
        Ok(result) => result,
        Err(_) => Err(Error::ProbeTimeout {
            timeout_ms: policy.probe_timeout.as_millis() as u64,
        }),
    };

    match probe {
        Ok(()) => Ok(session),
        Err(e) => {
            if let Err(close_err) = session.close().await {
                debug!("Closing unhealthy session failed: {close_err}");
            }
            Err(e)
        }
    }
}

// ============================================================================
// Redaction
// ============================================================================

/// Replace the password in a connection descriptor with `***`
///
/// URL descriptors are rewritten through the `url` crate; key/value
/// descriptors (`host=... password=...`) fall back to a pattern match.
pub fn redact_descriptor(descriptor: &str) -> String {
    if let Ok(mut parsed) = url::Url::parse(descriptor) {
        if parsed.password().is_some() && parsed.set_password(Some(REDACTED)).is_ok() {
            return parsed.to_string();
        }
        if !descriptor.contains("password=") {
            return descriptor.to_string();
        }
    }

    PASSWORD_PAIR_REGEX
        .replace_all(descriptor, format!("${{1}}{REDACTED}"))
        .into_owned()
}
