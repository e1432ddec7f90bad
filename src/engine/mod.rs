//! Provisioning engine
//!
//! Runs the desired state against every server, one server at a time.
//!
//! # Overview
//!
//! The engine module provides:
//! - `Provisioner` - connects to each server, reconciles it and closes it
//! - `RunReport` / `ServerReport` - what a run did
//! - `CheckReport` - what a read-only check found
//!
//! A server that cannot be reached is skipped and the run moves on; a failing
//! grant is recorded and the server moves on. Neither ends the run.

mod types;

pub use types::{
    CheckOutcome, CheckReport, GrantCheck, RunReport, RunSummary, ServerCheck, ServerOutcome,
    ServerReport,
};

use crate::config::{DatabaseGrant, DesiredState, ServerTarget};
use crate::connection::{connect_with_retry, redact_descriptor, RetryPolicy};
use crate::dialect::{self, Dialect};
use crate::reconcile;
use crate::session::{Connector, SqlSession, SqlxConnector};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Orchestrates provisioning runs
pub struct Provisioner {
    /// Opens sessions to servers
    connector: Arc<dyn Connector>,
    /// Connection retry policy
    policy: RetryPolicy,
}

impl Default for Provisioner {
    fn default() -> Self {
        Self::new(Arc::new(SqlxConnector))
    }
}

impl Provisioner {
    /// Create a provisioner using `connector` and the default retry policy
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self {
            connector,
            policy: RetryPolicy::default(),
        }
    }

    /// Set the retry policy
    #[must_use]
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Get the retry policy
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Reconcile every server in document order
    pub async fn run(&self, state: &DesiredState) -> RunReport {
        let started_at = Utc::now();
        info!(
            servers = state.servers.len(),
            grants = state.grant_count(),
            "Starting provisioning run"
        );

        let mut servers = Vec::with_capacity(state.servers.len());
        for (index, server) in state.servers.iter().enumerate() {
            servers.push(self.run_server(index, server).await);
        }

        let report = RunReport::new(started_at, servers);
        info!(
            servers = report.summary.servers,
            skipped = report.summary.servers_skipped,
            succeeded = report.summary.grants_succeeded,
            failed = report.summary.grants_failed,
            duration_ms = report.duration_ms(),
            "Provisioning run finished"
        );
        report
    }

    /// Connect to one server, reconcile its grants and close the session
    pub async fn run_server(&self, index: usize, server: &ServerTarget) -> ServerReport {
        let name = server.display_name(index);
        let dialect = dialect::for_descriptor(&server.connection_string);
        let family = dialect.family();
        let descriptor = redact_descriptor(&server.connection_string);

        info!(server = %name, family = %family, "Processing server");
        debug!(
            server = %name,
            worst_case_wait = ?self.policy.worst_case_wait(),
            "Connecting"
        );

        let mut session = match self.connect(dialect.as_ref(), server).await {
            Ok(session) => session,
            Err(reason) => {
                warn!(server = %name, "Skipping server: {reason}");
                return ServerReport {
                    index,
                    name,
                    family,
                    descriptor,
                    outcome: ServerOutcome::Skipped { reason },
                };
            }
        };

        let grants =
            reconcile::reconcile(dialect.as_ref(), session.as_mut(), &name, &server.databases)
                .await;

        close_session(&name, session).await;

        ServerReport {
            index,
            name,
            family,
            descriptor,
            outcome: ServerOutcome::Reconciled { grants },
        }
    }

    /// Look up every grant's user and database without changing anything
    pub async fn check(&self, state: &DesiredState) -> CheckReport {
        let started_at = Utc::now();
        let mut servers = Vec::with_capacity(state.servers.len());

        for (index, server) in state.servers.iter().enumerate() {
            servers.push(self.check_server(index, server).await);
        }

        CheckReport::new(started_at, servers)
    }

    /// Check one server
    pub async fn check_server(&self, index: usize, server: &ServerTarget) -> ServerCheck {
        let name = server.display_name(index);
        let dialect = dialect::for_descriptor(&server.connection_string);
        let family = dialect.family();
        let descriptor = redact_descriptor(&server.connection_string);

        let outcome = match self.connect(dialect.as_ref(), server).await {
            Ok(mut session) => {
                let mut grants = Vec::with_capacity(server.databases.len());
                for grant in &server.databases {
                    grants.push(check_grant(dialect.as_ref(), session.as_mut(), grant).await);
                }
                close_session(&name, session).await;
                CheckOutcome::Reachable { grants }
            }
            Err(reason) => {
                warn!(server = %name, "Server unreachable: {reason}");
                CheckOutcome::Unreachable { reason }
            }
        };

        ServerCheck {
            index,
            name,
            family,
            descriptor,
            outcome,
        }
    }

    async fn connect(
        &self,
        dialect: &dyn Dialect,
        server: &ServerTarget,
    ) -> std::result::Result<Box<dyn SqlSession>, String> {
        connect_with_retry(
            dialect,
            self.connector.as_ref(),
            &server.connection_string,
            &self.policy,
        )
        .await
        .map_err(|e| e.to_string())
    }
}

/// Existence lookups for one grant
async fn check_grant(
    dialect: &dyn Dialect,
    session: &mut dyn SqlSession,
    grant: &DatabaseGrant,
) -> GrantCheck {
    let mut check = GrantCheck {
        user: grant.user.clone(),
        database: grant.database.clone(),
        user_exists: None,
        database_exists: None,
        error: None,
    };

    if let Err(e) = dialect.validate_grant(grant) {
        check.error = Some(e.to_string());
        return check;
    }

    match dialect.user_exists(session, &grant.user).await {
        Ok(exists) => check.user_exists = Some(exists),
        Err(e) => check.error = Some(e.to_string()),
    }

    match dialect.database_exists(session, &grant.database).await {
        Ok(exists) => check.database_exists = Some(exists),
        Err(e) => {
            check.error.get_or_insert_with(|| e.to_string());
        }
    }

    check
}

/// Close a session, logging (not propagating) failures
async fn close_session(server: &str, session: Box<dyn SqlSession>) {
    if let Err(e) = session.close().await {
        warn!(server, "Failed to close connection: {e}");
    }
}

#[cfg(test)]
mod tests;
