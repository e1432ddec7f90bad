//! Per-server reconciliation
//!
//! Walks a server's grants in order and converges each one independently:
//! a failing grant is recorded and the next grant still runs.
//!
//! # Overview
//!
//! The reconcile module provides:
//! - `reconcile` - run every grant of one server over an open session
//! - `reconcile_grant` - the step sequence for a single grant
//! - `Step`, `GrantOutcome`, `GrantResult` - per-grant results

mod types;

pub use types::{GrantOutcome, GrantResult, Step};

use crate::config::DatabaseGrant;
use crate::dialect::Dialect;
use crate::error::Result;
use crate::session::SqlSession;
use tracing::{info, warn};

/// Reconcile every grant of one server, in order
///
/// Always returns one result per input grant. Nothing here is fatal: errors
/// end up in the results.
pub async fn reconcile(
    dialect: &dyn Dialect,
    session: &mut dyn SqlSession,
    server_name: &str,
    grants: &[DatabaseGrant],
) -> Vec<GrantResult> {
    let mut results = Vec::with_capacity(grants.len());

    for grant in grants {
        let result = reconcile_grant(dialect, session, grant).await;

        match &result.outcome {
            GrantOutcome::Success { user, database } => info!(
                server = server_name,
                grant = %grant.label(),
                user_outcome = ?user,
                database_outcome = ?database,
                "Grant reconciled"
            ),
            GrantOutcome::Failure { step, reason } => warn!(
                server = server_name,
                grant = %grant.label(),
                step = %step,
                "Grant failed: {reason}"
            ),
        }

        results.push(result);
    }

    results
}

/// Run the step sequence for one grant, stopping at the first failure
pub async fn reconcile_grant(
    dialect: &dyn Dialect,
    session: &mut dyn SqlSession,
    grant: &DatabaseGrant,
) -> GrantResult {
    if let Err(e) = dialect.validate_grant(grant) {
        return GrantResult::failure(grant.clone(), Step::Validate, e.to_string());
    }

    let user = match at_step(
        Step::EnsureUser,
        dialect.ensure_user(session, &grant.user, &grant.password).await,
    ) {
        Ok(outcome) => outcome,
        Err((step, reason)) => return GrantResult::failure(grant.clone(), step, reason),
    };

    let database = match at_step(
        Step::EnsureDatabase,
        dialect
            .ensure_database(session, &grant.database, &grant.user)
            .await,
    ) {
        Ok(outcome) => outcome,
        Err((step, reason)) => return GrantResult::failure(grant.clone(), step, reason),
    };

    if let Err((step, reason)) = at_step(
        Step::GrantPrivileges,
        dialect
            .grant_privileges(session, &grant.database, &grant.user)
            .await,
    ) {
        return GrantResult::failure(grant.clone(), step, reason);
    }

    if let Err((step, reason)) = at_step(Step::Finalize, dialect.finalize(session).await) {
        return GrantResult::failure(grant.clone(), step, reason);
    }

    GrantResult::success(grant.clone(), user, database)
}

/// Tag a step's error with the step
fn at_step<T>(step: Step, result: Result<T>) -> std::result::Result<T, (Step, String)> {
    result.map_err(|e| (step, e.to_string()))
}
