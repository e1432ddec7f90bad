//! Reconciliation result types

use crate::config::DatabaseGrant;
use crate::dialect::{DatabaseOutcome, UserOutcome};
use serde::Serialize;
use std::fmt;

/// A step of the per-grant sequence, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    /// Identifier validation
    Validate,
    /// Create the user or reset its password
    EnsureUser,
    /// Create the database or fix its owner
    EnsureDatabase,
    /// Grant all privileges
    GrantPrivileges,
    /// Dialect-specific post-grant work
    Finalize,
}

impl Step {
    /// Step name as shown in reports
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validate => "validate",
            Self::EnsureUser => "ensure_user",
            Self::EnsureDatabase => "ensure_database",
            Self::GrantPrivileges => "grant_privileges",
            Self::Finalize => "finalize",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a single grant ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GrantOutcome {
    /// Every step succeeded
    Success {
        /// What happened to the user
        user: UserOutcome,
        /// What happened to the database
        database: DatabaseOutcome,
    },
    /// A step failed and the remaining steps were skipped
    Failure {
        /// The failing step
        step: Step,
        /// Error message from the server or validation
        reason: String,
    },
}

/// Result of reconciling one grant
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GrantResult {
    /// The grant (its password is never serialized)
    pub grant: DatabaseGrant,
    /// What happened
    pub outcome: GrantOutcome,
}

impl GrantResult {
    /// Successful result
    pub fn success(grant: DatabaseGrant, user: UserOutcome, database: DatabaseOutcome) -> Self {
        Self {
            grant,
            outcome: GrantOutcome::Success { user, database },
        }
    }

    /// Failed result
    pub fn failure(grant: DatabaseGrant, step: Step, reason: impl Into<String>) -> Self {
        Self {
            grant,
            outcome: GrantOutcome::Failure {
                step,
                reason: reason.into(),
            },
        }
    }

    /// Check if the grant was fully reconciled
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, GrantOutcome::Success { .. })
    }

    /// The failing step, if any
    pub fn failed_step(&self) -> Option<Step> {
        match &self.outcome {
            GrantOutcome::Failure { step, .. } => Some(*step),
            GrantOutcome::Success { .. } => None,
        }
    }
}
