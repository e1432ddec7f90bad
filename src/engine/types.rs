//! Engine types
//!
//! Reports produced by a provisioning run and by a read-only check.

use crate::dialect::DialectFamily;
use crate::reconcile::GrantResult;
use chrono::{DateTime, Utc};
use serde::Serialize;

// ============================================================================
// Run Report
// ============================================================================

/// What happened to one server during a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ServerOutcome {
    /// Connected and reconciled; one result per grant, in document order
    Reconciled {
        /// Per-grant results
        grants: Vec<GrantResult>,
    },
    /// Could not connect; no grant was attempted
    Skipped {
        /// Last connection failure
        reason: String,
    },
}

/// Report for one server
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerReport {
    /// 0-based position in the document
    pub index: usize,
    /// Display name
    pub name: String,
    /// Detected engine family
    pub family: DialectFamily,
    /// Connection descriptor with the password redacted
    pub descriptor: String,
    /// Outcome
    #[serde(flatten)]
    pub outcome: ServerOutcome,
}

impl ServerReport {
    /// Grant results, empty when the server was skipped
    pub fn grants(&self) -> &[GrantResult] {
        match &self.outcome {
            ServerOutcome::Reconciled { grants } => grants,
            ServerOutcome::Skipped { .. } => &[],
        }
    }

    /// Check if the server was skipped
    pub fn is_skipped(&self) -> bool {
        matches!(self.outcome, ServerOutcome::Skipped { .. })
    }
}

/// Aggregate counts over a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Servers in the document
    pub servers: usize,
    /// Servers that could not be reached
    pub servers_skipped: usize,
    /// Grants attempted on reachable servers
    pub grants: usize,
    /// Grants fully reconciled
    pub grants_succeeded: usize,
    /// Grants that failed at some step
    pub grants_failed: usize,
}

impl RunSummary {
    /// Count the outcomes in a list of server reports
    pub fn from_servers(servers: &[ServerReport]) -> Self {
        let mut summary = Self {
            servers: servers.len(),
            ..Self::default()
        };
        for server in servers {
            if server.is_skipped() {
                summary.servers_skipped += 1;
            }
            for grant in server.grants() {
                summary.grants += 1;
                if grant.is_success() {
                    summary.grants_succeeded += 1;
                } else {
                    summary.grants_failed += 1;
                }
            }
        }
        summary
    }
}

/// Result of one full provisioning run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// When the run finished
    pub finished_at: DateTime<Utc>,
    /// Per-server reports, in document order
    pub servers: Vec<ServerReport>,
    /// Aggregate counts
    pub summary: RunSummary,
}

impl RunReport {
    /// Build a report, computing the summary
    pub fn new(started_at: DateTime<Utc>, servers: Vec<ServerReport>) -> Self {
        let summary = RunSummary::from_servers(&servers);
        Self {
            started_at,
            finished_at: Utc::now(),
            servers,
            summary,
        }
    }

    /// True when no server was skipped and no grant failed
    pub fn is_clean(&self) -> bool {
        self.summary.servers_skipped == 0 && self.summary.grants_failed == 0
    }

    /// Run duration in milliseconds
    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }
}

// ============================================================================
// Check Report
// ============================================================================

/// Existence of one grant's user and database
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GrantCheck {
    /// User name
    pub user: String,
    /// Database name
    pub database: String,
    /// Whether the user exists (unknown when the lookup failed)
    pub user_exists: Option<bool>,
    /// Whether the database exists (unknown when the lookup failed)
    pub database_exists: Option<bool>,
    /// Lookup or validation error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl GrantCheck {
    /// True when both the user and the database exist
    pub fn is_present(&self) -> bool {
        self.user_exists == Some(true) && self.database_exists == Some(true)
    }
}

/// What a check found on one server
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CheckOutcome {
    /// Connected and looked up every grant
    Reachable {
        /// Per-grant findings
        grants: Vec<GrantCheck>,
    },
    /// Could not connect
    Unreachable {
        /// Last connection failure
        reason: String,
    },
}

/// Check report for one server
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerCheck {
    /// 0-based position in the document
    pub index: usize,
    /// Display name
    pub name: String,
    /// Detected engine family
    pub family: DialectFamily,
    /// Connection descriptor with the password redacted
    pub descriptor: String,
    /// Findings
    #[serde(flatten)]
    pub outcome: CheckOutcome,
}

/// Result of a read-only check over every server
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckReport {
    /// When the check started
    pub started_at: DateTime<Utc>,
    /// When the check finished
    pub finished_at: DateTime<Utc>,
    /// Per-server findings, in document order
    pub servers: Vec<ServerCheck>,
}

impl CheckReport {
    /// Build a report stamped with the finish time
    pub fn new(started_at: DateTime<Utc>, servers: Vec<ServerCheck>) -> Self {
        Self {
            started_at,
            finished_at: Utc::now(),
            servers,
        }
    }

    /// True when every server was reachable and every grant already present
    pub fn all_present(&self) -> bool {
        self.servers.iter().all(|s| match &s.outcome {
            CheckOutcome::Reachable { grants } => grants.iter().all(GrantCheck::is_present),
            CheckOutcome::Unreachable { .. } => false,
        })
    }
}
