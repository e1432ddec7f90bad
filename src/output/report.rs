//! Report rendering

use crate::config::DesiredState;
use crate::connection::redact_descriptor;
use crate::dialect::DialectFamily;
use crate::engine::{CheckOutcome, CheckReport, GrantCheck, RunReport, ServerOutcome};
use crate::error::Result;
use crate::reconcile::{GrantOutcome, GrantResult};
use serde::Serialize;

/// Render any report as one line of JSON
pub fn render_json<T: Serialize>(report: &T) -> Result<String> {
    Ok(serde_json::to_string(report)?)
}

/// Human-readable run summary
pub fn render_pretty(report: &RunReport) -> String {
    let mut lines = vec![format!(
        "Provisioning run at {} ({} ms)",
        report.started_at.format("%Y-%m-%d %H:%M:%S UTC"),
        report.duration_ms()
    )];

    for server in &report.servers {
        lines.push(format!(
            "[{}] {} ({}) {}",
            server.index + 1,
            server.name,
            server.family,
            server.descriptor
        ));
        match &server.outcome {
            ServerOutcome::Skipped { reason } => lines.push(format!("    SKIPPED  {reason}")),
            ServerOutcome::Reconciled { grants } => {
                lines.extend(grants.iter().map(grant_line));
            }
        }
    }

    let s = &report.summary;
    lines.push(format!(
        "Summary: {} servers ({} skipped), {} grants: {} succeeded, {} failed",
        s.servers, s.servers_skipped, s.grants, s.grants_succeeded, s.grants_failed
    ));

    lines.join("\n")
}

fn grant_line(result: &GrantResult) -> String {
    match &result.outcome {
        GrantOutcome::Success { user, database } => format!(
            "    ok       {}  user {}, database {}",
            result.grant.label(),
            snake(user),
            snake(database)
        ),
        GrantOutcome::Failure { step, reason } => {
            format!("    FAILED   {}  {step}: {reason}", result.grant.label())
        }
    }
}

/// Human-readable check summary
pub fn render_check_pretty(report: &CheckReport) -> String {
    let mut lines = Vec::new();

    for server in &report.servers {
        lines.push(format!(
            "[{}] {} ({}) {}",
            server.index + 1,
            server.name,
            server.family,
            server.descriptor
        ));
        match &server.outcome {
            CheckOutcome::Unreachable { reason } => {
                lines.push(format!("    UNREACHABLE  {reason}"));
            }
            CheckOutcome::Reachable { grants } => lines.extend(grants.iter().map(check_line)),
        }
    }

    lines.push(if report.all_present() {
        "All users and databases present".to_string()
    } else {
        "Some users or databases are missing or could not be checked".to_string()
    });

    lines.join("\n")
}

fn check_line(check: &GrantCheck) -> String {
    let label = format!("{}@{}", check.user, check.database);
    if let Some(error) = &check.error {
        return format!("    ERROR    {label}  {error}");
    }
    format!(
        "    {:<8} {label}  user {}, database {}",
        if check.is_present() { "present" } else { "missing" },
        presence(check.user_exists),
        presence(check.database_exists)
    )
}

fn presence(exists: Option<bool>) -> &'static str {
    match exists {
        Some(true) => "exists",
        Some(false) => "missing",
        None => "unknown",
    }
}

/// List what a validated document would provision
pub fn render_state_summary(state: &DesiredState) -> String {
    let mut lines = vec![format!(
        "Config is valid: {} servers, {} grants",
        state.servers.len(),
        state.grant_count()
    )];

    for (index, server) in state.servers.iter().enumerate() {
        lines.push(format!(
            "[{}] {} ({}) {}",
            index + 1,
            server.display_name(index),
            DialectFamily::detect(&server.connection_string),
            redact_descriptor(&server.connection_string)
        ));
        lines.extend(
            server
                .databases
                .iter()
                .map(|grant| format!("    {}", grant.label())),
        );
    }

    lines.join("\n")
}

/// Serialized variant name as words: `password_updated` becomes `password updated`
fn snake<T: Serialize>(value: &T) -> String {
    serde_json::to_value(value)
        .ok()
        .and_then(|v| v.as_str().map(|s| s.replace('_', " ")))
        .unwrap_or_default()
}
