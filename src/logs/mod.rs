use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::core::{CheckStatus, FindingsSummary};
use crate::gateway::{ContextSwitch, QueryAttempt, QueryWarning};

/// What a live verification run did, for the audit log.
#[derive(Debug, Clone)]
pub struct VerifyRun<'a> {
    pub started_at: OffsetDateTime,
    pub finished_at: OffsetDateTime,
    pub target: &'a str,
    pub user: &'a str,
    pub profile: Option<&'a str>,
    pub groups: &'a [String],
    pub context_switch: &'a ContextSwitch,
    pub attempts: &'a [QueryAttempt],
    pub warnings: &'a [QueryWarning],
    pub summary: &'a FindingsSummary,
    pub overall: CheckStatus,
}

#[derive(Debug, Serialize)]
struct VerifyLog<'a> {
    schema_version: &'static str,
    tool_version: &'static str,
    command: &'static str,
    started_at: String,
    finished_at: String,
    status: &'static str,
    target: &'a str,
    user: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    profile: Option<&'a str>,
    groups: &'a [String],
    context_switch: &'a ContextSwitch,
    attempts: &'a [QueryAttempt],
    #[serde(skip_serializing_if = "<[QueryWarning]>::is_empty")]
    warnings: &'a [QueryWarning],
    summary: &'a FindingsSummary,
    overall: CheckStatus,
}

pub fn logs_dir(home_dir: &Path) -> PathBuf {
    crate::config::config_dir(home_dir).join("logs")
}

pub fn write_verify_log(home_dir: &Path, run: &VerifyRun<'_>) -> Result<PathBuf> {
    let dir = logs_dir(home_dir);
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create log directory: {}", dir.display()))?;

    let pid = std::process::id();
    let ts = run.finished_at.unix_timestamp_nanos();
    let path = dir.join(format!("verify-{pid}-{ts}.json"));

    let status = if run.attempts.iter().any(|a| a.error.is_some()) {
        "partial_error"
    } else {
        "ok"
    };

    let log = VerifyLog {
        schema_version: "1.0",
        tool_version: env!("CARGO_PKG_VERSION"),
        command: "verify",
        started_at: format_ts(run.started_at),
        finished_at: format_ts(run.finished_at),
        status,
        target: run.target,
        user: run.user,
        profile: run.profile,
        groups: run.groups,
        context_switch: run.context_switch,
        attempts: run.attempts,
        warnings: run.warnings,
        summary: run.summary,
        overall: run.overall,
    };

    let buf = serde_json::to_vec_pretty(&log).context("failed to serialize log (JSON)")?;
    std::fs::write(&path, buf)
        .with_context(|| format!("failed to write log: {}", path.display()))?;
    tracing::debug!(path = %path.display(), "wrote run log");
    Ok(path)
}

pub fn format_ts(ts: OffsetDateTime) -> String {
    ts.format(&Rfc3339).unwrap_or_else(|_| "unknown".to_string())
}
