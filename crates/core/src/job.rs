// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Remediation jobs: the per-(tool, finding group) unit of work.
//!
//! The job ledger is the de-duplication point across workers and across
//! repeated runs: at most one `running` or `completed` job may cover any
//! `(repo, tool, finding)` triple.

use crate::id::{JobId, RunId};
use crate::tool::Tool;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Longest error text stored on a job row.
pub const MAX_JOB_ERROR_CHARS: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Running,
    Completed,
    Failed,
    Cancelled,
    Timeout,
}

crate::simple_display! {
    JobStatus {
        Running => "running",
        Completed => "completed",
        Failed => "failed",
        Cancelled => "cancelled",
        Timeout => "timeout",
    }
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobStatus::Running)
    }

    /// Running and completed jobs block a new claim on the same finding.
    pub fn blocks_claim(&self) -> bool {
        matches!(self, JobStatus::Running | JobStatus::Completed)
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "running" => Ok(JobStatus::Running),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            "cancelled" => Ok(JobStatus::Cancelled),
            "timeout" => Ok(JobStatus::Timeout),
            other => Err(format!("unknown job status '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemediationJob {
    pub id: JobId,
    pub run_id: Option<RunId>,
    pub repo: String,
    pub tool: Tool,
    /// Finding numbers covered by this job (one file group)
    pub findings: Vec<u64>,
    pub rule_id: String,
    pub file_path: String,
    pub status: JobStatus,
    pub commit_ref: Option<String>,
    pub error: Option<String>,
    pub created_at_ms: u64,
    pub updated_at_ms: u64,
}

/// Request to claim a set of findings for one tool.
#[derive(Debug, Clone, PartialEq)]
pub struct JobClaim {
    pub run_id: Option<RunId>,
    pub repo: String,
    pub tool: Tool,
    pub findings: Vec<u64>,
    pub rule_id: String,
    pub file_path: String,
    pub now_ms: u64,
}

impl JobClaim {
    /// The `running` job row this claim creates for `findings`.
    pub fn into_job(self, findings: Vec<u64>) -> RemediationJob {
        RemediationJob {
            id: JobId::new(),
            run_id: self.run_id,
            repo: self.repo,
            tool: self.tool,
            findings,
            rule_id: self.rule_id,
            file_path: self.file_path,
            status: JobStatus::Running,
            commit_ref: None,
            error: None,
            created_at_ms: self.now_ms,
            updated_at_ms: self.now_ms,
        }
    }
}

/// A finding left out of a claim because another job already covers it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedFinding {
    pub finding: u64,
    /// Status of the blocking job (`running` or `completed`)
    pub blocked_by: JobStatus,
}

impl SkippedFinding {
    /// `already_completed` / `already_running`, as recorded on `alert_skipped`.
    pub fn reason(&self) -> &'static str {
        match self.blocked_by {
            JobStatus::Completed => "already_completed",
            _ => "already_running",
        }
    }
}

/// Result of an atomic claim.
#[derive(Debug, Clone, PartialEq)]
pub struct ClaimOutcome {
    /// The new `running` job, if any finding was claimable
    pub job: Option<RemediationJob>,
    pub skipped: Vec<SkippedFinding>,
}

/// Terminal update applied to a job row.
#[derive(Debug, Clone, PartialEq)]
pub struct JobUpdate {
    pub status: JobStatus,
    pub commit_ref: Option<String>,
    pub error: Option<String>,
    pub now_ms: u64,
}

impl JobUpdate {
    pub fn completed(commit_ref: Option<String>, now_ms: u64) -> Self {
        Self { status: JobStatus::Completed, commit_ref, error: None, now_ms }
    }

    /// A non-success terminal update; the error is truncated for storage.
    pub fn ended(status: JobStatus, error: impl AsRef<str>, now_ms: u64) -> Self {
        let error = crate::text::truncate(error.as_ref(), MAX_JOB_ERROR_CHARS).to_string();
        Self { status, commit_ref: None, error: Some(error), now_ms }
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
