// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[yare::parameterized(
    running   = { JobStatus::Running, true, false },
    completed = { JobStatus::Completed, true, true },
    failed    = { JobStatus::Failed, false, true },
    cancelled = { JobStatus::Cancelled, false, true },
    timeout   = { JobStatus::Timeout, false, true },
)]
fn status_flags(status: JobStatus, blocks: bool, terminal: bool) {
    assert_eq!(status.blocks_claim(), blocks);
    assert_eq!(status.is_terminal(), terminal);
    assert_eq!(status.to_string().parse::<JobStatus>().unwrap(), status);
}

#[test]
fn claim_into_job_is_running() {
    let claim = JobClaim {
        run_id: None,
        repo: "acme/shop".into(),
        tool: Tool::Anthropic,
        findings: vec![1, 2],
        rule_id: "py/sql-injection".into(),
        file_path: "app/db.py".into(),
        now_ms: 42,
    };

    let job = claim.into_job(vec![2]);

    assert_eq!(job.status, JobStatus::Running);
    assert_eq!(job.findings, vec![2]);
    assert_eq!(job.created_at_ms, 42);
    assert!(job.id.as_str().starts_with("job-"));
}

#[test]
fn skipped_reason_names_blocking_status() {
    let done = SkippedFinding { finding: 1, blocked_by: JobStatus::Completed };
    let busy = SkippedFinding { finding: 2, blocked_by: JobStatus::Running };
    assert_eq!(done.reason(), "already_completed");
    assert_eq!(busy.reason(), "already_running");
}

#[test]
fn ended_update_truncates_error() {
    let long = "x".repeat(MAX_JOB_ERROR_CHARS + 50);
    let update = JobUpdate::ended(JobStatus::Failed, &long, 7);
    assert_eq!(update.error.as_deref().map(str::len), Some(MAX_JOB_ERROR_CHARS));
    assert!(update.commit_ref.is_none());
}
