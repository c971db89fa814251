// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use rb_core::metadata;
use std::sync::Arc;

fn run() -> Run {
    Run::new(
        "acme/shop",
        vec![Tool::Devin, Tool::OpenAi],
        Some("refs/heads/main".into()),
        Some("bench".into()),
        1_000,
    )
}

fn event(run_id: &RunId, offset_ms: u64, cost: f64) -> Event {
    Event {
        id: EventId::new(),
        run_id: run_id.clone(),
        tool: "openai".to_string(),
        kind: EventKind::PatchGenerated,
        detail: format!("patch at {offset_ms}"),
        finding: Some(offset_ms),
        offset_ms,
        cost: CostStamp { event_cost_usd: cost, cumulative_cost_usd: cost },
        metadata: metadata! { "model" => "gpt-5.3-codex", "input_tokens" => 120 },
        created_at_ms: 1_000 + offset_ms,
    }
}

fn claim(tool: Tool, findings: &[u64]) -> JobClaim {
    JobClaim {
        run_id: None,
        repo: "acme/shop".to_string(),
        tool,
        findings: findings.to_vec(),
        rule_id: "py/path-injection".to_string(),
        file_path: "src/y.py".to_string(),
        now_ms: 10,
    }
}

#[tokio::test]
async fn run_round_trips_through_sqlite() {
    let ledger = SqliteLedger::open_in_memory().unwrap();
    let run = run();
    ledger.create_run(&run).await.unwrap();
    assert_eq!(ledger.get_run(&run.id).await.unwrap(), Some(run));
    assert_eq!(ledger.get_run(&RunId::new()).await.unwrap(), None);
}

#[tokio::test]
async fn events_keep_metadata_and_order() {
    let ledger = SqliteLedger::open_in_memory().unwrap();
    let run = run();
    ledger.create_run(&run).await.unwrap();

    let late = event(&run.id, 30, 0.5);
    let early = event(&run.id, 10, 0.25);
    let tie = event(&run.id, 10, 0.0);
    for e in [&late, &early, &tie] {
        ledger.append_event(e).await.unwrap();
    }

    let events = ledger.list_events(&run.id).await.unwrap();
    assert_eq!(events, vec![early, tie, late]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_cost_increments_all_land() {
    const WORKERS: usize = 4;
    const EVENTS: usize = 25;
    const COST: f64 = 0.01;

    let ledger = Arc::new(SqliteLedger::open_in_memory().unwrap());
    let run = run();
    ledger.create_run(&run).await.unwrap();

    let mut set = tokio::task::JoinSet::new();
    for _ in 0..WORKERS {
        let ledger = Arc::clone(&ledger);
        let run_id = run.id.clone();
        set.spawn(async move {
            for _ in 0..EVENTS {
                ledger.increment_cost(&run_id, COST).await.unwrap();
            }
        });
    }
    while let Some(res) = set.join_next().await {
        res.unwrap();
    }

    let total = ledger.get_run(&run.id).await.unwrap().unwrap().total_cost_usd;
    assert!((total - WORKERS as f64 * EVENTS as f64 * COST).abs() < 1e-9, "total {total}");
}

#[tokio::test]
async fn held_connection_leaves_the_runtime_responsive() {
    let ledger = Arc::new(SqliteLedger::open_in_memory().unwrap());
    let run = run();
    ledger.create_run(&run).await.unwrap();

    let guard = ledger.conn.lock();
    let pending = tokio::spawn({
        let ledger = Arc::clone(&ledger);
        let run_id = run.id.clone();
        async move { ledger.increment_cost(&run_id, 0.25).await }
    });
    // a single-threaded runtime only gets here if the call waits off-thread
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    assert!(!pending.is_finished());

    drop(guard);
    pending.await.unwrap().unwrap();
    assert_eq!(ledger.get_run(&run.id).await.unwrap().unwrap().total_cost_usd, 0.25);
}

#[tokio::test]
async fn finish_run_sets_status_once() {
    let ledger = SqliteLedger::open_in_memory().unwrap();
    let run = run();
    ledger.create_run(&run).await.unwrap();

    assert!(ledger.finish_run(&run.id, RunStatus::Completed, 2_000).await.unwrap());
    assert!(!ledger.finish_run(&run.id, RunStatus::Failed, 3_000).await.unwrap());
    let stored = ledger.get_run(&run.id).await.unwrap().unwrap();
    assert_eq!(stored.status, RunStatus::Completed);
    assert_eq!(stored.duration_ms(), Some(1_000));

    let missing = ledger.finish_run(&RunId::new(), RunStatus::Failed, 1).await.unwrap_err();
    assert!(matches!(missing, StoreError::RunNotFound(_)));
}

#[yare::parameterized(
    completed_blocks = { JobStatus::Completed, Some("already_completed") },
    failed_releases  = { JobStatus::Failed, None },
    timeout_releases = { JobStatus::Timeout, None },
    cancel_releases  = { JobStatus::Cancelled, None },
)]
#[test_macro(tokio::test)]
async fn claim_after_terminal_status(status: JobStatus, skip_reason: Option<&str>) {
    let ledger = SqliteLedger::open_in_memory().unwrap();
    let job = ledger.claim_job(claim(Tool::Copilot, &[5])).await.unwrap().job.unwrap();
    let update = match status {
        JobStatus::Completed => JobUpdate::completed(Some("deadbeef".into()), 20),
        other => JobUpdate::ended(other, "nope", 20),
    };
    ledger.update_job(&job.id, update).await.unwrap();

    let again = ledger.claim_job(claim(Tool::Copilot, &[5])).await.unwrap();
    assert_eq!(again.skipped.first().map(|s| s.reason()), skip_reason);
    assert_eq!(again.job.is_some(), skip_reason.is_none());
}

#[tokio::test]
async fn claim_partially_blocked_group() {
    let ledger = SqliteLedger::open_in_memory().unwrap();
    ledger.claim_job(claim(Tool::Gemini, &[1])).await.unwrap();

    let outcome = ledger.claim_job(claim(Tool::Gemini, &[1, 2, 3])).await.unwrap();
    assert_eq!(outcome.job.as_ref().map(|j| j.findings.clone()), Some(vec![2, 3]));
    assert_eq!(outcome.skipped.len(), 1);
    assert_eq!(outcome.skipped[0].blocked_by, JobStatus::Running);
}

#[tokio::test]
async fn update_job_records_commit_and_error() {
    let ledger = SqliteLedger::open_in_memory().unwrap();
    let ok = ledger.claim_job(claim(Tool::Anthropic, &[1])).await.unwrap().job.unwrap();
    let bad = ledger.claim_job(claim(Tool::Anthropic, &[2])).await.unwrap().job.unwrap();

    ledger.update_job(&ok.id, JobUpdate::completed(Some("c0ffee".into()), 30)).await.unwrap();
    let long = "x".repeat(900);
    ledger.update_job(&bad.id, JobUpdate::ended(JobStatus::Failed, &long, 31)).await.unwrap();

    let ok = ledger.get_job(&ok.id).await.unwrap().unwrap();
    assert_eq!(ok.commit_ref.as_deref(), Some("c0ffee"));
    assert_eq!(ok.updated_at_ms, 30);
    let bad = ledger.get_job(&bad.id).await.unwrap().unwrap();
    assert_eq!(bad.error.map(|e| e.chars().count()), Some(rb_core::job::MAX_JOB_ERROR_CHARS));

    let err = ledger.update_job(&JobId::new(), JobUpdate::completed(None, 1)).await.unwrap_err();
    assert!(matches!(err, StoreError::JobNotFound(_)));
}

#[tokio::test]
async fn ledger_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("ledger.db");
    let run = run();
    {
        let ledger = SqliteLedger::open(&path).unwrap();
        ledger.create_run(&run).await.unwrap();
        ledger.increment_cost(&run.id, 1.25).await.unwrap();
        ledger.claim_job(claim(Tool::Devin, &[9])).await.unwrap();
    }

    let ledger = SqliteLedger::open(&path).unwrap();
    assert_eq!(ledger.get_run(&run.id).await.unwrap().unwrap().total_cost_usd, 1.25);
    let jobs = ledger.list_jobs("acme/shop", Some(Tool::Devin)).await.unwrap();
    assert_eq!(jobs.len(), 1);
    assert!(ledger.claim_job(claim(Tool::Devin, &[9])).await.unwrap().job.is_none());
}
