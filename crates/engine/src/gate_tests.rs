// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use rb_adapters::{BackendError, FakeAlertSource, SourceCall};
use rb_core::test_support::findings_in;
use rb_core::FakeClock;
use rb_storage::{LedgerStore, MemoryLedger};
use std::sync::Arc;

const POLL: Duration = Duration::from_secs(30);
const MAX_WAIT: Duration = Duration::from_secs(20 * 60);

struct Harness {
    ledger: MemoryLedger,
    source: FakeAlertSource,
    recorder: ReplayRecorder<FakeClock>,
    branches: IndexMap<Tool, String>,
}

async fn harness() -> Harness {
    let ledger = MemoryLedger::new();
    let source = FakeAlertSource::new()
        .without_analysis()
        .with_branch("main", findings_in("src/x.py", 1, 3))
        .with_branch("remediate/anthropic-bench-1", Vec::new())
        .with_branch("remediate/gemini-bench-1", Vec::new());
    let recorder = ReplayRecorder::start(
        Arc::new(ledger.clone()),
        FakeClock::new(),
        vec![Tool::Anthropic, Tool::Gemini],
        "acme/shop",
        None,
        None,
    )
    .await
    .unwrap();
    let mut branches = IndexMap::new();
    branches.insert(Tool::Anthropic, "remediate/anthropic-bench-1".to_string());
    branches.insert(Tool::Gemini, "remediate/gemini-bench-1".to_string());
    Harness { ledger, source, recorder, branches }
}

fn gate(source: &FakeAlertSource) -> ReadinessGate<FakeAlertSource> {
    ReadinessGate::new(source.clone(), "acme/shop", POLL, MAX_WAIT)
}

fn polls_of(source: &FakeAlertSource, branch: &str) -> usize {
    source
        .calls()
        .iter()
        .filter(|c| matches!(c, SourceCall::ListFindings { branch: b } if b == branch))
        .count()
}

#[tokio::test(start_paused = true)]
async fn ready_immediately_when_counts_already_match() {
    let mut h = harness().await;
    for branch in h.branches.values() {
        h.source.set_findings(branch, findings_in("src/x.py", 1, 3));
    }
    let started = Instant::now();

    let report = gate(&h.source).wait(&mut h.recorder, 3, &h.branches, &CancellationToken::new()).await;

    assert_eq!(report.ready, vec![Tool::Anthropic, Tool::Gemini]);
    assert!(report.not_ready.is_empty());
    assert!(!report.timed_out && !report.cancelled);
    assert_eq!(started.elapsed(), Duration::ZERO);

    let events = h.ledger.list_events(h.recorder.run_id()).await.unwrap();
    let kinds: Vec<_> = events.iter().map(|e| (e.tool.as_str(), e.kind)).collect();
    assert_eq!(
        kinds,
        vec![
            ("benchmark", EventKind::CodeqlWaiting),
            ("anthropic", EventKind::CodeqlReady),
            ("gemini", EventKind::CodeqlReady),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn ready_on_first_poll_reaching_target_never_earlier() {
    let mut h = harness().await;
    let branch = "remediate/anthropic-bench-1";
    h.branches.shift_remove(&Tool::Gemini);

    // counts climb 0 -> 1 -> 2 -> 3 between the polls at 0s, 30s, 60s, 90s
    let source = h.source.clone();
    tokio::spawn(async move {
        for count in 1..=3 {
            tokio::time::sleep(Duration::from_secs(if count == 1 { 10 } else { 30 })).await;
            source.set_findings(branch, findings_in("src/x.py", 1, count));
        }
    });
    let started = Instant::now();

    let report = gate(&h.source).wait(&mut h.recorder, 3, &h.branches, &CancellationToken::new()).await;

    assert_eq!(report.ready, vec![Tool::Anthropic]);
    assert_eq!(started.elapsed(), Duration::from_secs(90));
    assert_eq!(polls_of(&h.source, branch), 4);
}

#[tokio::test(start_paused = true)]
async fn ready_branches_are_not_polled_again() {
    let mut h = harness().await;
    h.source.set_findings("remediate/anthropic-bench-1", findings_in("src/x.py", 1, 3));
    let source = h.source.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(45)).await;
        source.set_findings("remediate/gemini-bench-1", findings_in("src/x.py", 1, 5));
    });

    let report = gate(&h.source).wait(&mut h.recorder, 3, &h.branches, &CancellationToken::new()).await;

    assert_eq!(report.ready, vec![Tool::Anthropic, Tool::Gemini]);
    assert_eq!(polls_of(&h.source, "remediate/anthropic-bench-1"), 1);
    assert_eq!(polls_of(&h.source, "remediate/gemini-bench-1"), 3);
}

#[tokio::test(start_paused = true)]
async fn global_ceiling_proceeds_with_ready_subset() {
    let mut h = harness().await;
    h.source.set_findings("remediate/gemini-bench-1", findings_in("src/x.py", 1, 3));

    let report = gate(&h.source).wait(&mut h.recorder, 3, &h.branches, &CancellationToken::new()).await;

    assert!(report.timed_out);
    assert_eq!(report.ready, vec![Tool::Gemini]);
    assert_eq!(report.not_ready, vec![Tool::Anthropic]);

    let events = h.ledger.list_events(h.recorder.run_id()).await.unwrap();
    let timeout = events.iter().find(|e| e.kind == EventKind::CodeqlTimeout).unwrap();
    assert_eq!(timeout.metadata["not_ready"], serde_json::json!(["anthropic"]));
    assert_eq!(timeout.metadata["ready"], serde_json::json!(["gemini"]));
}

#[tokio::test(start_paused = true)]
async fn poll_errors_keep_waiting() {
    let mut h = harness().await;
    h.source.fail("list_findings", BackendError::Http { status: 404, body: "no analysis".into() });
    let source = h.source.clone();
    let branches = h.branches.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(100)).await;
        source.clear_failure("list_findings");
        for branch in branches.values() {
            source.set_findings(branch, findings_in("src/x.py", 1, 3));
        }
    });

    let report = gate(&h.source).wait(&mut h.recorder, 3, &h.branches, &CancellationToken::new()).await;

    assert_eq!(report.ready.len(), 2);
    assert!(!report.timed_out);
}

#[tokio::test(start_paused = true)]
async fn cancellation_returns_early_with_event() {
    let mut h = harness().await;
    let token = CancellationToken::new();
    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(75)).await;
        canceller.cancel();
    });
    let started = Instant::now();

    let report = gate(&h.source).wait(&mut h.recorder, 3, &h.branches, &token).await;

    assert!(report.cancelled);
    assert!(!report.timed_out);
    assert_eq!(report.not_ready.len(), 2);
    assert_eq!(started.elapsed(), Duration::from_secs(90));

    let events = h.ledger.list_events(h.recorder.run_id()).await.unwrap();
    assert_eq!(events.last().unwrap().kind, EventKind::Cancelled);
}
