// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use async_trait::async_trait;
use rb_adapters::{
    BackendError, FakeAgentBackend, FakeAlertSource, FakePatchGenerator, Patch, SessionStatus,
    SourceCall,
};
use rb_core::test_support::two_file_baseline;
use rb_core::{Event, FakeClock, JobStatus};
use rb_storage::MemoryLedger;
use std::time::Duration;

const REPO: &str = "acme/shop";

struct Harness {
    ledger: MemoryLedger,
    source: FakeAlertSource,
    agent: FakeAgentBackend,
    patches: FakePatchGenerator,
    clock: FakeClock,
}

impl Harness {
    fn new() -> Self {
        Self::with_source(FakeAlertSource::new().with_branch("main", two_file_baseline()))
    }

    fn with_source(source: FakeAlertSource) -> Self {
        Self {
            ledger: MemoryLedger::new(),
            source,
            agent: FakeAgentBackend::new(),
            patches: FakePatchGenerator::new(),
            clock: FakeClock::new(),
        }
    }

    fn orchestrator(
        &self,
    ) -> Orchestrator<FakeAlertSource, FakeAgentBackend, FakePatchGenerator, FakeClock> {
        Orchestrator::new(
            Arc::new(self.ledger.clone()),
            Backends {
                source: self.source.clone(),
                agent: self.agent.clone(),
                patches: self.patches.clone(),
            },
            self.clock.clone(),
        )
    }

    async fn events(&self, run_id: &RunId) -> Vec<Event> {
        self.ledger.list_events(run_id).await.unwrap()
    }
}

fn request(tools: &[Tool]) -> BenchmarkRequest {
    BenchmarkRequest { tools: tools.to_vec(), wait_for_analysis: false, ..BenchmarkRequest::new(REPO) }
}

fn count(events: &[Event], tool: &str, kind: EventKind) -> usize {
    events.iter().filter(|e| e.tool == tool && e.kind == kind).count()
}

#[tokio::test(start_paused = true)]
async fn two_patch_tools_fix_every_file() {
    let h = Harness::new();

    let summary =
        h.orchestrator().benchmark(request(&[Tool::Anthropic, Tool::OpenAi])).await.unwrap();

    assert_eq!(summary.status, RunStatus::Completed);
    for tool in [Tool::Anthropic, Tool::OpenAi] {
        assert_eq!(summary.outcomes[&tool], WorkerOutcome { completed: 3, failed: 0, skipped: 0 });
    }

    let jobs = h.ledger.list_jobs(REPO, None).await.unwrap();
    assert_eq!(jobs.len(), 4);
    assert!(jobs.iter().all(|j| j.status == JobStatus::Completed));

    let events = h.events(&summary.run_id).await;
    assert_eq!(count(&events, "anthropic", EventKind::PatchApplied), 2);
    assert_eq!(count(&events, "openai", EventKind::PatchApplied), 2);

    let run = h.ledger.get_run(&summary.run_id).await.unwrap().unwrap();
    let event_total: f64 = events.iter().map(|e| e.cost.event_cost_usd).sum();
    assert!((run.total_cost_usd - event_total).abs() < 1e-9);
    assert!((run.total_cost_usd - 0.0291).abs() < 1e-9);
    assert_eq!(run.status, RunStatus::Completed);
    assert!(run.ended_at_ms.is_some());
    assert_eq!(run.branch_label.as_deref(), Some("bench-1767225600"));
}

#[tokio::test(start_paused = true)]
async fn branches_are_created_from_the_baseline_per_tool() {
    let h = Harness::new();

    let prepared =
        h.orchestrator().prepare(request(&[Tool::Gemini, Tool::Copilot, Tool::Gemini])).await.unwrap();

    let branches: Vec<_> = prepared.branches().iter().map(|(t, b)| (*t, b.as_str())).collect();
    assert_eq!(
        branches,
        vec![
            (Tool::Gemini, "remediate/gemini-bench-1767225600"),
            (Tool::Copilot, "remediate/copilot-bench-1767225600"),
        ]
    );
    assert!(h.source.calls().iter().all(|c| match c {
        SourceCall::CreateBranch { from, .. } => from == "main",
        _ => true,
    }));
    let run = h.ledger.get_run(prepared.run_id()).await.unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Running);
    assert_eq!(run.tools, vec![Tool::Gemini, Tool::Copilot]);
}

#[tokio::test(start_paused = true)]
async fn empty_patch_fails_one_group_and_the_run_completes() {
    let h = Harness::new();
    h.patches.reply_when("src/x.py", "");

    let summary = h.orchestrator().benchmark(request(&[Tool::Anthropic])).await.unwrap();

    assert_eq!(summary.status, RunStatus::Completed);
    assert_eq!(
        summary.outcomes[&Tool::Anthropic],
        WorkerOutcome { completed: 1, failed: 2, skipped: 0 }
    );
    let jobs = h.ledger.list_jobs(REPO, Some(Tool::Anthropic)).await.unwrap();
    let failed: Vec<_> = jobs.iter().filter(|j| j.status == JobStatus::Failed).collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].file_path, "src/x.py");
    assert!(failed[0].error.as_deref().unwrap().contains("empty response"));
}

#[tokio::test(start_paused = true)]
async fn cancel_while_agent_polls_leaves_no_running_jobs() {
    let h = Harness::new();
    h.agent.set_fallback(SessionStatus::new("", "running"));
    let orchestrator = h.orchestrator();
    let prepared = orchestrator.prepare(request(&[Tool::Devin])).await.unwrap();
    let run_id = prepared.run_id().clone();

    let registry = orchestrator.registry().clone();
    let cancel_id = run_id.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(45)).await;
        assert!(registry.cancel(&cancel_id));
    });

    let summary = orchestrator.run(prepared).await.unwrap();

    assert_eq!(summary.status, RunStatus::Cancelled);
    let jobs = h.ledger.list_jobs(REPO, Some(Tool::Devin)).await.unwrap();
    assert!(!jobs.is_empty());
    assert!(jobs.iter().all(|j| j.status != JobStatus::Running));
    assert!(jobs.iter().any(|j| j.status == JobStatus::Cancelled));

    let events = h.events(&run_id).await;
    assert_eq!(count(&events, "devin", EventKind::Cancelled), 1);
    assert_eq!(h.ledger.get_run(&run_id).await.unwrap().unwrap().status, RunStatus::Cancelled);
    assert!(orchestrator.registry().active().is_empty());
}

#[tokio::test(start_paused = true)]
async fn rerun_skips_completed_findings_without_work_calls() {
    let h = Harness::new();
    let orchestrator = h.orchestrator();
    orchestrator.benchmark(request(&[Tool::Anthropic, Tool::Copilot])).await.unwrap();
    let before = h.source.calls().len();
    h.clock.advance(Duration::from_secs(5));

    let summary = orchestrator.benchmark(request(&[Tool::Anthropic, Tool::Copilot])).await.unwrap();

    assert_eq!(summary.status, RunStatus::Completed);
    for tool in [Tool::Anthropic, Tool::Copilot] {
        assert_eq!(summary.outcomes[&tool], WorkerOutcome { completed: 0, failed: 0, skipped: 3 });
    }
    assert!(!h.source.calls()[before..].iter().any(SourceCall::is_external_work));
    assert_eq!(h.patches.calls().len(), 2);

    let events = h.events(&summary.run_id).await;
    assert_eq!(count(&events, "anthropic", EventKind::AlertSkipped), 3);
    assert_eq!(count(&events, "copilot", EventKind::AlertSkipped), 3);
    assert_eq!(h.ledger.list_jobs(REPO, None).await.unwrap().len(), 5);
}

#[tokio::test(start_paused = true)]
async fn gate_waits_for_branch_analysis() {
    let h = Harness::new();

    let summary = h
        .orchestrator()
        .benchmark(BenchmarkRequest { wait_for_analysis: true, ..request(&[Tool::Gemini]) })
        .await
        .unwrap();

    let gate = summary.gate.unwrap();
    assert_eq!(gate.ready, vec![Tool::Gemini]);
    let events = h.events(&summary.run_id).await;
    assert_eq!(events[0].kind, EventKind::CodeqlWaiting);
    assert_eq!(events[0].metadata["baseline_count"], 3);
    assert_eq!((events[1].tool.as_str(), events[1].kind), ("gemini", EventKind::CodeqlReady));
    assert_eq!(events[2].kind, EventKind::ScanStarted);
}

#[tokio::test(start_paused = true)]
async fn cancel_during_gate_skips_fan_out() {
    let h = Harness::with_source(
        FakeAlertSource::new().without_analysis().with_branch("main", two_file_baseline()),
    );
    let orchestrator = h.orchestrator();
    let prepared = orchestrator
        .prepare(BenchmarkRequest { wait_for_analysis: true, ..request(&[Tool::Anthropic]) })
        .await
        .unwrap();
    let handle = prepared.handle();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(10)).await;
        handle.token.cancel();
    });

    let summary = orchestrator.run(prepared).await.unwrap();

    assert_eq!(summary.status, RunStatus::Cancelled);
    assert!(summary.gate.unwrap().cancelled);
    assert!(summary.outcomes.is_empty());
    let kinds: Vec<_> = h.events(&summary.run_id).await.iter().map(|e| e.kind).collect();
    assert_eq!(kinds, vec![EventKind::CodeqlWaiting, EventKind::Cancelled]);
    assert!(h.ledger.list_jobs(REPO, None).await.unwrap().is_empty());
}

#[derive(Clone)]
struct PanickingPatches;

#[async_trait]
impl PatchGenerator for PanickingPatches {
    fn ensure_configured(&self, _tool: Tool) -> Result<(), BackendError> {
        Ok(())
    }

    async fn generate(&self, _tool: Tool, _prompt: &str) -> Result<Patch, BackendError> {
        panic!("model client bug");
    }
}

#[tokio::test(start_paused = true)]
async fn panicking_worker_does_not_fail_the_run() {
    let h = Harness::new();
    let orchestrator = Orchestrator::new(
        Arc::new(h.ledger.clone()),
        Backends { source: h.source.clone(), agent: h.agent.clone(), patches: PanickingPatches },
        h.clock.clone(),
    );

    let summary = orchestrator.benchmark(request(&[Tool::Anthropic, Tool::Copilot])).await.unwrap();

    assert_eq!(summary.status, RunStatus::Completed);
    assert!(!summary.outcomes.contains_key(&Tool::Anthropic));
    assert_eq!(summary.outcomes[&Tool::Copilot].completed, 3);
    let events = h.events(&summary.run_id).await;
    assert!(events
        .iter()
        .any(|e| e.tool == "benchmark" && e.kind == EventKind::Error && e.detail.contains("Worker task failed")));
}

#[tokio::test(start_paused = true)]
async fn unmatched_filters_return_no_findings() {
    let h = Harness::new();

    let err = h
        .orchestrator()
        .benchmark(BenchmarkRequest { severities: vec![Severity::Low], ..request(&[Tool::Gemini]) })
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::NoFindings { ref branch } if branch == "main"));
    assert!(h.ledger.list_runs(None).await.unwrap().is_empty());
    assert_eq!(h.source.branch_names(), vec!["main"]);
}

#[tokio::test(start_paused = true)]
async fn finding_numbers_narrow_the_selection() {
    let h = Harness::new();

    let prepared = h
        .orchestrator()
        .prepare(BenchmarkRequest { finding_numbers: Some(vec![3]), ..request(&[Tool::Gemini]) })
        .await
        .unwrap();

    assert_eq!(prepared.findings().len(), 1);
    assert_eq!(prepared.findings()[0].file_path, "src/y.py");
    assert_eq!(prepared.severity_counts(), BTreeMap::from([(Severity::High, 1)]));
}

#[tokio::test(start_paused = true)]
async fn empty_tool_list_is_rejected() {
    let h = Harness::new();
    let err = h.orchestrator().benchmark(request(&[])).await.unwrap_err();
    assert!(matches!(err, EngineError::NoTools));
}

#[tokio::test(start_paused = true)]
async fn branch_failure_aborts_before_the_run_exists() {
    let h = Harness::new();
    h.source.fail("create_branch", BackendError::Http { status: 422, body: "exists".into() });

    let err = h.orchestrator().benchmark(request(&[Tool::Anthropic])).await.unwrap_err();

    assert!(matches!(err, EngineError::Backend(BackendError::Http { status: 422, .. })));
    assert!(h.ledger.list_runs(None).await.unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn finished_runs_leave_the_registry() {
    let h = Harness::new();
    let registry = RunRegistry::new();
    let orchestrator = h.orchestrator().with_registry(registry.clone());

    let prepared = orchestrator.prepare(request(&[Tool::Gemini])).await.unwrap();
    assert_eq!(registry.active(), vec![prepared.run_id().clone()]);
    let summary = orchestrator.run(prepared).await.unwrap();

    assert!(registry.active().is_empty());
    assert!(!registry.cancel(&summary.run_id));
}

#[tokio::test(start_paused = true)]
async fn dropped_prepared_run_leaves_the_registry() {
    let h = Harness::new();
    let registry = RunRegistry::new();
    let orchestrator = h.orchestrator().with_registry(registry.clone());

    let prepared = orchestrator.prepare(request(&[Tool::Gemini])).await.unwrap();
    let run_id = prepared.run_id().clone();
    assert_eq!(registry.active(), vec![run_id.clone()]);
    drop(prepared);

    assert!(registry.active().is_empty());
    assert!(!registry.cancel(&run_id));
}

#[tokio::test(start_paused = true)]
async fn unconfigured_tool_still_completes_the_run() {
    let h = Harness::new();
    h.patches.unconfigure(Tool::OpenAi);

    let summary =
        h.orchestrator().benchmark(request(&[Tool::OpenAi, Tool::Gemini])).await.unwrap();

    assert_eq!(summary.status, RunStatus::Completed);
    assert_eq!(summary.outcomes[&Tool::OpenAi], WorkerOutcome::default());
    assert_eq!(summary.outcomes[&Tool::Gemini].completed, 3);
    let events = h.events(&summary.run_id).await;
    assert_eq!(count(&events, "openai", EventKind::Error), 1);
    assert_eq!(count(&events, "openai", EventKind::RemediationComplete), 0);
}
