// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Benchmark orchestration: prepare branches and the run, wait for analysis,
//! fan out one worker per tool, finalize the run exactly once.

use crate::env::Timings;
use crate::error::EngineError;
use crate::gate::{GateReport, ReadinessGate};
use crate::recorder::{Entry, ReplayRecorder};
use crate::registry::{Registration, RunRegistry};
use crate::worker::{Backends, Worker, WorkerContext, WorkerOutcome};
use indexmap::IndexMap;
use rb_adapters::{AgentBackend, AlertSource, PatchGenerator};
use rb_core::{
    metadata, Clock, EventKind, Finding, FindingState, RateTable, RunId, RunStatus, Severity,
    Tool,
};
use rb_storage::LedgerStore;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// What to benchmark
#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkRequest {
    pub repo: String,
    pub baseline_branch: String,
    /// Launch order; duplicates are ignored
    pub tools: Vec<Tool>,
    /// Empty means every severity
    pub severities: Vec<Severity>,
    pub finding_numbers: Option<Vec<u64>>,
    pub scan_ref: Option<String>,
    pub wait_for_analysis: bool,
}

impl BenchmarkRequest {
    /// Every tool against the open findings of `main`, gated on analysis.
    pub fn new(repo: impl Into<String>) -> Self {
        Self {
            repo: repo.into(),
            baseline_branch: "main".to_string(),
            tools: Tool::ALL.to_vec(),
            severities: Vec::new(),
            finding_numbers: None,
            scan_ref: None,
            wait_for_analysis: true,
        }
    }

    fn selects(&self, finding: &Finding) -> bool {
        let severity = self.severities.is_empty() || self.severities.contains(&finding.severity);
        let number =
            self.finding_numbers.as_ref().is_none_or(|numbers| numbers.contains(&finding.number));
        severity && number
    }
}

/// Caller-side handle on a prepared run
#[derive(Debug, Clone)]
pub struct RunHandle {
    pub run_id: RunId,
    pub token: CancellationToken,
}

/// A run whose branches and ledger row exist but whose workers have not started
pub struct PreparedRun<C: Clock> {
    recorder: ReplayRecorder<C>,
    token: CancellationToken,
    repo: String,
    baseline_branch: String,
    findings: Vec<Finding>,
    branches: IndexMap<Tool, String>,
    /// Open findings on the baseline before filtering; the readiness target
    baseline_open: usize,
    wait_for_analysis: bool,
    /// Drops the registry entry with the run, started or not
    registration: Registration,
}

impl<C: Clock> PreparedRun<C> {
    pub fn handle(&self) -> RunHandle {
        RunHandle { run_id: self.recorder.run_id().clone(), token: self.token.clone() }
    }

    pub fn run_id(&self) -> &RunId {
        self.recorder.run_id()
    }

    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    pub fn branches(&self) -> &IndexMap<Tool, String> {
        &self.branches
    }

    /// Selected findings per severity
    pub fn severity_counts(&self) -> BTreeMap<Severity, usize> {
        let mut counts = BTreeMap::new();
        for finding in &self.findings {
            *counts.entry(finding.severity).or_insert(0) += 1;
        }
        counts
    }
}

/// Final state of a run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub run_id: RunId,
    pub status: RunStatus,
    pub outcomes: BTreeMap<Tool, WorkerOutcome>,
    pub gate: Option<GateReport>,
}

pub struct Orchestrator<S, A, P, C> {
    ledger: Arc<dyn LedgerStore>,
    backends: Backends<S, A, P>,
    clock: C,
    timings: Timings,
    rates: Arc<RateTable>,
    registry: RunRegistry,
}

impl<S, A, P, C> Orchestrator<S, A, P, C>
where
    S: AlertSource,
    A: AgentBackend,
    P: PatchGenerator,
    C: Clock,
{
    pub fn new(ledger: Arc<dyn LedgerStore>, backends: Backends<S, A, P>, clock: C) -> Self {
        Self {
            ledger,
            backends,
            clock,
            timings: Timings::default(),
            rates: Arc::new(RateTable::default()),
            registry: RunRegistry::new(),
        }
    }

    pub fn with_timings(mut self, timings: Timings) -> Self {
        self.timings = timings;
        self
    }

    pub fn with_rates(mut self, rates: RateTable) -> Self {
        self.rates = Arc::new(rates);
        self
    }

    /// Share a registry with an outer surface that cancels runs by id.
    pub fn with_registry(mut self, registry: RunRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn registry(&self) -> &RunRegistry {
        &self.registry
    }

    /// Prepare and run to completion.
    pub async fn benchmark(&self, request: BenchmarkRequest) -> Result<RunSummary, EngineError> {
        let prepared = self.prepare(request).await?;
        self.run(prepared).await
    }

    /// Select findings, create one branch per tool and open the run.
    ///
    /// Any failure here happens before the run row exists.
    pub async fn prepare(&self, request: BenchmarkRequest) -> Result<PreparedRun<C>, EngineError> {
        let mut tools: Vec<Tool> = Vec::new();
        for tool in &request.tools {
            if !tools.contains(tool) {
                tools.push(*tool);
            }
        }
        if tools.is_empty() {
            return Err(EngineError::NoTools);
        }

        let source = &self.backends.source;
        let baseline = source
            .list_findings(&request.repo, &request.baseline_branch, Some(FindingState::Open))
            .await?;
        let baseline_open = baseline.len();
        let findings: Vec<Finding> = baseline.into_iter().filter(|f| request.selects(f)).collect();
        if findings.is_empty() {
            return Err(EngineError::NoFindings { branch: request.baseline_branch });
        }

        let label = format!("bench-{}", self.clock.epoch_ms() / 1000);
        let mut branches = IndexMap::new();
        for tool in &tools {
            let branch = format!("remediate/{tool}-{label}");
            source.create_branch(&request.repo, &branch, &request.baseline_branch).await?;
            tracing::info!(repo = %request.repo, %tool, %branch, "remediation branch created");
            branches.insert(*tool, branch);
        }

        let recorder = ReplayRecorder::start(
            Arc::clone(&self.ledger),
            self.clock.clone(),
            tools,
            &request.repo,
            request.scan_ref,
            Some(label),
        )
        .await?;
        let token = self.registry.register(recorder.run_id());
        let registration = Registration::new(self.registry.clone(), recorder.run_id().clone());
        tracing::info!(
            run_id = %recorder.run_id(),
            repo = %request.repo,
            findings = findings.len(),
            baseline_open,
            "benchmark prepared",
        );

        Ok(PreparedRun {
            recorder,
            token,
            repo: request.repo,
            baseline_branch: request.baseline_branch,
            findings,
            branches,
            baseline_open,
            wait_for_analysis: request.wait_for_analysis,
            registration,
        })
    }

    /// Gate, fan out and finalize a prepared run.
    ///
    /// Worker failures never fail the run; only a launch error does. The
    /// registry entry is removed however this returns.
    pub async fn run(&self, prepared: PreparedRun<C>) -> Result<RunSummary, EngineError> {
        let PreparedRun {
            mut recorder,
            token,
            repo,
            baseline_branch,
            findings,
            branches,
            baseline_open,
            wait_for_analysis,
            registration: _registration,
        } = prepared;
        let run_id = recorder.run_id().clone();

        let gate = if wait_for_analysis {
            let gate = ReadinessGate::new(
                self.backends.source.clone(),
                &repo,
                self.timings.readiness_poll,
                self.timings.readiness_max_wait,
            );
            Some(gate.wait(&mut recorder, baseline_open, &branches, &token).await)
        } else {
            None
        };

        let launch = Launch { repo: &repo, baseline_branch: &baseline_branch, findings: &findings };
        let fanned = if token.is_cancelled() {
            tracing::info!(%run_id, "cancelled before launch");
            Ok(BTreeMap::new())
        } else {
            self.fan_out(&mut recorder, &launch, &branches, &token).await
        };

        let status = if token.is_cancelled() {
            RunStatus::Cancelled
        } else if fanned.is_err() {
            RunStatus::Failed
        } else {
            RunStatus::Completed
        };
        let outcomes = match fanned {
            Ok(outcomes) => outcomes,
            Err(e) => {
                tracing::error!(%run_id, error = %e, "benchmark failed");
                recorder
                    .emit(
                        Entry::new(EventKind::Error, format!("Benchmark failed: {e}"))
                            .metadata(metadata! { "error" => e.to_string() }),
                    )
                    .await;
                BTreeMap::new()
            }
        };

        recorder.finish(status).await?;
        tracing::info!(%run_id, %status, total_usd = recorder.cumulative_cost(), "benchmark finished");
        Ok(RunSummary { run_id, status, outcomes, gate })
    }

    async fn fan_out(
        &self,
        recorder: &mut ReplayRecorder<C>,
        launch: &Launch<'_>,
        branches: &IndexMap<Tool, String>,
        token: &CancellationToken,
    ) -> Result<BTreeMap<Tool, WorkerOutcome>, EngineError> {
        let tools = recorder.tools().to_vec();
        let mut set = JoinSet::new();
        let mut launch_error = None;
        for (index, tool) in tools.into_iter().enumerate() {
            if index > 0 {
                tokio::time::sleep(self.timings.inter_tool_delay).await;
            }
            if token.is_cancelled() {
                tracing::info!(run_id = %recorder.run_id(), %tool, "cancelled, not launching");
                break;
            }
            let Some(branch) = branches.get(&tool) else {
                launch_error = Some(EngineError::MissingBranch(tool));
                break;
            };

            let ctx = WorkerContext {
                tool,
                repo: launch.repo.to_string(),
                branch: branch.clone(),
                baseline_branch: launch.baseline_branch.to_string(),
                findings: launch.findings.to_vec(),
                recorder: recorder.for_tool(tool),
                ledger: Arc::clone(&self.ledger),
                backends: self.backends.clone(),
                rates: Arc::clone(&self.rates),
                timings: self.timings,
                token: token.clone(),
            };
            tracing::debug!(run_id = %recorder.run_id(), %tool, %branch, "launching worker");
            set.spawn(async move { (tool, Worker::for_tool(tool).run(ctx).await) });
        }

        let mut outcomes = BTreeMap::new();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((tool, outcome)) => {
                    outcomes.insert(tool, outcome);
                }
                Err(e) => {
                    tracing::error!(run_id = %recorder.run_id(), error = %e, "worker task failed");
                    recorder
                        .emit(
                            Entry::new(EventKind::Error, format!("Worker task failed: {e}"))
                                .metadata(metadata! { "error" => e.to_string() }),
                        )
                        .await;
                }
            }
        }

        match launch_error {
            Some(e) => Err(e),
            None => Ok(outcomes),
        }
    }
}

/// Inputs shared by every worker of one run
struct Launch<'a> {
    repo: &'a str,
    baseline_branch: &'a str,
    findings: &'a [Finding],
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
