// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tool workers: one closed set of remediation strategies, selected per tool.
//!
//! Every worker walks the same units (file groups, or single findings for
//! native autofix) through `claim → work → poll → commit`, converting each
//! unit's failure into a job status plus an `error` event and moving on.

mod agent;
mod autofix;
mod patch;

use crate::env::Timings;
use crate::recorder::{Entry, ReplayRecorder};
use rb_adapters::{AgentBackend, AlertSource, BackendError, PatchGenerator};
use rb_core::job::MAX_JOB_ERROR_CHARS;
use rb_core::text::MAX_DETAIL_CHARS;
use rb_core::{
    finding, metadata, truncate, Clock, EventKind, Finding, JobClaim, JobStatus, JobUpdate,
    RateTable, RemediationJob, Tool, ToolFamily,
};
use rb_storage::LedgerStore;
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// The three worker strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Worker {
    AgentSession,
    NativeAutofix,
    PatchGenerator,
}

/// Per-finding tally reported by a worker when it ends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WorkerOutcome {
    pub completed: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl WorkerOutcome {
    pub fn settled(&self) -> usize {
        self.completed + self.failed + self.skipped
    }
}

/// External collaborators shared by every worker of a run
#[derive(Clone)]
pub struct Backends<S, A, P> {
    pub source: S,
    pub agent: A,
    pub patches: P,
}

/// Everything one worker needs for one tool on one run
pub struct WorkerContext<S, A, P, C: Clock> {
    pub tool: Tool,
    pub repo: String,
    /// Remediation branch for this tool
    pub branch: String,
    pub baseline_branch: String,
    pub findings: Vec<Finding>,
    pub recorder: ReplayRecorder<C>,
    pub ledger: Arc<dyn LedgerStore>,
    pub backends: Backends<S, A, P>,
    pub rates: Arc<RateTable>,
    pub timings: Timings,
    pub token: CancellationToken,
}

/// A claimed unit of work: the new job and the findings it covers
pub(crate) struct Unit {
    pub job: RemediationJob,
    pub findings: Vec<Finding>,
}

impl Worker {
    pub fn for_tool(tool: Tool) -> Self {
        match tool.family() {
            ToolFamily::AgentSession => Worker::AgentSession,
            ToolFamily::NativeAutofix => Worker::NativeAutofix,
            ToolFamily::PatchGenerator => Worker::PatchGenerator,
        }
    }

    /// Run to completion. Never fails: problems end up as events and job rows.
    pub async fn run<S, A, P, C>(self, mut ctx: WorkerContext<S, A, P, C>) -> WorkerOutcome
    where
        S: AlertSource,
        A: AgentBackend,
        P: PatchGenerator,
        C: Clock,
    {
        if let Err(err) = self.ensure_configured(&ctx) {
            tracing::warn!(run_id = %ctx.recorder.run_id(), tool = %ctx.tool, error = %err, "worker not configured");
            ctx.recorder
                .emit(
                    Entry::new(EventKind::Error, format!("{err}, skipping {}", ctx.tool))
                        .metadata(metadata! { "error" => err.to_string() }),
                )
                .await;
            return WorkerOutcome::default();
        }

        tracing::info!(
            run_id = %ctx.recorder.run_id(),
            tool = %ctx.tool,
            branch = %ctx.branch,
            findings = ctx.findings.len(),
            "worker started",
        );
        let outcome = match self {
            Worker::AgentSession => agent::run(&mut ctx).await,
            Worker::NativeAutofix => autofix::run(&mut ctx).await,
            Worker::PatchGenerator => patch::run(&mut ctx).await,
        };
        tracing::info!(
            run_id = %ctx.recorder.run_id(),
            tool = %ctx.tool,
            completed = outcome.completed,
            failed = outcome.failed,
            skipped = outcome.skipped,
            "worker finished",
        );
        outcome
    }

    fn ensure_configured<S, A, P, C>(
        &self,
        ctx: &WorkerContext<S, A, P, C>,
    ) -> Result<(), BackendError>
    where
        S: AlertSource,
        A: AgentBackend,
        P: PatchGenerator,
        C: Clock,
    {
        match self {
            Worker::AgentSession => ctx.backends.agent.ensure_configured(),
            Worker::PatchGenerator => ctx.backends.patches.ensure_configured(ctx.tool),
            Worker::NativeAutofix => Ok(()),
        }
    }
}

impl<S, A, P, C> WorkerContext<S, A, P, C>
where
    S: AlertSource,
    A: AgentBackend,
    P: PatchGenerator,
    C: Clock,
{
    pub(crate) fn cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub(crate) async fn emit(&mut self, entry: Entry) {
        self.recorder.emit(entry).await;
    }

    /// Claim the findings of one unit that no active or completed job covers.
    ///
    /// Blocked findings are reported as `alert_skipped` and counted skipped.
    /// A store failure fails the whole unit. Returns `None` when nothing is
    /// left to work on.
    pub(crate) async fn claim(
        &mut self,
        file_path: &str,
        findings: &[Finding],
        outcome: &mut WorkerOutcome,
    ) -> Option<Unit> {
        let claim = JobClaim {
            run_id: Some(self.recorder.run_id().clone()),
            repo: self.repo.clone(),
            tool: self.tool,
            findings: finding::numbers(findings),
            rule_id: findings.first().map(|f| f.rule_id.clone()).unwrap_or_default(),
            file_path: file_path.to_string(),
            now_ms: self.recorder.epoch_ms(),
        };
        let claimed = match self.ledger.claim_job(claim).await {
            Ok(claimed) => claimed,
            Err(e) => {
                tracing::warn!(tool = %self.tool, %file_path, error = %e, "claim failed");
                self.report_error(file_path, findings.first().map(|f| f.number), &e.to_string())
                    .await;
                outcome.failed += findings.len();
                return None;
            }
        };

        for skip in &claimed.skipped {
            tracing::info!(tool = %self.tool, finding = skip.finding, reason = skip.reason(), "finding skipped");
            self.emit(
                Entry::new(
                    EventKind::AlertSkipped,
                    format!("Alert #{} skipped: {}", skip.finding, skip.reason()),
                )
                .finding(skip.finding)
                .metadata(metadata! { "reason" => skip.reason(), "file_path" => file_path }),
            )
            .await;
        }
        outcome.skipped += claimed.skipped.len();

        let job = claimed.job?;
        let findings = findings.iter().filter(|f| job.findings.contains(&f.number)).cloned().collect();
        Some(Unit { job, findings })
    }

    /// Apply a terminal update to a claimed job.
    ///
    /// A failure here leaves the job `running` in the ledger. It is logged and
    /// never retried.
    pub(crate) async fn settle(&self, job: &RemediationJob, update: JobUpdate) {
        let status = update.status;
        if let Err(e) = self.ledger.update_job(&job.id, update).await {
            tracing::warn!(
                tool = %self.tool,
                job_id = %job.id,
                %status,
                error = %e,
                "failed to record job outcome",
            );
        }
    }

    /// Mark a unit's job ended with `status` and report the error.
    pub(crate) async fn fail_unit(&mut self, unit: &Unit, status: JobStatus, message: &str) {
        tracing::warn!(tool = %self.tool, file_path = %unit.job.file_path, error = %message, "unit failed");
        self.settle(&unit.job, JobUpdate::ended(status, message, self.recorder.epoch_ms())).await;
        self.report_error(&unit.job.file_path, unit.findings.first().map(|f| f.number), message)
            .await;
    }

    async fn report_error(&mut self, file_path: &str, finding: Option<u64>, message: &str) {
        let detail = format!(
            "Failed to remediate {file_path}: {}",
            truncate(message, MAX_DETAIL_CHARS)
        );
        let mut entry = Entry::new(EventKind::Error, detail).metadata(metadata! {
            "error" => truncate(message, MAX_JOB_ERROR_CHARS),
            "file_path" => file_path,
        });
        if let Some(number) = finding {
            entry = entry.finding(number);
        }
        self.emit(entry).await;
    }

    pub(crate) async fn scan_started(&mut self, detail: String, files: usize) {
        let meta = metadata! {
            "repo" => &self.repo,
            "branch" => &self.branch,
            "source_branch" => &self.baseline_branch,
            "alert_count" => self.findings.len(),
            "file_count" => files,
            "tool" => self.tool,
        };
        self.emit(Entry::new(EventKind::ScanStarted, detail).metadata(meta)).await;
    }

    /// Record cancellation and fail every finding not yet settled.
    pub(crate) async fn stop_cancelled(&mut self, outcome: &mut WorkerOutcome) {
        let detail = format!(
            "{} cancelled after {} fixed, {} failed",
            self.tool, outcome.completed, outcome.failed
        );
        tracing::info!(run_id = %self.recorder.run_id(), tool = %self.tool, "worker cancelled");
        self.emit(Entry::new(EventKind::Cancelled, detail).metadata(metadata! {
            "completed" => outcome.completed,
            "failed" => outcome.failed,
        }))
        .await;
        self.fail_remaining(outcome);
    }

    pub(crate) fn fail_remaining(&self, outcome: &mut WorkerOutcome) {
        outcome.failed += self.findings.len().saturating_sub(outcome.settled());
    }

    pub(crate) async fn remediation_complete(&mut self, outcome: WorkerOutcome) {
        let detail = format!(
            "{} complete: {} fixed, {} failed, {} skipped out of {} alerts",
            self.tool,
            outcome.completed,
            outcome.failed,
            outcome.skipped,
            self.findings.len()
        );
        let meta = metadata! {
            "completed" => outcome.completed,
            "failed" => outcome.failed,
            "skipped" => outcome.skipped,
            "total_alerts" => self.findings.len(),
            "branch" => &self.branch,
        };
        self.emit(Entry::new(EventKind::RemediationComplete, detail).metadata(meta)).await;
    }
}

/// `fix: remediate N alert(s) (#a, #b) in PATH via TOOL`
pub(crate) fn commit_message(findings: &[Finding], file_path: &str, tool: Tool) -> String {
    format!(
        "fix: remediate {} alert(s) ({}) in {file_path} via {tool}",
        findings.len(),
        finding::number_refs(findings)
    )
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
