// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The ledger contract shared by every store implementation.

use crate::StoreError;
use async_trait::async_trait;
use rb_core::{
    ClaimOutcome, Event, JobClaim, JobId, JobUpdate, RemediationJob, Run, RunId, RunStatus, Tool,
};

/// Durable, append-only storage for runs, events and remediation jobs.
///
/// Implementations must tolerate concurrent appenders: every tool worker of a
/// run writes events and cost increments at the same time.
#[async_trait]
pub trait LedgerStore: Send + Sync + 'static {
    /// Insert a new run row.
    async fn create_run(&self, run: &Run) -> Result<(), StoreError>;

    async fn get_run(&self, run_id: &RunId) -> Result<Option<Run>, StoreError>;

    /// Runs newest first, optionally filtered by repository.
    async fn list_runs(&self, repo: Option<&str>) -> Result<Vec<Run>, StoreError>;

    /// Atomically add `delta_usd` to the run's total cost.
    ///
    /// Never a read-modify-write from caller state: concurrent increments from
    /// different recorders must all land.
    async fn increment_cost(&self, run_id: &RunId, delta_usd: f64) -> Result<(), StoreError>;

    /// Append one immutable event.
    async fn append_event(&self, event: &Event) -> Result<(), StoreError>;

    /// Events of a run ordered by offset; ties keep insertion order.
    async fn list_events(&self, run_id: &RunId) -> Result<Vec<Event>, StoreError>;

    /// Move a `running` run to a terminal status.
    ///
    /// Returns `Ok(false)` without changes when the run is already terminal.
    async fn finish_run(
        &self,
        run_id: &RunId,
        status: RunStatus,
        ended_at_ms: u64,
    ) -> Result<bool, StoreError>;

    /// Atomically claim the findings of `claim` that no `running` or
    /// `completed` job covers yet for `(repo, tool)`.
    ///
    /// Blocked findings are reported in [`ClaimOutcome::skipped`]; when at
    /// least one finding is free a single new `running` job covers them all.
    async fn claim_job(&self, claim: JobClaim) -> Result<ClaimOutcome, StoreError>;

    /// Apply a terminal update to a `running` job. Jobs are never reopened.
    async fn update_job(&self, job_id: &JobId, update: JobUpdate) -> Result<(), StoreError>;

    async fn get_job(&self, job_id: &JobId) -> Result<Option<RemediationJob>, StoreError>;

    /// Jobs of a repository oldest first, optionally for one tool.
    async fn list_jobs(
        &self,
        repo: &str,
        tool: Option<Tool>,
    ) -> Result<Vec<RemediationJob>, StoreError>;
}

pub(crate) fn check_finish(
    run_id: &RunId,
    current: RunStatus,
    next: RunStatus,
) -> Result<bool, StoreError> {
    if !next.is_terminal() {
        return Err(StoreError::InvalidRunTransition {
            run_id: run_id.clone(),
            from: current,
            to: next,
        });
    }
    Ok(current.can_transition_to(next))
}
