// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process ledger used by tests and dry runs.

use crate::ledger::{check_finish, LedgerStore};
use crate::StoreError;
use async_trait::async_trait;
use parking_lot::Mutex;
use rb_core::{
    ClaimOutcome, Event, JobClaim, JobId, JobUpdate, RemediationJob, Run, RunId, RunStatus,
    SkippedFinding, Tool,
};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Default)]
struct State {
    runs: Vec<Run>,
    events: Vec<Event>,
    jobs: Vec<RemediationJob>,
    fail_writes: bool,
}

/// Cloneable handle to a shared in-memory ledger.
#[derive(Clone, Default)]
pub struct MemoryLedger {
    inner: Arc<Mutex<State>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail with [`StoreError::Unavailable`].
    pub fn fail_writes(&self, fail: bool) {
        self.inner.lock().fail_writes = fail;
    }

    fn check_writable(state: &State) -> Result<(), StoreError> {
        if state.fail_writes {
            return Err(StoreError::Unavailable("writes disabled".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for MemoryLedger {
    async fn create_run(&self, run: &Run) -> Result<(), StoreError> {
        let mut state = self.inner.lock();
        Self::check_writable(&state)?;
        state.runs.push(run.clone());
        Ok(())
    }

    async fn get_run(&self, run_id: &RunId) -> Result<Option<Run>, StoreError> {
        Ok(self.inner.lock().runs.iter().find(|r| &r.id == run_id).cloned())
    }

    async fn list_runs(&self, repo: Option<&str>) -> Result<Vec<Run>, StoreError> {
        let state = self.inner.lock();
        let mut runs: Vec<Run> = state
            .runs
            .iter()
            .filter(|r| repo.is_none_or(|repo| r.repo == repo))
            .cloned()
            .collect();
        runs.reverse();
        runs.sort_by(|a, b| b.started_at_ms.cmp(&a.started_at_ms));
        Ok(runs)
    }

    async fn increment_cost(&self, run_id: &RunId, delta_usd: f64) -> Result<(), StoreError> {
        let mut state = self.inner.lock();
        Self::check_writable(&state)?;
        let run = state
            .runs
            .iter_mut()
            .find(|r| &r.id == run_id)
            .ok_or_else(|| StoreError::RunNotFound(run_id.clone()))?;
        run.total_cost_usd += delta_usd;
        Ok(())
    }

    async fn append_event(&self, event: &Event) -> Result<(), StoreError> {
        let mut state = self.inner.lock();
        Self::check_writable(&state)?;
        state.events.push(event.clone());
        Ok(())
    }

    async fn list_events(&self, run_id: &RunId) -> Result<Vec<Event>, StoreError> {
        let state = self.inner.lock();
        let mut events: Vec<Event> =
            state.events.iter().filter(|e| &e.run_id == run_id).cloned().collect();
        // stable sort keeps insertion order for equal offsets
        events.sort_by_key(|e| e.offset_ms);
        Ok(events)
    }

    async fn finish_run(
        &self,
        run_id: &RunId,
        status: RunStatus,
        ended_at_ms: u64,
    ) -> Result<bool, StoreError> {
        let mut state = self.inner.lock();
        Self::check_writable(&state)?;
        let run = state
            .runs
            .iter_mut()
            .find(|r| &r.id == run_id)
            .ok_or_else(|| StoreError::RunNotFound(run_id.clone()))?;
        if !check_finish(run_id, run.status, status)? {
            return Ok(false);
        }
        run.status = status;
        run.ended_at_ms = Some(ended_at_ms);
        Ok(true)
    }

    async fn claim_job(&self, claim: JobClaim) -> Result<ClaimOutcome, StoreError> {
        let mut state = self.inner.lock();
        Self::check_writable(&state)?;

        // completed wins over running when both cover a finding
        let mut blockers: HashMap<u64, rb_core::JobStatus> = HashMap::new();
        for job in state.jobs.iter().filter(|j| {
            j.repo == claim.repo && j.tool == claim.tool && j.status.blocks_claim()
        }) {
            for &finding in &job.findings {
                let entry = blockers.entry(finding).or_insert(job.status);
                if job.status == rb_core::JobStatus::Completed {
                    *entry = job.status;
                }
            }
        }

        let mut free = Vec::new();
        let mut skipped = Vec::new();
        for &finding in &claim.findings {
            match blockers.get(&finding) {
                Some(&blocked_by) => skipped.push(SkippedFinding { finding, blocked_by }),
                None => free.push(finding),
            }
        }

        let job = if free.is_empty() {
            None
        } else {
            let job = claim.into_job(free);
            state.jobs.push(job.clone());
            Some(job)
        };
        Ok(ClaimOutcome { job, skipped })
    }

    async fn update_job(&self, job_id: &JobId, update: JobUpdate) -> Result<(), StoreError> {
        let mut state = self.inner.lock();
        Self::check_writable(&state)?;
        let job = state
            .jobs
            .iter_mut()
            .find(|j| &j.id == job_id)
            .ok_or_else(|| StoreError::JobNotFound(job_id.clone()))?;
        if job.status.is_terminal() {
            return Err(StoreError::JobAlreadyTerminal {
                job_id: job_id.clone(),
                status: job.status,
            });
        }
        job.status = update.status;
        job.commit_ref = update.commit_ref;
        job.error = update.error;
        job.updated_at_ms = update.now_ms;
        Ok(())
    }

    async fn get_job(&self, job_id: &JobId) -> Result<Option<RemediationJob>, StoreError> {
        Ok(self.inner.lock().jobs.iter().find(|j| &j.id == job_id).cloned())
    }

    async fn list_jobs(
        &self,
        repo: &str,
        tool: Option<Tool>,
    ) -> Result<Vec<RemediationJob>, StoreError> {
        let state = self.inner.lock();
        Ok(state
            .jobs
            .iter()
            .filter(|j| j.repo == repo && tool.is_none_or(|t| j.tool == t))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
