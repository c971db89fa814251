// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Replay recorder: turns worker progress into costed, offset-stamped events.
//!
//! Every recorder attached to a run shares the run's start instant, so
//! offsets from different tools are comparable. Cumulative cost is local to
//! one recorder; the run total is kept by the store's atomic increment.

use rb_core::{
    Clock, CostStamp, Event, EventId, EventKind, Metadata, Run, RunId, RunStatus, Tool,
    ORCHESTRATOR_SOURCE,
};
use rb_storage::{LedgerStore, StoreError};
use std::sync::Arc;
use std::time::Instant;

/// One event to record, before offset and cost stamping.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub kind: EventKind,
    pub detail: String,
    pub finding: Option<u64>,
    pub metadata: Metadata,
    pub cost_usd: f64,
}

impl Entry {
    pub fn new(kind: EventKind, detail: impl Into<String>) -> Self {
        Self { kind, detail: detail.into(), finding: None, metadata: Metadata::new(), cost_usd: 0.0 }
    }

    pub fn finding(mut self, number: u64) -> Self {
        self.finding = Some(number);
        self
    }

    pub fn metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn cost(mut self, usd: f64) -> Self {
        self.cost_usd = usd;
        self
    }
}

#[derive(Clone)]
pub struct ReplayRecorder<C: Clock> {
    store: Arc<dyn LedgerStore>,
    clock: C,
    run_id: RunId,
    repo: String,
    tools: Vec<Tool>,
    started: Instant,
    /// Default `tool` column for [`ReplayRecorder::emit`]
    source: String,
    cumulative_usd: f64,
}

impl<C: Clock> ReplayRecorder<C> {
    /// Create a `running` run and a recorder for orchestrator-level events.
    pub async fn start(
        store: Arc<dyn LedgerStore>,
        clock: C,
        tools: Vec<Tool>,
        repo: &str,
        scan_ref: Option<String>,
        branch_label: Option<String>,
    ) -> Result<Self, StoreError> {
        let run = Run::new(repo, tools.clone(), scan_ref, branch_label, clock.epoch_ms());
        store.create_run(&run).await?;
        let started = clock.now();
        tracing::info!(run_id = %run.id, %repo, ?tools, "run started");
        Ok(Self {
            store,
            clock,
            run_id: run.id,
            repo: repo.to_string(),
            tools,
            started,
            source: ORCHESTRATOR_SOURCE.to_string(),
            cumulative_usd: 0.0,
        })
    }

    /// Bind to an existing run without writing a row.
    pub fn attach(
        store: Arc<dyn LedgerStore>,
        clock: C,
        run_id: RunId,
        tools: Vec<Tool>,
        repo: &str,
        started: Instant,
    ) -> Self {
        let source = match tools.as_slice() {
            [tool] => tool.to_string(),
            _ => ORCHESTRATOR_SOURCE.to_string(),
        };
        Self {
            store,
            clock,
            run_id,
            repo: repo.to_string(),
            tools,
            started,
            source,
            cumulative_usd: 0.0,
        }
    }

    /// A fresh recorder for `tool` on the same run and start instant.
    pub fn for_tool(&self, tool: Tool) -> Self {
        Self::attach(
            Arc::clone(&self.store),
            self.clock.clone(),
            self.run_id.clone(),
            vec![tool],
            &self.repo,
            self.started,
        )
    }

    pub fn run_id(&self) -> &RunId {
        &self.run_id
    }

    pub fn repo(&self) -> &str {
        &self.repo
    }

    pub fn tools(&self) -> &[Tool] {
        &self.tools
    }

    pub fn started(&self) -> Instant {
        self.started
    }

    pub fn cumulative_cost(&self) -> f64 {
        self.cumulative_usd
    }

    pub fn offset_ms(&self) -> u64 {
        self.clock.offset_ms(self.started)
    }

    pub fn epoch_ms(&self) -> u64 {
        self.clock.epoch_ms()
    }

    /// Record under this recorder's own tool label.
    pub async fn emit(&mut self, entry: Entry) -> Option<EventId> {
        let source = self.source.clone();
        self.record_entry(&source, entry).await
    }

    /// Append one event and add its cost to the run total.
    ///
    /// Storage failures are logged and yield `None`; recording never aborts
    /// the caller.
    pub async fn record(
        &mut self,
        tool: &str,
        kind: EventKind,
        detail: impl Into<String>,
        finding: Option<u64>,
        metadata: Option<Metadata>,
        cost_usd: f64,
    ) -> Option<EventId> {
        let entry = Entry {
            kind,
            detail: detail.into(),
            finding,
            metadata: metadata.unwrap_or_default(),
            cost_usd,
        };
        self.record_entry(tool, entry).await
    }

    async fn record_entry(&mut self, tool: &str, entry: Entry) -> Option<EventId> {
        let cost_usd =
            if entry.cost_usd.is_finite() && entry.cost_usd > 0.0 { entry.cost_usd } else { 0.0 };
        let cumulative_usd = self.cumulative_usd + cost_usd;
        let event = Event {
            id: EventId::new(),
            run_id: self.run_id.clone(),
            tool: tool.to_string(),
            kind: entry.kind,
            detail: entry.detail,
            finding: entry.finding,
            offset_ms: self.offset_ms(),
            cost: CostStamp { event_cost_usd: cost_usd, cumulative_cost_usd: cumulative_usd },
            metadata: entry.metadata,
            created_at_ms: self.clock.epoch_ms(),
        };

        if let Err(e) = self.store.append_event(&event).await {
            tracing::warn!(
                run_id = %self.run_id,
                %tool,
                kind = %event.kind,
                error = %e,
                "failed to record event",
            );
            return None;
        }
        self.cumulative_usd = cumulative_usd;
        if cost_usd > 0.0 {
            if let Err(e) = self.store.increment_cost(&self.run_id, cost_usd).await {
                tracing::warn!(
                    run_id = %self.run_id,
                    %tool,
                    cost_usd,
                    error = %e,
                    "failed to add event cost to run",
                );
            }
        }
        tracing::debug!(run_id = %self.run_id, %tool, kind = %event.kind, offset_ms = event.offset_ms, "event recorded");
        Some(event.id)
    }

    /// Move the run to its terminal status; `Ok(false)` when already terminal.
    pub async fn finish(&self, status: RunStatus) -> Result<bool, StoreError> {
        let finished = self.store.finish_run(&self.run_id, status, self.clock.epoch_ms()).await?;
        if finished {
            tracing::info!(run_id = %self.run_id, %status, "run finished");
        } else {
            tracing::warn!(run_id = %self.run_id, %status, "run already finished");
        }
        Ok(finished)
    }
}

#[cfg(test)]
#[path = "recorder_tests.rs"]
mod tests;
