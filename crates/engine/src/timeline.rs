// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Read side of the ledger: a run's events in replay order with per-tool totals.

use crate::error::EngineError;
use rb_core::{Event, EventKind, Run, RunId};
use rb_storage::LedgerStore;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Timeline {
    pub run: Run,
    /// Sorted by offset; ties keep append order
    pub events: Vec<Event>,
    /// One entry per event source, in order of first appearance
    pub tools: Vec<ToolSummary>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ToolSummary {
    /// Tool name, or `benchmark` for orchestrator events
    pub tool: String,
    pub events: usize,
    pub cost_usd: f64,
    pub patches: usize,
    pub skipped: usize,
    pub errors: usize,
    /// Offset of the last event
    pub last_offset_ms: u64,
}

pub async fn timeline(store: &dyn LedgerStore, run_id: &RunId) -> Result<Timeline, EngineError> {
    let run = store.get_run(run_id).await?.ok_or_else(|| EngineError::RunNotFound(run_id.clone()))?;
    let mut events = store.list_events(run_id).await?;
    events.sort_by_key(|e| e.offset_ms);
    let tools = summarize(&events);
    Ok(Timeline { run, events, tools })
}

fn summarize(events: &[Event]) -> Vec<ToolSummary> {
    let mut tools: Vec<ToolSummary> = Vec::new();
    for event in events {
        let index = match tools.iter().position(|t| t.tool == event.tool) {
            Some(i) => i,
            None => {
                tools.push(ToolSummary { tool: event.tool.clone(), ..ToolSummary::default() });
                tools.len() - 1
            }
        };
        let summary = &mut tools[index];
        summary.events += 1;
        summary.cost_usd += event.cost.event_cost_usd;
        summary.last_offset_ms = summary.last_offset_ms.max(event.offset_ms);
        match event.kind {
            EventKind::PatchApplied => summary.patches += 1,
            EventKind::AlertSkipped => summary.skipped += 1,
            EventKind::Error => summary.errors += 1,
            _ => {}
        }
    }
    tools
}

#[cfg(test)]
#[path = "timeline_tests.rs"]
mod tests;
