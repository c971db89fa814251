// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Readiness gate: wait for freshly created branches to be re-analyzed.

use crate::recorder::{Entry, ReplayRecorder};
use indexmap::IndexMap;
use rb_adapters::AlertSource;
use rb_core::{metadata, Clock, EventKind, FindingState, Tool};
use serde::Serialize;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Which branches reached the target count before the gate let go
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GateReport {
    pub ready: Vec<Tool>,
    pub not_ready: Vec<Tool>,
    pub cancelled: bool,
    pub timed_out: bool,
}

pub struct ReadinessGate<S: AlertSource> {
    source: S,
    repo: String,
    poll_interval: Duration,
    max_wait: Duration,
}

impl<S: AlertSource> ReadinessGate<S> {
    pub fn new(source: S, repo: &str, poll_interval: Duration, max_wait: Duration) -> Self {
        Self { source, repo: repo.to_string(), poll_interval, max_wait }
    }

    /// Poll every not-yet-ready branch until its open count reaches `target`.
    ///
    /// Never fails: poll errors are expected while analysis runs, the global
    /// ceiling proceeds with whatever is ready, and cancellation returns early.
    pub async fn wait<C: Clock>(
        &self,
        recorder: &mut ReplayRecorder<C>,
        target: usize,
        branches: &IndexMap<Tool, String>,
        token: &CancellationToken,
    ) -> GateReport {
        let started = Instant::now();
        let mut report = GateReport::default();
        recorder
            .emit(
                Entry::new(
                    EventKind::CodeqlWaiting,
                    format!(
                        "Waiting for analysis of {} branches (target: {target} alerts per branch)",
                        branches.len()
                    ),
                )
                .metadata(metadata! { "baseline_count" => target, "branches" => branches }),
            )
            .await;

        while report.ready.len() < branches.len() {
            if token.is_cancelled() {
                recorder
                    .emit(
                        Entry::new(EventKind::Cancelled, "Benchmark cancelled during analysis wait")
                            .metadata(metadata! { "ready_branches" => &report.ready }),
                    )
                    .await;
                report.cancelled = true;
                break;
            }

            let elapsed = started.elapsed();
            if elapsed > self.max_wait {
                let not_ready = pending(branches, &report.ready);
                tracing::warn!(
                    run_id = %recorder.run_id(),
                    elapsed_s = elapsed.as_secs(),
                    ?not_ready,
                    "analysis wait timed out",
                );
                recorder
                    .emit(
                        Entry::new(
                            EventKind::CodeqlTimeout,
                            format!(
                                "Analysis wait timed out after {}s. Proceeding with {}/{} ready.",
                                elapsed.as_secs(),
                                report.ready.len(),
                                branches.len()
                            ),
                        )
                        .metadata(metadata! {
                            "ready" => &report.ready,
                            "not_ready" => &not_ready,
                            "elapsed_s" => elapsed.as_secs(),
                        }),
                    )
                    .await;
                report.timed_out = true;
                break;
            }

            for (tool, branch) in branches {
                if report.ready.contains(tool) {
                    continue;
                }
                match self.source.list_findings(&self.repo, branch, Some(FindingState::Open)).await {
                    Ok(findings) if findings.len() >= target => {
                        report.ready.push(*tool);
                        recorder
                            .record(
                                tool.as_str(),
                                EventKind::CodeqlReady,
                                format!(
                                    "Branch {branch} ready: {} alerts (target: {target})",
                                    findings.len()
                                ),
                                None,
                                Some(metadata! {
                                    "branch" => branch,
                                    "alert_count" => findings.len(),
                                    "baseline_count" => target,
                                }),
                                0.0,
                            )
                            .await;
                    }
                    Ok(findings) => {
                        tracing::debug!(%tool, %branch, count = findings.len(), target, "branch not ready");
                    }
                    Err(e) => {
                        tracing::debug!(%tool, %branch, error = %e, "readiness poll failed");
                    }
                }
            }

            if report.ready.len() < branches.len() {
                tokio::time::sleep(self.poll_interval).await;
            }
        }

        report.not_ready = pending(branches, &report.ready);
        report
    }
}

fn pending(branches: &IndexMap<Tool, String>, ready: &[Tool]) -> Vec<Tool> {
    branches.keys().filter(|tool| !ready.contains(tool)).copied().collect()
}

#[cfg(test)]
#[path = "gate_tests.rs"]
mod tests;
