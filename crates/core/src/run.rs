// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Remediation runs and their status machine.

use crate::id::RunId;
use crate::tool::Tool;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
    Cancelled,
}

crate::simple_display! {
    RunStatus {
        Running => "running",
        Completed => "completed",
        Failed => "failed",
        Cancelled => "cancelled",
    }
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RunStatus::Running)
    }

    /// Runs only ever move from `running` to a terminal status.
    pub fn can_transition_to(&self, next: RunStatus) -> bool {
        *self == RunStatus::Running && next.is_terminal()
    }
}

impl FromStr for RunStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "running" => Ok(RunStatus::Running),
            "completed" => Ok(RunStatus::Completed),
            "failed" => Ok(RunStatus::Failed),
            "cancelled" => Ok(RunStatus::Cancelled),
            other => Err(format!("unknown run status '{other}'")),
        }
    }
}

/// One remediation attempt across one or more tools sharing a start time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    pub id: RunId,
    pub repo: String,
    pub scan_ref: Option<String>,
    pub started_at_ms: u64,
    pub ended_at_ms: Option<u64>,
    pub status: RunStatus,
    pub tools: Vec<Tool>,
    pub branch_label: Option<String>,
    pub total_cost_usd: f64,
}

impl Run {
    /// A fresh `running` run with zero cost.
    pub fn new(
        repo: impl Into<String>,
        tools: Vec<Tool>,
        scan_ref: Option<String>,
        branch_label: Option<String>,
        started_at_ms: u64,
    ) -> Self {
        Self {
            id: RunId::new(),
            repo: repo.into(),
            scan_ref,
            started_at_ms,
            ended_at_ms: None,
            status: RunStatus::Running,
            tools,
            branch_label,
            total_cost_usd: 0.0,
        }
    }

    pub fn duration_ms(&self) -> Option<u64> {
        self.ended_at_ms.map(|end| end.saturating_sub(self.started_at_ms))
    }
}

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;
