// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Timeline events recorded against a run.

use crate::id::{EventId, RunId};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Free-form event metadata (string → JSON value).
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Build a [`Metadata`] map from `key => value` pairs.
///
/// ```ignore
/// let meta = rb_core::metadata! { "file_path" => path, "alert_count" => 2 };
/// ```
#[macro_export]
macro_rules! metadata {
    () => { $crate::event::Metadata::new() };
    ($( $key:expr => $value:expr ),+ $(,)?) => {{
        let mut map = $crate::event::Metadata::new();
        $( map.insert($key.to_string(), $crate::serde_json::json!($value)); )+
        map
    }};
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    ScanStarted,
    CodeqlWaiting,
    CodeqlReady,
    CodeqlTimeout,
    AlertTriaged,
    AlertSkipped,
    ApiCallSent,
    PatchGenerated,
    SessionCreated,
    MessageSent,
    Analyzing,
    SessionComplete,
    PollingTimeout,
    AutofixTriggered,
    AutofixResult,
    BatchPause,
    PatchApplied,
    Error,
    Cancelled,
    RemediationComplete,
}

crate::simple_display! {
    EventKind {
        ScanStarted => "scan_started",
        CodeqlWaiting => "codeql_waiting",
        CodeqlReady => "codeql_ready",
        CodeqlTimeout => "codeql_timeout",
        AlertTriaged => "alert_triaged",
        AlertSkipped => "alert_skipped",
        ApiCallSent => "api_call_sent",
        PatchGenerated => "patch_generated",
        SessionCreated => "session_created",
        MessageSent => "message_sent",
        Analyzing => "analyzing",
        SessionComplete => "session_complete",
        PollingTimeout => "polling_timeout",
        AutofixTriggered => "autofix_triggered",
        AutofixResult => "autofix_result",
        BatchPause => "batch_pause",
        PatchApplied => "patch_applied",
        Error => "error",
        Cancelled => "cancelled",
        RemediationComplete => "remediation_complete",
    }
}

impl EventKind {
    pub const ALL: [EventKind; 20] = [
        EventKind::ScanStarted,
        EventKind::CodeqlWaiting,
        EventKind::CodeqlReady,
        EventKind::CodeqlTimeout,
        EventKind::AlertTriaged,
        EventKind::AlertSkipped,
        EventKind::ApiCallSent,
        EventKind::PatchGenerated,
        EventKind::SessionCreated,
        EventKind::MessageSent,
        EventKind::Analyzing,
        EventKind::SessionComplete,
        EventKind::PollingTimeout,
        EventKind::AutofixTriggered,
        EventKind::AutofixResult,
        EventKind::BatchPause,
        EventKind::PatchApplied,
        EventKind::Error,
        EventKind::Cancelled,
        EventKind::RemediationComplete,
    ];
}

impl FromStr for EventKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| format!("unknown event kind '{s}'"))
    }
}

/// Cost bookkeeping carried by every event.
///
/// `cumulative_cost_usd` is the emitting recorder's running total, not the
/// run-level total (which sums every tool).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CostStamp {
    pub event_cost_usd: f64,
    pub cumulative_cost_usd: f64,
}

/// One immutable step of a worker's progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub run_id: RunId,
    pub tool: String,
    pub kind: EventKind,
    pub detail: String,
    pub finding: Option<u64>,
    pub offset_ms: u64,
    pub cost: CostStamp,
    #[serde(default)]
    pub metadata: Metadata,
    pub created_at_ms: u64,
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
