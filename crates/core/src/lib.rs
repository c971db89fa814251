// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! rb-core: data model and pure logic for the remediation benchmark

pub mod macros;

pub mod clock;
pub mod cost;
pub mod event;
pub mod finding;
pub mod group;
pub mod id;
pub mod job;
pub mod prompt;
pub mod run;
pub mod text;
pub mod tool;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

#[doc(hidden)]
pub use serde_json;

pub use clock::{Clock, FakeClock, SystemClock};
pub use cost::{RateTable, RateTableError, Usage};
pub use event::{CostStamp, Event, EventKind, Metadata};
#[cfg(any(test, feature = "test-support"))]
pub use finding::FindingBuilder;
pub use finding::{Finding, FindingState, Severity};
pub use group::group_by_file;
pub use id::{EventId, JobId, RunId};
pub use job::{ClaimOutcome, JobClaim, JobStatus, JobUpdate, RemediationJob, SkippedFinding};
pub use run::{Run, RunStatus};
pub use text::truncate;
pub use tool::{Tool, ToolFamily, UnknownTool, ORCHESTRATOR_SOURCE};
