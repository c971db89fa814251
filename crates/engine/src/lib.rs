// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! rb-engine: runs benchmarks across remediation tools and records their timelines

pub mod env;
mod error;
mod gate;
mod orchestrator;
mod recorder;
mod registry;
mod timeline;
mod worker;

pub use env::Timings;
pub use error::EngineError;
pub use gate::{GateReport, ReadinessGate};
pub use orchestrator::{BenchmarkRequest, Orchestrator, PreparedRun, RunHandle, RunSummary};
pub use recorder::{Entry, ReplayRecorder};
pub use registry::RunRegistry;
pub use timeline::{timeline, Timeline, ToolSummary};
pub use worker::{Backends, Worker, WorkerContext, WorkerOutcome};
