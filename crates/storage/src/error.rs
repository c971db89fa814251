// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use rb_core::{JobId, JobStatus, RunId, RunStatus};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("run not found: {0}")]
    RunNotFound(RunId),

    #[error("job not found: {0}")]
    JobNotFound(JobId),

    #[error("run {run_id} cannot move from {from} to {to}")]
    InvalidRunTransition { run_id: RunId, from: RunStatus, to: RunStatus },

    #[error("job {job_id} is already {status}")]
    JobAlreadyTerminal { job_id: JobId, status: JobStatus },

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("storage task failed: {0}")]
    Task(String),

    #[error("corrupt row: {0}")]
    Corrupt(String),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
