// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use rb_adapters::BackendError;
use rb_core::{RunId, Tool};
use rb_storage::StoreError;
use thiserror::Error;

/// Errors surfaced by the orchestrator and timeline queries
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no open findings on {branch} match the request")]
    NoFindings { branch: String },

    #[error("no tools selected")]
    NoTools,

    #[error("no remediation branch prepared for {0}")]
    MissingBranch(Tool),

    #[error("run not found: {0}")]
    RunNotFound(RunId),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Backend(#[from] BackendError),
}
