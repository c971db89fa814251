// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Code-scanning alert source: findings, branches, files and native autofix.

mod github;

pub use github::{AutofixPolling, GitHubClient};

use crate::BackendError;
use async_trait::async_trait;
use rb_core::{Finding, FindingState};
use serde::{Deserialize, Serialize};

/// Autofix statuses after which polling stops.
pub const AUTOFIX_TERMINAL: [&str; 5] = ["succeeded", "success", "failed", "dismissed", "skipped"];

/// State of a native autofix request for one alert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutofixStatus {
    pub status: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl AutofixStatus {
    pub fn new(status: impl Into<String>) -> Self {
        Self { status: status.into(), description: None }
    }

    pub fn is_terminal(&self) -> bool {
        AUTOFIX_TERMINAL.contains(&self.status.as_str())
    }

    pub fn is_success(&self) -> bool {
        matches!(self.status.as_str(), "succeeded" | "success")
    }
}

/// Adapter for the repository host's code-scanning and contents APIs
#[async_trait]
pub trait AlertSource: Clone + Send + Sync + 'static {
    /// Findings on `branch`, optionally filtered by state.
    async fn list_findings(
        &self,
        repo: &str,
        branch: &str,
        state: Option<FindingState>,
    ) -> Result<Vec<Finding>, BackendError>;

    /// Create `new_branch` at the head of `from_branch`; returns the head sha.
    async fn create_branch(
        &self,
        repo: &str,
        new_branch: &str,
        from_branch: &str,
    ) -> Result<String, BackendError>;

    /// Current head commit sha of `branch`.
    async fn branch_head(&self, repo: &str, branch: &str) -> Result<String, BackendError>;

    /// Commit shas on `branch` newer than `since_sha`, newest first.
    async fn commits_since(
        &self,
        repo: &str,
        branch: &str,
        since_sha: &str,
    ) -> Result<Vec<String>, BackendError>;

    async fn get_file(&self, repo: &str, path: &str, branch: &str) -> Result<String, BackendError>;

    /// Replace a file's content with one commit; returns the commit sha.
    async fn write_file(
        &self,
        repo: &str,
        path: &str,
        branch: &str,
        content: &str,
        message: &str,
    ) -> Result<String, BackendError>;

    async fn trigger_autofix(&self, repo: &str, number: u64) -> Result<AutofixStatus, BackendError>;

    /// Poll until the autofix reaches a terminal status or the polling
    /// ceiling passes; returns the last observed status either way.
    async fn poll_autofix(&self, repo: &str, number: u64) -> Result<AutofixStatus, BackendError>;

    /// Commit a generated autofix onto `branch`; returns the commit sha.
    async fn commit_autofix(
        &self,
        repo: &str,
        number: u64,
        branch: &str,
        message: &str,
    ) -> Result<String, BackendError>;
}

#[cfg(any(test, feature = "test-support"))]
mod fake;

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeAlertSource, SourceCall};
