// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Hosted coding-agent sessions.

mod devin;

pub use devin::{DevinClient, DEVIN_API};

use crate::BackendError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Session states after which the agent does no further work.
pub const HARD_TERMINAL_STATES: [&str; 3] = ["exit", "error", "suspended"];

/// Status details meaning the agent finished its task and waits for input
/// that an automated run never sends.
pub const DONE_DETAILS: [&str; 1] = ["waiting_for_user"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionHandle {
    pub session_id: String,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PullRequestRef {
    #[serde(default)]
    pub pr_url: Option<String>,
    #[serde(default)]
    pub pr_state: Option<String>,
}

/// Snapshot of a session as reported by the agent API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionStatus {
    pub session_id: String,
    #[serde(default = "unknown")]
    pub status: String,
    #[serde(default)]
    pub status_detail: Option<String>,
    /// Cumulative compute units consumed by the session
    #[serde(default)]
    pub acus_consumed: Option<f64>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub pull_requests: Vec<PullRequestRef>,
}

fn unknown() -> String {
    "unknown".to_string()
}

impl SessionStatus {
    pub fn new(session_id: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            status: status.into(),
            status_detail: None,
            acus_consumed: None,
            url: None,
            pull_requests: Vec::new(),
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.status_detail = Some(detail.into());
        self
    }

    pub fn with_acus(mut self, acus: f64) -> Self {
        self.acus_consumed = Some(acus);
        self
    }

    pub fn is_hard_terminal(&self) -> bool {
        HARD_TERMINAL_STATES.contains(&self.status.as_str())
    }

    /// Whether the current task is over, either for good or awaiting input.
    pub fn is_done(&self) -> bool {
        self.is_hard_terminal()
            || self.status_detail.as_deref().is_some_and(|d| DONE_DETAILS.contains(&d))
    }

    /// `status`, or `status:detail` when the detail is what ended the task.
    pub fn effective_status(&self) -> String {
        match self.status_detail.as_deref() {
            Some(detail) if !self.is_hard_terminal() && DONE_DETAILS.contains(&detail) => {
                format!("{}:{}", self.status, detail)
            }
            _ => self.status.clone(),
        }
    }

    pub fn pr_url(&self) -> Option<&str> {
        self.pull_requests.first().and_then(|pr| pr.pr_url.as_deref())
    }
}

/// Adapter for a hosted autonomous coding agent
#[async_trait]
pub trait AgentBackend: Clone + Send + Sync + 'static {
    /// Fails with [`BackendError::ConfigurationMissing`] when credentials are absent.
    fn ensure_configured(&self) -> Result<(), BackendError>;

    async fn create_session(&self, repo: &str, prompt: &str) -> Result<SessionHandle, BackendError>;

    async fn send_message(&self, session_id: &str, message: &str) -> Result<(), BackendError>;

    async fn get_status(&self, session_id: &str) -> Result<SessionStatus, BackendError>;

    /// All sessions of the organization; carries `status_detail` reliably.
    async fn list_sessions(&self) -> Result<Vec<SessionStatus>, BackendError>;
}

#[cfg(any(test, feature = "test-support"))]
mod fake;

#[cfg(any(test, feature = "test-support"))]
pub use fake::{AgentCall, FakeAgentBackend};

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
