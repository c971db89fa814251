// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! rb-adapters: clients for the alert source, agent sessions and language models

mod error;
mod retry;

pub mod agent;
pub mod patch;
pub mod source;

pub use error::{BackendError, MAX_ERROR_BODY_CHARS};
pub use retry::{parse_retry_after, RetryPolicy};

pub use agent::{AgentBackend, DevinClient, SessionHandle, SessionStatus};
pub use patch::{extract_code, LlmClient, LlmKeys, LlmProvider, Patch, PatchGenerator};
pub use source::{AlertSource, AutofixPolling, AutofixStatus, GitHubClient};

#[cfg(any(test, feature = "test-support"))]
pub use agent::{AgentCall, FakeAgentBackend};
#[cfg(any(test, feature = "test-support"))]
pub use patch::{FakePatchGenerator, PatchCall};
#[cfg(any(test, feature = "test-support"))]
pub use source::{FakeAlertSource, SourceCall};
