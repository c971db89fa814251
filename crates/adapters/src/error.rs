// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;
use thiserror::Error;

/// Upstream response bodies kept in errors are cut to this many characters.
pub const MAX_ERROR_BODY_CHARS: usize = 500;

/// Errors from external backends (alert source, agent sessions, LLMs)
#[derive(Debug, Clone, Error)]
pub enum BackendError {
    #[error("{0} not configured")]
    ConfigurationMissing(String),

    #[error("backend unavailable: {0}")]
    Unavailable(String),

    #[error("rate limited")]
    RateLimited { retry_after: Option<Duration> },

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("{0}")]
    EmptyResult(String),

    #[error("timed out: {0}")]
    Timeout(String),

    #[error("cancelled")]
    Cancelled,

    #[error("unexpected response: {0}")]
    Decode(String),
}

impl BackendError {
    /// Transient failures worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BackendError::Unavailable(_)
                | BackendError::RateLimited { .. }
                | BackendError::Timeout(_)
        )
    }

    pub(crate) fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let body = rb_core::truncate(body.trim(), MAX_ERROR_BODY_CHARS).to_string();
        if status.is_server_error() {
            BackendError::Unavailable(format!("HTTP {}: {}", status.as_u16(), body))
        } else {
            BackendError::Http { status: status.as_u16(), body }
        }
    }
}

/// The request URL is dropped so query parameters never reach a stored error.
impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        let err = err.without_url();
        if err.is_timeout() {
            BackendError::Timeout(err.to_string())
        } else if err.is_decode() {
            BackendError::Decode(err.to_string())
        } else {
            BackendError::Unavailable(err.to_string())
        }
    }
}

impl From<serde_json::Error> for BackendError {
    fn from(err: serde_json::Error) -> Self {
        BackendError::Decode(err.to_string())
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
