// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Retrying HTTP sends with capped exponential backoff.

use crate::BackendError;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{RequestBuilder, Response, StatusCode};
use std::time::Duration;

/// How often and how patiently a request is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts after the first one.
    pub max_retries: u32,
    pub base: Duration,
    pub cap: Duration,
}

impl RetryPolicy {
    /// General upstream calls: 2 s, 4 s, 8 s.
    pub const STANDARD: RetryPolicy = RetryPolicy {
        max_retries: 3,
        base: Duration::from_secs(2),
        cap: Duration::from_secs(8),
    };

    /// Agent-session API, which rate limits aggressively.
    pub const RATE_LIMITED: RetryPolicy = RetryPolicy {
        max_retries: 10,
        base: Duration::from_secs(10),
        cap: Duration::from_secs(320),
    };

    pub const NONE: RetryPolicy =
        RetryPolicy { max_retries: 0, base: Duration::ZERO, cap: Duration::ZERO };

    /// Delay before retry number `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base.saturating_mul(factor).min(self.cap)
    }

    /// Server hints win over computed backoff, still bounded by the cap.
    pub fn delay(&self, attempt: u32, err: &BackendError) -> Duration {
        match err {
            BackendError::RateLimited { retry_after: Some(hint) } => (*hint).min(self.cap),
            _ => self.backoff(attempt),
        }
    }
}

/// Parse a `Retry-After` header given in seconds.
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let value = headers.get(RETRY_AFTER)?.to_str().ok()?.trim();
    let secs = value.parse::<f64>().ok()?;
    if !secs.is_finite() || secs < 0.0 {
        return None;
    }
    Some(Duration::from_secs_f64(secs))
}

/// Turn a response into an error unless it is a success.
pub(crate) async fn check_status(response: Response) -> Result<Response, BackendError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(BackendError::RateLimited { retry_after: parse_retry_after(response.headers()) });
    }
    let body = response.text().await.unwrap_or_default();
    Err(BackendError::from_status(status, &body))
}

/// Send a request, retrying transient failures.
///
/// Rate limiting is always retried since the server did not act on the
/// request. Network and 5xx failures are only retried when `idempotent`.
pub(crate) async fn send_with_retry<F>(
    policy: RetryPolicy,
    label: &str,
    idempotent: bool,
    build: F,
) -> Result<Response, BackendError>
where
    F: Fn() -> RequestBuilder,
{
    let mut attempt = 0;
    loop {
        let result = match build().send().await {
            Ok(response) => check_status(response).await,
            Err(err) => Err(BackendError::from(err)),
        };
        let err = match result {
            Ok(response) => return Ok(response),
            Err(err) => err,
        };

        let retry = match err {
            BackendError::RateLimited { .. } => true,
            ref e => idempotent && e.is_retryable(),
        };
        if !retry || attempt >= policy.max_retries {
            return Err(err);
        }
        attempt += 1;
        let delay = policy.delay(attempt, &err);
        tracing::warn!(
            %label,
            attempt,
            max_retries = policy.max_retries,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "retrying request",
        );
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;
