// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the engine crate.

use std::time::Duration;

pub const INTER_TOOL_DELAY: Duration = Duration::from_secs(1);
pub const READINESS_POLL: Duration = Duration::from_secs(30);
pub const READINESS_MAX_WAIT: Duration = Duration::from_secs(20 * 60);
pub const AGENT_POLL: Duration = Duration::from_secs(30);
pub const AGENT_MAX_WAIT: Duration = Duration::from_secs(30 * 60);
pub const AUTOFIX_DELAY: Duration = Duration::from_secs(2);
pub const AUTOFIX_BATCH_PAUSE: Duration = Duration::from_secs(4);
pub const AUTOFIX_BATCH_SIZE: usize = 10;
pub const PATCH_DELAY: Duration = Duration::from_secs(2);

/// Delays, poll intervals and ceilings used by the orchestrator and workers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    /// Pause between launching consecutive tool workers
    pub inter_tool_delay: Duration,
    pub readiness_poll: Duration,
    pub readiness_max_wait: Duration,
    pub agent_poll: Duration,
    /// Per file group
    pub agent_max_wait: Duration,
    pub autofix_delay: Duration,
    pub autofix_batch_pause: Duration,
    /// File groups per autofix batch
    pub autofix_batch_size: usize,
    pub patch_delay: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            inter_tool_delay: INTER_TOOL_DELAY,
            readiness_poll: READINESS_POLL,
            readiness_max_wait: READINESS_MAX_WAIT,
            agent_poll: AGENT_POLL,
            agent_max_wait: AGENT_MAX_WAIT,
            autofix_delay: AUTOFIX_DELAY,
            autofix_batch_pause: AUTOFIX_BATCH_PAUSE,
            autofix_batch_size: AUTOFIX_BATCH_SIZE,
            patch_delay: PATCH_DELAY,
        }
    }
}

impl Timings {
    /// Defaults overridden by `RB_*_MS` / `RB_AUTOFIX_BATCH_SIZE`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            inter_tool_delay: duration_ms("RB_INTER_TOOL_DELAY_MS")
                .unwrap_or(defaults.inter_tool_delay),
            readiness_poll: duration_ms("RB_READINESS_POLL_MS").unwrap_or(defaults.readiness_poll),
            readiness_max_wait: duration_ms("RB_READINESS_MAX_WAIT_MS")
                .unwrap_or(defaults.readiness_max_wait),
            agent_poll: duration_ms("RB_AGENT_POLL_MS").unwrap_or(defaults.agent_poll),
            agent_max_wait: duration_ms("RB_AGENT_MAX_WAIT_MS").unwrap_or(defaults.agent_max_wait),
            autofix_delay: duration_ms("RB_AUTOFIX_DELAY_MS").unwrap_or(defaults.autofix_delay),
            autofix_batch_pause: duration_ms("RB_AUTOFIX_BATCH_PAUSE_MS")
                .unwrap_or(defaults.autofix_batch_pause),
            autofix_batch_size: std::env::var("RB_AUTOFIX_BATCH_SIZE")
                .ok()
                .and_then(|s| s.parse::<usize>().ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.autofix_batch_size),
            patch_delay: duration_ms("RB_PATCH_DELAY_MS").unwrap_or(defaults.patch_delay),
        }
    }
}

fn duration_ms(var: &str) -> Option<Duration> {
    std::env::var(var).ok().and_then(|s| s.parse::<u64>().ok()).map(Duration::from_millis)
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
