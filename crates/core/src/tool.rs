// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Remediation tools and the worker family each one belongs to.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Tool name used for events emitted by the orchestrator itself
/// (readiness gate, run-level cancellation).
pub const ORCHESTRATOR_SOURCE: &str = "benchmark";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tool {
    Devin,
    Copilot,
    Anthropic,
    #[serde(rename = "openai")]
    OpenAi,
    Gemini,
}

crate::simple_display! {
    Tool {
        Devin => "devin",
        Copilot => "copilot",
        Anthropic => "anthropic",
        OpenAi => "openai",
        Gemini => "gemini",
    }
}

/// Worker variant that drives a tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolFamily {
    /// Long-lived autonomous agent session, usage metered
    AgentSession,
    /// Alert-source native autofix, priced per request
    NativeAutofix,
    /// One-shot LLM patch generation, priced per token
    PatchGenerator,
}

crate::simple_display! {
    ToolFamily {
        AgentSession => "agent_session",
        NativeAutofix => "native_autofix",
        PatchGenerator => "patch_generator",
    }
}

impl Tool {
    /// Every tool, in launch order.
    pub const ALL: [Tool; 5] =
        [Tool::Devin, Tool::Copilot, Tool::Anthropic, Tool::OpenAi, Tool::Gemini];

    pub fn family(&self) -> ToolFamily {
        match self {
            Tool::Devin => ToolFamily::AgentSession,
            Tool::Copilot => ToolFamily::NativeAutofix,
            Tool::Anthropic | Tool::OpenAi | Tool::Gemini => ToolFamily::PatchGenerator,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown tool '{0}' (expected one of devin, copilot, anthropic, openai, gemini)")]
pub struct UnknownTool(pub String);

impl FromStr for Tool {
    type Err = UnknownTool;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Tool::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownTool(s.to_string()))
    }
}

#[cfg(test)]
#[path = "tool_tests.rs"]
mod tests;
