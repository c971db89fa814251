// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[yare::parameterized(
    devin     = { Tool::Devin, ToolFamily::AgentSession },
    copilot   = { Tool::Copilot, ToolFamily::NativeAutofix },
    anthropic = { Tool::Anthropic, ToolFamily::PatchGenerator },
    openai    = { Tool::OpenAi, ToolFamily::PatchGenerator },
    gemini    = { Tool::Gemini, ToolFamily::PatchGenerator },
)]
fn family_of(tool: Tool, family: ToolFamily) {
    assert_eq!(tool.family(), family);
}

#[test]
fn parse_round_trips_display() {
    for tool in Tool::ALL {
        assert_eq!(tool.to_string().parse::<Tool>().unwrap(), tool);
    }
}

#[test]
fn parse_is_case_insensitive() {
    assert_eq!("OpenAI".parse::<Tool>().unwrap(), Tool::OpenAi);
}

#[test]
fn parse_rejects_unknown() {
    let err = "cursor".parse::<Tool>().unwrap_err();
    assert!(err.to_string().contains("cursor"));
}

#[test]
fn serde_uses_wire_names() {
    assert_eq!(serde_json::to_string(&Tool::OpenAi).unwrap(), "\"openai\"");
    assert_eq!(serde_json::from_str::<Tool>("\"devin\"").unwrap(), Tool::Devin);
}
