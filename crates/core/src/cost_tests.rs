// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use proptest::prelude::*;

#[yare::parameterized(
    anthropic = { Tool::Anthropic },
    openai    = { Tool::OpenAi },
    gemini    = { Tool::Gemini },
)]
fn zero_tokens_cost_nothing(tool: Tool) {
    let table = RateTable::default();
    assert_eq!(table.cost(tool, Usage::Tokens { input: 0, output: 0 }), 0.0);
}

#[test]
fn anthropic_call_cost() {
    let table = RateTable::default();
    // 12k in at $5/M + 3k out at $25/M = 0.06 + 0.075
    let cost = table.cost(Tool::Anthropic, Usage::Tokens { input: 12_000, output: 3_000 });
    assert!((cost - 0.135).abs() < 1e-9);
}

#[test]
fn token_cost_rounds_to_six_places() {
    // 1 token at $1.75/M = 0.00000175 → 0.000002
    assert_eq!(token_cost(1.75, 0.0, 1, 0), 0.000002);
}

#[yare::parameterized(
    absent   = { None, 0.0 },
    zero     = { Some(0.0), 0.0 },
    negative = { Some(-1.0), 0.0 },
    nan      = { Some(f64::NAN), 0.0 },
    some     = { Some(2.0), 4.5 },
)]
fn devin_usage_cost(units: Option<f64>, expected: f64) {
    let table = RateTable::default();
    assert_eq!(table.cost(Tool::Devin, Usage::Units(units)), expected);
}

#[test]
fn copilot_is_flat_per_request() {
    let table = RateTable::default();
    assert_eq!(table.cost(Tool::Copilot, Usage::Requests(3)), 0.12);
}

#[test]
fn mismatched_usage_is_free() {
    let table = RateTable::default();
    assert_eq!(table.cost(Tool::Copilot, Usage::Tokens { input: 10, output: 10 }), 0.0);
}

#[test]
fn model_only_for_token_tools() {
    let table = RateTable::default();
    assert_eq!(table.model(Tool::Anthropic), Some("claude-opus-4-6"));
    assert_eq!(table.model(Tool::Devin), None);
}

#[test]
fn toml_override_layers_on_defaults() {
    let table = RateTable::from_toml_str(
        r#"
version = "2026-03"

[rates.copilot]
kind = "per_request"
usd = 0.05

[rates.openai]
kind = "tokens"
model = "gpt-6"
input_per_mtok = 2.0
output_per_mtok = 10.0
"#,
    )
    .unwrap();

    assert_eq!(table.version, "2026-03");
    assert_eq!(table.cost(Tool::Copilot, Usage::Requests(2)), 0.1);
    assert_eq!(table.model(Tool::OpenAi), Some("gpt-6"));
    assert_eq!(table.model(Tool::Anthropic), Some("claude-opus-4-6"));
}

#[test]
fn toml_rejects_unknown_tool() {
    let err = RateTable::from_toml_str("[rates.cursor]\nkind = \"per_request\"\nusd = 1.0\n")
        .unwrap_err();
    assert!(matches!(err, RateTableError::UnknownTool(name) if name == "cursor"));
}

#[test]
fn toml_rejects_negative_rates() {
    let err = RateTable::from_toml_str("[rates.devin]\nkind = \"per_unit\"\nunit = \"acu\"\nusd = -1.0\n")
        .unwrap_err();
    assert!(matches!(err, RateTableError::Negative { tool: Tool::Devin }));
}

#[yare::parameterized(
    empty = { "", 0 },
    three = { "abc", 1 },
    four  = { "abcd", 1 },
    five  = { "abcde", 2 },
)]
fn estimate_tokens_rounds_up(text: &str, expected: u64) {
    assert_eq!(estimate_tokens(text), expected);
}

proptest! {
    #[test]
    fn token_cost_is_linear(input in 0u64..2_000_000, output in 0u64..2_000_000) {
        let single = token_cost(5.0, 25.0, input, output);
        let double = token_cost(5.0, 25.0, input * 2, output * 2);
        prop_assert!((double - 2.0 * single).abs() < 2e-6);
    }

    #[test]
    fn token_cost_is_stable(input in 0u64..5_000_000, output in 0u64..5_000_000) {
        prop_assert_eq!(token_cost(1.75, 14.0, input, output), token_cost(1.75, 14.0, input, output));
    }
}
