// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `rb estimate` specs

use crate::prelude::*;
use similar_asserts::assert_eq;

#[test]
fn token_estimate_in_text() {
    cli()
        .args(&["estimate", "--tool", "anthropic", "--input-tokens", "2000", "--output-tokens", "400"])
        .passes()
        .stdout_has("anthropic (claude-opus-4-6)")
        .stdout_has("$0.0200");
}

#[test]
fn request_estimate_as_json() {
    let out = cli().args(&["estimate", "--tool", "copilot", "--requests", "3", "-o", "json"]).passes();

    let value = out.json();
    assert_eq!(value["usage"], serde_json::json!({ "kind": "requests", "count": 3 }));
    assert!((value["cost_usd"].as_f64().unwrap() - 0.12).abs() < 1e-9);
}

#[test]
fn rates_file_overrides_builtin_prices() {
    let cmd = cli();
    let rates = cmd.file("rates.toml", "version = \"2026-03\"\n[rates.copilot]\nkind = \"per_request\"\nusd = 0.05\n");

    cmd.env("RB_RATES_FILE", &rates)
        .args(&["estimate", "--tool", "copilot"])
        .passes()
        .stdout_has("$0.0500")
        .stdout_has("rates 2026-03");
}

#[test]
fn unknown_tool_is_a_usage_error() {
    cli().args(&["estimate", "--tool", "cursor"]).fails().code_is(2).stderr_has("unknown tool");
}
