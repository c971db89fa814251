// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the CLI crate.

use std::path::PathBuf;

use rb_adapters::LlmKeys;

/// Resolve state directory: RB_STATE_DIR > XDG_STATE_HOME/rb > ~/.local/state/rb
pub fn state_dir() -> anyhow::Result<PathBuf> {
    if let Some(dir) = non_empty("RB_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Some(xdg) = non_empty("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("rb"));
    }
    let home = non_empty("HOME")
        .ok_or_else(|| anyhow::anyhow!("cannot locate state directory: HOME is not set"))?;
    Ok(PathBuf::from(home).join(".local/state/rb"))
}

/// Ledger database: RB_DB_PATH > <state>/ledger.db
pub fn db_path() -> anyhow::Result<PathBuf> {
    match non_empty("RB_DB_PATH") {
        Some(path) => Ok(PathBuf::from(path)),
        None => Ok(state_dir()?.join("ledger.db")),
    }
}

/// Optional TOML rate table layered over the built-in rates
pub fn rates_file() -> Option<PathBuf> {
    non_empty("RB_RATES_FILE").map(PathBuf::from)
}

/// Log filter directives: RB_LOG > RUST_LOG
pub fn log_filter() -> Option<String> {
    non_empty("RB_LOG").or_else(|| non_empty("RUST_LOG"))
}

pub fn github_token() -> Option<String> {
    non_empty("GITHUB_TOKEN")
}

pub fn devin_api_key() -> Option<String> {
    non_empty("DEVIN_API_KEY")
}

pub fn devin_org_id() -> Option<String> {
    non_empty("DEVIN_ORG_ID")
}

pub fn llm_keys() -> LlmKeys {
    LlmKeys {
        anthropic: non_empty("ANTHROPIC_API_KEY"),
        openai: non_empty("OPENAI_API_KEY"),
        gemini: non_empty("GEMINI_API_KEY"),
    }
}

fn non_empty(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|s| !s.trim().is_empty())
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
