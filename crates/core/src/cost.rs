// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! USD cost model.
//!
//! Pure functions over a versioned [`RateTable`]. Rates are configuration:
//! a TOML override replaces individual tool entries without code changes.

use crate::tool::Tool;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Version label of the built-in rate table.
pub const DEFAULT_RATES_VERSION: &str = "2026-02";

/// Round a USD amount to 6 decimal places.
pub fn round_usd(usd: f64) -> f64 {
    (usd * 1_000_000.0).round() / 1_000_000.0
}

/// Token-priced cost: `in/1e6 × in_rate + out/1e6 × out_rate`, rounded.
pub fn token_cost(
    input_per_mtok: f64,
    output_per_mtok: f64,
    input_tokens: u64,
    output_tokens: u64,
) -> f64 {
    if input_tokens == 0 && output_tokens == 0 {
        return 0.0;
    }
    let input = input_tokens as f64 / 1_000_000.0 * input_per_mtok;
    let output = output_tokens as f64 / 1_000_000.0 * output_per_mtok;
    round_usd(input + output)
}

/// Flat-priced cost: `units × rate`.
pub fn flat_cost(units: u32, usd_per_unit: f64) -> f64 {
    round_usd(f64::from(units) * usd_per_unit)
}

/// Usage-metered cost; absent or non-positive usage is free.
pub fn usage_cost(units: Option<f64>, usd_per_unit: f64) -> f64 {
    match units {
        Some(u) if u > 0.0 && u.is_finite() => round_usd(u * usd_per_unit),
        _ => 0.0,
    }
}

/// Rough prompt size: one token per four characters, rounded up.
pub fn estimate_tokens(text: &str) -> u64 {
    (text.chars().count() as u64).div_ceil(4)
}

/// Pricing scheme for one tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Rate {
    Tokens { model: String, input_per_mtok: f64, output_per_mtok: f64 },
    PerRequest { usd: f64 },
    PerUnit { unit: String, usd: f64 },
}

/// Metered consumption reported by a backend.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Usage {
    Tokens { input: u64, output: u64 },
    Requests(u32),
    Units(Option<f64>),
}

#[derive(Debug, Error)]
pub enum RateTableError {
    #[error("invalid rate table: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("rate table names unknown tool '{0}'")]
    UnknownTool(String),
    #[error("rate for {tool} must not be negative")]
    Negative { tool: Tool },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RateTable {
    pub version: String,
    pub rates: BTreeMap<Tool, Rate>,
}

#[derive(Deserialize)]
struct RateFile {
    version: Option<String>,
    #[serde(default)]
    rates: BTreeMap<String, Rate>,
}

impl Default for RateTable {
    fn default() -> Self {
        let mut rates = BTreeMap::new();
        rates.insert(
            Tool::Anthropic,
            Rate::Tokens {
                model: "claude-opus-4-6".into(),
                input_per_mtok: 5.0,
                output_per_mtok: 25.0,
            },
        );
        rates.insert(
            Tool::OpenAi,
            Rate::Tokens {
                model: "gpt-5.3-codex".into(),
                input_per_mtok: 1.75,
                output_per_mtok: 14.0,
            },
        );
        rates.insert(
            Tool::Gemini,
            Rate::Tokens {
                model: "gemini-3.1-pro-preview".into(),
                input_per_mtok: 2.0,
                output_per_mtok: 12.0,
            },
        );
        rates.insert(Tool::Copilot, Rate::PerRequest { usd: 0.04 });
        rates.insert(Tool::Devin, Rate::PerUnit { unit: "acu".into(), usd: 2.25 });
        Self { version: DEFAULT_RATES_VERSION.to_string(), rates }
    }
}

impl RateTable {
    /// Parse a TOML override and layer it over the built-in table.
    ///
    /// ```toml
    /// version = "2026-03"
    /// [rates.copilot]
    /// kind = "per_request"
    /// usd = 0.05
    /// ```
    pub fn from_toml_str(content: &str) -> Result<Self, RateTableError> {
        let file: RateFile = toml::from_str(content)?;
        let mut table = Self::default();
        for (name, rate) in file.rates {
            let tool: Tool = name.parse().map_err(|_| RateTableError::UnknownTool(name))?;
            let negative = match &rate {
                Rate::Tokens { input_per_mtok, output_per_mtok, .. } => {
                    *input_per_mtok < 0.0 || *output_per_mtok < 0.0
                }
                Rate::PerRequest { usd } | Rate::PerUnit { usd, .. } => *usd < 0.0,
            };
            if negative {
                return Err(RateTableError::Negative { tool });
            }
            table.rates.insert(tool, rate);
        }
        if let Some(version) = file.version {
            table.version = version;
        }
        Ok(table)
    }

    pub fn rate(&self, tool: Tool) -> Option<&Rate> {
        self.rates.get(&tool)
    }

    /// Model name for token-priced tools.
    pub fn model(&self, tool: Tool) -> Option<&str> {
        match self.rate(tool)? {
            Rate::Tokens { model, .. } => Some(model),
            _ => None,
        }
    }

    /// Cost of `usage` under `tool`'s rate. Usage that does not match the
    /// tool's pricing scheme costs nothing.
    pub fn cost(&self, tool: Tool, usage: Usage) -> f64 {
        match (self.rate(tool), usage) {
            (
                Some(Rate::Tokens { input_per_mtok, output_per_mtok, .. }),
                Usage::Tokens { input, output },
            ) => token_cost(*input_per_mtok, *output_per_mtok, input, output),
            (Some(Rate::PerRequest { usd }), Usage::Requests(n)) => flat_cost(n, *usd),
            (Some(Rate::PerUnit { usd, .. }), Usage::Units(units)) => usage_cost(units, *usd),
            _ => 0.0,
        }
    }
}

#[cfg(test)]
#[path = "cost_tests.rs"]
mod tests;
