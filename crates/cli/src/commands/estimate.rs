// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `rb estimate` — price a hypothetical tool call with the active rate table.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use rb_core::cost::estimate_tokens;
use rb_core::{RateTable, Tool, ToolFamily, Usage};
use serde::Serialize;

use crate::output::{format_or_json, format_usd, OutputFormat};

#[derive(Args, Debug)]
pub struct EstimateArgs {
    /// Tool whose rate applies
    #[arg(long)]
    pub tool: Tool,

    /// Prompt tokens (patch tools)
    #[arg(long)]
    pub input_tokens: Option<u64>,

    /// Completion tokens (patch tools)
    #[arg(long, default_value_t = 0)]
    pub output_tokens: u64,

    /// Size the prompt from a file at four characters per token
    #[arg(long, conflicts_with = "input_tokens")]
    pub prompt_file: Option<PathBuf>,

    /// Billed requests (autofix)
    #[arg(long, default_value_t = 1)]
    pub requests: u32,

    /// Metered usage units (agent sessions)
    #[arg(long)]
    pub units: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Estimate {
    pub tool: Tool,
    pub model: Option<String>,
    pub usage: UsageView,
    pub cost_usd: f64,
    pub rates_version: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UsageView {
    Tokens { input: u64, output: u64 },
    Requests { count: u32 },
    Units { units: Option<f64> },
}

impl From<UsageView> for Usage {
    fn from(view: UsageView) -> Self {
        match view {
            UsageView::Tokens { input, output } => Usage::Tokens { input, output },
            UsageView::Requests { count } => Usage::Requests(count),
            UsageView::Units { units } => Usage::Units(units),
        }
    }
}

pub fn handle(args: EstimateArgs, format: OutputFormat) -> Result<()> {
    let rates = super::load_rates()?;
    let prompt = match &args.prompt_file {
        Some(path) => Some(
            std::fs::read_to_string(path)
                .with_context(|| format!("failed to read prompt {}", path.display()))?,
        ),
        None => None,
    };
    let estimate = estimate(&rates, &args, prompt.as_deref());

    format_or_json(format, &estimate, |out| {
        let usage = match estimate.usage {
            UsageView::Tokens { input, output } => format!("{input} in / {output} out tokens"),
            UsageView::Requests { count } => format!("{count} request(s)"),
            UsageView::Units { units: Some(u) } => format!("{u} unit(s)"),
            UsageView::Units { units: None } => "no usage reported".to_string(),
        };
        let model = estimate.model.as_deref().map(|m| format!(" ({m})")).unwrap_or_default();
        writeln!(out, "{}{}: {} = {}", estimate.tool, model, usage, format_usd(estimate.cost_usd))?;
        writeln!(out, "{}", crate::color::muted(&format!("rates {}", estimate.rates_version)))
    })
}

/// Usage follows the tool's pricing scheme; flags for other schemes are ignored.
pub fn estimate(rates: &RateTable, args: &EstimateArgs, prompt: Option<&str>) -> Estimate {
    let usage = match args.tool.family() {
        ToolFamily::PatchGenerator => UsageView::Tokens {
            input: args.input_tokens.or_else(|| prompt.map(estimate_tokens)).unwrap_or(0),
            output: args.output_tokens,
        },
        ToolFamily::NativeAutofix => UsageView::Requests { count: args.requests },
        ToolFamily::AgentSession => UsageView::Units { units: args.units },
    };
    Estimate {
        tool: args.tool,
        model: rates.model(args.tool).map(str::to_string),
        usage,
        cost_usd: rates.cost(args.tool, usage.into()),
        rates_version: rates.version.clone(),
    }
}

#[cfg(test)]
#[path = "estimate_tests.rs"]
mod tests;
