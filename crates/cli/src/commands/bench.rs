// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `rb bench` — run one benchmark in-process; Ctrl-C cancels it.

use std::io::Write;

use anyhow::Result;
use clap::Args;
use rb_adapters::{DevinClient, GitHubClient, LlmClient, LlmProvider};
use rb_core::{RateTable, RunStatus, Severity, SystemClock, Tool};
use rb_engine::{Backends, BenchmarkRequest, Orchestrator, RunSummary, Timings};
use serde::Serialize;

use crate::color;
use crate::exit_error::{ExitError, EXIT_CANCELLED};
use crate::output::{format_or_json, format_usd, write_table, OutputFormat};

#[derive(Args, Debug)]
pub struct BenchArgs {
    /// Repository (owner/name)
    #[arg(long)]
    pub repo: String,

    /// Branch whose open findings are remediated
    #[arg(long = "baseline", default_value = "main")]
    pub baseline_branch: String,

    /// Tools to launch, in order (default: all)
    #[arg(long = "tool")]
    pub tools: Vec<Tool>,

    /// Only findings of these severities (default: all)
    #[arg(long = "severity", value_parser = parse_severity)]
    pub severities: Vec<Severity>,

    /// Only these finding numbers
    #[arg(long = "finding")]
    pub findings: Vec<u64>,

    /// Analysis ref recorded on the run
    #[arg(long)]
    pub scan_ref: Option<String>,

    /// Launch tools without waiting for analysis on the new branches
    #[arg(long)]
    pub no_wait: bool,
}

impl BenchArgs {
    pub fn into_request(self) -> BenchmarkRequest {
        let mut request = BenchmarkRequest::new(self.repo);
        request.baseline_branch = self.baseline_branch;
        if !self.tools.is_empty() {
            request.tools = self.tools;
        }
        request.severities = self.severities;
        if !self.findings.is_empty() {
            request.finding_numbers = Some(self.findings);
        }
        request.scan_ref = self.scan_ref;
        request.wait_for_analysis = !self.no_wait;
        request
    }
}

pub(crate) fn parse_severity(s: &str) -> Result<Severity, String> {
    Severity::ALL.into_iter().find(|sev| sev.as_str().eq_ignore_ascii_case(s.trim())).ok_or_else(
        || {
            let names: Vec<&str> = Severity::ALL.iter().map(|s| s.as_str()).collect();
            format!("unknown severity '{s}' (expected one of {})", names.join(", "))
        },
    )
}

/// Final report printed after a run ends
#[derive(Debug, Serialize)]
struct BenchReport {
    #[serde(flatten)]
    summary: RunSummary,
    total_cost_usd: f64,
}

pub async fn handle(args: BenchArgs, format: OutputFormat) -> Result<()> {
    let token = crate::env::github_token()
        .ok_or_else(|| ExitError::new(2, "GITHUB_TOKEN must be set to run a benchmark"))?;
    let rates = super::load_rates()?;
    let backends = Backends {
        source: GitHubClient::new(token)?,
        agent: DevinClient::new(crate::env::devin_api_key(), crate::env::devin_org_id())?,
        patches: patch_client(&rates)?,
    };
    let ledger = super::open_ledger()?;
    let orchestrator = Orchestrator::new(std::sync::Arc::clone(&ledger), backends, SystemClock)
        .with_timings(Timings::from_env())
        .with_rates(rates);

    let prepared = orchestrator.prepare(args.into_request()).await?;
    if format == OutputFormat::Text {
        let counts: Vec<String> =
            prepared.severity_counts().iter().map(|(sev, n)| format!("{n} {sev}")).collect();
        println!(
            "Run {} started: {} finding(s) ({})",
            color::header(prepared.run_id().as_str()),
            prepared.findings().len(),
            counts.join(", ")
        );
        for (tool, branch) in prepared.branches() {
            println!("  {:<10} {}", tool.as_str(), color::muted(branch));
        }
    }

    let handle = prepared.handle();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!(run_id = %handle.run_id, "interrupt received, cancelling run");
            handle.token.cancel();
        }
    });
    let summary = orchestrator.run(prepared).await;
    interrupt.abort();
    let summary = summary?;

    let total_cost_usd =
        ledger.get_run(&summary.run_id).await?.map(|run| run.total_cost_usd).unwrap_or_default();
    let status = summary.status;
    let report = BenchReport { summary, total_cost_usd };
    format_or_json(format, &report, |out| render(&report, out))?;

    match status {
        RunStatus::Cancelled => Err(ExitError::new(EXIT_CANCELLED, "run cancelled").into()),
        RunStatus::Failed => Err(ExitError::new(1, "run failed").into()),
        RunStatus::Completed | RunStatus::Running => Ok(()),
    }
}

/// LLM client with each provider's model taken from the rate table.
fn patch_client(rates: &RateTable) -> Result<LlmClient> {
    let mut client = LlmClient::new(crate::env::llm_keys())?;
    for tool in Tool::ALL {
        if let (Some(provider), Some(model)) = (LlmProvider::for_tool(tool), rates.model(tool)) {
            client = client.with_model(provider, model);
        }
    }
    Ok(client)
}

fn render(report: &BenchReport, out: &mut dyn Write) -> std::io::Result<()> {
    let summary = &report.summary;
    writeln!(
        out,
        "\nRun {} {}  total {}",
        summary.run_id,
        color::status(summary.status.as_str()),
        format_usd(report.total_cost_usd)
    )?;
    if let Some(gate) = &summary.gate {
        if gate.timed_out {
            let waiting: Vec<&str> = gate.not_ready.iter().map(|t| t.as_str()).collect();
            writeln!(out, "analysis gate timed out waiting for {}", waiting.join(", "))?;
        }
    }
    if summary.outcomes.is_empty() {
        return writeln!(out, "No tools ran");
    }
    let rows: Vec<Vec<String>> = summary
        .outcomes
        .iter()
        .map(|(tool, outcome)| {
            vec![
                tool.to_string(),
                outcome.completed.to_string(),
                outcome.failed.to_string(),
                outcome.skipped.to_string(),
            ]
        })
        .collect();
    write_table(out, &["TOOL", "COMPLETED", "FAILED", "SKIPPED"], &rows, |_, cell| {
        cell.to_string()
    })
}

#[cfg(test)]
#[path = "bench_tests.rs"]
mod tests;
