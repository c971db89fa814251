// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `rb runs` — list recorded runs, newest first.

use std::io::Write;

use anyhow::Result;
use clap::Args;
use rb_core::Run;

use crate::color;
use crate::output::{
    format_duration, format_time_ago, format_usd, handle_list, write_table, OutputFormat,
};

#[derive(Args, Debug)]
pub struct RunsArgs {
    /// Only runs against this repository (owner/name)
    #[arg(long)]
    pub repo: Option<String>,

    /// Maximum number of runs to show
    #[arg(short = 'n', long, default_value_t = 20)]
    pub limit: usize,
}

pub async fn handle(args: RunsArgs, format: OutputFormat) -> Result<()> {
    let ledger = super::open_ledger()?;
    let mut runs = ledger.list_runs(args.repo.as_deref()).await?;
    let total = runs.len();
    runs.truncate(args.limit);

    handle_list(format, &runs, "No runs recorded", |runs, out| {
        render(runs, out)?;
        if total > runs.len() {
            writeln!(out, "\n... {} more not shown. Use -n N to see more.", total - runs.len())?;
        }
        Ok(())
    })
}

pub(crate) fn render(runs: &[Run], out: &mut dyn Write) -> std::io::Result<()> {
    let rows: Vec<Vec<String>> = runs
        .iter()
        .map(|run| {
            let tools: Vec<&str> = run.tools.iter().map(|t| t.as_str()).collect();
            vec![
                run.id.to_string(),
                run.repo.clone(),
                run.status.to_string(),
                format_usd(run.total_cost_usd),
                format_duration(run.duration_ms()),
                format_time_ago(run.started_at_ms),
                tools.join(","),
            ]
        })
        .collect();
    write_table(
        out,
        &["ID", "REPO", "STATUS", "COST", "DURATION", "STARTED", "TOOLS"],
        &rows,
        |col, cell| match col {
            2 => color::status(cell),
            5 => color::muted(cell),
            _ => cell.to_string(),
        },
    )
}
