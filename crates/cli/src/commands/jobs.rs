// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `rb jobs` — remediation jobs recorded for a repository.

use std::io::Write;

use anyhow::Result;
use clap::Args;
use rb_core::{truncate, RemediationJob, Tool};

use crate::color;
use crate::output::{format_time_ago, handle_list, write_table, OutputFormat};

const ERROR_COLUMN_CHARS: usize = 60;

#[derive(Args, Debug)]
pub struct JobsArgs {
    /// Repository (owner/name)
    #[arg(long)]
    pub repo: String,

    /// Only jobs for this tool
    #[arg(long)]
    pub tool: Option<Tool>,
}

pub async fn handle(args: JobsArgs, format: OutputFormat) -> Result<()> {
    let ledger = super::open_ledger()?;
    let jobs = ledger.list_jobs(&args.repo, args.tool).await?;
    let empty = format!("No jobs recorded for {}", args.repo);
    handle_list(format, &jobs, &empty, render)
}

pub(crate) fn render(jobs: &[RemediationJob], out: &mut dyn Write) -> std::io::Result<()> {
    let rows: Vec<Vec<String>> = jobs
        .iter()
        .map(|job| {
            let findings: Vec<String> = job.findings.iter().map(|n| format!("#{n}")).collect();
            vec![
                job.id.short(8).to_string(),
                job.tool.to_string(),
                job.status.to_string(),
                job.file_path.clone(),
                findings.join(","),
                job.commit_ref
                    .as_deref()
                    .map(|c| truncate(c, 7).to_string())
                    .unwrap_or_else(|| "-".to_string()),
                format_time_ago(job.updated_at_ms),
                job.error
                    .as_deref()
                    .map(|e| truncate(e, ERROR_COLUMN_CHARS).to_string())
                    .unwrap_or_default(),
            ]
        })
        .collect();
    write_table(
        out,
        &["JOB", "TOOL", "STATUS", "FILE", "FINDINGS", "COMMIT", "UPDATED", "ERROR"],
        &rows,
        |col, cell| match col {
            2 => color::status(cell),
            6 => color::muted(cell),
            _ => cell.to_string(),
        },
    )
}
