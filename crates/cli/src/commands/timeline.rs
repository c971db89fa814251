// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `rb timeline` — replay a run's events with per-tool totals.

use std::io::Write;

use anyhow::Result;
use clap::Args;
use rb_engine::Timeline;

use crate::color;
use crate::output::{
    format_duration, format_offset, format_or_json, format_usd, write_table, OutputFormat,
};

#[derive(Args, Debug)]
pub struct TimelineArgs {
    /// Run id or unique prefix
    pub run_id: String,
}

pub async fn handle(args: TimelineArgs, format: OutputFormat) -> Result<()> {
    let ledger = super::open_ledger()?;
    let run_id = super::resolve_run(ledger.as_ref(), &args.run_id).await?;
    let timeline = rb_engine::timeline(ledger.as_ref(), &run_id).await?;
    format_or_json(format, &timeline, |out| render(&timeline, out))
}

pub(crate) fn render(timeline: &Timeline, out: &mut dyn Write) -> std::io::Result<()> {
    let run = &timeline.run;
    writeln!(
        out,
        "{} {} {} {}",
        color::header(run.id.as_str()),
        run.repo,
        color::status(run.status.as_str()),
        color::muted(run.branch_label.as_deref().unwrap_or("-")),
    )?;
    writeln!(
        out,
        "total {}  duration {}\n",
        format_usd(run.total_cost_usd),
        format_duration(run.duration_ms())
    )?;

    if timeline.events.is_empty() {
        return writeln!(out, "No events recorded");
    }

    let rows: Vec<Vec<String>> = timeline
        .events
        .iter()
        .map(|event| {
            vec![
                format_offset(event.offset_ms),
                event.tool.clone(),
                event.kind.to_string(),
                event.finding.map(|n| format!("#{n}")).unwrap_or_default(),
                if event.cost.event_cost_usd > 0.0 {
                    format_usd(event.cost.event_cost_usd)
                } else {
                    String::new()
                },
                event.detail.clone(),
            ]
        })
        .collect();
    write_table(out, &["OFFSET", "TOOL", "EVENT", "FINDING", "COST", "DETAIL"], &rows, |col, cell| {
        match col {
            0 => color::muted(cell),
            2 => color::status(cell),
            _ => cell.to_string(),
        }
    })?;

    writeln!(out)?;
    let rows: Vec<Vec<String>> = timeline
        .tools
        .iter()
        .map(|tool| {
            vec![
                tool.tool.clone(),
                tool.events.to_string(),
                tool.patches.to_string(),
                tool.skipped.to_string(),
                tool.errors.to_string(),
                format_usd(tool.cost_usd),
                format_offset(tool.last_offset_ms),
            ]
        })
        .collect();
    write_table(
        out,
        &["TOOL", "EVENTS", "PATCHES", "SKIPPED", "ERRORS", "COST", "LAST"],
        &rows,
        |_, cell| cell.to_string(),
    )
}

#[cfg(test)]
#[path = "timeline_tests.rs"]
mod tests;
