// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::io::Write;

use clap::ValueEnum;
use serde::Serialize;

#[cfg(test)]
#[path = "output_tests.rs"]
mod tests;

#[derive(Clone, Copy, Debug, Default, PartialEq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Format a timestamp as relative time (e.g., "5s", "2m", "1h", "3d")
pub fn format_time_ago(epoch_ms: u64) -> String {
    let now_ms = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64;
    format_time_between(epoch_ms, now_ms)
}

fn format_time_between(epoch_ms: u64, now_ms: u64) -> String {
    if epoch_ms == 0 {
        return "-".to_string();
    }
    format_elapsed(now_ms.saturating_sub(epoch_ms) / 1000)
}

/// Coarsest unit only: "45s", "12m", "3h", "2d"
pub fn format_elapsed(secs: u64) -> String {
    match secs {
        0..=59 => format!("{secs}s"),
        60..=3599 => format!("{}m", secs / 60),
        3600..=86_399 => format!("{}h", secs / 3600),
        _ => format!("{}d", secs / 86_400),
    }
}

/// Replay offset as `m:ss.mmm`
pub fn format_offset(offset_ms: u64) -> String {
    let secs = offset_ms / 1000;
    format!("{}:{:02}.{:03}", secs / 60, secs % 60, offset_ms % 1000)
}

pub fn format_usd(usd: f64) -> String {
    format!("${usd:.4}")
}

pub fn format_duration(duration_ms: Option<u64>) -> String {
    match duration_ms {
        Some(ms) => format_elapsed(ms / 1000),
        None => "-".to_string(),
    }
}

/// Render a list as text table or JSON. Handles empty check + format branch.
pub fn handle_list<T: Serialize>(
    format: OutputFormat,
    items: &[T],
    empty_msg: &str,
    render_text: impl FnOnce(&[T], &mut dyn Write) -> std::io::Result<()>,
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(items)?);
        }
        OutputFormat::Text => {
            if items.is_empty() {
                println!("{}", empty_msg);
            } else {
                render_text(items, &mut std::io::stdout())?;
            }
        }
    }
    Ok(())
}

/// Format-branch helper for single values.
///
/// Renders as JSON when `format` is `Json`, otherwise calls `text_fn`.
pub fn format_or_json<T: Serialize>(
    format: OutputFormat,
    data: &T,
    text_fn: impl FnOnce(&mut dyn Write) -> std::io::Result<()>,
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(data)?);
        }
        OutputFormat::Text => {
            text_fn(&mut std::io::stdout())?;
        }
    }
    Ok(())
}

/// Left-aligned columns sized to the widest cell, two spaces apart.
///
/// Widths are measured before coloring; pass plain cells and a painter.
pub fn write_table(
    out: &mut dyn Write,
    headers: &[&str],
    rows: &[Vec<String>],
    paint: impl Fn(usize, &str) -> String,
) -> std::io::Result<()> {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(w) = widths.get_mut(i) {
                *w = (*w).max(cell.chars().count());
            }
        }
    }

    let last = headers.len().saturating_sub(1);
    let mut line = String::new();
    for (i, header) in headers.iter().enumerate() {
        let cell = if i == last { header.to_string() } else { format!("{:<w$}  ", header, w = widths[i]) };
        line.push_str(&crate::color::header(&cell));
    }
    writeln!(out, "{}", line.trim_end())?;

    for row in rows {
        let mut line = String::new();
        for (i, cell) in row.iter().enumerate() {
            let pad = widths.get(i).copied().unwrap_or(0).saturating_sub(cell.chars().count());
            line.push_str(&paint(i, cell));
            if i != last {
                line.push_str(&" ".repeat(pad + 2));
            }
        }
        writeln!(out, "{}", line.trim_end())?;
    }
    Ok(())
}
