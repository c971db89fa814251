// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI command implementations

pub mod bench;
pub mod estimate;
pub mod jobs;
pub mod runs;
pub mod timeline;

use std::sync::Arc;

use anyhow::{Context, Result};
use rb_core::{RateTable, RunId};
use rb_storage::{LedgerStore, SqliteLedger};

use crate::exit_error::ExitError;

/// Open the SQLite ledger at the configured path, creating it if needed.
pub(crate) fn open_ledger() -> Result<Arc<dyn LedgerStore>> {
    let path = crate::env::db_path()?;
    let ledger = SqliteLedger::open(&path)
        .with_context(|| format!("failed to open ledger at {}", path.display()))?;
    tracing::debug!(path = %path.display(), "ledger opened");
    Ok(Arc::new(ledger))
}

/// Built-in rates, layered with `RB_RATES_FILE` when set.
pub(crate) fn load_rates() -> Result<RateTable> {
    let Some(path) = crate::env::rates_file() else {
        return Ok(RateTable::default());
    };
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read rate table {}", path.display()))?;
    let table = RateTable::from_toml_str(&content)?;
    tracing::debug!(path = %path.display(), version = %table.version, "rate table loaded");
    Ok(table)
}

/// Resolve a full run id or a unique prefix of one.
pub(crate) async fn resolve_run(ledger: &dyn LedgerStore, id: &str) -> Result<RunId> {
    let exact = RunId::from_string(id);
    if ledger.get_run(&exact).await?.is_some() {
        return Ok(exact);
    }

    let runs = ledger.list_runs(None).await?;
    let matches: Vec<&RunId> = runs
        .iter()
        .map(|r| &r.id)
        .filter(|rid| rid.as_str().starts_with(id) || rid.suffix().starts_with(id))
        .collect();
    match matches.as_slice() {
        [one] => Ok((*one).clone()),
        [] => Err(ExitError::new(1, format!("run not found: {id}")).into()),
        many => Err(ExitError::new(
            1,
            format!("ambiguous run id '{id}' matches {} runs", many.len()),
        )
        .into()),
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
