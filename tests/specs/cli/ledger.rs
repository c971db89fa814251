// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ledger queries against a fresh state directory

use crate::prelude::*;

#[test]
fn runs_on_empty_ledger() {
    cli().args(&["runs"]).passes().stdout_has("No runs recorded");
    let out = cli().args(&["runs", "-o", "json"]).passes();
    assert_eq!(out.json(), serde_json::json!([]));
}

#[test]
fn ledger_is_created_under_state_dir() {
    let cmd = cli().args(&["runs"]);
    let db = cmd.state_dir().join("ledger.db");
    let _out = cmd.passes();
    assert!(db.exists());
}

#[test]
fn jobs_on_empty_ledger() {
    cli()
        .args(&["jobs", "--repo", "acme/shop", "--tool", "devin"])
        .passes()
        .stdout_has("No jobs recorded for acme/shop");
}

#[test]
fn timeline_of_unknown_run_fails() {
    cli().args(&["timeline", "run-missing"]).fails().code_is(1).stderr_has("run not found");
}
