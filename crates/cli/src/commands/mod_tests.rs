// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use rb_core::{Run, Tool};
use rb_storage::MemoryLedger;
use serial_test::serial;

async fn ledger_with(ids: &[&str]) -> MemoryLedger {
    let ledger = MemoryLedger::new();
    for id in ids {
        let mut run = Run::new("acme/shop", vec![Tool::Copilot], None, None, 1_000);
        run.id = RunId::from_string(*id);
        ledger.create_run(&run).await.unwrap();
    }
    ledger
}

#[tokio::test]
async fn resolves_exact_id_and_unique_prefix() {
    let ledger = ledger_with(&["run-abc123", "run-xyz789"]).await;

    assert_eq!(resolve_run(&ledger, "run-abc123").await.unwrap(), "run-abc123");
    assert_eq!(resolve_run(&ledger, "xyz").await.unwrap(), "run-xyz789");
    assert_eq!(resolve_run(&ledger, "run-ab").await.unwrap(), "run-abc123");
}

#[tokio::test]
async fn unknown_and_ambiguous_prefixes_are_exit_errors() {
    let ledger = ledger_with(&["run-abc123", "run-abd456"]).await;

    let missing = resolve_run(&ledger, "zzz").await.unwrap_err();
    assert_eq!(missing.downcast_ref::<ExitError>().unwrap().message, "run not found: zzz");

    let ambiguous = resolve_run(&ledger, "ab").await.unwrap_err();
    assert!(ambiguous.to_string().contains("matches 2 runs"));
}

#[test]
#[serial]
fn rates_file_overrides_builtin_table() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rates.toml");
    std::fs::write(&path, "version = \"2026-03\"\n[rates.copilot]\nkind = \"per_request\"\nusd = 0.05\n")
        .unwrap();
    std::env::set_var("RB_RATES_FILE", &path);

    let table = load_rates().unwrap();

    assert_eq!(table.version, "2026-03");
    assert!((table.cost(Tool::Copilot, rb_core::Usage::Requests(2)) - 0.10).abs() < 1e-9);
    std::env::remove_var("RB_RATES_FILE");
}

#[test]
#[serial]
fn unreadable_rates_file_is_an_error() {
    std::env::set_var("RB_RATES_FILE", "/nonexistent/rates.toml");
    let err = load_rates().unwrap_err();
    assert!(err.to_string().contains("failed to read rate table"));
    std::env::remove_var("RB_RATES_FILE");
}
