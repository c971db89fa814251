// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `rb bench` argument and configuration specs

use crate::prelude::*;

#[test]
fn bench_requires_github_token() {
    cli()
        .args(&["bench", "--repo", "acme/shop"])
        .fails()
        .code_is(2)
        .stderr_has("GITHUB_TOKEN");
}

#[test]
fn bench_rejects_unknown_severity() {
    cli()
        .args(&["bench", "--repo", "acme/shop", "--severity", "urgent"])
        .fails()
        .code_is(2)
        .stderr_has("unknown severity");
}

#[test]
fn bench_requires_repo() {
    cli().args(&["bench"]).fails().code_is(2).stderr_has("--repo");
}
