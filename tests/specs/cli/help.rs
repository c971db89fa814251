// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI help output specs

use crate::prelude::*;

#[test]
fn rb_binary_is_found_in_the_target_dir() {
    let path = rb_binary();
    assert!(path.is_file(), "{}", path.display());
    assert_eq!(path.file_stem().and_then(|s| s.to_str()), Some("rb"));
}

#[test]
fn rb_help_lists_commands() {
    cli()
        .args(&["--help"])
        .passes()
        .stdout_has("Usage:")
        .stdout_has("bench")
        .stdout_has("timeline")
        .stdout_has("estimate");
}

#[test]
fn rb_bench_help_shows_selection_flags() {
    cli()
        .args(&["bench", "--help"])
        .passes()
        .stdout_has("--baseline")
        .stdout_has("--severity")
        .stdout_has("--no-wait");
}

#[test]
fn rb_version_shows_version() {
    cli().args(&["--version"]).passes().stdout_has("0.2");
}

#[test]
fn rb_without_command_fails() {
    cli().fails().code_is(2).stderr_has("Usage:");
}
