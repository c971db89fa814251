// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn cancel_sets_the_registered_token() {
    let registry = RunRegistry::new();
    let run_id = RunId::new();
    let token = registry.register(&run_id);

    assert!(registry.cancel(&run_id));
    assert!(token.is_cancelled());
}

#[test]
fn cancel_unknown_run_is_false() {
    let registry = RunRegistry::new();
    assert!(!registry.cancel(&RunId::from_string("run-nope")));
}

#[test]
fn registration_drop_removes_entry() {
    let registry = RunRegistry::new();
    let run_id = RunId::new();
    let token = registry.register(&run_id);

    drop(Registration::new(registry.clone(), run_id.clone()));

    assert!(registry.active().is_empty());
    assert!(!registry.cancel(&run_id));
    assert!(!token.is_cancelled());
}

#[test]
fn clones_share_entries() {
    let registry = RunRegistry::new();
    let run_id = RunId::new();
    let token = registry.clone().register(&run_id);

    assert!(registry.token(&run_id).is_some());
    registry.clone().cancel(&run_id);
    assert!(token.is_cancelled());
}
