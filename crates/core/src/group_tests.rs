// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_support::strategies::arb_findings;
use proptest::prelude::*;

fn finding(number: u64, path: &str) -> Finding {
    Finding::builder().number(number).file_path(path).build()
}

#[test]
fn groups_follow_discovery_order() {
    let findings =
        vec![finding(1, "x.py"), finding(3, "y.py"), finding(2, "x.py"), finding(4, "z.py")];

    let groups = group_by_file(&findings);

    let paths: Vec<_> = groups.keys().cloned().collect();
    assert_eq!(paths, vec!["x.py", "y.py", "z.py"]);
    let x: Vec<_> = groups["x.py"].iter().map(|f| f.number).collect();
    assert_eq!(x, vec![1, 2]);
}

#[test]
fn empty_input_yields_no_groups() {
    assert!(group_by_file(&[]).is_empty());
}

#[yare::parameterized(
    exact     = { 4, 2, vec![2, 2] },
    remainder = { 5, 2, vec![2, 2, 1] },
    one_batch = { 3, 10, vec![3] },
    zero_size = { 2, 0, vec![1, 1] },
)]
fn batches_respect_size(files: usize, size: usize, expected: Vec<usize>) {
    let findings: Vec<_> = (0..files).map(|i| finding(i as u64, &format!("f{i}.rs"))).collect();
    let groups = group_by_file(&findings);

    let sizes: Vec<_> = batches(&groups, size).iter().map(|b| b.len()).collect();

    assert_eq!(sizes, expected);
}

proptest! {
    #[test]
    fn grouping_partitions_input(findings in arb_findings(0..40)) {
        let groups = group_by_file(&findings);

        let total: usize = groups.values().map(Vec::len).sum();
        prop_assert_eq!(total, findings.len());
        prop_assert!(groups.values().all(|g| !g.is_empty()));
        for (path, group) in &groups {
            prop_assert!(group.iter().all(|f| &f.file_path == path));
        }
        for f in &findings {
            let hits = groups.values().flatten().filter(|g| g.number == f.number).count();
            prop_assert_eq!(hits, 1);
        }
    }
}
