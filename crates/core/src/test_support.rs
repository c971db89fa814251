// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test helpers shared across crates (enabled by the `test-support` feature).

use crate::finding::Finding;

/// `n` findings in `path`, numbered from `first`.
pub fn findings_in(path: &str, first: u64, n: u64) -> Vec<Finding> {
    (first..first + n)
        .map(|number| {
            Finding::builder()
                .number(number)
                .file_path(path)
                .rule_id(format!("rule-{number}"))
                .html_url(format!("https://github.com/acme/shop/security/code-scanning/{number}"))
                .build()
        })
        .collect()
}

/// Baseline used by the end-to-end scenarios: file X holds #1 and #2,
/// file Y holds #3.
pub fn two_file_baseline() -> Vec<Finding> {
    let mut findings = findings_in("src/x.py", 1, 2);
    findings.extend(findings_in("src/y.py", 3, 1));
    findings
}

pub mod strategies {
    use crate::finding::{Finding, Severity};
    use proptest::prelude::*;

    pub fn arb_severity() -> impl Strategy<Value = Severity> {
        proptest::sample::select(Severity::ALL.to_vec())
    }

    /// Findings with unique numbers spread over a handful of files.
    pub fn arb_findings(
        len: std::ops::Range<usize>,
    ) -> impl Strategy<Value = Vec<Finding>> {
        proptest::collection::vec((0u8..6, arb_severity()), len).prop_map(|specs| {
            specs
                .into_iter()
                .enumerate()
                .map(|(i, (file, severity))| {
                    Finding::builder()
                        .number(i as u64 + 1)
                        .file_path(format!("src/file_{file}.rs"))
                        .severity(severity)
                        .build()
                })
                .collect()
        })
    }
}
