// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Alert grouping by target file.
//!
//! The unit of remediation work is `(tool, file)`: two prompts never patch the
//! same file in one run, and a file with several findings gets one combined
//! request.

use crate::finding::Finding;
use indexmap::IndexMap;

/// Group findings by `file_path`.
///
/// Groups appear in order of first discovery and each group keeps the input
/// order of its findings. Every finding lands in exactly one group and no group
/// is empty.
pub fn group_by_file(findings: &[Finding]) -> IndexMap<String, Vec<Finding>> {
    let mut groups: IndexMap<String, Vec<Finding>> = IndexMap::new();
    for finding in findings {
        groups.entry(finding.file_path.clone()).or_default().push(finding.clone());
    }
    groups
}

/// Split file groups into batches of at most `batch_size` groups.
///
/// A `batch_size` of zero is treated as one.
pub fn batches(
    groups: &IndexMap<String, Vec<Finding>>,
    batch_size: usize,
) -> Vec<Vec<(&String, &Vec<Finding>)>> {
    let size = batch_size.max(1);
    let entries: Vec<_> = groups.iter().collect();
    entries.chunks(size).map(|chunk| chunk.to_vec()).collect()
}

#[cfg(test)]
#[path = "group_tests.rs"]
mod tests;
