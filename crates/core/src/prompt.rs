// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Remediation prompt builders.
//!
//! Patch generators receive the whole source file and must answer with the
//! complete fixed file. Agent sessions receive instructions to fix and push to
//! the benchmark branch themselves.

use crate::finding::{number_refs, Finding};
use std::fmt::Write;

/// Prompt for a single finding in `file_content`.
pub fn patch_prompt(finding: &Finding, file_content: &str) -> String {
    format!(
        "You are a security engineer. Fix the following vulnerability in the source code.\n\n\
         ## Alert Details\n\
         - Rule: {rule}\n\
         - Severity: {severity}\n\
         - Description: {description}\n\
         - Message: {message}\n\
         - File: {path}\n\
         - Lines: {start}-{end}\n\n\
         ## Source File ({path})\n\
         ```\n{content}\n```\n\n\
         Return ONLY the complete fixed file content. Do not include explanations.",
        rule = finding.rule_id,
        severity = finding.severity,
        description = finding.rule_description,
        message = finding.message,
        path = finding.file_path,
        start = finding.start_line,
        end = finding.end_line,
        content = file_content,
    )
}

/// One combined prompt for every finding in one file.
pub fn grouped_patch_prompt(file_path: &str, file_content: &str, findings: &[Finding]) -> String {
    let sections = findings
        .iter()
        .enumerate()
        .map(|(i, f)| {
            format!(
                "### Alert {}\n- Rule: {}\n- Severity: {}\n- Description: {}\n- Message: {}\n- Lines: {}-{}",
                i + 1,
                f.rule_id,
                f.severity,
                f.rule_description,
                f.message,
                f.start_line,
                f.end_line
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");
    format!(
        "You are a security engineer. Fix ALL of the following vulnerabilities in the source file below.\n\n\
         ## Alerts to Fix\n\n{sections}\n\n\
         ## Source File ({file_path})\n\
         ```\n{file_content}\n```\n\n\
         Return ONLY the complete fixed file content that addresses ALL of the above alerts. \
         Do not include explanations."
    )
}

/// Single or grouped patch prompt, depending on group size.
pub fn file_group_prompt(file_path: &str, file_content: &str, findings: &[Finding]) -> String {
    match findings {
        [single] => patch_prompt(single, file_content),
        _ => grouped_patch_prompt(file_path, file_content, findings),
    }
}

/// Opening instructions for an agent session on one file group.
pub fn agent_session_prompt(repo: &str, branch: &str, findings: &[Finding]) -> String {
    let body = match findings {
        [single] => format!(
            "Fix a CodeQL security finding in the repository `{repo}` on branch `{branch}`.\n\n{}",
            finding_block(single)
        ),
        _ => format!(
            "Fix {} CodeQL security findings in the repository `{repo}` on branch `{branch}`.\n\n{}",
            findings.len(),
            grouped_block(findings)
        ),
    };
    let steps = agent_steps(
        &format!("Clone the repo and checkout the `{branch}` branch"),
        branch,
        findings,
    );
    format!("{body}\n\n{steps}")
}

/// Follow-up instructions sent to an idle session for the next file group.
pub fn agent_followup_prompt(branch: &str, findings: &[Finding]) -> String {
    let body = match findings {
        [single] => format!(
            "Great work! Now fix the next CodeQL finding on the same branch `{branch}`.\n\n{}",
            finding_block(single)
        ),
        _ => format!(
            "Great work! Now fix {} more CodeQL findings on the same branch `{branch}`.\n\n{}",
            findings.len(),
            grouped_block(findings)
        ),
    };
    let steps =
        agent_steps(&format!("Make sure you're on the `{branch}` branch"), branch, findings);
    format!("{body}\n\n{steps}")
}

fn finding_block(f: &Finding) -> String {
    format!(
        "**Alert #{}**: {}\n**Description**: {}\n**Severity**: {}\n**File**: `{}` (lines {}-{})\n**Message**: {}",
        f.number, f.rule_id, f.rule_description, f.severity, f.file_path, f.start_line, f.end_line, f.message
    )
}

fn grouped_block(findings: &[Finding]) -> String {
    let path = findings.first().map(|f| f.file_path.as_str()).unwrap_or_default();
    let mut out = format!("All alerts are in the same file: `{path}`\n\n");
    let sections = findings
        .iter()
        .map(|f| {
            format!(
                "- **Alert #{}**: {}\n  Description: {}\n  Severity: {}\n  Lines: {}-{}\n  Message: {}",
                f.number, f.rule_id, f.rule_description, f.severity, f.start_line, f.end_line, f.message
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");
    out.push_str(&sections);
    out
}

fn agent_steps(first_step: &str, branch: &str, findings: &[Finding]) -> String {
    let mut out = String::from("Instructions:\n");
    let _ = writeln!(out, "1. {first_step}");
    match findings {
        [_] => {
            out.push_str("2. Read the affected file and understand the vulnerability\n");
            out.push_str("3. Fix the security issue following best practices\n");
            out.push_str("4. Make sure the fix doesn't break existing functionality\n");
        }
        _ => {
            let path = findings.first().map(|f| f.file_path.as_str()).unwrap_or_default();
            let _ = writeln!(
                out,
                "2. Read `{path}` and understand all {} vulnerabilities (alerts {})",
                findings.len(),
                number_refs(findings)
            );
            out.push_str("3. Fix ALL security issues in a single edit\n");
            out.push_str("4. Make sure the fixes don't break existing functionality\n");
        }
    }
    let _ = writeln!(out, "5. Commit and push directly to the `{branch}` branch");
    out.push_str("6. Do NOT create a PR; push directly to the branch\n\n");
    out.push_str("Address the root cause, not just the warning.");
    out
}

#[cfg(test)]
#[path = "prompt_tests.rs"]
mod tests;
