// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Static-analysis findings as reported by the alert source.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Severity tier. Security rules report `critical..low`; quality rules fall
/// back to the generic `error|warning|note` levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    Error,
    Warning,
    Note,
}

crate::simple_display! {
    Severity {
        Critical => "critical",
        High => "high",
        Medium => "medium",
        Low => "low",
        Error => "error",
        Warning => "warning",
        Note => "note",
    }
}

impl Severity {
    pub const ALL: [Severity; 7] = [
        Severity::Critical,
        Severity::High,
        Severity::Medium,
        Severity::Low,
        Severity::Error,
        Severity::Warning,
        Severity::Note,
    ];

    /// Parse a severity label; unknown or empty labels become `Note`.
    pub fn parse_lenient(s: &str) -> Severity {
        Severity::ALL
            .into_iter()
            .find(|sev| sev.as_str().eq_ignore_ascii_case(s.trim()))
            .unwrap_or(Severity::Note)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingState {
    Open,
    Fixed,
    Dismissed,
}

crate::simple_display! {
    FindingState {
        Open => "open",
        Fixed => "fixed",
        Dismissed => "dismissed",
    }
}

/// One static-analysis result on one branch snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    /// Unique within the source branch
    pub number: u64,
    pub rule_id: String,
    pub rule_description: String,
    pub severity: Severity,
    pub state: FindingState,
    /// Analyzer that produced the finding (e.g. `CodeQL`)
    pub analyzer: String,
    pub branch: String,
    pub file_path: String,
    pub start_line: u32,
    pub end_line: u32,
    pub message: String,
    pub html_url: String,
    pub created_at: DateTime<Utc>,
    pub dismissed_at: Option<DateTime<Utc>>,
    pub fixed_at: Option<DateTime<Utc>>,
}

impl Finding {
    pub fn is_open(&self) -> bool {
        self.state == FindingState::Open
    }
}

/// Finding numbers of `findings`, in order.
pub fn numbers(findings: &[Finding]) -> Vec<u64> {
    findings.iter().map(|f| f.number).collect()
}

/// `#1, #2, #3` label used in commit messages and event details.
pub fn number_refs(findings: &[Finding]) -> String {
    findings.iter().map(|f| format!("#{}", f.number)).collect::<Vec<_>>().join(", ")
}

crate::builder! {
    pub struct FindingBuilder => Finding {
        into {
            rule_id: String = "js/sql-injection",
            rule_description: String = "Database query built from user-controlled sources",
            analyzer: String = "CodeQL",
            branch: String = "main",
            file_path: String = "src/app.js",
            message: String = "This query depends on a user-provided value.",
            html_url: String = "https://github.com/acme/shop/security/code-scanning/1",
        }
        set {
            number: u64 = 1,
            severity: Severity = Severity::High,
            state: FindingState = FindingState::Open,
            start_line: u32 = 10,
            end_line: u32 = 12,
            created_at: DateTime<Utc> = DateTime::<Utc>::UNIX_EPOCH,
        }
        option {
            dismissed_at: DateTime<Utc> = None,
            fixed_at: DateTime<Utc> = None,
        }
    }
}

#[cfg(test)]
#[path = "finding_tests.rs"]
mod tests;
