// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::{AlertSource, AutofixStatus};
use crate::BackendError;
use async_trait::async_trait;
use parking_lot::Mutex;
use rb_core::{Finding, FindingState};
use std::collections::HashMap;
use std::sync::Arc;

/// Recorded alert-source call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceCall {
    ListFindings { branch: String },
    CreateBranch { branch: String, from: String },
    BranchHead { branch: String },
    CommitsSince { branch: String, since: String },
    GetFile { path: String, branch: String },
    WriteFile { path: String, branch: String, message: String },
    TriggerAutofix { number: u64 },
    PollAutofix { number: u64 },
    CommitAutofix { number: u64, branch: String, message: String },
}

impl SourceCall {
    /// Calls that do remediation work rather than bookkeeping.
    pub fn is_external_work(&self) -> bool {
        matches!(
            self,
            SourceCall::GetFile { .. }
                | SourceCall::WriteFile { .. }
                | SourceCall::TriggerAutofix { .. }
                | SourceCall::PollAutofix { .. }
                | SourceCall::CommitAutofix { .. }
        )
    }
}

#[derive(Default)]
struct Branch {
    findings: Vec<Finding>,
    files: HashMap<String, String>,
    /// Newest last
    commits: Vec<String>,
}

struct FakeSourceState {
    branches: HashMap<String, Branch>,
    analyze_new_branches: bool,
    autofix: HashMap<u64, AutofixStatus>,
    failures: HashMap<&'static str, BackendError>,
    commit_seq: u64,
    calls: Vec<SourceCall>,
}

/// In-memory alert source for tests.
///
/// New branches copy the files and commits of their base; with analysis
/// enabled (the default) they also start with the base branch's findings.
#[derive(Clone)]
pub struct FakeAlertSource {
    inner: Arc<Mutex<FakeSourceState>>,
}

impl Default for FakeAlertSource {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeSourceState {
                branches: HashMap::new(),
                analyze_new_branches: true,
                autofix: HashMap::new(),
                failures: HashMap::new(),
                commit_seq: 0,
                calls: Vec::new(),
            })),
        }
    }
}

impl FakeAlertSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed `branch` with findings and a placeholder file per finding path.
    pub fn with_branch(self, branch: &str, findings: Vec<Finding>) -> Self {
        {
            let mut state = self.inner.lock();
            state.commit_seq += 1;
            let head = format!("base{}", state.commit_seq);
            let entry = state.branches.entry(branch.to_string()).or_default();
            for finding in &findings {
                entry
                    .files
                    .entry(finding.file_path.clone())
                    .or_insert_with(|| format!("# {}\n", finding.file_path));
            }
            entry.findings = findings;
            entry.commits.push(head);
        }
        self
    }

    /// New branches start without findings until [`set_findings`] is called.
    ///
    /// [`set_findings`]: FakeAlertSource::set_findings
    pub fn without_analysis(self) -> Self {
        self.inner.lock().analyze_new_branches = false;
        self
    }

    pub fn set_findings(&self, branch: &str, findings: Vec<Finding>) {
        self.inner.lock().branches.entry(branch.to_string()).or_default().findings = findings;
    }

    pub fn set_file(&self, branch: &str, path: &str, content: &str) {
        self.inner
            .lock()
            .branches
            .entry(branch.to_string())
            .or_default()
            .files
            .insert(path.to_string(), content.to_string());
    }

    pub fn set_autofix(&self, number: u64, status: AutofixStatus) {
        self.inner.lock().autofix.insert(number, status);
    }

    /// Fail every call of `operation` (e.g. `"write_file"`) with `err`.
    pub fn fail(&self, operation: &'static str, err: BackendError) {
        self.inner.lock().failures.insert(operation, err);
    }

    pub fn clear_failure(&self, operation: &'static str) {
        self.inner.lock().failures.remove(operation);
    }

    /// Push a commit onto every branch whose name starts with `prefix`.
    pub fn push_commit_matching(&self, prefix: &str) -> Vec<String> {
        let mut state = self.inner.lock();
        let names: Vec<String> =
            state.branches.keys().filter(|b| b.starts_with(prefix)).cloned().collect();
        let mut pushed = Vec::new();
        for name in names {
            state.commit_seq += 1;
            let sha = format!("commit{}", state.commit_seq);
            if let Some(branch) = state.branches.get_mut(&name) {
                branch.commits.push(sha.clone());
            }
            pushed.push(sha);
        }
        pushed
    }

    pub fn branch_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.lock().branches.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn file(&self, branch: &str, path: &str) -> Option<String> {
        self.inner.lock().branches.get(branch).and_then(|b| b.files.get(path).cloned())
    }

    pub fn calls(&self) -> Vec<SourceCall> {
        self.inner.lock().calls.clone()
    }

    fn enter(&self, call: SourceCall, operation: &'static str) -> Result<(), BackendError> {
        let mut state = self.inner.lock();
        state.calls.push(call);
        match state.failures.get(operation) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn next_commit(state: &mut FakeSourceState, branch: &str) -> Result<String, BackendError> {
        state.commit_seq += 1;
        let sha = format!("commit{}", state.commit_seq);
        let branch = state
            .branches
            .get_mut(branch)
            .ok_or_else(|| BackendError::Http { status: 404, body: format!("no branch {branch}") })?;
        branch.commits.push(sha.clone());
        Ok(sha)
    }
}

fn not_found(what: String) -> BackendError {
    BackendError::Http { status: 404, body: what }
}

#[async_trait]
impl AlertSource for FakeAlertSource {
    async fn list_findings(
        &self,
        _repo: &str,
        branch: &str,
        state: Option<FindingState>,
    ) -> Result<Vec<Finding>, BackendError> {
        self.enter(SourceCall::ListFindings { branch: branch.to_string() }, "list_findings")?;
        let inner = self.inner.lock();
        let findings = inner.branches.get(branch).map(|b| b.findings.clone()).unwrap_or_default();
        Ok(findings.into_iter().filter(|f| state.is_none_or(|s| f.state == s)).collect())
    }

    async fn create_branch(
        &self,
        _repo: &str,
        new_branch: &str,
        from_branch: &str,
    ) -> Result<String, BackendError> {
        self.enter(
            SourceCall::CreateBranch { branch: new_branch.to_string(), from: from_branch.to_string() },
            "create_branch",
        )?;
        let mut state = self.inner.lock();
        let base = state
            .branches
            .get(from_branch)
            .ok_or_else(|| not_found(format!("no branch {from_branch}")))?;
        let findings = if state.analyze_new_branches {
            base.findings
                .iter()
                .cloned()
                .map(|mut f| {
                    f.branch = new_branch.to_string();
                    f
                })
                .collect()
        } else {
            Vec::new()
        };
        let branch =
            Branch { findings, files: base.files.clone(), commits: base.commits.clone() };
        let head = branch.commits.last().cloned().unwrap_or_default();
        state.branches.insert(new_branch.to_string(), branch);
        Ok(head)
    }

    async fn branch_head(&self, _repo: &str, branch: &str) -> Result<String, BackendError> {
        self.enter(SourceCall::BranchHead { branch: branch.to_string() }, "branch_head")?;
        let state = self.inner.lock();
        state
            .branches
            .get(branch)
            .and_then(|b| b.commits.last().cloned())
            .ok_or_else(|| not_found(format!("no branch {branch}")))
    }

    async fn commits_since(
        &self,
        _repo: &str,
        branch: &str,
        since_sha: &str,
    ) -> Result<Vec<String>, BackendError> {
        self.enter(
            SourceCall::CommitsSince { branch: branch.to_string(), since: since_sha.to_string() },
            "commits_since",
        )?;
        let state = self.inner.lock();
        let commits = state.branches.get(branch).map(|b| b.commits.clone()).unwrap_or_default();
        Ok(commits.into_iter().rev().take_while(|sha| sha != since_sha).collect())
    }

    async fn get_file(&self, _repo: &str, path: &str, branch: &str) -> Result<String, BackendError> {
        self.enter(
            SourceCall::GetFile { path: path.to_string(), branch: branch.to_string() },
            "get_file",
        )?;
        self.file(branch, path).ok_or_else(|| not_found(format!("no file {path} on {branch}")))
    }

    async fn write_file(
        &self,
        _repo: &str,
        path: &str,
        branch: &str,
        content: &str,
        message: &str,
    ) -> Result<String, BackendError> {
        self.enter(
            SourceCall::WriteFile {
                path: path.to_string(),
                branch: branch.to_string(),
                message: message.to_string(),
            },
            "write_file",
        )?;
        let mut state = self.inner.lock();
        let sha = Self::next_commit(&mut state, branch)?;
        if let Some(b) = state.branches.get_mut(branch) {
            b.files.insert(path.to_string(), content.to_string());
        }
        Ok(sha)
    }

    async fn trigger_autofix(&self, _repo: &str, number: u64) -> Result<AutofixStatus, BackendError> {
        self.enter(SourceCall::TriggerAutofix { number }, "trigger_autofix")?;
        Ok(AutofixStatus::new("pending"))
    }

    async fn poll_autofix(&self, _repo: &str, number: u64) -> Result<AutofixStatus, BackendError> {
        self.enter(SourceCall::PollAutofix { number }, "poll_autofix")?;
        let state = self.inner.lock();
        Ok(state.autofix.get(&number).cloned().unwrap_or_else(|| AutofixStatus::new("succeeded")))
    }

    async fn commit_autofix(
        &self,
        _repo: &str,
        number: u64,
        branch: &str,
        message: &str,
    ) -> Result<String, BackendError> {
        self.enter(
            SourceCall::CommitAutofix {
                number,
                branch: branch.to_string(),
                message: message.to_string(),
            },
            "commit_autofix",
        )?;
        let mut state = self.inner.lock();
        Self::next_commit(&mut state, branch)
    }
}
