// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! GitHub REST client for code-scanning alerts, refs, contents and autofix.

use super::{AlertSource, AutofixStatus};
use crate::retry::{send_with_retry, RetryPolicy};
use crate::BackendError;
use async_trait::async_trait;
use base64::Engine;
use chrono::{DateTime, Utc};
use rb_core::{Finding, FindingState, Severity};
use reqwest::{Client, Method, RequestBuilder};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

pub const GITHUB_API: &str = "https://api.github.com";
const API_VERSION: &str = "2022-11-28";
const PER_PAGE: usize = 100;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Autofix polling cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutofixPolling {
    pub interval: Duration,
    pub max_wait: Duration,
}

impl Default for AutofixPolling {
    fn default() -> Self {
        Self { interval: Duration::from_secs(3), max_wait: Duration::from_secs(120) }
    }
}

#[derive(Clone)]
pub struct GitHubClient {
    http: Client,
    base_url: String,
    token: String,
    polling: AutofixPolling,
    retry: RetryPolicy,
}

impl GitHubClient {
    pub fn new(token: impl Into<String>) -> Result<Self, BackendError> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(BackendError::ConfigurationMissing("GITHUB_TOKEN".to_string()));
        }
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("rb/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            base_url: GITHUB_API.to_string(),
            token,
            polling: AutofixPolling::default(),
            retry: RetryPolicy::STANDARD,
        })
    }

    /// Point at a GitHub Enterprise or mock server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_polling(mut self, polling: AutofixPolling) -> Self {
        self.polling = polling;
        self
    }

    fn request(&self, method: Method, repo: &str, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}/repos/{}/{}", self.base_url, repo, path))
            .bearer_auth(&self.token)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        repo: &str,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, BackendError> {
        let response = send_with_retry(self.retry, path, true, || {
            self.request(Method::GET, repo, path).query(query)
        })
        .await?;
        Ok(response.json().await?)
    }

    async fn send_json<T: serde::de::DeserializeOwned>(
        &self,
        method: Method,
        repo: &str,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<T, BackendError> {
        let response = send_with_retry(self.retry, path, false, || {
            self.request(method.clone(), repo, path).json(body)
        })
        .await?;
        Ok(response.json().await?)
    }

    async fn contents(&self, repo: &str, path: &str, branch: &str) -> Result<Contents, BackendError> {
        self.get_json(repo, &format!("contents/{path}"), &[("ref", branch.to_string())]).await
    }

    async fn autofix_status(&self, repo: &str, number: u64) -> Result<AutofixStatus, BackendError> {
        self.get_json(repo, &format!("code-scanning/alerts/{number}/autofix"), &[]).await
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct AlertItem {
    number: u64,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    rule: AlertRule,
    #[serde(default)]
    tool: AlertTool,
    #[serde(default)]
    most_recent_instance: AlertInstance,
    #[serde(default)]
    html_url: String,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    dismissed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    fixed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize)]
struct AlertRule {
    #[serde(default)]
    id: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    severity: Option<String>,
    #[serde(default)]
    security_severity_level: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct AlertTool {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct AlertInstance {
    #[serde(default)]
    location: AlertLocation,
    #[serde(default)]
    message: AlertMessage,
}

#[derive(Debug, Default, Deserialize)]
struct AlertLocation {
    #[serde(default)]
    path: String,
    #[serde(default)]
    start_line: u32,
    #[serde(default)]
    end_line: u32,
}

#[derive(Debug, Default, Deserialize)]
struct AlertMessage {
    #[serde(default)]
    text: String,
}

impl AlertItem {
    pub(crate) fn into_finding(self, branch: &str) -> Finding {
        let severity = self
            .rule
            .security_severity_level
            .filter(|s| !s.is_empty())
            .or(self.rule.severity.filter(|s| !s.is_empty()))
            .map(|s| Severity::parse_lenient(&s))
            .unwrap_or(Severity::Note);
        let state = match self.state.as_deref() {
            Some("fixed") => FindingState::Fixed,
            Some("dismissed") => FindingState::Dismissed,
            _ => FindingState::Open,
        };
        Finding {
            number: self.number,
            rule_id: self.rule.id,
            rule_description: self.rule.description,
            severity,
            state,
            analyzer: self.tool.name.unwrap_or_else(|| "CodeQL".to_string()),
            branch: branch.to_string(),
            file_path: self.most_recent_instance.location.path,
            start_line: self.most_recent_instance.location.start_line,
            end_line: self.most_recent_instance.location.end_line,
            message: self.most_recent_instance.message.text,
            html_url: self.html_url,
            created_at: self.created_at.unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
            dismissed_at: self.dismissed_at,
            fixed_at: self.fixed_at,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GitRef {
    object: GitObject,
}

#[derive(Debug, Deserialize)]
struct GitObject {
    sha: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Contents {
    sha: String,
    #[serde(default)]
    content: String,
}

impl Contents {
    pub(crate) fn decode(&self) -> Result<String, BackendError> {
        // the API wraps base64 at 60 columns
        let packed: String = self.content.chars().filter(|c| !c.is_whitespace()).collect();
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(packed)
            .map_err(|e| BackendError::Decode(format!("file content: {e}")))?;
        String::from_utf8(bytes).map_err(|e| BackendError::Decode(format!("file content: {e}")))
    }
}

#[derive(Debug, Deserialize)]
struct CommitEnvelope {
    #[serde(default)]
    commit: Option<CommitSha>,
}

impl CommitEnvelope {
    /// The new commit sha; a write without one did not land.
    fn sha(self) -> Result<String, BackendError> {
        match self.commit {
            Some(commit) if !commit.sha.is_empty() => Ok(commit.sha),
            _ => Err(BackendError::Decode("contents response has no commit sha".into())),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct CommitSha {
    sha: String,
}

/// Shas listed newest first, cut at `since_sha` (exclusive).
pub(crate) fn newer_than(commits: Vec<CommitSha>, since_sha: &str) -> Vec<String> {
    commits.into_iter().map(|c| c.sha).take_while(|sha| sha != since_sha).collect()
}

#[async_trait]
impl AlertSource for GitHubClient {
    async fn list_findings(
        &self,
        repo: &str,
        branch: &str,
        state: Option<FindingState>,
    ) -> Result<Vec<Finding>, BackendError> {
        let mut findings = Vec::new();
        let mut page = 1;
        loop {
            let mut query = vec![
                ("ref", format!("refs/heads/{branch}")),
                ("per_page", PER_PAGE.to_string()),
                ("page", page.to_string()),
            ];
            if let Some(state) = state {
                query.push(("state", state.to_string()));
            }
            let items: Vec<AlertItem> =
                self.get_json(repo, "code-scanning/alerts", &query).await?;
            let count = items.len();
            findings.extend(items.into_iter().map(|item| item.into_finding(branch)));
            if count < PER_PAGE {
                break;
            }
            page += 1;
        }
        tracing::debug!(%repo, %branch, count = findings.len(), "listed findings");
        Ok(findings)
    }

    async fn create_branch(
        &self,
        repo: &str,
        new_branch: &str,
        from_branch: &str,
    ) -> Result<String, BackendError> {
        let sha = self.branch_head(repo, from_branch).await?;
        let created: GitRef = self
            .send_json(
                Method::POST,
                repo,
                "git/refs",
                &json!({ "ref": format!("refs/heads/{new_branch}"), "sha": sha }),
            )
            .await?;
        tracing::info!(%repo, branch = %new_branch, from = %from_branch, "created branch");
        Ok(created.object.sha)
    }

    async fn branch_head(&self, repo: &str, branch: &str) -> Result<String, BackendError> {
        let head: GitRef = self.get_json(repo, &format!("git/ref/heads/{branch}"), &[]).await?;
        Ok(head.object.sha)
    }

    async fn commits_since(
        &self,
        repo: &str,
        branch: &str,
        since_sha: &str,
    ) -> Result<Vec<String>, BackendError> {
        let commits: Vec<CommitSha> = self
            .get_json(
                repo,
                "commits",
                &[("sha", branch.to_string()), ("per_page", PER_PAGE.to_string())],
            )
            .await?;
        Ok(newer_than(commits, since_sha))
    }

    async fn get_file(&self, repo: &str, path: &str, branch: &str) -> Result<String, BackendError> {
        self.contents(repo, path, branch).await?.decode()
    }

    async fn write_file(
        &self,
        repo: &str,
        path: &str,
        branch: &str,
        content: &str,
        message: &str,
    ) -> Result<String, BackendError> {
        let current = self.contents(repo, path, branch).await?;
        let encoded = base64::engine::general_purpose::STANDARD.encode(content.as_bytes());
        let written: CommitEnvelope = self
            .send_json(
                Method::PUT,
                repo,
                &format!("contents/{path}"),
                &json!({
                    "message": message,
                    "content": encoded,
                    "sha": current.sha,
                    "branch": branch,
                }),
            )
            .await?;
        written.sha()
    }

    async fn trigger_autofix(&self, repo: &str, number: u64) -> Result<AutofixStatus, BackendError> {
        self.send_json(
            Method::POST,
            repo,
            &format!("code-scanning/alerts/{number}/autofix"),
            &json!({}),
        )
        .await
    }

    async fn poll_autofix(&self, repo: &str, number: u64) -> Result<AutofixStatus, BackendError> {
        let deadline = tokio::time::Instant::now() + self.polling.max_wait;
        while tokio::time::Instant::now() < deadline {
            tokio::time::sleep(self.polling.interval).await;
            let status = self.autofix_status(repo, number).await?;
            if status.is_terminal() {
                return Ok(status);
            }
        }
        self.autofix_status(repo, number).await
    }

    async fn commit_autofix(
        &self,
        repo: &str,
        number: u64,
        branch: &str,
        message: &str,
    ) -> Result<String, BackendError> {
        let committed: CommitSha = self
            .send_json(
                Method::POST,
                repo,
                &format!("code-scanning/alerts/{number}/autofix/commits"),
                &json!({ "target_ref": format!("refs/heads/{branch}"), "message": message }),
            )
            .await?;
        Ok(committed.sha)
    }
}

#[cfg(test)]
#[path = "github_tests.rs"]
mod tests;
