// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Devin v3 organization API client.

use super::{AgentBackend, SessionHandle, SessionStatus};
use crate::retry::{send_with_retry, RetryPolicy};
use crate::BackendError;
use async_trait::async_trait;
use reqwest::{Client, Method};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

pub const DEVIN_API: &str = "https://api.devin.ai/v3";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct DevinClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
    org_id: Option<String>,
    retry: RetryPolicy,
}

#[derive(Debug, Deserialize)]
struct SessionList {
    #[serde(default)]
    items: Vec<SessionStatus>,
}

impl DevinClient {
    /// Missing credentials are reported lazily by [`AgentBackend::ensure_configured`].
    pub fn new(api_key: Option<String>, org_id: Option<String>) -> Result<Self, BackendError> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            base_url: DEVIN_API.to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            org_id: org_id.filter(|o| !o.trim().is_empty()),
            retry: RetryPolicy::RATE_LIMITED,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn sessions_url(&self) -> Result<String, BackendError> {
        let org = self
            .org_id
            .as_deref()
            .ok_or_else(|| BackendError::ConfigurationMissing("DEVIN_ORG_ID".to_string()))?;
        Ok(format!("{}/organizations/{}/sessions", self.base_url, org))
    }

    fn api_key(&self) -> Result<&str, BackendError> {
        self.api_key
            .as_deref()
            .ok_or_else(|| BackendError::ConfigurationMissing("DEVIN_API_KEY".to_string()))
    }

    async fn send(
        &self,
        method: Method,
        url: &str,
        body: Option<serde_json::Value>,
    ) -> Result<reqwest::Response, BackendError> {
        let key = self.api_key()?;
        let idempotent = method == Method::GET;
        send_with_retry(self.retry, "devin", idempotent, || {
            let builder = self.http.request(method.clone(), url).bearer_auth(key);
            match &body {
                Some(body) => builder.json(body),
                None => builder,
            }
        })
        .await
    }
}

#[async_trait]
impl AgentBackend for DevinClient {
    fn ensure_configured(&self) -> Result<(), BackendError> {
        self.api_key()?;
        self.sessions_url()?;
        Ok(())
    }

    async fn create_session(&self, repo: &str, prompt: &str) -> Result<SessionHandle, BackendError> {
        let url = self.sessions_url()?;
        let response =
            self.send(Method::POST, &url, Some(json!({ "prompt": prompt, "repos": [repo] }))).await?;
        let handle: SessionHandle = response.json().await?;
        tracing::info!(session_id = %handle.session_id, %repo, "created agent session");
        Ok(handle)
    }

    async fn send_message(&self, session_id: &str, message: &str) -> Result<(), BackendError> {
        let url = format!("{}/{}/messages", self.sessions_url()?, session_id);
        self.send(Method::POST, &url, Some(json!({ "message": message }))).await?;
        Ok(())
    }

    async fn get_status(&self, session_id: &str) -> Result<SessionStatus, BackendError> {
        let url = format!("{}/{}", self.sessions_url()?, session_id);
        Ok(self.send(Method::GET, &url, None).await?.json().await?)
    }

    async fn list_sessions(&self) -> Result<Vec<SessionStatus>, BackendError> {
        let url = self.sessions_url()?;
        let list: SessionList = self.send(Method::GET, &url, None).await?.json().await?;
        Ok(list.items)
    }
}

#[cfg(test)]
#[path = "devin_tests.rs"]
mod tests;
