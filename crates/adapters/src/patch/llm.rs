// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP clients for the Anthropic, OpenAI and Gemini text APIs.

use super::{extract_code, Patch, PatchGenerator};
use crate::retry::{send_with_retry, RetryPolicy};
use crate::BackendError;
use async_trait::async_trait;
use rb_core::Tool;
use reqwest::{Client, RequestBuilder};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Generous: large files take a while to rewrite.
const LLM_TIMEOUT: Duration = Duration::from_secs(120);
const MAX_OUTPUT_TOKENS: u32 = 16_384;

/// The model vendors behind the patch tools
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LlmProvider {
    Anthropic,
    OpenAi,
    Gemini,
}

impl LlmProvider {
    pub fn for_tool(tool: Tool) -> Option<LlmProvider> {
        match tool {
            Tool::Anthropic => Some(LlmProvider::Anthropic),
            Tool::OpenAi => Some(LlmProvider::OpenAi),
            Tool::Gemini => Some(LlmProvider::Gemini),
            Tool::Devin | Tool::Copilot => None,
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            LlmProvider::Anthropic => "claude-opus-4-6",
            LlmProvider::OpenAi => "gpt-5.3-codex",
            LlmProvider::Gemini => "gemini-3.1-pro-preview",
        }
    }

    pub fn key_var(&self) -> &'static str {
        match self {
            LlmProvider::Anthropic => "ANTHROPIC_API_KEY",
            LlmProvider::OpenAi => "OPENAI_API_KEY",
            LlmProvider::Gemini => "GEMINI_API_KEY",
        }
    }

    fn default_endpoint(&self) -> &'static str {
        match self {
            LlmProvider::Anthropic => "https://api.anthropic.com/v1/messages",
            LlmProvider::OpenAi => "https://api.openai.com/v1/chat/completions",
            LlmProvider::Gemini => "https://generativelanguage.googleapis.com/v1beta/models",
        }
    }
}

/// API keys per provider; absent keys disable that tool.
#[derive(Debug, Clone, Default)]
pub struct LlmKeys {
    pub anthropic: Option<String>,
    pub openai: Option<String>,
    pub gemini: Option<String>,
}

impl LlmKeys {
    fn get(&self, provider: LlmProvider) -> Option<&str> {
        let key = match provider {
            LlmProvider::Anthropic => self.anthropic.as_deref(),
            LlmProvider::OpenAi => self.openai.as_deref(),
            LlmProvider::Gemini => self.gemini.as_deref(),
        };
        key.filter(|k| !k.trim().is_empty())
    }
}

/// Text reply and token usage parsed from a provider response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Completion {
    pub text: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

#[derive(Clone)]
pub struct LlmClient {
    http: Client,
    keys: LlmKeys,
    models: HashMap<LlmProvider, String>,
    endpoints: HashMap<LlmProvider, String>,
    retry: RetryPolicy,
}

impl LlmClient {
    pub fn new(keys: LlmKeys) -> Result<Self, BackendError> {
        let http = Client::builder().timeout(LLM_TIMEOUT).build()?;
        Ok(Self {
            http,
            keys,
            models: HashMap::new(),
            endpoints: HashMap::new(),
            retry: RetryPolicy::STANDARD,
        })
    }

    /// Override the model used for `provider` (e.g. from the rate table).
    pub fn with_model(mut self, provider: LlmProvider, model: impl Into<String>) -> Self {
        self.models.insert(provider, model.into());
        self
    }

    pub fn with_endpoint(mut self, provider: LlmProvider, url: impl Into<String>) -> Self {
        self.endpoints.insert(provider, url.into());
        self
    }

    pub fn model(&self, provider: LlmProvider) -> &str {
        self.models.get(&provider).map(String::as_str).unwrap_or(provider.default_model())
    }

    fn endpoint(&self, provider: LlmProvider) -> &str {
        self.endpoints.get(&provider).map(String::as_str).unwrap_or(provider.default_endpoint())
    }

    fn provider(&self, tool: Tool) -> Result<(LlmProvider, &str), BackendError> {
        let provider = LlmProvider::for_tool(tool).ok_or_else(|| {
            BackendError::ConfigurationMissing(format!("language model for {tool}"))
        })?;
        let key = self
            .keys
            .get(provider)
            .ok_or_else(|| BackendError::ConfigurationMissing(provider.key_var().to_string()))?;
        Ok((provider, key))
    }

    fn build(&self, provider: LlmProvider, key: &str, model: &str, prompt: &str) -> RequestBuilder {
        match provider {
            LlmProvider::Anthropic => self
                .http
                .post(self.endpoint(provider))
                .header("x-api-key", key)
                .header("anthropic-version", "2023-06-01")
                .json(&json!({
                    "model": model,
                    "max_tokens": MAX_OUTPUT_TOKENS,
                    "messages": [{ "role": "user", "content": prompt }],
                })),
            LlmProvider::OpenAi => self.http.post(self.endpoint(provider)).bearer_auth(key).json(
                &json!({
                    "model": model,
                    "max_tokens": MAX_OUTPUT_TOKENS,
                    "messages": [{ "role": "user", "content": prompt }],
                }),
            ),
            LlmProvider::Gemini => self
                .http
                .post(format!("{}/{}:generateContent", self.endpoint(provider), model))
                .header("x-goog-api-key", key)
                .json(&json!({
                    "contents": [{ "parts": [{ "text": prompt }] }],
                    "generationConfig": { "maxOutputTokens": MAX_OUTPUT_TOKENS },
                })),
        }
    }
}

fn tokens(value: &Value, pointer: &str) -> u64 {
    value.pointer(pointer).and_then(Value::as_u64).unwrap_or(0)
}

/// Parse a provider response body into reply text and usage.
pub(crate) fn parse_completion(provider: LlmProvider, body: &Value) -> Result<Completion, BackendError> {
    match provider {
        LlmProvider::Anthropic => {
            let text = body
                .get("content")
                .and_then(Value::as_array)
                .map(|blocks| {
                    blocks
                        .iter()
                        .filter(|b| b.get("type").and_then(Value::as_str) == Some("text"))
                        .filter_map(|b| b.get("text").and_then(Value::as_str))
                        .collect::<Vec<_>>()
                        .join("\n")
                })
                .unwrap_or_default();
            Ok(Completion {
                text,
                input_tokens: tokens(body, "/usage/input_tokens"),
                output_tokens: tokens(body, "/usage/output_tokens"),
            })
        }
        LlmProvider::OpenAi => {
            let choice = body
                .get("choices")
                .and_then(Value::as_array)
                .and_then(|c| c.first())
                .ok_or_else(|| BackendError::Decode("OpenAI returned no choices".to_string()))?;
            Ok(Completion {
                text: choice
                    .pointer("/message/content")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                input_tokens: tokens(body, "/usage/prompt_tokens"),
                output_tokens: tokens(body, "/usage/completion_tokens"),
            })
        }
        LlmProvider::Gemini => {
            let candidate = body
                .get("candidates")
                .and_then(Value::as_array)
                .and_then(|c| c.first())
                .ok_or_else(|| BackendError::Decode("Gemini returned no candidates".to_string()))?;
            let text = candidate
                .pointer("/content/parts")
                .and_then(Value::as_array)
                .map(|parts| {
                    parts
                        .iter()
                        .filter_map(|p| p.get("text").and_then(Value::as_str))
                        .collect::<Vec<_>>()
                        .join("\n")
                })
                .unwrap_or_default();
            Ok(Completion {
                text,
                input_tokens: tokens(body, "/usageMetadata/promptTokenCount"),
                output_tokens: tokens(body, "/usageMetadata/candidatesTokenCount"),
            })
        }
    }
}

#[async_trait]
impl PatchGenerator for LlmClient {
    fn ensure_configured(&self, tool: Tool) -> Result<(), BackendError> {
        self.provider(tool).map(|_| ())
    }

    async fn generate(&self, tool: Tool, prompt: &str) -> Result<Patch, BackendError> {
        let (provider, key) = self.provider(tool)?;
        let model = self.model(provider).to_string();
        let started = Instant::now();
        let response =
            send_with_retry(self.retry, tool.as_str(), true, || self.build(provider, key, &model, prompt))
                .await?;
        let body: Value = response.json().await?;
        let latency_ms = started.elapsed().as_millis() as u64;

        let completion = parse_completion(provider, &body)?;
        tracing::debug!(
            %tool,
            %model,
            latency_ms,
            input_tokens = completion.input_tokens,
            output_tokens = completion.output_tokens,
            "model replied",
        );
        Ok(Patch {
            patch_text: extract_code(&completion.text),
            input_tokens: completion.input_tokens,
            output_tokens: completion.output_tokens,
            latency_ms,
            model,
        })
    }
}

#[cfg(test)]
#[path = "llm_tests.rs"]
mod tests;
