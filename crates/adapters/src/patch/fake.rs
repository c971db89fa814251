// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::{Patch, PatchGenerator};
use crate::BackendError;
use async_trait::async_trait;
use parking_lot::Mutex;
use rb_core::Tool;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Recorded generation request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchCall {
    pub tool: Tool,
    pub prompt: String,
}

#[derive(Default)]
struct FakePatchState {
    unconfigured: HashSet<Tool>,
    /// Replies keyed by a substring the prompt must contain
    replies: Vec<(String, Result<String, BackendError>)>,
    usage: HashMap<Tool, (u64, u64)>,
    calls: Vec<PatchCall>,
}

/// Patch generator that answers from canned replies.
///
/// Without a matching reply the patch text is `fixed`, with 1000 input and
/// 200 output tokens.
#[derive(Clone, Default)]
pub struct FakePatchGenerator {
    inner: Arc<Mutex<FakePatchState>>,
}

impl FakePatchGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unconfigure(&self, tool: Tool) {
        self.inner.lock().unconfigured.insert(tool);
    }

    /// Reply with `text` to prompts containing `needle` (e.g. a file path).
    pub fn reply_when(&self, needle: &str, text: &str) {
        self.inner.lock().replies.push((needle.to_string(), Ok(text.to_string())));
    }

    pub fn fail_when(&self, needle: &str, err: BackendError) {
        self.inner.lock().replies.push((needle.to_string(), Err(err)));
    }

    pub fn set_usage(&self, tool: Tool, input_tokens: u64, output_tokens: u64) {
        self.inner.lock().usage.insert(tool, (input_tokens, output_tokens));
    }

    pub fn calls(&self) -> Vec<PatchCall> {
        self.inner.lock().calls.clone()
    }
}

#[async_trait]
impl PatchGenerator for FakePatchGenerator {
    fn ensure_configured(&self, tool: Tool) -> Result<(), BackendError> {
        if self.inner.lock().unconfigured.contains(&tool) {
            return Err(BackendError::ConfigurationMissing(format!(
                "{}_API_KEY",
                tool.as_str().to_uppercase()
            )));
        }
        Ok(())
    }

    async fn generate(&self, tool: Tool, prompt: &str) -> Result<Patch, BackendError> {
        self.ensure_configured(tool)?;
        let mut state = self.inner.lock();
        state.calls.push(PatchCall { tool, prompt: prompt.to_string() });
        let reply = state
            .replies
            .iter()
            .find(|(needle, _)| prompt.contains(needle.as_str()))
            .map(|(_, reply)| reply.clone())
            .unwrap_or_else(|| Ok("fixed".to_string()));
        let patch_text = reply?;
        let (input_tokens, output_tokens) = state.usage.get(&tool).copied().unwrap_or((1_000, 200));
        Ok(Patch {
            patch_text,
            input_tokens,
            output_tokens,
            latency_ms: 5,
            model: format!("{tool}-fake"),
        })
    }
}
