// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Patch generation by hosted language models.

mod extract;
mod llm;

pub use extract::extract_code;
pub use llm::{LlmClient, LlmKeys, LlmProvider};

use crate::BackendError;
use async_trait::async_trait;
use rb_core::Tool;
use serde::{Deserialize, Serialize};

/// A generated replacement file plus the usage that produced it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patch {
    pub patch_text: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub latency_ms: u64,
    pub model: String,
}

/// Adapter for model-backed patch generation, one model per patch tool
#[async_trait]
pub trait PatchGenerator: Clone + Send + Sync + 'static {
    /// Fails with [`BackendError::ConfigurationMissing`] when `tool` has no credentials.
    fn ensure_configured(&self, tool: Tool) -> Result<(), BackendError>;

    /// Generate a patch. Empty `patch_text` is returned as-is.
    async fn generate(&self, tool: Tool, prompt: &str) -> Result<Patch, BackendError>;
}

#[cfg(any(test, feature = "test-support"))]
mod fake;

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakePatchGenerator, PatchCall};
