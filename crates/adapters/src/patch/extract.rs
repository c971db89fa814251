// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use regex::Regex;
use std::sync::LazyLock;

/// First markdown code fence, optional language tag
#[allow(clippy::expect_used)]
static FENCE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```(?:\w+)?\n(.*?)```").expect("constant regex pattern is valid")
});

/// Pull the file body out of a model reply.
///
/// The first fenced block wins (trailing newlines dropped); unfenced replies
/// are trimmed.
pub fn extract_code(text: &str) -> String {
    match FENCE_PATTERN.captures(text).and_then(|c| c.get(1)) {
        Some(body) => body.as_str().trim_end_matches('\n').to_string(),
        None => text.trim().to_string(),
    }
}

#[cfg(test)]
#[path = "extract_tests.rs"]
mod tests;
