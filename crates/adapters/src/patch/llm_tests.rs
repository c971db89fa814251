// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn anthropic_joins_text_blocks_and_reads_usage() {
    let body = json!({
        "content": [
            { "type": "text", "text": "```python" },
            { "type": "tool_use", "id": "x" },
            { "type": "text", "text": "x = 1\n```" }
        ],
        "usage": { "input_tokens": 1200, "output_tokens": 300 }
    });
    let completion = parse_completion(LlmProvider::Anthropic, &body).unwrap();
    assert_eq!(completion.text, "```python\nx = 1\n```");
    assert_eq!((completion.input_tokens, completion.output_tokens), (1200, 300));
    assert_eq!(extract_code(&completion.text), "x = 1");
}

#[test]
fn openai_reads_first_choice() {
    let body = json!({
        "choices": [{ "message": { "role": "assistant", "content": "fixed" } }],
        "usage": { "prompt_tokens": 10, "completion_tokens": 2 }
    });
    let completion = parse_completion(LlmProvider::OpenAi, &body).unwrap();
    assert_eq!(completion, Completion { text: "fixed".into(), input_tokens: 10, output_tokens: 2 });
}

#[test]
fn openai_without_choices_is_a_decode_error() {
    let err = parse_completion(LlmProvider::OpenAi, &json!({ "choices": [] })).unwrap_err();
    assert!(matches!(err, BackendError::Decode(m) if m.contains("no choices")));
}

#[test]
fn gemini_reads_parts_and_usage_metadata() {
    let body = json!({
        "candidates": [{ "content": { "parts": [{ "text": "a" }, { "text": "b" }] } }],
        "usageMetadata": { "promptTokenCount": 50, "candidatesTokenCount": 7 }
    });
    let completion = parse_completion(LlmProvider::Gemini, &body).unwrap();
    assert_eq!(completion.text, "a\nb");
    assert_eq!((completion.input_tokens, completion.output_tokens), (50, 7));
}

#[test]
fn missing_usage_counts_as_zero() {
    let body = json!({ "candidates": [{ "content": { "parts": [] } }] });
    let completion = parse_completion(LlmProvider::Gemini, &body).unwrap();
    assert_eq!(completion.text, "");
    assert_eq!(completion.input_tokens, 0);
}

#[yare::parameterized(
    anthropic = { Tool::Anthropic, "ANTHROPIC_API_KEY" },
    openai    = { Tool::OpenAi, "OPENAI_API_KEY" },
    gemini    = { Tool::Gemini, "GEMINI_API_KEY" },
)]
fn missing_key_is_reported_per_provider(tool: Tool, var: &str) {
    let client = LlmClient::new(LlmKeys::default()).unwrap();
    match client.ensure_configured(tool) {
        Err(BackendError::ConfigurationMissing(name)) => assert_eq!(name, var),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn non_patch_tools_have_no_provider() {
    let keys = LlmKeys { anthropic: Some("k".into()), ..LlmKeys::default() };
    let client = LlmClient::new(keys).unwrap();
    client.ensure_configured(Tool::Anthropic).unwrap();
    assert!(client.ensure_configured(Tool::Copilot).is_err());
}

#[test]
fn model_override_applies_to_one_provider() {
    let client = LlmClient::new(LlmKeys::default())
        .unwrap()
        .with_model(LlmProvider::OpenAi, "gpt-test");
    assert_eq!(client.model(LlmProvider::OpenAi), "gpt-test");
    assert_eq!(client.model(LlmProvider::Gemini), "gemini-3.1-pro-preview");
}

fn gemini_client(key: &str) -> LlmClient {
    let mut client = LlmClient::new(LlmKeys { gemini: Some(key.to_string()), ..LlmKeys::default() })
        .unwrap()
        .with_endpoint(LlmProvider::Gemini, "http://127.0.0.1:9/v1beta/models");
    client.retry = RetryPolicy::NONE;
    client
}

#[test]
fn gemini_key_travels_in_a_header() {
    let client = gemini_client("gm-secret-key");

    let request = client
        .build(LlmProvider::Gemini, "gm-secret-key", "gemini-3.1-pro-preview", "fix it")
        .build()
        .unwrap();

    assert_eq!(request.url().query(), None);
    assert!(!request.url().as_str().contains("gm-secret-key"));
    assert_eq!(request.headers()["x-goog-api-key"], "gm-secret-key");
}

#[tokio::test]
async fn transport_errors_never_carry_the_key() {
    let client = gemini_client("gm-secret-key");

    let err = client.generate(Tool::Gemini, "fix it").await.unwrap_err();

    assert!(matches!(err, BackendError::Unavailable(_) | BackendError::Timeout(_)));
    assert!(!err.to_string().contains("gm-secret-key"));
    assert!(!err.to_string().contains("127.0.0.1"));
}
