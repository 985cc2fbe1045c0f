//! Anthropic Messages API wire format.

use crate::error::LlmError;
use crate::types::{ClientConfig, Completion, CompletionRequest, TokenUsage};
use serde::{Deserialize, Serialize};

pub(crate) const API_VERSION: &str = "2023-06-01";

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: [Message<'a>; 1],
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    model: String,
    #[serde(default)]
    content: Vec<ContentBlock>,
    stop_reason: Option<String>,
    #[serde(default)]
    usage: Usage,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text {
        text: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Deserialize, Default)]
struct Usage {
    #[serde(default)]
    input_tokens: u64,
    #[serde(default)]
    output_tokens: u64,
}

pub(crate) fn build(
    http: &reqwest::Client,
    config: &ClientConfig,
    request: &CompletionRequest,
) -> reqwest::RequestBuilder {
    let body = MessagesRequest {
        model: &request.model,
        max_tokens: request.max_tokens,
        temperature: request.temperature,
        system: request.system.as_deref(),
        messages: [Message {
            role: "user",
            content: &request.prompt,
        }],
    };
    http.post(format!("{}/v1/messages", config.base_url()))
        .header("x-api-key", &config.api_key)
        .header("anthropic-version", API_VERSION)
        .json(&body)
}

/// Text blocks are concatenated in order; other block types are ignored.
pub(crate) fn parse(body: &str) -> Result<Completion, LlmError> {
    let response: MessagesResponse = serde_json::from_str(body)
        .map_err(|e| LlmError::InvalidResponse(format!("undecodable messages body: {e}")))?;
    let text: String = response
        .content
        .into_iter()
        .filter_map(|block| match block {
            ContentBlock::Text { text } => Some(text),
            ContentBlock::Other => None,
        })
        .collect();
    if text.is_empty() {
        return Err(LlmError::InvalidResponse(
            "response contained no text content".to_string(),
        ));
    }
    Ok(Completion {
        text,
        model: response.model,
        stop_reason: response.stop_reason,
        usage: TokenUsage {
            input_tokens: response.usage.input_tokens,
            output_tokens: response.usage.output_tokens,
        },
    })
}
