//! OpenAI Chat Completions wire format.

use crate::error::LlmError;
use crate::types::{ClientConfig, Completion, CompletionRequest, TokenUsage};
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: String,
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Usage,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize, Default)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

pub(crate) fn build(
    http: &reqwest::Client,
    config: &ClientConfig,
    request: &CompletionRequest,
) -> reqwest::RequestBuilder {
    let mut messages = Vec::with_capacity(2);
    if let Some(system) = request.system.as_deref() {
        messages.push(ChatMessage {
            role: "system",
            content: system,
        });
    }
    messages.push(ChatMessage {
        role: "user",
        content: &request.prompt,
    });
    let body = ChatRequest {
        model: &request.model,
        max_tokens: request.max_tokens,
        temperature: request.temperature,
        messages,
    };
    http.post(format!("{}/v1/chat/completions", config.base_url()))
        .bearer_auth(&config.api_key)
        .json(&body)
}

/// Only the first choice is used.
pub(crate) fn parse(body: &str) -> Result<Completion, LlmError> {
    let response: ChatResponse = serde_json::from_str(body)
        .map_err(|e| LlmError::InvalidResponse(format!("undecodable chat body: {e}")))?;
    let Some(choice) = response.choices.into_iter().next() else {
        return Err(LlmError::InvalidResponse("response contained no choices".to_string()));
    };
    let text = choice.message.content.unwrap_or_default();
    if text.is_empty() {
        return Err(LlmError::InvalidResponse(
            "response contained no text content".to_string(),
        ));
    }
    Ok(Completion {
        text,
        model: response.model,
        stop_reason: choice.finish_reason,
        usage: TokenUsage {
            input_tokens: response.usage.prompt_tokens,
            output_tokens: response.usage.completion_tokens,
        },
    })
}
