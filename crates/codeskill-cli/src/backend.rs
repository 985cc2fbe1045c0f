//! Bridges the async HTTP client into the core's synchronous `LlmClient`.

use codeskill_core::agents::{CompletionRequest, LlmClient};
use codeskill_core::config::{LlmConfig, Provider};
use codeskill_core::error::{CompletionError, CompletionErrorKind};
use llm_client::{Client, ClientConfig, LlmError};
use std::time::Duration;
use tokio::runtime::Runtime;

pub struct HttpBackend {
    client: Client,
    runtime: Runtime,
}

impl HttpBackend {
    pub fn new(llm: &LlmConfig, api_key: String) -> anyhow::Result<Self> {
        let provider = match llm.provider {
            Provider::Anthropic => llm_client::Provider::Anthropic,
            Provider::Openai => llm_client::Provider::OpenAi,
        };
        let mut config = ClientConfig::new(provider, api_key)
            .with_timeout(Duration::from_secs(llm.timeout_seconds));
        if let Some(url) = &llm.base_url {
            config = config.with_base_url(url.clone());
        }
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        Ok(Self {
            client: Client::new(config)?,
            runtime,
        })
    }
}

impl LlmClient for HttpBackend {
    fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        let wire = llm_client::CompletionRequest {
            model: request.model.clone(),
            system: Some(request.system_prompt.clone()).filter(|s| !s.is_empty()),
            prompt: request.prompt.clone(),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };
        self.runtime
            .block_on(self.client.complete(&wire))
            .map(|completion| completion.text)
            .map_err(completion_error)
    }
}

fn completion_error(e: LlmError) -> CompletionError {
    let kind = match &e {
        LlmError::Network(_) => CompletionErrorKind::Network,
        LlmError::Timeout(_) => CompletionErrorKind::Timeout,
        LlmError::RateLimit { .. } => CompletionErrorKind::RateLimit,
        LlmError::Auth { .. } => CompletionErrorKind::Auth,
        LlmError::TokenLimit(_) => CompletionErrorKind::TokenLimit,
        LlmError::InvalidRequest { .. } | LlmError::Config(_) => CompletionErrorKind::InvalidRequest,
        LlmError::Api { .. } => CompletionErrorKind::Api,
        LlmError::InvalidResponse(_) => CompletionErrorKind::InvalidResponse,
    };
    CompletionError::new(kind, e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kinds_survive_the_bridge() {
        let e = completion_error(LlmError::RateLimit {
            retry_after: Some(3),
            message: "slow down".into(),
        });
        assert_eq!(e.kind, CompletionErrorKind::RateLimit);
        assert!(e.message.contains("slow down"));

        let e = completion_error(LlmError::from_status(401, None, "nope"));
        assert_eq!(e.kind, CompletionErrorKind::Auth);
    }
}
