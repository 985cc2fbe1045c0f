use crate::error::LlmError;
use crate::types::{ClientConfig, Completion, CompletionRequest, Provider};
use crate::{anthropic, openai, Result};
use std::time::Instant;
use tracing::debug;

/// One HTTP client per provider configuration; connection pooling is shared
/// across calls.
#[derive(Debug, Clone)]
pub struct Client {
    config: ClientConfig,
    http: reqwest::Client,
}

impl Client {
    pub fn new(config: ClientConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(LlmError::Config("API key is empty".to_string()));
        }
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// One request, one response. No retry.
    pub async fn complete(&self, request: &CompletionRequest) -> Result<Completion> {
        let provider = self.config.provider;
        let builder = match provider {
            Provider::Anthropic => anthropic::build(&self.http, &self.config, request),
            Provider::OpenAi => openai::build(&self.http, &self.config, request),
        };

        debug!(
            provider = %provider,
            model = %request.model,
            max_tokens = request.max_tokens,
            "sending completion request"
        );
        let started = Instant::now();
        let response = builder.send().await.map_err(LlmError::from_transport)?;
        let status = response.status();

        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok());
            let body = response.text().await.unwrap_or_default();
            debug!(status = status.as_u16(), "completion request failed");
            return Err(LlmError::from_status(status.as_u16(), retry_after, &body));
        }

        let body = response.text().await.map_err(LlmError::from_transport)?;
        let completion = match provider {
            Provider::Anthropic => anthropic::parse(&body)?,
            Provider::OpenAi => openai::parse(&body)?,
        };
        debug!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            input_tokens = completion.usage.input_tokens,
            output_tokens = completion.usage.output_tokens,
            "completion received"
        );
        Ok(completion)
    }
}
