use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("rate limit exceeded: {message}")]
    RateLimit {
        retry_after: Option<u64>,
        message: String,
    },

    #[error("authentication failed ({status}): {message}")]
    Auth { status: u16, message: String },

    #[error("token limit exceeded: {0}")]
    TokenLimit(String),

    #[error("invalid request ({status}): {message}")]
    InvalidRequest { status: u16, message: String },

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("configuration error: {0}")]
    Config(String),
}

/// Both providers wrap failures as `{"error": {"message": ...}}`.
#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

const MAX_BODY_IN_MESSAGE: usize = 500;

impl LlmError {
    /// Map a non-2xx response onto a kind.
    pub fn from_status(status: u16, retry_after: Option<u64>, body: &str) -> Self {
        let message = error_message(body);
        match status {
            401 | 403 => LlmError::Auth { status, message },
            429 => LlmError::RateLimit {
                retry_after,
                message,
            },
            408 | 504 => LlmError::Timeout(message),
            400 if mentions_token_limit(&message) => LlmError::TokenLimit(message),
            400 | 404 | 422 => LlmError::InvalidRequest { status, message },
            _ => LlmError::Api { status, message },
        }
    }

    /// Map a transport failure (no HTTP status).
    pub fn from_transport(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            LlmError::Timeout(e.to_string())
        } else if e.is_decode() {
            LlmError::InvalidResponse(e.to_string())
        } else {
            LlmError::Network(e.to_string())
        }
    }
}

fn error_message(body: &str) -> String {
    if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(body) {
        return envelope.error.message;
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "empty response body".to_string();
    }
    trimmed.chars().take(MAX_BODY_IN_MESSAGE).collect()
}

fn mentions_token_limit(message: &str) -> bool {
    let lower = message.to_lowercase();
    ["token", "context length", "context_length", "too long"]
        .iter()
        .any(|needle| lower.contains(needle))
}
