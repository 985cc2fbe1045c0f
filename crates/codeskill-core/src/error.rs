use crate::classify::CodedError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// ---------------------------------------------------------------------------
// CompletionError: the LLM boundary's closed failure set
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionErrorKind {
    Network,
    Timeout,
    RateLimit,
    Auth,
    TokenLimit,
    InvalidRequest,
    Api,
    InvalidResponse,
}

impl CompletionErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            CompletionErrorKind::Network => "network",
            CompletionErrorKind::Timeout => "timeout",
            CompletionErrorKind::RateLimit => "rate_limit",
            CompletionErrorKind::Auth => "auth",
            CompletionErrorKind::TokenLimit => "token_limit",
            CompletionErrorKind::InvalidRequest => "invalid_request",
            CompletionErrorKind::Api => "api",
            CompletionErrorKind::InvalidResponse => "invalid_response",
        }
    }
}

impl fmt::Display for CompletionErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed completion call, as reported by whatever adapter implements
/// [`crate::agents::LlmClient`].
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("LLM {kind} error: {message}")]
pub struct CompletionError {
    pub kind: CompletionErrorKind,
    pub message: String,
}

impl CompletionError {
    pub fn new(kind: CompletionErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// SkillError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum SkillError {
    #[error("malformed response: {message} at line {line} column {column} near `{window}`")]
    MalformedResponse {
        message: String,
        line: usize,
        column: usize,
        window: String,
    },

    #[error("schema violation in {artifact}: {detail}")]
    SchemaViolation { artifact: String, detail: String },

    #[error(transparent)]
    Completion(#[from] CompletionError),

    #[error("Design review failed ({critical} critical issue(s)). Please address the issues and retry.")]
    DesignRejected { critical: usize },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    Failed(String),

    #[error(transparent)]
    Coded(#[from] CodedError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SkillError>;

impl SkillError {
    pub fn schema(artifact: &str, detail: impl Into<String>) -> Self {
        SkillError::SchemaViolation {
            artifact: artifact.to_string(),
            detail: detail.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            SkillError::MalformedResponse { .. } => ErrorKind::MalformedResponse,
            SkillError::SchemaViolation { .. } => ErrorKind::SchemaViolation,
            SkillError::Completion(e) => ErrorKind::Completion(e.kind),
            SkillError::DesignRejected { .. } => ErrorKind::DesignRejected,
            SkillError::Config(_) => ErrorKind::Config,
            SkillError::Internal(_) => ErrorKind::Internal,
            SkillError::Failed(_) => ErrorKind::Other,
            SkillError::Coded(e) => ErrorKind::Coded(e.code),
            SkillError::Io(e) => ErrorKind::Io(e.kind()),
            SkillError::Yaml(_) => ErrorKind::Yaml,
            SkillError::Json(_) => ErrorKind::Json,
        }
    }
}

// ---------------------------------------------------------------------------
// ErrorKind: a Copy tag for routing without string matching
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    MalformedResponse,
    SchemaViolation,
    Completion(CompletionErrorKind),
    DesignRejected,
    Config,
    Internal,
    Coded(u32),
    Io(std::io::ErrorKind),
    Yaml,
    Json,
    Other,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::MalformedResponse => f.write_str("malformed_response"),
            ErrorKind::SchemaViolation => f.write_str("schema_violation"),
            ErrorKind::Completion(k) => write!(f, "completion.{k}"),
            ErrorKind::DesignRejected => f.write_str("design_rejected"),
            ErrorKind::Config => f.write_str("config"),
            ErrorKind::Internal => f.write_str("internal"),
            ErrorKind::Coded(code) => write!(f, "coded.{code}"),
            ErrorKind::Io(_) => f.write_str("io"),
            ErrorKind::Yaml => f.write_str("yaml"),
            ErrorKind::Json => f.write_str("json"),
            ErrorKind::Other => f.write_str("other"),
        }
    }
}

impl Serialize for ErrorKind {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_kind_flows_through() {
        let err: SkillError = CompletionError::new(CompletionErrorKind::RateLimit, "slow down").into();
        assert_eq!(err.kind(), ErrorKind::Completion(CompletionErrorKind::RateLimit));
        assert_eq!(err.kind().to_string(), "completion.rate_limit");
        assert!(err.to_string().contains("slow down"));
    }

    #[test]
    fn io_kind_keeps_std_kind() {
        let err: SkillError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert_eq!(err.kind(), ErrorKind::Io(std::io::ErrorKind::NotFound));
    }

    #[test]
    fn design_rejected_message() {
        let err = SkillError::DesignRejected { critical: 1 };
        assert!(err.to_string().starts_with("Design review failed"));
        assert!(err.to_string().ends_with("Please address the issues and retry."));
    }

    #[test]
    fn kind_serializes_as_string() {
        let json = serde_json::to_string(&ErrorKind::SchemaViolation).unwrap();
        assert_eq!(json, "\"schema_violation\"");
    }
}
