//! Coded error taxonomy.
//!
//! Every failure maps to a six-digit code whose leading digit is its
//! category (`code / 100_000`). Classification walks an ordered rule table
//! and stops at the first match; typed kinds are matched before message
//! text, and anything unmatched becomes [`codes::UNKNOWN_EXCEPTION`].

use crate::error::{CompletionErrorKind, ErrorKind, SkillError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Codes
// ---------------------------------------------------------------------------

pub mod codes {
    pub const VALIDATION_JSON_DECODE: u32 = 100101;
    pub const VALIDATION_SCHEMA: u32 = 100201;

    pub const RUNTIME_EXECUTION_FAILED: u32 = 300101;
    pub const RUNTIME_TIMEOUT: u32 = 300102;
    pub const RUNTIME_PANIC: u32 = 300104;

    pub const API_LLM_REQUEST_FAILED: u32 = 400100;
    pub const API_LLM_RATE_LIMIT: u32 = 400103;
    pub const API_LLM_AUTH_FAILED: u32 = 400104;
    pub const API_LLM_TOKEN_LIMIT: u32 = 400105;
    pub const API_LLM_INVALID_REQUEST: u32 = 400106;
    pub const API_NETWORK_CONNECTION: u32 = 400201;
    pub const API_NETWORK_TIMEOUT: u32 = 400202;

    pub const RESOURCE_FILE_NOT_FOUND: u32 = 500101;
    pub const RESOURCE_FILE_PERMISSION: u32 = 500102;
    pub const RESOURCE_FILE_READ_ERROR: u32 = 500103;

    pub const CONFIG_API_KEY_MISSING: u32 = 600101;
    pub const CONFIG_INVALID: u32 = 600102;

    pub const BUSINESS_NODE_FAILED: u32 = 700101;
    pub const BUSINESS_QUOTA_INSUFFICIENT: u32 = 700102;
    pub const BUSINESS_QUOTA_EXCEEDED: u32 = 700103;
    pub const BUSINESS_BALANCE_OVERDUE: u32 = 700104;
    pub const BUSINESS_DESIGN_REJECTED: u32 = 700105;

    pub const INTEGRATION_SERVICE_FAILED: u32 = 800101;

    pub const UNKNOWN_ERROR: u32 = 900000;
    pub const UNKNOWN_EXCEPTION: u32 = 900001;
}

// ---------------------------------------------------------------------------
// ErrorCategory
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Validation,
    Code,
    Runtime,
    Api,
    Resource,
    Config,
    Business,
    Integration,
    Unknown,
}

impl ErrorCategory {
    pub fn from_code(code: u32) -> Self {
        match code / 100_000 {
            1 => ErrorCategory::Validation,
            2 => ErrorCategory::Code,
            3 => ErrorCategory::Runtime,
            4 => ErrorCategory::Api,
            5 => ErrorCategory::Resource,
            6 => ErrorCategory::Config,
            7 => ErrorCategory::Business,
            8 => ErrorCategory::Integration,
            _ => ErrorCategory::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCategory::Validation => "validation",
            ErrorCategory::Code => "code",
            ErrorCategory::Runtime => "runtime",
            ErrorCategory::Api => "api",
            ErrorCategory::Resource => "resource",
            ErrorCategory::Config => "config",
            ErrorCategory::Business => "business",
            ErrorCategory::Integration => "integration",
            ErrorCategory::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// CodedError
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("[{code}] {message}")]
pub struct CodedError {
    pub code: u32,
    pub message: String,
    #[serde(default)]
    pub context: BTreeMap<String, String>,
}

impl CodedError {
    pub fn new(code: u32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: BTreeMap::new(),
        }
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::from_code(self.code)
    }
}

// ---------------------------------------------------------------------------
// Rule table
// ---------------------------------------------------------------------------

pub struct Probe<'a> {
    pub kind: ErrorKind,
    pub message: &'a str,
    lower: String,
}

impl<'a> Probe<'a> {
    pub fn new(kind: ErrorKind, message: &'a str) -> Self {
        Self {
            kind,
            message,
            lower: message.to_lowercase(),
        }
    }

    fn mentions(&self, needles: &[&str]) -> bool {
        needles.iter().any(|n| self.lower.contains(n))
    }

    fn completion(&self, kind: CompletionErrorKind) -> bool {
        self.kind == ErrorKind::Completion(kind)
    }
}

/// A fn-pointer rule, evaluated in table order.
pub struct ClassifyRule {
    pub id: &'static str,
    pub code: u32,
    pub condition: fn(&Probe) -> bool,
    pub prefix: &'static str,
}

pub fn default_rules() -> Vec<ClassifyRule> {
    use codes::*;
    use CompletionErrorKind as C;

    vec![
        // Typed kinds from the LLM boundary.
        ClassifyRule {
            id: "llm_rate_limit",
            code: API_LLM_RATE_LIMIT,
            condition: |p| p.completion(C::RateLimit),
            prefix: "LLM rate limit exceeded",
        },
        ClassifyRule {
            id: "llm_auth",
            code: API_LLM_AUTH_FAILED,
            condition: |p| p.completion(C::Auth),
            prefix: "LLM authentication failed",
        },
        ClassifyRule {
            id: "llm_token_limit",
            code: API_LLM_TOKEN_LIMIT,
            condition: |p| p.completion(C::TokenLimit),
            prefix: "LLM token limit exceeded",
        },
        ClassifyRule {
            id: "llm_invalid_request",
            code: API_LLM_INVALID_REQUEST,
            condition: |p| p.completion(C::InvalidRequest),
            prefix: "LLM rejected the request",
        },
        ClassifyRule {
            id: "llm_timeout",
            code: API_NETWORK_TIMEOUT,
            condition: |p| p.completion(C::Timeout),
            prefix: "LLM request timed out",
        },
        ClassifyRule {
            id: "llm_network",
            code: API_NETWORK_CONNECTION,
            condition: |p| p.completion(C::Network),
            prefix: "Could not reach the LLM service",
        },
        ClassifyRule {
            id: "llm_request",
            code: API_LLM_REQUEST_FAILED,
            condition: |p| matches!(p.kind, ErrorKind::Completion(_)),
            prefix: "LLM request failed",
        },
        // Parsing and shape.
        ClassifyRule {
            id: "json_decode",
            code: VALIDATION_JSON_DECODE,
            condition: |p| matches!(p.kind, ErrorKind::MalformedResponse | ErrorKind::Json),
            prefix: "Invalid JSON",
        },
        ClassifyRule {
            id: "schema",
            code: VALIDATION_SCHEMA,
            condition: |p| p.kind == ErrorKind::SchemaViolation,
            prefix: "Response does not match the expected schema",
        },
        // Filesystem.
        ClassifyRule {
            id: "file_not_found",
            code: RESOURCE_FILE_NOT_FOUND,
            condition: |p| p.kind == ErrorKind::Io(std::io::ErrorKind::NotFound),
            prefix: "File not found",
        },
        ClassifyRule {
            id: "file_permission",
            code: RESOURCE_FILE_PERMISSION,
            condition: |p| p.kind == ErrorKind::Io(std::io::ErrorKind::PermissionDenied),
            prefix: "Permission denied",
        },
        ClassifyRule {
            id: "file_io",
            code: RESOURCE_FILE_READ_ERROR,
            condition: |p| matches!(p.kind, ErrorKind::Io(_)),
            prefix: "File I/O failed",
        },
        // Configuration.
        ClassifyRule {
            id: "config_api_key",
            code: CONFIG_API_KEY_MISSING,
            condition: |p| p.kind == ErrorKind::Config && p.mentions(&["api key", "api_key"]),
            prefix: "API key is not configured",
        },
        ClassifyRule {
            id: "config_invalid",
            code: CONFIG_INVALID,
            condition: |p| matches!(p.kind, ErrorKind::Config | ErrorKind::Yaml),
            prefix: "Invalid configuration",
        },
        // Workflow outcomes.
        ClassifyRule {
            id: "design_rejected",
            code: BUSINESS_DESIGN_REJECTED,
            condition: |p| p.kind == ErrorKind::DesignRejected,
            prefix: "Design review rejected the design",
        },
        ClassifyRule {
            id: "panic",
            code: RUNTIME_PANIC,
            condition: |p| p.kind == ErrorKind::Internal,
            prefix: "Unexpected internal failure",
        },
        // Untyped failures: message text only.
        ClassifyRule {
            id: "quota_exceeded",
            code: BUSINESS_QUOTA_EXCEEDED,
            condition: |p| p.mentions(&["quota"]) && p.mentions(&["exceeded", "exhausted"]),
            prefix: "Quota exceeded",
        },
        ClassifyRule {
            id: "quota_insufficient",
            code: BUSINESS_QUOTA_INSUFFICIENT,
            condition: |p| p.mentions(&["quota", "insufficient"]),
            prefix: "Insufficient quota",
        },
        ClassifyRule {
            id: "balance_overdue",
            code: BUSINESS_BALANCE_OVERDUE,
            condition: |p| p.mentions(&["balance", "overdue", "arrears"]),
            prefix: "Account balance overdue",
        },
        ClassifyRule {
            id: "api_key",
            code: CONFIG_API_KEY_MISSING,
            condition: |p| p.mentions(&["api key", "api_key"]),
            prefix: "API key problem",
        },
        ClassifyRule {
            id: "rate_limit",
            code: API_LLM_RATE_LIMIT,
            condition: |p| p.mentions(&["rate limit", "429"]),
            prefix: "Rate limited",
        },
        ClassifyRule {
            id: "timeout",
            code: RUNTIME_TIMEOUT,
            condition: |p| p.mentions(&["timeout", "timed out"]),
            prefix: "Operation timed out",
        },
        ClassifyRule {
            id: "connection",
            code: API_NETWORK_CONNECTION,
            condition: |p| p.mentions(&["connection", "connect"]),
            prefix: "Connection failed",
        },
        ClassifyRule {
            id: "not_found",
            code: RESOURCE_FILE_NOT_FOUND,
            condition: |p| p.mentions(&["no such file", "not found"]),
            prefix: "Not found",
        },
        ClassifyRule {
            id: "failed",
            code: BUSINESS_NODE_FAILED,
            condition: |p| p.mentions(&["failed"]),
            prefix: "Workflow step failed",
        },
    ]
}

// ---------------------------------------------------------------------------
// ErrorClassifier
// ---------------------------------------------------------------------------

pub struct ErrorClassifier {
    rules: Vec<ClassifyRule>,
}

impl Default for ErrorClassifier {
    fn default() -> Self {
        Self::new(default_rules())
    }
}

impl ErrorClassifier {
    pub fn new(rules: Vec<ClassifyRule>) -> Self {
        Self { rules }
    }

    /// Classify by kind and message. Pure: no I/O, same input, same code.
    pub fn classify_parts(
        &self,
        kind: ErrorKind,
        message: &str,
        context: BTreeMap<String, String>,
    ) -> CodedError {
        let probe = Probe::new(kind, message);
        let (code, prefix) = self
            .rules
            .iter()
            .find(|r| (r.condition)(&probe))
            .map_or((codes::UNKNOWN_EXCEPTION, "Unhandled error"), |r| {
                (r.code, r.prefix)
            });
        CodedError {
            code,
            message: format!("{prefix}: {message}"),
            context,
        }
    }

    /// An already-coded error keeps its code and message; `context` is
    /// merged over its existing context.
    pub fn classify(&self, err: &SkillError, context: BTreeMap<String, String>) -> CodedError {
        if let SkillError::Coded(existing) = err {
            let mut merged = existing.clone();
            merged.context.extend(context);
            return merged;
        }
        self.classify_parts(err.kind(), &err.to_string(), context)
    }
}

fn shared() -> &'static ErrorClassifier {
    static CLASSIFIER: OnceLock<ErrorClassifier> = OnceLock::new();
    CLASSIFIER.get_or_init(ErrorClassifier::default)
}

/// Classify with the default rule table.
pub fn classify(err: &SkillError, context: BTreeMap<String, String>) -> CodedError {
    shared().classify(err, context)
}

pub fn classify_parts(kind: ErrorKind, message: &str, context: BTreeMap<String, String>) -> CodedError {
    shared().classify_parts(kind, message, context)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CompletionError;

    fn ctx(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn category_is_leading_digit() {
        assert_eq!(ErrorCategory::from_code(codes::VALIDATION_SCHEMA), ErrorCategory::Validation);
        assert_eq!(ErrorCategory::from_code(codes::API_NETWORK_TIMEOUT), ErrorCategory::Api);
        assert_eq!(
            ErrorCategory::from_code(codes::BUSINESS_DESIGN_REJECTED),
            ErrorCategory::Business
        );
        assert_eq!(ErrorCategory::from_code(codes::UNKNOWN_EXCEPTION), ErrorCategory::Unknown);
        assert_eq!(ErrorCategory::from_code(42), ErrorCategory::Unknown);
    }

    #[test]
    fn typed_completion_kinds_map_directly() {
        let cases = [
            (CompletionErrorKind::RateLimit, codes::API_LLM_RATE_LIMIT),
            (CompletionErrorKind::Auth, codes::API_LLM_AUTH_FAILED),
            (CompletionErrorKind::TokenLimit, codes::API_LLM_TOKEN_LIMIT),
            (CompletionErrorKind::InvalidRequest, codes::API_LLM_INVALID_REQUEST),
            (CompletionErrorKind::Timeout, codes::API_NETWORK_TIMEOUT),
            (CompletionErrorKind::Network, codes::API_NETWORK_CONNECTION),
            (CompletionErrorKind::Api, codes::API_LLM_REQUEST_FAILED),
        ];
        for (kind, code) in cases {
            let err = SkillError::from(CompletionError::new(kind, "boom"));
            assert_eq!(classify(&err, BTreeMap::new()).code, code, "{kind}");
        }
    }

    #[test]
    fn typed_kind_beats_message_text() {
        // The message says "timeout" but the kind says schema.
        let err = SkillError::schema("task_plan", "timeout field missing");
        assert_eq!(classify(&err, BTreeMap::new()).code, codes::VALIDATION_SCHEMA);
    }

    #[test]
    fn io_kinds() {
        let nf = SkillError::from(std::io::Error::new(std::io::ErrorKind::NotFound, "x"));
        assert_eq!(classify(&nf, BTreeMap::new()).code, codes::RESOURCE_FILE_NOT_FOUND);
        let perm = SkillError::from(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "x"));
        assert_eq!(classify(&perm, BTreeMap::new()).code, codes::RESOURCE_FILE_PERMISSION);
    }

    #[test]
    fn untyped_messages_cascade() {
        let code = |m: &str| classify(&SkillError::Failed(m.into()), BTreeMap::new()).code;
        assert_eq!(code("quota exceeded for today"), codes::BUSINESS_QUOTA_EXCEEDED);
        assert_eq!(code("insufficient quota"), codes::BUSINESS_QUOTA_INSUFFICIENT);
        assert_eq!(code("account balance is overdue"), codes::BUSINESS_BALANCE_OVERDUE);
        assert_eq!(code("missing API key"), codes::CONFIG_API_KEY_MISSING);
        assert_eq!(code("connection reset by peer"), codes::API_NETWORK_CONNECTION);
        assert_eq!(code("step failed"), codes::BUSINESS_NODE_FAILED);
        assert_eq!(code("something odd"), codes::UNKNOWN_EXCEPTION);
    }

    #[test]
    fn classification_is_stable() {
        let err = SkillError::Internal("worker panicked".into());
        let a = classify(&err, ctx(&[("stage", "design")]));
        let b = classify(&err, ctx(&[("stage", "design")]));
        assert_eq!(a, b);
        assert_eq!(a.code, codes::RUNTIME_PANIC);
        assert_eq!(a.category(), ErrorCategory::Runtime);
    }

    #[test]
    fn coded_errors_merge_context_and_keep_code() {
        let first = classify(
            &SkillError::DesignRejected { critical: 1 },
            ctx(&[("stage", "design_review")]),
        );
        assert_eq!(first.code, codes::BUSINESS_DESIGN_REJECTED);

        let again = classify(&SkillError::Coded(first.clone()), ctx(&[("attempt", "2")]));
        assert_eq!(again.code, first.code);
        assert_eq!(again.message, first.message);
        assert_eq!(again.context["stage"], "design_review");
        assert_eq!(again.context["attempt"], "2");
    }

    #[test]
    fn custom_rule_table() {
        let classifier = ErrorClassifier::new(vec![ClassifyRule {
            id: "everything",
            code: codes::INTEGRATION_SERVICE_FAILED,
            condition: |_| true,
            prefix: "Integration",
        }]);
        let coded = classifier.classify(&SkillError::Failed("x".into()), BTreeMap::new());
        assert_eq!(coded.category(), ErrorCategory::Integration);
        assert_eq!(coded.to_string(), "[800101] Integration: x");
    }
}
