//! Bounded whole-workflow retry with an append-only fix log.
//!
//! Each failed attempt is classified and logged with a strategy name, then the
//! workflow is re-run from stage 1 after a fixed delay. The strategy is only
//! recorded; every retry is identical.

use crate::coordinator::{Coordinator, WorkflowRequest, WorkflowResult};
use crate::error::{CompletionErrorKind, ErrorKind, Result};
use crate::paths;
use crate::report::Stage;
use crate::sink::{write_json, ProjectSink};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Duration;
use tracing::{info, warn};

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Anything that can run the whole workflow once. The wrapper treats it as
/// a restartable black box.
pub trait Workflow {
    fn execute(&self, request: &WorkflowRequest) -> WorkflowResult;
}

impl Workflow for Coordinator<'_> {
    fn execute(&self, request: &WorkflowRequest) -> WorkflowResult {
        Coordinator::execute(self, request)
    }
}

// ---------------------------------------------------------------------------
// ErrorType
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    Parsing,
    Api,
    Validation,
    Generation,
    File,
    Network,
    Timeout,
    Unknown,
}

struct TypeRule {
    error_type: ErrorType,
    matches: fn(Option<ErrorKind>, &str) -> bool,
}

/// Typed kinds first, then substrings of `"<kind> <message>"` lowercased.
const TYPE_RULES: &[TypeRule] = &[
    TypeRule {
        error_type: ErrorType::Parsing,
        matches: |k, _| matches!(k, Some(ErrorKind::MalformedResponse | ErrorKind::Json)),
    },
    TypeRule {
        error_type: ErrorType::Validation,
        matches: |k, _| k == Some(ErrorKind::SchemaViolation),
    },
    TypeRule {
        error_type: ErrorType::Timeout,
        matches: |k, _| k == Some(ErrorKind::Completion(CompletionErrorKind::Timeout)),
    },
    TypeRule {
        error_type: ErrorType::Network,
        matches: |k, _| k == Some(ErrorKind::Completion(CompletionErrorKind::Network)),
    },
    TypeRule {
        error_type: ErrorType::Api,
        matches: |k, _| matches!(k, Some(ErrorKind::Completion(_))),
    },
    TypeRule {
        error_type: ErrorType::File,
        matches: |k, _| matches!(k, Some(ErrorKind::Io(_))),
    },
    TypeRule {
        error_type: ErrorType::Parsing,
        matches: |_, s| s.contains("json"),
    },
    TypeRule {
        error_type: ErrorType::Api,
        matches: |_, s| s.contains("api") || s.contains("anthropic"),
    },
    TypeRule {
        error_type: ErrorType::Network,
        matches: |_, s| s.contains("network") || s.contains("connection"),
    },
    TypeRule {
        error_type: ErrorType::Timeout,
        matches: |_, s| s.contains("timeout"),
    },
    TypeRule {
        error_type: ErrorType::File,
        matches: |_, s| s.contains("file"),
    },
    TypeRule {
        error_type: ErrorType::Validation,
        matches: |_, s| s.contains("validation") || s.contains("invalid"),
    },
    TypeRule {
        error_type: ErrorType::Generation,
        matches: |_, s| s.contains("generation") || s.contains("generate"),
    },
];

impl ErrorType {
    /// First matching rule wins; no match is `Unknown`.
    pub fn classify(kind: Option<ErrorKind>, message: &str) -> Self {
        let haystack = match kind {
            Some(k) => format!("{k} {message}").to_lowercase(),
            None => message.to_lowercase(),
        };
        TYPE_RULES
            .iter()
            .find(|rule| (rule.matches)(kind, &haystack))
            .map_or(ErrorType::Unknown, |rule| rule.error_type)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorType::Parsing => "parsing",
            ErrorType::Api => "api",
            ErrorType::Validation => "validation",
            ErrorType::Generation => "generation",
            ErrorType::File => "file",
            ErrorType::Network => "network",
            ErrorType::Timeout => "timeout",
            ErrorType::Unknown => "unknown",
        }
    }

    /// The remediation name logged for this type. Nothing acts on it.
    pub fn strategy(self) -> &'static str {
        match self {
            ErrorType::Parsing => "Improved JSON extraction",
            ErrorType::Api => "Retry with exponential backoff",
            ErrorType::Network => "Retry after network recovery",
            ErrorType::Timeout => "Retry with increased timeout",
            ErrorType::Generation => "Simplified task breakdown",
            ErrorType::Validation => "Relaxed validation rules",
            ErrorType::File => "Ensure directory exists",
            ErrorType::Unknown => "Generic retry",
        }
    }
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ErrorContext
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorContext {
    pub stage: String,
    pub error_type: ErrorType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<u32>,
    pub error_message: String,
    pub exception_type: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub additional_info: BTreeMap<String, String>,
}

impl ErrorContext {
    pub fn from_result(result: &WorkflowResult, attempt: u32) -> Self {
        let message = result
            .error
            .clone()
            .unwrap_or_else(|| "workflow failed without an error message".to_string());
        let mut additional_info = BTreeMap::new();
        additional_info.insert("run_id".to_string(), result.run_id.clone());
        additional_info.insert("attempt".to_string(), attempt.to_string());
        additional_info.insert(
            "stages_completed".to_string(),
            result.stages_completed.join(","),
        );
        Self {
            stage: stage_name(result.stage),
            error_type: ErrorType::classify(result.error_kind, &message),
            error_code: result.error_code,
            exception_type: result
                .error_kind
                .map_or_else(|| "other".to_string(), |k| k.to_string()),
            error_message: message,
            timestamp: Utc::now(),
            additional_info,
        }
    }

    /// `[TYPE] kind: first 100 chars of the message`
    pub fn short_description(&self) -> String {
        let head: String = self.error_message.chars().take(100).collect();
        format!(
            "[{}] {}: {}",
            self.error_type.as_str().to_uppercase(),
            self.exception_type,
            head
        )
    }
}

fn stage_name(stage: Option<Stage>) -> String {
    stage.map_or("workflow", Stage::as_str).to_string()
}

// ---------------------------------------------------------------------------
// FixLogger
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixStatus {
    Attempting,
    Success,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixRecord {
    pub stage: String,
    pub attempt: u32,
    pub timestamp: DateTime<Utc>,
    pub error: ErrorContext,
    pub fix_strategy: String,
    pub status: FixStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixSummary {
    pub total_attempts: usize,
    pub successful_fixes: usize,
    pub failed_fixes: usize,
    pub success_rate: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixLog {
    pub fix_records: Vec<FixRecord>,
    pub summary: FixSummary,
}

/// Append-only record of retry attempts. Records only move from
/// `attempting` to `success` or `failed`.
#[derive(Debug, Default)]
pub struct FixLogger {
    records: Vec<FixRecord>,
}

impl FixLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[FixRecord] {
        &self.records
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn log_attempt(&mut self, stage: &str, attempt: u32, error: ErrorContext, strategy: &str) {
        info!(stage, attempt, strategy, "{}", error.short_description());
        self.records.push(FixRecord {
            stage: stage.to_string(),
            attempt,
            timestamp: Utc::now(),
            error,
            fix_strategy: strategy.to_string(),
            status: FixStatus::Attempting,
            resolved_at: None,
            failed_at: None,
            failure_reason: None,
        });
    }

    /// Marks the latest matching record. No match is a no-op.
    pub fn log_success(&mut self, stage: &str, attempt: u32) {
        if let Some(record) = self.latest_mut(stage, attempt) {
            record.status = FixStatus::Success;
            record.resolved_at = Some(Utc::now());
        }
    }

    pub fn log_failure(&mut self, stage: &str, attempt: u32, reason: &str) {
        if let Some(record) = self.latest_mut(stage, attempt) {
            record.status = FixStatus::Failed;
            record.failed_at = Some(Utc::now());
            record.failure_reason = Some(reason.to_string());
        }
    }

    fn latest_mut(&mut self, stage: &str, attempt: u32) -> Option<&mut FixRecord> {
        self.records
            .iter_mut()
            .rev()
            .find(|r| r.stage == stage && r.attempt == attempt && r.status == FixStatus::Attempting)
    }

    pub fn summary(&self) -> FixSummary {
        let total = self.records.len();
        let successful = self.count(FixStatus::Success);
        let success_rate = if total == 0 {
            "0%".to_string()
        } else {
            format!("{:.1}%", successful as f64 / total as f64 * 100.0)
        };
        FixSummary {
            total_attempts: total,
            successful_fixes: successful,
            failed_fixes: self.count(FixStatus::Failed),
            success_rate,
        }
    }

    fn count(&self, status: FixStatus) -> usize {
        self.records.iter().filter(|r| r.status == status).count()
    }

    pub fn summary_line(&self) -> String {
        let s = self.summary();
        format!(
            "Fix Attempts: {} | Successful: {} | Failed: {} | Success Rate: {}",
            s.total_attempts, s.successful_fixes, s.failed_fixes, s.success_rate
        )
    }

    /// Write `docs/fix_log.json`, even with no records.
    pub fn save(&self, sink: &dyn ProjectSink) -> Result<String> {
        let log = FixLog {
            fix_records: self.records.clone(),
            summary: self.summary(),
        };
        write_json(sink, paths::FIX_LOG_FILE, &log)?;
        Ok(paths::FIX_LOG_FILE.to_string())
    }
}

// ---------------------------------------------------------------------------
// SelfHealing
// ---------------------------------------------------------------------------

pub struct SelfHealing<'a, W> {
    workflow: W,
    sink: &'a dyn ProjectSink,
    max_retries: u32,
    retry_delay: Duration,
}

impl<'a, W: Workflow> SelfHealing<'a, W> {
    pub fn new(workflow: W, sink: &'a dyn ProjectSink) -> Self {
        Self {
            workflow,
            sink,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }

    /// At least one attempt always runs.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn execute(&self, request: &WorkflowRequest) -> WorkflowResult {
        let mut logger = FixLogger::new();
        let mut attempt = 1;
        loop {
            info!(attempt, max_retries = self.max_retries, "workflow attempt");
            let mut result = self.attempt(request);

            if result.success {
                // Records only exist for earlier failed attempts, so none is
                // marked successful here.
                if logger.is_empty() {
                    self.save(&logger);
                } else {
                    self.annotate(&mut result, &logger);
                }
                return result;
            }

            let context = ErrorContext::from_result(&result, attempt);
            let stage = context.stage.clone();
            let strategy = context.error_type.strategy();
            warn!(
                attempt,
                stage = %stage,
                error_type = %context.error_type,
                "workflow attempt failed"
            );
            logger.log_attempt(&stage, attempt, context, strategy);

            if attempt >= self.max_retries {
                logger.log_failure(&stage, attempt, "Max retries reached");
                warn!(attempts = attempt, "giving up: max retries reached");
                self.annotate(&mut result, &logger);
                return result;
            }

            std::thread::sleep(self.retry_delay);
            attempt += 1;
        }
    }

    /// A panicking workflow counts as a failed attempt.
    fn attempt(&self, request: &WorkflowRequest) -> WorkflowResult {
        catch_unwind(AssertUnwindSafe(|| self.workflow.execute(request))).unwrap_or_else(|_| {
            WorkflowResult::internal_failure("workflow panicked outside the coordinator")
        })
    }

    fn annotate(&self, result: &mut WorkflowResult, logger: &FixLogger) {
        result.fix_summary = Some(logger.summary_line());
        result.fix_log_path = self.save(logger);
    }

    fn save(&self, logger: &FixLogger) -> Option<String> {
        logger
            .save(self.sink)
            .map_err(|e| warn!(error = %e, "could not save fix log"))
            .ok()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
