//! Scripted [`LlmClient`] for tests and dry runs.

use super::{CompletionRequest, LlmClient};
use crate::error::{CompletionError, CompletionErrorKind};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Replays queued responses in order and records every request it sees.
/// An exhausted queue answers with an `InvalidResponse` failure.
#[derive(Debug, Default)]
pub struct MockLlm {
    responses: Mutex<VecDeque<Result<String, CompletionError>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockLlm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_text(&self, text: impl Into<String>) -> &Self {
        lock(&self.responses).push_back(Ok(text.into()));
        self
    }

    pub fn push_json(&self, value: serde_json::Value) -> &Self {
        self.push_text(value.to_string())
    }

    pub fn push_error(&self, kind: CompletionErrorKind, message: impl Into<String>) -> &Self {
        lock(&self.responses).push_back(Err(CompletionError::new(kind, message)));
        self
    }

    pub fn remaining(&self) -> usize {
        lock(&self.responses).len()
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        lock(&self.requests).clone()
    }

    /// Agent names in call order.
    pub fn calls(&self) -> Vec<String> {
        lock(&self.requests).iter().map(|r| r.agent.clone()).collect()
    }
}

impl LlmClient for MockLlm {
    fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        lock(&self.requests).push(request.clone());
        lock(&self.responses).pop_front().unwrap_or_else(|| {
            Err(CompletionError::new(
                CompletionErrorKind::InvalidResponse,
                "mock response queue is empty",
            ))
        })
    }
}
