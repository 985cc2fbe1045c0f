//! `llm-client`: text-in, text-out completion calls against
//! Anthropic-compatible (`/v1/messages`) and OpenAI-compatible
//! (`/v1/chat/completions`) HTTP services.
//!
//! ```text
//! CompletionRequest ──► Client::complete ──► anthropic | openai wire body
//!                                              │
//!                              HTTP status ────┤──► LlmError (typed kind)
//!                                              ▼
//!                                          Completion { text, usage, .. }
//! ```
//!
//! There is no retry inside this crate; callers decide.

pub mod client;
pub mod error;
pub mod types;

pub(crate) mod anthropic;
pub(crate) mod openai;


pub use client::Client;
pub use error::LlmError;
pub use types::{ClientConfig, Completion, CompletionRequest, Provider, TokenUsage};

/// Convenience `Result` alias for this crate.
pub type Result<T> = std::result::Result<T, LlmError>;
