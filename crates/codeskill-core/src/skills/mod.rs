//! One-shot skills: shorter pipelines over the same stage agents, without
//! stage reports, checkpoints or the design gate.

pub mod code;
pub mod design;
pub mod refactor;
pub mod review;

pub use code::{CodeMode, CodeOutcome};
pub use design::DesignOutcome;
pub use refactor::RefactorOutcome;
pub use review::{discover, ReviewOptions, ReviewOutcome};

use crate::agents::{AgentResult, Agents, LlmClient};
use crate::error::Result;
use crate::sink::ProjectSink;
use tracing::warn;

pub struct Skills<'a> {
    llm: &'a dyn LlmClient,
    sink: &'a dyn ProjectSink,
    agents: Agents,
}

impl<'a> Skills<'a> {
    pub fn new(llm: &'a dyn LlmClient, sink: &'a dyn ProjectSink, agents: Agents) -> Self {
        Self { llm, sink, agents }
    }
}

/// Unwrap an agent step that the skill cannot continue without.
fn required<T>(step: AgentResult<T>) -> Result<T> {
    step.map_err(|f| {
        warn!(
            agent = f.agent,
            has_raw_response = f.raw_response.is_some(),
            error = %f.error,
            "agent failed"
        );
        f.into()
    })
}
