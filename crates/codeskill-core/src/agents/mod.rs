//! Stage agents.
//!
//! Each agent owns one prompt template and one expected output type. An
//! invocation makes exactly one [`LlmClient::complete`] call, parses the
//! text with [`crate::parse::parse`], deserializes into the typed artifact
//! and runs its [`Validate`] checks. Retrying is the caller's business.

pub mod api_designer;
pub mod architect;
pub mod generator;
pub mod mock;
pub mod planner;
pub mod requirement;
pub mod reviewer;

pub use api_designer::ApiDesigner;
pub use architect::SystemArchitect;
pub use generator::{CodeGenerator, GenerationContext, PlanOutput};
pub use mock::MockLlm;
pub use planner::TaskPlanner;
pub use requirement::RequirementAnalyst;
pub use reviewer::CodeReviewer;

use crate::artifact::Validate;
use crate::config::{AgentOverride, Config, DEFAULT_MODEL};
use crate::error::{CompletionError, SkillError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::time::Instant;
use tracing::debug;

/// Names accepted under `agents:` in the config file.
pub const AGENT_NAMES: &[&str] = &[
    requirement::NAME,
    architect::NAME,
    api_designer::NAME,
    planner::NAME,
    generator::NAME,
    reviewer::NAME,
];

const JSON_ONLY: &str = "Respond with ONLY the JSON, no additional text.";

// ---------------------------------------------------------------------------
// LLM boundary
// ---------------------------------------------------------------------------

/// One completion call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    pub agent: String,
    pub model: String,
    pub system_prompt: String,
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Text in, text out. Implementations must not retry internally.
pub trait LlmClient {
    fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError>;
}

impl<T: LlmClient + ?Sized> LlmClient for &T {
    fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        (**self).complete(request)
    }
}

// ---------------------------------------------------------------------------
// AgentProfile
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct AgentProfile {
    pub name: &'static str,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl AgentProfile {
    pub fn new(name: &'static str, temperature: f32, max_tokens: u32) -> Self {
        Self {
            name,
            model: DEFAULT_MODEL.to_string(),
            temperature,
            max_tokens,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn apply(mut self, ov: Option<&AgentOverride>) -> Self {
        if let Some(ov) = ov {
            if let Some(m) = &ov.model {
                self.model = m.clone();
            }
            if let Some(t) = ov.temperature {
                self.temperature = t;
            }
            if let Some(n) = ov.max_tokens {
                self.max_tokens = n;
            }
        }
        self
    }

    fn request(&self, system_prompt: &str, prompt: String, max_tokens: u32) -> CompletionRequest {
        CompletionRequest {
            agent: self.name.to_string(),
            model: self.model.clone(),
            system_prompt: system_prompt.to_string(),
            prompt,
            temperature: self.temperature,
            max_tokens,
        }
    }
}

// ---------------------------------------------------------------------------
// AgentFailure
// ---------------------------------------------------------------------------

/// The `ok: false` side of an agent call. `raw_response` is kept whenever the
/// model did answer, so a parse or schema failure can be inspected.
#[derive(Debug)]
pub struct AgentFailure {
    pub agent: &'static str,
    pub error: SkillError,
    pub raw_response: Option<String>,
}

impl fmt::Display for AgentFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed: {}", self.agent, self.error)
    }
}

impl std::error::Error for AgentFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

impl From<AgentFailure> for SkillError {
    fn from(f: AgentFailure) -> Self {
        f.error
    }
}

pub type AgentResult<T> = Result<T, AgentFailure>;

// ---------------------------------------------------------------------------
// Shared invocation path
// ---------------------------------------------------------------------------

pub(crate) fn invoke<T>(
    llm: &dyn LlmClient,
    profile: &AgentProfile,
    system_prompt: &str,
    prompt: String,
) -> AgentResult<T>
where
    T: DeserializeOwned + Validate,
{
    invoke_with_budget(llm, profile, system_prompt, prompt, profile.max_tokens)
}

pub(crate) fn invoke_with_budget<T>(
    llm: &dyn LlmClient,
    profile: &AgentProfile,
    system_prompt: &str,
    prompt: String,
    max_tokens: u32,
) -> AgentResult<T>
where
    T: DeserializeOwned + Validate,
{
    let fail = |error: SkillError, raw: Option<&str>| AgentFailure {
        agent: profile.name,
        error,
        raw_response: raw.map(str::to_string),
    };

    let request = profile.request(system_prompt, prompt, max_tokens);
    debug!(
        agent = profile.name,
        model = %request.model,
        prompt_chars = request.prompt.len(),
        "calling LLM"
    );
    let started = Instant::now();
    let raw = llm
        .complete(&request)
        .map_err(|e| fail(e.into(), None))?;
    debug!(
        agent = profile.name,
        elapsed_ms = started.elapsed().as_millis() as u64,
        response_chars = raw.len(),
        "LLM responded"
    );

    let value = crate::parse::parse(&raw).map_err(|e| fail(e, Some(&raw)))?;
    let typed: T = serde_json::from_value(value)
        .map_err(|e| fail(SkillError::schema(T::ARTIFACT, e.to_string()), Some(&raw)))?;
    typed.validate().map_err(|e| fail(e, Some(&raw)))?;
    Ok(typed)
}

/// Pretty JSON for embedding inputs in a prompt.
pub(crate) fn render<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("<unrenderable: {e}>"))
}

// ---------------------------------------------------------------------------
// Agents roster
// ---------------------------------------------------------------------------

/// The six stage agents with their generation profiles resolved.
#[derive(Debug, Clone)]
pub struct Agents {
    pub requirement_analyst: RequirementAnalyst,
    pub system_architect: SystemArchitect,
    pub api_designer: ApiDesigner,
    pub task_planner: TaskPlanner,
    pub code_generator: CodeGenerator,
    pub code_reviewer: CodeReviewer,
}

impl Default for Agents {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl Agents {
    /// `llm.model` becomes every agent's model, then per-agent overrides apply.
    pub fn from_config(config: &Config) -> Self {
        let profile = |p: AgentProfile| {
            let name = p.name;
            p.with_model(config.llm.model.clone())
                .apply(config.agent_override(name))
        };
        Self {
            requirement_analyst: RequirementAnalyst::new(profile(requirement::profile())),
            system_architect: SystemArchitect::new(profile(architect::profile())),
            api_designer: ApiDesigner::new(profile(api_designer::profile())),
            task_planner: TaskPlanner::new(profile(planner::profile())),
            code_generator: CodeGenerator::new(profile(generator::profile())),
            code_reviewer: CodeReviewer::new(profile(reviewer::profile())),
        }
    }
}
