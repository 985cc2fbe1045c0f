use super::design::save_design;
use super::{required, Skills};
use crate::agents::GenerationContext;
use crate::artifact::{ApiSpec, Architecture, Requirement};
use crate::error::{Result, SkillError};
use crate::paths;
use crate::score::ReviewReport;
use crate::sink::write_json;
use crate::task::TaskPlan;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{info, warn};

/// Accepted and recorded; the pipeline runs the same way in every mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CodeMode {
    #[default]
    Auto,
    SemiAuto,
    Manual,
}

impl CodeMode {
    pub fn as_str(self) -> &'static str {
        match self {
            CodeMode::Auto => "auto",
            CodeMode::SemiAuto => "semi-auto",
            CodeMode::Manual => "manual",
        }
    }
}

impl fmt::Display for CodeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CodeMode {
    type Err = SkillError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "auto" => Ok(CodeMode::Auto),
            "semi-auto" => Ok(CodeMode::SemiAuto),
            "manual" => Ok(CodeMode::Manual),
            other => Err(SkillError::Config(format!(
                "unknown mode '{other}' (expected auto, semi-auto or manual)"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CodeOutcome {
    pub mode: CodeMode,
    pub requirement: Requirement,
    pub architecture: Architecture,
    pub api_spec: ApiSpec,
    pub task_plan: TaskPlan,
    pub generated_files: Vec<String>,
    pub completed_tasks: Vec<String>,
    pub failed_tasks: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review: Option<ReviewReport>,
    pub saved: Vec<String>,
}

impl Skills<'_> {
    /// The plain six-step pipeline. Task failures are skipped and a failed
    /// review is omitted; any other agent failure aborts.
    pub fn code(&self, requirement: &str, mode: CodeMode) -> Result<CodeOutcome> {
        info!(mode = %mode, "Step 1/6: analyzing requirements");
        let req = required(self.agents.requirement_analyst.execute(self.llm, requirement))?;
        info!("Step 2/6: designing architecture");
        let architecture = required(self.agents.system_architect.execute(self.llm, &req))?;
        info!("Step 3/6: designing API");
        let api_spec = required(self.agents.api_designer.execute(self.llm, &req, &architecture))?;
        info!("Step 4/6: planning tasks");
        let task_plan = required(self.agents.task_planner.execute(
            self.llm,
            &req,
            &architecture,
            &api_spec,
        ))?;
        info!(tasks = task_plan.tasks.len(), "Step 5/6: generating code");

        let context = GenerationContext::Design {
            requirement: &req,
            architecture: &architecture,
            api_spec: &api_spec,
        };
        let output = self
            .agents
            .code_generator
            .run_plan(self.llm, self.sink, &task_plan, &context);
        let generated_files = output.paths();
        let completed_tasks = output.completed;
        let failed_tasks = output.failed;
        let written = output.written;

        info!(files = written.len(), "Step 6/6: reviewing code");
        let review = match self.agents.code_reviewer.execute(self.llm, &written, &req) {
            Ok(review) => Some(review),
            Err(f) => {
                warn!(error = %f.error, "code review failed");
                None
            }
        };

        let mut saved = save_design(self.sink, &req, &architecture, &api_spec)?;
        if let Some(review) = &review {
            write_json(self.sink, paths::CODE_REVIEW_DOC, review)?;
            saved.push(paths::CODE_REVIEW_DOC.to_string());
        }

        Ok(CodeOutcome {
            mode,
            requirement: req,
            architecture,
            api_spec,
            task_plan,
            generated_files,
            completed_tasks,
            failed_tasks,
            review,
            saved,
        })
    }
}
