use super::{invoke, render, AgentProfile, AgentResult, LlmClient, JSON_ONLY};
use crate::artifact::{ApiSpec, Architecture, GeneratedCode, Requirement, SourceFile};
use crate::sink::ProjectSink;
use crate::task::{Task, TaskPlan};
use serde::Serialize;
use tracing::{info, warn};

pub const NAME: &str = "code_generator";

const SYSTEM: &str = "You are a code generator. You write complete, production-ready \
source files with tests.";

pub fn profile() -> AgentProfile {
    AgentProfile::new(NAME, 0.3, 8000)
}

/// What the generator sees besides the task itself.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum GenerationContext<'a> {
    Design {
        requirement: &'a Requirement,
        architecture: &'a Architecture,
        api_spec: &'a ApiSpec,
    },
    Refactor {
        original_code: &'a str,
        refactor_goal: &'a str,
    },
}

#[derive(Debug, Clone)]
pub struct CodeGenerator {
    profile: AgentProfile,
}

impl Default for CodeGenerator {
    fn default() -> Self {
        Self::new(profile())
    }
}

impl CodeGenerator {
    pub fn new(profile: AgentProfile) -> Self {
        Self { profile }
    }

    pub fn profile(&self) -> &AgentProfile {
        &self.profile
    }

    pub fn execute(
        &self,
        llm: &dyn LlmClient,
        task: &Task,
        context: &GenerationContext<'_>,
    ) -> AgentResult<GeneratedCode> {
        invoke(llm, &self.profile, SYSTEM, prompt(task, context))
    }

    /// Generate every task in list order and write the results through
    /// `sink`. A failed task is recorded and skipped. A file that cannot be
    /// written is logged and left out; its task still counts as completed.
    pub fn run_plan(
        &self,
        llm: &dyn LlmClient,
        sink: &dyn ProjectSink,
        plan: &TaskPlan,
        context: &GenerationContext<'_>,
    ) -> PlanOutput {
        let total = plan.tasks.len();
        let mut out = PlanOutput::default();
        for (i, task) in plan.tasks.iter().enumerate() {
            info!("[{}/{}] {}", i + 1, total, task.title);
            let code = match self.execute(llm, task, context) {
                Ok(code) => code,
                Err(f) => {
                    warn!(task = %task.id, error = %f.error, "code generation failed; skipping task");
                    out.failed.push(task.id.clone());
                    continue;
                }
            };
            for file in code.all_files() {
                match sink.write(&file.path, file.content.as_bytes()) {
                    Ok(()) => out.written.push(file.clone()),
                    Err(e) => warn!(path = %file.path, error = %e, "could not write generated file"),
                }
            }
            out.completed.push(task.id.clone());
        }
        out
    }
}

/// Result of [`CodeGenerator::run_plan`].
#[derive(Debug, Default)]
pub struct PlanOutput {
    pub written: Vec<SourceFile>,
    pub completed: Vec<String>,
    pub failed: Vec<String>,
}

impl PlanOutput {
    pub fn paths(&self) -> Vec<String> {
        self.written.iter().map(|f| f.path.clone()).collect()
    }
}

fn prompt(task: &Task, context: &GenerationContext<'_>) -> String {
    let task = render(task);
    let context = render(context);
    format!(
        r#"Generate the code for this task.

Task:
{task}

Context:
{context}

Use exactly this shape:
{{
    "files": [
        {{"path": "relative/path/to/file", "content": "Complete file content", "language": "python|javascript|typescript|rust|..."}}
    ],
    "tests": [
        {{"path": "relative/path/to/test_file", "content": "Complete test file", "language": "..."}}
    ],
    "dependencies": ["New dependency, e.g. requests==2.31.0"],
    "setup_instructions": ["Setup step"]
}}

Write complete files with imports, error handling and documentation, plus unit tests.
Paths are relative to the project root. {JSON_ONLY}"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::MockLlm;
    use serde_json::json;

    #[test]
    fn refactor_context_reaches_prompt() {
        let llm = MockLlm::new();
        llm.push_json(json!({
            "files": [{"path": "app.py", "content": "print('hi')\n", "language": "python"}]
        }));
        let mut task = Task::new("refactor", "Refactor app.py");
        task.description = "tidy".into();
        let ctx = GenerationContext::Refactor {
            original_code: "print( 'hi' )",
            refactor_goal: "tidy",
        };
        let code = CodeGenerator::default().execute(&llm, &task, &ctx).unwrap();
        assert_eq!(code.files[0].path, "app.py");
        assert!(llm.requests()[0].prompt.contains("\"original_code\": \"print( 'hi' )\""));
    }

    #[test]
    fn run_plan_skips_failed_tasks_and_writes_files() {
        let dir = tempfile::TempDir::new().unwrap();
        let sink = crate::sink::FsSink::new(dir.path());
        let llm = MockLlm::new();
        llm.push_error(crate::error::CompletionErrorKind::Timeout, "slow");
        llm.push_json(json!({
            "files": [{"path": "src/app.py", "content": "x = 1\n", "language": "python"}],
            "tests": [{"path": "tests/test_app.py", "content": "def test(): pass\n"}]
        }));
        let plan = TaskPlan {
            tasks: vec![Task::new("t1", "One"), Task::new("t2", "Two")],
            estimated_effort: None,
        };
        let ctx = GenerationContext::Refactor {
            original_code: "",
            refactor_goal: "",
        };

        let out = CodeGenerator::default().run_plan(&llm, &sink, &plan, &ctx);
        assert_eq!(out.failed, ["t1"]);
        assert_eq!(out.completed, ["t2"]);
        assert_eq!(out.paths(), ["src/app.py", "tests/test_app.py"]);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("src/app.py")).unwrap(),
            "x = 1\n"
        );
    }
}
