use super::{invoke, render, AgentProfile, AgentResult, LlmClient, JSON_ONLY};
use crate::artifact::{ApiSpec, Architecture, Requirement};
use crate::task::{Task, TaskPlan};

pub const NAME: &str = "task_planner";

const SYSTEM: &str = "You are a task planner. You break projects into small, ordered \
development tasks with explicit dependencies.";

pub fn profile() -> AgentProfile {
    AgentProfile::new(NAME, 0.5, 8000)
}

#[derive(Debug, Clone)]
pub struct TaskPlanner {
    profile: AgentProfile,
}

impl Default for TaskPlanner {
    fn default() -> Self {
        Self::new(profile())
    }
}

impl TaskPlanner {
    pub fn new(profile: AgentProfile) -> Self {
        Self { profile }
    }

    pub fn profile(&self) -> &AgentProfile {
        &self.profile
    }

    /// The returned plan has unique ids and only in-plan dependencies.
    pub fn execute(
        &self,
        llm: &dyn LlmClient,
        requirement: &Requirement,
        architecture: &Architecture,
        api_spec: &ApiSpec,
    ) -> AgentResult<TaskPlan> {
        invoke(
            llm,
            &self.profile,
            SYSTEM,
            prompt(requirement, architecture, api_spec),
        )
    }

    /// See [`crate::task::next_ready_task`].
    pub fn next_ready_task<'p, S: AsRef<str>>(
        &self,
        plan: &'p TaskPlan,
        completed: &[S],
    ) -> Option<&'p Task> {
        crate::task::next_ready_task(plan, completed)
    }
}

fn prompt(requirement: &Requirement, architecture: &Architecture, api_spec: &ApiSpec) -> String {
    let requirement = render(requirement);
    let architecture = render(architecture);
    let api_spec = render(api_spec);
    format!(
        r#"Break the project below into executable development tasks.

Requirement:
{requirement}

Architecture:
{architecture}

API Specification:
{api_spec}

Use exactly this shape:
{{
    "tasks": [
        {{
            "id": "task_001",
            "title": "Task title",
            "description": "What to build",
            "type": "setup|backend|frontend|database|testing|documentation",
            "priority": 1,
            "dependencies": ["id of a task in this list that must finish first"],
            "estimated_complexity": "low|medium|high",
            "files_to_create": [{{"path": "relative/path/to/file", "description": "Contents"}}],
            "acceptance_criteria": ["Criterion"]
        }}
    ],
    "estimated_effort": "e.g. 3 days"
}}

Every dependency must be the id of another task in the list. Order tasks so that
dependencies come first. {JSON_ONLY}"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::MockLlm;
    use crate::error::SkillError;
    use serde_json::json;

    fn requirement() -> Requirement {
        serde_json::from_value(json!({"title": "T", "description": "D", "type": "web"})).unwrap()
    }

    #[test]
    fn dangling_dependency_is_rejected() {
        let llm = MockLlm::new();
        llm.push_json(json!({
            "tasks": [{"id": "t1", "title": "one", "dependencies": ["t9"]}]
        }));
        let err = TaskPlanner::default()
            .execute(&llm, &requirement(), &Architecture::default(), &ApiSpec::default())
            .unwrap_err();
        assert!(matches!(err.error, SkillError::SchemaViolation { .. }));
        assert!(err.raw_response.is_some());
    }

    #[test]
    fn plan_keeps_list_order() {
        let llm = MockLlm::new();
        llm.push_json(json!({
            "tasks": [
                {"id": "t1", "title": "one"},
                {"id": "t2", "title": "two", "dependencies": ["t1"]}
            ],
            "estimated_effort": "2 days"
        }));
        let plan = TaskPlanner::default()
            .execute(&llm, &requirement(), &Architecture::default(), &ApiSpec::default())
            .unwrap();
        let ids: Vec<_> = plan.tasks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, ["t1", "t2"]);
        assert_eq!(plan.estimated_effort.as_deref(), Some("2 days"));
    }

    #[test]
    fn frontier_follows_dependencies() {
        let llm = MockLlm::new();
        llm.push_json(json!({
            "tasks": [
                {"id": "a", "title": "A"},
                {"id": "b", "title": "B", "dependencies": ["a"]},
                {"id": "c", "title": "C", "dependencies": ["b"]}
            ]
        }));
        let planner = TaskPlanner::default();
        let plan = planner
            .execute(&llm, &requirement(), &Architecture::default(), &ApiSpec::default())
            .unwrap();

        let none: [&str; 0] = [];
        assert_eq!(planner.next_ready_task(&plan, &none).unwrap().id, "a");
        assert_eq!(planner.next_ready_task(&plan, &["a"]).unwrap().id, "b");
        assert!(planner.next_ready_task(&plan, &["a", "b", "c"]).is_none());
    }
}
