use crate::artifact::Validate;
use crate::error::{Result, SkillError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

// ---------------------------------------------------------------------------
// TaskPlan
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskPlan {
    pub tasks: Vec<Task>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_effort: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub task_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_complexity: Option<String>,
    #[serde(default)]
    pub files_to_create: Vec<PlannedFile>,
    #[serde(default)]
    pub acceptance_criteria: Vec<String>,
}

/// Carried through to reports but never consulted for ordering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Priority {
    Rank(i64),
    Label(String),
}

/// Planners emit either a bare path or `{path, description}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PlannedFile {
    Path(String),
    Described {
        path: String,
        #[serde(default)]
        description: String,
    },
}

impl PlannedFile {
    pub fn path(&self) -> &str {
        match self {
            PlannedFile::Path(p) => p,
            PlannedFile::Described { path, .. } => path,
        }
    }
}

impl Task {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            task_type: None,
            priority: None,
            dependencies: Vec::new(),
            estimated_complexity: None,
            files_to_create: Vec::new(),
            acceptance_criteria: Vec::new(),
        }
    }

    pub fn with_dependencies(mut self, deps: &[&str]) -> Self {
        self.dependencies = deps.iter().map(|d| d.to_string()).collect();
        self
    }

    pub fn type_or_other(&self) -> &str {
        self.task_type.as_deref().unwrap_or("other")
    }
}

impl Validate for TaskPlan {
    const ARTIFACT: &'static str = "task_plan";

    /// Ids are unique and every dependency names a task in this plan.
    fn validate(&self) -> Result<()> {
        let mut ids = HashSet::new();
        for task in &self.tasks {
            if task.id.trim().is_empty() {
                return Err(SkillError::schema(Self::ARTIFACT, "task id must not be empty"));
            }
            if !ids.insert(task.id.as_str()) {
                return Err(SkillError::schema(
                    Self::ARTIFACT,
                    format!("duplicate task id '{}'", task.id),
                ));
            }
        }
        for task in &self.tasks {
            if let Some(dep) = task.dependencies.iter().find(|d| !ids.contains(d.as_str())) {
                return Err(SkillError::schema(
                    Self::ARTIFACT,
                    format!("task '{}' depends on unknown task '{}'", task.id, dep),
                ));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Frontier scan
// ---------------------------------------------------------------------------

/// First task, in plan order, that is not completed and whose dependencies
/// are all completed. `None` once everything left is done or blocked.
///
/// `priority` is ignored: ties go to list order.
pub fn next_ready_task<'a, S: AsRef<str>>(plan: &'a TaskPlan, completed: &[S]) -> Option<&'a Task> {
    let done: HashSet<&str> = completed.iter().map(AsRef::as_ref).collect();
    plan.tasks.iter().find(|t| {
        !done.contains(t.id.as_str()) && t.dependencies.iter().all(|d| done.contains(d.as_str()))
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn abc_plan() -> TaskPlan {
        TaskPlan {
            tasks: vec![
                Task::new("a", "A"),
                Task::new("b", "B").with_dependencies(&["a"]),
                Task::new("c", "C").with_dependencies(&["z"]),
            ],
            estimated_effort: None,
        }
    }

    #[test]
    fn frontier_skips_blocked_tasks() {
        let plan = abc_plan();
        assert_eq!(next_ready_task(&plan, &["a"]).map(|t| t.id.as_str()), Some("b"));
    }

    #[test]
    fn frontier_returns_none_when_only_blocked_remain() {
        let plan = abc_plan();
        assert!(next_ready_task(&plan, &["a", "b"]).is_none());
    }

    #[test]
    fn frontier_starts_with_roots() {
        let plan = abc_plan();
        let none: [&str; 0] = [];
        assert_eq!(next_ready_task(&plan, &none).map(|t| t.id.as_str()), Some("a"));
    }

    #[test]
    fn draining_the_frontier_terminates() {
        let plan = abc_plan();
        let mut completed: Vec<String> = Vec::new();
        while let Some(task) = next_ready_task(&plan, completed.as_slice()) {
            completed.push(task.id.clone());
            assert!(completed.len() <= plan.tasks.len());
        }
        assert_eq!(completed, vec!["a", "b"]);
    }

    #[test]
    fn priority_does_not_reorder() {
        let mut plan = TaskPlan::default();
        let mut low = Task::new("low", "Low");
        low.priority = Some(Priority::Rank(5));
        let mut high = Task::new("high", "High");
        high.priority = Some(Priority::Rank(1));
        plan.tasks = vec![low, high];
        let none: [&str; 0] = [];
        assert_eq!(next_ready_task(&plan, &none).map(|t| t.id.as_str()), Some("low"));
    }

    #[test]
    fn unknown_dependency_is_a_schema_violation() {
        let err = abc_plan().validate().unwrap_err();
        assert!(err.to_string().contains("unknown task 'z'"));
    }

    #[test]
    fn duplicate_ids_are_a_schema_violation() {
        let plan = TaskPlan {
            tasks: vec![Task::new("a", "A"), Task::new("a", "again")],
            estimated_effort: None,
        };
        assert!(matches!(plan.validate(), Err(SkillError::SchemaViolation { .. })));
    }

    #[test]
    fn deserializes_planner_output() {
        let plan: TaskPlan = serde_json::from_value(json!({
            "tasks": [{
                "id": "task_001",
                "title": "Scaffold",
                "type": "setup",
                "priority": 1,
                "dependencies": [],
                "files_to_create": [
                    {"path": "src/main.py", "description": "entry"},
                    "README.md"
                ]
            }, {
                "id": "task_002",
                "title": "Models",
                "priority": "high",
                "dependencies": ["task_001"]
            }]
        }))
        .unwrap();
        assert!(plan.validate().is_ok());
        assert_eq!(plan.tasks[0].files_to_create[1].path(), "README.md");
        assert_eq!(plan.tasks[1].priority, Some(Priority::Label("high".into())));
        assert_eq!(plan.tasks[1].type_or_other(), "other");
    }
}
