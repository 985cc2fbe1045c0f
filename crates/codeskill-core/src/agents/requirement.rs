use super::{invoke, AgentProfile, AgentResult, LlmClient, JSON_ONLY};
use crate::artifact::Requirement;

pub const NAME: &str = "requirement_analyst";

const SYSTEM: &str = "You are a requirement analyst. You turn loosely worded software \
requests into precise, structured requirements.";

pub fn profile() -> AgentProfile {
    AgentProfile::new(NAME, 0.3, 4096)
}

#[derive(Debug, Clone)]
pub struct RequirementAnalyst {
    profile: AgentProfile,
}

impl Default for RequirementAnalyst {
    fn default() -> Self {
        Self::new(profile())
    }
}

impl RequirementAnalyst {
    pub fn new(profile: AgentProfile) -> Self {
        Self { profile }
    }

    pub fn profile(&self) -> &AgentProfile {
        &self.profile
    }

    pub fn execute(&self, llm: &dyn LlmClient, requirement: &str) -> AgentResult<Requirement> {
        invoke(llm, &self.profile, SYSTEM, prompt(requirement))
    }
}

fn prompt(requirement: &str) -> String {
    format!(
        r#"Analyze the requirement below and restate it as structured JSON.

Requirement:
{requirement}

Use exactly this shape:
{{
    "title": "Short title",
    "description": "Full description of what is being built",
    "type": "web|mobile|backend|desktop|other",
    "features": [
        {{"name": "Feature name", "description": "What it does", "priority": "high|medium|low"}}
    ],
    "technical_requirements": ["Technical requirement"],
    "constraints": ["Constraint or limitation"],
    "success_criteria": ["Measurable success criterion"],
    "complexity": "low|medium|high",
    "estimated_tasks": 5
}}

{JSON_ONLY}"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::MockLlm;
    use serde_json::json;

    #[test]
    fn structured_requirement_from_fenced_reply() {
        let llm = MockLlm::new();
        llm.push_text(format!(
            "```json\n{}\n```",
            json!({
                "title": "Todo API",
                "description": "CRUD todos",
                "type": "backend",
                "features": [{"name": "create", "description": "add a todo", "priority": "high"}]
            })
        ));
        let req = RequirementAnalyst::default()
            .execute(&llm, "I need a todo API")
            .unwrap();
        assert_eq!(req.title, "Todo API");
        assert_eq!(req.features.len(), 1);

        let sent = &llm.requests()[0];
        assert!(sent.prompt.contains("I need a todo API"));
        assert!(sent.prompt.ends_with(JSON_ONLY));
        assert_eq!(sent.max_tokens, 4096);
    }
}
