use super::{invoke, render, AgentProfile, AgentResult, LlmClient, JSON_ONLY};
use crate::artifact::{Architecture, Requirement};

pub const NAME: &str = "system_architect";

const SYSTEM: &str = "You are a system architect. You design pragmatic architectures \
that a small team can build and operate.";

pub fn profile() -> AgentProfile {
    AgentProfile::new(NAME, 0.4, 8000)
}

#[derive(Debug, Clone)]
pub struct SystemArchitect {
    profile: AgentProfile,
}

impl Default for SystemArchitect {
    fn default() -> Self {
        Self::new(profile())
    }
}

impl SystemArchitect {
    pub fn new(profile: AgentProfile) -> Self {
        Self { profile }
    }

    pub fn profile(&self) -> &AgentProfile {
        &self.profile
    }

    pub fn execute(&self, llm: &dyn LlmClient, requirement: &Requirement) -> AgentResult<Architecture> {
        invoke(llm, &self.profile, SYSTEM, prompt(requirement))
    }
}

fn prompt(requirement: &Requirement) -> String {
    let requirement = render(requirement);
    format!(
        r#"Design the system architecture for this requirement.

Requirement:
{requirement}

Use exactly this shape:
{{
    "overview": "High-level description of the architecture",
    "tech_stack": {{
        "frontend": ["Technology"],
        "backend": ["Technology"],
        "database": ["Technology"],
        "infrastructure": ["Component"]
    }},
    "directory_structure": {{
        "description": "How the tree is organized",
        "tree": ["project/", "  src/", "  tests/", "  docs/"]
    }},
    "data_model": [
        {{
            "entity": "Entity name",
            "fields": [{{"name": "field_name", "type": "data_type", "description": "Meaning"}}]
        }}
    ],
    "architecture_patterns": ["Pattern"],
    "security_considerations": ["Consideration"],
    "scalability_considerations": ["Consideration"]
}}

{JSON_ONLY}"#
    )
}
