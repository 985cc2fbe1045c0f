use super::{invoke, render, AgentProfile, AgentResult, LlmClient, JSON_ONLY};
use crate::artifact::{ApiSpec, Architecture, Requirement};

pub const NAME: &str = "api_designer";

const SYSTEM: &str = "You are an API designer. You write complete, consistent OpenAPI 3.0 \
documents.";

pub fn profile() -> AgentProfile {
    AgentProfile::new(NAME, 0.2, 8000)
}

#[derive(Debug, Clone)]
pub struct ApiDesigner {
    profile: AgentProfile,
}

impl Default for ApiDesigner {
    fn default() -> Self {
        Self::new(profile())
    }
}

impl ApiDesigner {
    pub fn new(profile: AgentProfile) -> Self {
        Self { profile }
    }

    pub fn profile(&self) -> &AgentProfile {
        &self.profile
    }

    pub fn execute(
        &self,
        llm: &dyn LlmClient,
        requirement: &Requirement,
        architecture: &Architecture,
    ) -> AgentResult<ApiSpec> {
        invoke(llm, &self.profile, SYSTEM, prompt(requirement, architecture))
    }
}

fn prompt(requirement: &Requirement, architecture: &Architecture) -> String {
    let requirement = render(requirement);
    let architecture = render(architecture);
    format!(
        r#"Design the API for the requirement and architecture below as an OpenAPI 3.0 document.

Requirement:
{requirement}

Architecture:
{architecture}

Use this shape:
{{
    "openapi": "3.0.0",
    "info": {{"title": "API title", "version": "1.0.0", "description": "What the API does"}},
    "paths": {{
        "/resource": {{
            "get": {{
                "summary": "What this operation does",
                "parameters": [],
                "responses": {{
                    "200": {{
                        "description": "Success",
                        "content": {{"application/json": {{"schema": {{}}}}}}
                    }}
                }}
            }}
        }}
    }},
    "components": {{"schemas": {{}}, "securitySchemes": {{}}}}
}}

{JSON_ONLY}"#
    )
}
