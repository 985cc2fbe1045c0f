use super::{invoke, invoke_with_budget, render, AgentProfile, AgentResult, LlmClient, JSON_ONLY};
use crate::artifact::SourceFile;
use crate::score::{QuickReview, ReviewReport};
use serde::Serialize;

pub const NAME: &str = "code_reviewer";

const QUICK_REVIEW_MAX_TOKENS: u32 = 2000;

const SYSTEM: &str = "You are a senior code reviewer. You judge correctness, security, \
performance and maintainability, and you score honestly.";

pub fn profile() -> AgentProfile {
    AgentProfile::new(NAME, 0.2, 8000)
}

#[derive(Debug, Clone)]
pub struct CodeReviewer {
    profile: AgentProfile,
}

impl Default for CodeReviewer {
    fn default() -> Self {
        Self::new(profile())
    }
}

#[derive(Serialize)]
struct ReviewSubject<'a> {
    files: &'a [SourceFile],
}

impl CodeReviewer {
    pub fn new(profile: AgentProfile) -> Self {
        Self { profile }
    }

    pub fn profile(&self) -> &AgentProfile {
        &self.profile
    }

    /// Full review of `files` against `requirement`.
    pub fn execute<R: Serialize + ?Sized>(
        &self,
        llm: &dyn LlmClient,
        files: &[SourceFile],
        requirement: &R,
    ) -> AgentResult<ReviewReport> {
        let code = render(&ReviewSubject { files });
        let requirement = render(requirement);
        invoke(llm, &self.profile, SYSTEM, review_prompt(&code, &requirement))
    }

    /// Cheap single-file triage for critical issues only.
    pub fn quick_review(
        &self,
        llm: &dyn LlmClient,
        path: &str,
        content: &str,
    ) -> AgentResult<QuickReview> {
        invoke_with_budget(
            llm,
            &self.profile,
            SYSTEM,
            quick_prompt(path, content),
            QUICK_REVIEW_MAX_TOKENS,
        )
    }
}

fn review_prompt(code: &str, requirement: &str) -> String {
    format!(
        r#"Review the following code for quality, security and adherence to the requirement.

Code:
{code}

Requirement:
{requirement}

Use exactly this shape:
{{
    "overall_score": 85,
    "summary": "One-paragraph verdict",
    "strengths": ["Strength"],
    "issues": [
        {{
            "severity": "critical|high|medium|low",
            "category": "security|performance|maintainability|style|correctness",
            "file": "path/to/file",
            "line": 42,
            "description": "What is wrong",
            "suggestion": "How to fix it"
        }}
    ],
    "security_concerns": ["Concern"],
    "performance_concerns": ["Concern"],
    "best_practices": ["Recommendation"],
    "test_coverage": {{"score": 80, "missing_tests": ["Scenario"]}},
    "recommendations": ["Recommendation"],
    "approved": true
}}

overall_score is between 0 and 100. {JSON_ONLY}"#
    )
}

fn quick_prompt(path: &str, content: &str) -> String {
    format!(
        r#"Check this file for critical issues only.

File: {path}
Content:
{content}

Use exactly this shape:
{{
    "has_critical_issues": false,
    "issues": ["Critical issue, if any"]
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
    fn review_sees_file_contents() {
        let llm = MockLlm::new();
        llm.push_json(json!({"overall_score": 91, "approved": true}));
        let files = vec![SourceFile {
            path: "src/app.py".into(),
            content: "def handler(): pass".into(),
            language: "python".into(),
        }];
        let report = CodeReviewer::default()
            .execute(&llm, &files, &json!({"title": "T"}))
            .unwrap();
        assert_eq!(report.overall_score, 91.0);
        let prompt = &llm.requests()[0].prompt;
        assert!(prompt.contains("def handler(): pass"));
        assert!(prompt.contains("src/app.py"));
    }

    #[test]
    fn quick_review_uses_small_budget() {
        let llm = MockLlm::new();
        llm.push_json(json!({"has_critical_issues": true, "issues": ["eval of user input"]}));
        let quick = CodeReviewer::default()
            .quick_review(&llm, "x.py", "eval(input())")
            .unwrap();
        assert!(quick.has_critical_issues);
        assert_eq!(llm.requests()[0].max_tokens, 2000);
        assert_eq!(llm.requests()[0].temperature, 0.2);
    }
}
