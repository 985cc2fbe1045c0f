//! Design-review gate between design and task planning.
//!
//! The automatic path is deterministic and makes no LLM call. Only a
//! missing API specification is critical; every other finding is advisory.

use crate::artifact::{ApiSpec, Architecture};
use crate::score::Severity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const MICROSERVICE_ENTITY_THRESHOLD: usize = 10;
const VERSIONING_ENDPOINT_THRESHOLD: usize = 20;

// ---------------------------------------------------------------------------
// ReviewMode
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewMode {
    #[default]
    Auto,
    Manual,
}

impl ReviewMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ReviewMode::Auto => "auto",
            ReviewMode::Manual => "manual",
        }
    }
}

impl fmt::Display for ReviewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReviewMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(ReviewMode::Auto),
            "manual" => Ok(ReviewMode::Manual),
            other => Err(format!("unknown review mode '{other}' (expected auto or manual)")),
        }
    }
}

// ---------------------------------------------------------------------------
// DesignReview (output)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateIssue {
    pub severity: Severity,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignReview {
    pub passed: bool,
    pub issues: Vec<GateIssue>,
    pub suggestions: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

impl DesignReview {
    pub fn critical_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Critical)
            .count()
    }
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

struct DesignInput<'a> {
    architecture: &'a Architecture,
    api_spec: &'a ApiSpec,
}

/// One finding the gate can raise. Rules sharing a `group` are exclusive:
/// only the first match within a group is reported.
struct GateRule {
    group: &'static str,
    severity: Severity,
    condition: fn(&DesignInput) -> bool,
    message: &'static str,
}

fn gate_rules() -> Vec<GateRule> {
    vec![
        GateRule {
            group: "tech_stack",
            severity: Severity::High,
            condition: |d| d.architecture.tech_stack.as_ref().map_or(true, |t| t.is_unset()),
            message: "No tech stack defined in architecture",
        },
        GateRule {
            group: "tech_stack",
            severity: Severity::Medium,
            condition: |d| d.architecture.tech_stack.as_ref().is_some_and(|t| t.is_empty()),
            message: "Tech stack is defined but empty",
        },
        GateRule {
            group: "data_model",
            severity: Severity::Medium,
            condition: |d| d.architecture.data_model_count() == 0,
            message: "No data models defined (may be acceptable for simple APIs)",
        },
        GateRule {
            group: "api_spec",
            severity: Severity::Critical,
            condition: |d| d.api_spec.is_empty(),
            message: "API specification is missing",
        },
        GateRule {
            group: "api_spec",
            severity: Severity::High,
            condition: |d| d.api_spec.endpoint_count() == 0,
            message: "No API paths defined in specification",
        },
    ]
}

/// Review a design. `passed` is true exactly when no critical issue was found.
pub fn review_design(architecture: &Architecture, api_spec: &ApiSpec) -> DesignReview {
    let input = DesignInput {
        architecture,
        api_spec,
    };

    let mut issues = Vec::new();
    let mut fired: Vec<&'static str> = Vec::new();
    for rule in gate_rules() {
        if fired.contains(&rule.group) {
            continue;
        }
        if (rule.condition)(&input) {
            fired.push(rule.group);
            issues.push(GateIssue {
                severity: rule.severity,
                message: rule.message.to_string(),
            });
        }
    }

    let mut suggestions = Vec::new();
    if architecture.data_model_count() > MICROSERVICE_ENTITY_THRESHOLD {
        suggestions.push("Consider breaking down into microservices".to_string());
    }
    if api_spec.endpoint_count() > VERSIONING_ENDPOINT_THRESHOLD {
        suggestions.push("Large number of endpoints - consider API versioning".to_string());
    }

    let passed = !issues.iter().any(|i| i.severity == Severity::Critical);
    DesignReview {
        passed,
        issues,
        suggestions,
        timestamp: Utc::now(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn arch(v: serde_json::Value) -> Architecture {
        serde_json::from_value(v).unwrap()
    }

    fn spec(v: serde_json::Value) -> ApiSpec {
        serde_json::from_value(v).unwrap()
    }

    fn messages(r: &DesignReview) -> Vec<&str> {
        r.issues.iter().map(|i| i.message.as_str()).collect()
    }

    #[test]
    fn empty_design_fails_on_missing_api_spec() {
        let r = review_design(&arch(json!({})), &spec(json!({})));
        assert!(!r.passed);
        assert_eq!(r.critical_count(), 1);
        assert!(messages(&r).contains(&"API specification is missing"));
        assert!(!messages(&r).contains(&"No API paths defined in specification"));
    }

    #[test]
    fn missing_data_model_is_advisory() {
        let r = review_design(
            &arch(json!({"tech_stack": {"backend": ["x"]}})),
            &spec(json!({"paths": {"/a": {}}})),
        );
        assert!(r.passed);
        assert_eq!(
            r.issues,
            vec![GateIssue {
                severity: Severity::Medium,
                message: "No data models defined (may be acceptable for simple APIs)".into(),
            }]
        );
    }

    #[test]
    fn empty_paths_is_high_not_critical() {
        let r = review_design(
            &arch(json!({"tech_stack": {"backend": ["x"]}, "data_model": [{"entity": "User"}]})),
            &spec(json!({"openapi": "3.0.0", "paths": {}})),
        );
        assert!(r.passed);
        assert_eq!(r.issues.len(), 1);
        assert_eq!(r.issues[0].severity, Severity::High);
    }

    #[test]
    fn tech_stack_findings_are_exclusive() {
        let unset = review_design(&arch(json!({"tech_stack": {}})), &spec(json!({"paths": {"/a": {}}})));
        assert!(messages(&unset).contains(&"No tech stack defined in architecture"));
        assert!(!messages(&unset).contains(&"Tech stack is defined but empty"));

        let empty = review_design(
            &arch(json!({"tech_stack": {"backend": [], "frontend": []}})),
            &spec(json!({"paths": {"/a": {}}})),
        );
        assert!(messages(&empty).contains(&"Tech stack is defined but empty"));
        assert!(!messages(&empty).contains(&"No tech stack defined in architecture"));
    }

    #[test]
    fn large_designs_get_suggestions() {
        let entities: Vec<_> = (0..11).map(|i| json!({"entity": format!("E{i}")})).collect();
        let paths: serde_json::Map<String, serde_json::Value> =
            (0..21).map(|i| (format!("/r{i}"), json!({}))).collect();
        let r = review_design(
            &arch(json!({"tech_stack": {"backend": ["x"]}, "data_model": entities})),
            &ApiSpec(serde_json::Map::from_iter([("paths".to_string(), serde_json::Value::Object(paths))])),
        );
        assert!(r.passed);
        assert_eq!(r.suggestions.len(), 2);
    }

    #[test]
    fn review_mode_parses() {
        assert_eq!("manual".parse::<ReviewMode>().unwrap(), ReviewMode::Manual);
        assert!("sometimes".parse::<ReviewMode>().is_err());
    }
}
