use crate::artifact::Validate;
use crate::error::{Result, SkillError};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Severity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    #[serde(alias = "Critical", alias = "CRITICAL")]
    Critical,
    #[serde(alias = "High", alias = "HIGH")]
    High,
    #[serde(alias = "Medium", alias = "MEDIUM")]
    Medium,
    #[serde(alias = "Low", alias = "LOW")]
    Low,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ReviewReport
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReviewReport {
    /// 0 to 100.
    #[serde(default)]
    pub overall_score: f64,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub issues: Vec<ReviewIssue>,
    #[serde(default)]
    pub security_concerns: Vec<String>,
    #[serde(default)]
    pub performance_concerns: Vec<String>,
    #[serde(default)]
    pub best_practices: Vec<String>,
    #[serde(default)]
    pub test_coverage: TestCoverage,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub approved: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewIssue {
    pub severity: Severity,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    pub description: String,
    #[serde(default)]
    pub suggestion: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestCoverage {
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub missing_tests: Vec<String>,
}

impl ReviewReport {
    pub fn critical_issues(&self) -> impl Iterator<Item = &ReviewIssue> {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Critical)
    }

    pub fn quality_level(&self) -> QualityLevel {
        QualityLevel::from_score(self.overall_score)
    }
}

impl Validate for ReviewReport {
    const ARTIFACT: &'static str = "review_report";

    fn validate(&self) -> Result<()> {
        if !(0.0..=100.0).contains(&self.overall_score) {
            return Err(SkillError::schema(
                Self::ARTIFACT,
                format!("overall_score {} is outside 0..=100", self.overall_score),
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// QuickReview
// ---------------------------------------------------------------------------

/// Single-file triage used before overwriting refactored code.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuickReview {
    #[serde(default)]
    pub has_critical_issues: bool,
    #[serde(default)]
    pub issues: Vec<String>,
}

impl Validate for QuickReview {
    const ARTIFACT: &'static str = "quick_review";
}

// ---------------------------------------------------------------------------
// QualityLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QualityLevel {
    Excellent,
    Good,
    Acceptable,
    #[serde(rename = "Needs Improvement")]
    NeedsImprovement,
    Poor,
}

impl QualityLevel {
    pub fn from_score(score: f64) -> Self {
        if score >= 90.0 {
            QualityLevel::Excellent
        } else if score >= 80.0 {
            QualityLevel::Good
        } else if score >= 70.0 {
            QualityLevel::Acceptable
        } else if score >= 60.0 {
            QualityLevel::NeedsImprovement
        } else {
            QualityLevel::Poor
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn quality_level_thresholds() {
        assert_eq!(QualityLevel::from_score(95.0), QualityLevel::Excellent);
        assert_eq!(QualityLevel::from_score(90.0), QualityLevel::Excellent);
        assert_eq!(QualityLevel::from_score(85.0), QualityLevel::Good);
        assert_eq!(QualityLevel::from_score(70.0), QualityLevel::Acceptable);
        assert_eq!(QualityLevel::from_score(60.0), QualityLevel::NeedsImprovement);
        assert_eq!(QualityLevel::from_score(0.0), QualityLevel::Poor);
        assert_eq!(
            serde_json::to_value(QualityLevel::NeedsImprovement).unwrap(),
            json!("Needs Improvement")
        );
    }

    #[test]
    fn review_report_defaults_missing_fields() {
        let r: ReviewReport = serde_json::from_value(json!({
            "overall_score": 82,
            "issues": [
                {"severity": "critical", "description": "SQL injection", "line": 12},
                {"severity": "Low", "description": "naming"}
            ]
        }))
        .unwrap();
        assert!(r.validate().is_ok());
        assert_eq!(r.critical_issues().count(), 1);
        assert_eq!(r.issues[1].severity, Severity::Low);
        assert!(!r.approved);
    }

    #[test]
    fn unknown_severity_is_rejected() {
        let r = serde_json::from_value::<ReviewReport>(json!({
            "issues": [{"severity": "catastrophic", "description": "x"}]
        }));
        assert!(r.is_err());
    }

    #[test]
    fn score_out_of_range_is_a_schema_violation() {
        let r: ReviewReport = serde_json::from_value(json!({"overall_score": 140})).unwrap();
        assert!(matches!(r.validate(), Err(SkillError::SchemaViolation { .. })));
    }
}
