//! Stage reports, the aggregate workflow report and the pause checkpoint.

use crate::artifact::{ApiSpec, Architecture, Requirement};
use crate::gate::{DesignReview, ReviewMode};
use crate::score::{QualityLevel, ReviewReport};
use crate::task::TaskPlan;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ---------------------------------------------------------------------------
// Stage
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    RequirementAnalysis,
    Design,
    DesignReview,
    TaskPlanning,
    CodeGeneration,
    CodeReview,
}

impl Stage {
    pub fn all() -> &'static [Stage] {
        &[
            Stage::RequirementAnalysis,
            Stage::Design,
            Stage::DesignReview,
            Stage::TaskPlanning,
            Stage::CodeGeneration,
            Stage::CodeReview,
        ]
    }

    pub fn number(self) -> u8 {
        match self {
            Stage::RequirementAnalysis => 1,
            Stage::Design => 2,
            Stage::DesignReview => 3,
            Stage::TaskPlanning => 4,
            Stage::CodeGeneration => 5,
            Stage::CodeReview => 6,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::RequirementAnalysis => "requirement_analysis",
            Stage::Design => "design",
            Stage::DesignReview => "design_review",
            Stage::TaskPlanning => "task_planning",
            Stage::CodeGeneration => "code_generation",
            Stage::CodeReview => "code_review",
        }
    }

    /// Key in the reports mapping and stem of the report file name.
    pub fn report_key(self) -> &'static str {
        match self {
            Stage::RequirementAnalysis => "stage1_requirement",
            Stage::Design => "stage2_design",
            Stage::DesignReview => "stage3_design_review",
            Stage::TaskPlanning => "stage4_task_planning",
            Stage::CodeGeneration => "stage5_code_generation",
            Stage::CodeReview => "stage6_code_review",
        }
    }

    /// `stage1` .. `stage6`, as recorded in `stages_completed`.
    pub fn short_id(self) -> String {
        format!("stage{}", self.number())
    }

    pub fn title(self) -> &'static str {
        match self {
            Stage::RequirementAnalysis => "Requirement Analysis",
            Stage::Design => "Architecture and API Design",
            Stage::DesignReview => "Design Review",
            Stage::TaskPlanning => "Task Planning",
            Stage::CodeGeneration => "Code Generation",
            Stage::CodeReview => "Code Review",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// StageReport
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Completed,
}

/// The durable record of one completed stage. Serialized flat:
/// `{"stage": ..., "status": ..., "timestamp": ..., <payload>, "summary": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageReport {
    pub status: StageStatus,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub detail: StageDetail,
}

impl StageReport {
    pub fn completed(detail: StageDetail) -> Self {
        Self {
            status: StageStatus::Completed,
            timestamp: Utc::now(),
            detail,
        }
    }

    pub fn stage(&self) -> Stage {
        self.detail.stage()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum StageDetail {
    RequirementAnalysis {
        input: String,
        output: Requirement,
        summary: RequirementSummary,
    },
    Design {
        architecture: Architecture,
        api_spec: ApiSpec,
        summary: DesignSummary,
    },
    DesignReview {
        review_mode: ReviewMode,
        review_result: DesignReview,
        summary: DesignReviewSummary,
    },
    TaskPlanning {
        task_plan: TaskPlan,
        summary: TaskPlanSummary,
    },
    CodeGeneration {
        generated_files: Vec<String>,
        completed_tasks: Vec<String>,
        failed_tasks: Vec<String>,
        summary: CodeGenerationSummary,
    },
    CodeReview {
        review: ReviewReport,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reviewer_error: Option<String>,
        summary: CodeReviewSummary,
    },
}

impl StageDetail {
    pub fn stage(&self) -> Stage {
        match self {
            StageDetail::RequirementAnalysis { .. } => Stage::RequirementAnalysis,
            StageDetail::Design { .. } => Stage::Design,
            StageDetail::DesignReview { .. } => Stage::DesignReview,
            StageDetail::TaskPlanning { .. } => Stage::TaskPlanning,
            StageDetail::CodeGeneration { .. } => Stage::CodeGeneration,
            StageDetail::CodeReview { .. } => Stage::CodeReview,
        }
    }
}

// ---------------------------------------------------------------------------
// Summaries
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequirementSummary {
    pub requirement_type: String,
    pub complexity: String,
    pub estimated_tasks: u32,
}

impl RequirementSummary {
    pub fn of(r: &Requirement) -> Self {
        Self {
            requirement_type: r.requirement_type.clone(),
            complexity: r.complexity.clone().unwrap_or_else(|| "medium".to_string()),
            estimated_tasks: r.estimated_tasks.unwrap_or(0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignSummary {
    /// Backend technologies named in the tech stack.
    pub components: usize,
    pub endpoints: usize,
    pub data_models: usize,
}

impl DesignSummary {
    pub fn of(architecture: &Architecture, api_spec: &ApiSpec) -> Self {
        Self {
            components: architecture
                .tech_stack
                .as_ref()
                .map_or(0, |t| t.backend_count()),
            endpoints: api_spec.endpoint_count(),
            data_models: architecture.data_model_count(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignReviewSummary {
    pub review_passed: bool,
    pub total_issues: usize,
    pub critical_issues: usize,
    pub suggestions: usize,
}

impl DesignReviewSummary {
    pub fn of(review: &DesignReview) -> Self {
        Self {
            review_passed: review.passed,
            total_issues: review.issues.len(),
            critical_issues: review.critical_count(),
            suggestions: review.suggestions.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskPlanSummary {
    pub total_tasks: usize,
    pub task_breakdown: BTreeMap<String, usize>,
    pub estimated_effort: String,
}

impl TaskPlanSummary {
    pub fn of(plan: &TaskPlan) -> Self {
        let mut task_breakdown = BTreeMap::new();
        for task in &plan.tasks {
            *task_breakdown
                .entry(task.type_or_other().to_string())
                .or_insert(0) += 1;
        }
        Self {
            total_tasks: plan.tasks.len(),
            task_breakdown,
            estimated_effort: plan
                .estimated_effort
                .clone()
                .unwrap_or_else(|| "unknown".to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeGenerationSummary {
    pub total_tasks: usize,
    pub completed_tasks: usize,
    pub failed_tasks: usize,
    pub total_files: usize,
    pub success_rate: String,
}

impl CodeGenerationSummary {
    pub fn new(total_tasks: usize, completed: usize, failed: usize, files: usize) -> Self {
        Self {
            total_tasks,
            completed_tasks: completed,
            failed_tasks: failed,
            total_files: files,
            success_rate: percent(completed, total_tasks),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeReviewSummary {
    pub overall_score: f64,
    pub total_issues: usize,
    pub critical_issues: usize,
    pub total_suggestions: usize,
    pub quality_level: QualityLevel,
}

impl CodeReviewSummary {
    pub fn of(review: &ReviewReport) -> Self {
        Self {
            overall_score: review.overall_score,
            total_issues: review.issues.len(),
            critical_issues: review.critical_issues().count(),
            total_suggestions: review.recommendations.len(),
            quality_level: review.quality_level(),
        }
    }
}

/// `"66.7%"`; an empty denominator reports `"0.0%"`.
pub fn percent(part: usize, whole: usize) -> String {
    if whole == 0 {
        return "0.0%".to_string();
    }
    format!("{:.1}%", part as f64 / whole as f64 * 100.0)
}

// ---------------------------------------------------------------------------
// WorkflowState
// ---------------------------------------------------------------------------

/// Everything one run has recorded so far. Reports are append-only for the
/// lifetime of a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowState {
    #[serde(default)]
    pub current_stage: Option<Stage>,
    #[serde(default)]
    pub stages_completed: Vec<String>,
    #[serde(default)]
    pub reports: BTreeMap<String, StageReport>,
}

impl WorkflowState {
    pub fn record(&mut self, report: StageReport) {
        let stage = report.stage();
        self.reports.insert(stage.report_key().to_string(), report);
        self.stages_completed.push(stage.short_id());
    }

    pub fn report(&self, stage: Stage) -> Option<&StageReport> {
        self.reports.get(stage.report_key())
    }

    pub fn has_completed(&self, stage: Stage) -> bool {
        self.stages_completed.contains(&stage.short_id())
    }
}

// ---------------------------------------------------------------------------
// WorkflowReport
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowReport {
    pub run_id: String,
    pub workflow_status: String,
    pub timestamp: DateTime<Utc>,
    pub stages_completed: Vec<String>,
    pub reports: BTreeMap<String, StageReport>,
}

impl WorkflowReport {
    pub fn completed(run_id: &str, state: &WorkflowState) -> Self {
        Self {
            run_id: run_id.to_string(),
            workflow_status: "completed".to_string(),
            timestamp: Utc::now(),
            stages_completed: state.stages_completed.clone(),
            reports: state.reports.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// WorkflowCheckpoint
// ---------------------------------------------------------------------------

/// Written when a run pauses for manual review after design.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowCheckpoint {
    pub workflow_state: WorkflowState,
    pub data: CheckpointData,
    pub timestamp: DateTime<Utc>,
}

/// The stage-2 output a resumed run re-enters with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointData {
    pub requirement: Requirement,
    pub architecture: Architecture,
    pub api_spec: ApiSpec,
}

/// Per-type counts keyed by `type_or_other`, for display.
pub fn breakdown_line(breakdown: &BTreeMap<String, usize>) -> String {
    breakdown
        .iter()
        .map(|(k, v)| format!("{k}: {v}"))
        .collect::<Vec<_>>()
        .join(", ")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
