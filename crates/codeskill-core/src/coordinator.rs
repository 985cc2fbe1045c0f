//! Six-stage workflow coordinator.
//!
//! ```text
//! INIT → STAGE1 requirement → STAGE2 design ─┬─ (manual + pause) → PAUSED_FOR_REVIEW
//!                                            └─ STAGE3 gate → STAGE4 plan → STAGE5 code
//!                                                              → STAGE6 review → DONE
//! ```
//!
//! An agent failure aborts the run at that stage and returns the reports
//! gathered so far. Files already written are left in place. Stage 5 is the
//! exception: a failed task is recorded and skipped. Reports reach disk only
//! on completion or pause.

use crate::agents::{AgentFailure, Agents, GenerationContext, LlmClient};
use crate::artifact::{ApiSpec, Architecture, Requirement, SourceFile};
use crate::classify::classify;
use crate::error::{ErrorKind, SkillError};
use crate::gate::{review_design, DesignReview, ReviewMode};
use crate::paths;
use crate::report::{
    CheckpointData, CodeGenerationSummary, CodeReviewSummary, DesignReviewSummary, DesignSummary,
    RequirementSummary, Stage, StageDetail, StageReport, TaskPlanSummary, WorkflowCheckpoint,
    WorkflowReport, WorkflowState,
};
use crate::score::ReviewReport;
use crate::sink::{write_json, ProjectSink};
use crate::task::TaskPlan;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// Request / result
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowRequest {
    pub requirement: String,
    pub review_mode: ReviewMode,
    pub pause_for_review: bool,
}

impl WorkflowRequest {
    pub fn new(requirement: impl Into<String>) -> Self {
        Self {
            requirement: requirement.into(),
            review_mode: ReviewMode::Auto,
            pause_for_review: false,
        }
    }

    fn pauses(&self) -> bool {
        self.pause_for_review && self.review_mode == ReviewMode::Manual
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    Completed,
    PausedForReview,
    Failed,
}

/// Outcome of one coordinator run. Failures carry the stage, the error and
/// every report recorded before the abort.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowResult {
    pub success: bool,
    pub status: WorkflowStatus,
    pub run_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<String>,
    pub stages_completed: Vec<String>,
    pub reports: BTreeMap<String, StageReport>,
    pub generated_files: Vec<String>,
    pub failed_tasks: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkpoint_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fix_summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fix_log_path: Option<String>,
}

impl WorkflowResult {
    fn from_run(run: Run, status: WorkflowStatus) -> Self {
        Self {
            success: status != WorkflowStatus::Failed,
            status,
            run_id: run.id,
            stage: None,
            error: None,
            error_kind: None,
            error_code: None,
            raw_response: None,
            stages_completed: run.state.stages_completed,
            reports: run.state.reports,
            generated_files: run.generated_files,
            failed_tasks: run.failed_tasks,
            final_score: run.final_score,
            report_path: None,
            checkpoint_path: None,
            fix_summary: None,
            fix_log_path: None,
        }
    }

    fn failed(run: Run, failure: StageFailure) -> Self {
        let mut context = BTreeMap::new();
        if let Some(stage) = failure.stage {
            context.insert("stage".to_string(), stage.as_str().to_string());
        }
        context.insert("run_id".to_string(), run.id.clone());
        let coded = classify(&failure.error, context);

        let mut result = Self::from_run(run, WorkflowStatus::Failed);
        result.stage = failure.stage;
        result.error = Some(failure.error.to_string());
        result.error_kind = Some(failure.error.kind());
        result.error_code = Some(coded.code);
        result.raw_response = failure.raw_response;
        result
    }

    /// A failure that happened outside any run, such as a panicking
    /// [`crate::healing::Workflow`] implementation.
    pub(crate) fn internal_failure(message: impl Into<String>) -> Self {
        Self::failed(
            Run::new(),
            StageFailure {
                stage: None,
                error: SkillError::Internal(message.into()),
                raw_response: None,
            },
        )
    }

    #[cfg(test)]
    pub(crate) fn stub(success: bool) -> Self {
        let status = if success {
            WorkflowStatus::Completed
        } else {
            WorkflowStatus::Failed
        };
        Self::from_run(Run::new(), status)
    }
}

// ---------------------------------------------------------------------------
// Per-run state
// ---------------------------------------------------------------------------

struct Run {
    id: String,
    state: WorkflowState,
    generated: Vec<SourceFile>,
    generated_files: Vec<String>,
    failed_tasks: Vec<String>,
    final_score: Option<f64>,
}

impl Run {
    fn new() -> Self {
        Self::with_state(WorkflowState::default())
    }

    fn with_state(state: WorkflowState) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            state,
            generated: Vec::new(),
            generated_files: Vec::new(),
            failed_tasks: Vec::new(),
            final_score: None,
        }
    }

    fn enter(&mut self, stage: Stage) {
        self.state.current_stage = Some(stage);
        info!(run_id = %self.id, "Stage {}/6: {}", stage.number(), stage.title());
    }
}

struct StageFailure {
    stage: Option<Stage>,
    error: SkillError,
    raw_response: Option<String>,
}

impl StageFailure {
    fn at(stage: Stage, error: SkillError) -> Self {
        Self {
            stage: Some(stage),
            error,
            raw_response: None,
        }
    }

    fn agent(stage: Stage, failure: AgentFailure) -> Self {
        Self {
            stage: Some(stage),
            error: failure.error,
            raw_response: failure.raw_response,
        }
    }
}

type StageResult<T> = std::result::Result<T, StageFailure>;

enum Outcome {
    Completed { report_path: String },
    Paused { checkpoint_path: String },
}

struct Design {
    requirement: Requirement,
    architecture: Architecture,
    api_spec: ApiSpec,
}

// ---------------------------------------------------------------------------
// Coordinator
// ---------------------------------------------------------------------------

pub struct Coordinator<'a> {
    llm: &'a dyn LlmClient,
    sink: &'a dyn ProjectSink,
    agents: Agents,
}

impl<'a> Coordinator<'a> {
    pub fn new(llm: &'a dyn LlmClient, sink: &'a dyn ProjectSink, agents: Agents) -> Self {
        Self { llm, sink, agents }
    }

    /// Run all six stages from scratch. Never panics: an unexpected panic
    /// inside a stage becomes a failed result with an internal error.
    pub fn execute(&self, request: &WorkflowRequest) -> WorkflowResult {
        let mut run = Run::new();
        info!(
            run_id = %run.id,
            review_mode = %request.review_mode,
            pause_for_review = request.pause_for_review,
            "starting workflow"
        );
        let outcome = catch_unwind(AssertUnwindSafe(|| self.run_from_start(&mut run, request)));
        self.finish(run, outcome)
    }

    /// Re-enter a paused run at the design-review gate with the saved
    /// stage-2 output. Stages 1 and 2 are not re-run.
    pub fn resume(&self, checkpoint: WorkflowCheckpoint) -> WorkflowResult {
        let mut run = Run::with_state(checkpoint.workflow_state);
        info!(run_id = %run.id, "resuming workflow at design review");
        let design = Design {
            requirement: checkpoint.data.requirement,
            architecture: checkpoint.data.architecture,
            api_spec: checkpoint.data.api_spec,
        };
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            self.run_from_review(&mut run, &design, ReviewMode::Manual)
        }));
        self.finish(run, outcome)
    }

    /// Read `docs/workflow_checkpoint.json` through the sink.
    pub fn load_checkpoint(&self) -> crate::Result<WorkflowCheckpoint> {
        let text = self.sink.read_to_string(paths::CHECKPOINT_FILE)?;
        Ok(serde_json::from_str(&text)?)
    }

    fn finish(
        &self,
        run: Run,
        outcome: std::thread::Result<StageResult<Outcome>>,
    ) -> WorkflowResult {
        match outcome {
            Ok(Ok(Outcome::Completed { report_path })) => {
                info!(run_id = %run.id, "workflow completed");
                let mut result = WorkflowResult::from_run(run, WorkflowStatus::Completed);
                result.report_path = Some(report_path);
                result
            }
            Ok(Ok(Outcome::Paused { checkpoint_path })) => {
                info!(run_id = %run.id, checkpoint = %checkpoint_path, "workflow paused for review");
                let mut result = WorkflowResult::from_run(run, WorkflowStatus::PausedForReview);
                result.checkpoint_path = Some(checkpoint_path);
                result
            }
            Ok(Err(failure)) => {
                warn!(
                    run_id = %run.id,
                    stage = ?failure.stage,
                    error = %failure.error,
                    "workflow failed"
                );
                WorkflowResult::failed(run, failure)
            }
            Err(payload) => {
                let stage = run.state.current_stage;
                let message = panic_message(payload.as_ref());
                warn!(run_id = %run.id, stage = ?stage, "workflow panicked: {message}");
                WorkflowResult::failed(
                    run,
                    StageFailure {
                        stage,
                        error: SkillError::Internal(message),
                        raw_response: None,
                    },
                )
            }
        }
    }

    // -----------------------------------------------------------------------
    // Pipeline
    // -----------------------------------------------------------------------

    fn run_from_start(&self, run: &mut Run, request: &WorkflowRequest) -> StageResult<Outcome> {
        let requirement = self.stage_requirement(run, &request.requirement)?;
        let design = self.stage_design(run, requirement)?;

        if request.pauses() {
            let checkpoint_path = self
                .save_checkpoint(run, &design)
                .map_err(|e| StageFailure::at(Stage::Design, e))?;
            return Ok(Outcome::Paused { checkpoint_path });
        }
        if request.review_mode == ReviewMode::Manual {
            warn!("manual review requested without pause_for_review; using the automatic gate");
        }

        self.run_from_review(run, &design, request.review_mode)
    }

    fn run_from_review(
        &self,
        run: &mut Run,
        design: &Design,
        review_mode: ReviewMode,
    ) -> StageResult<Outcome> {
        let review = self.stage_design_review(run, design, review_mode);
        if !review.passed {
            return Err(StageFailure::at(
                Stage::DesignReview,
                SkillError::DesignRejected {
                    critical: review.critical_count(),
                },
            ));
        }

        let plan = self.stage_task_planning(run, design)?;
        self.stage_code_generation(run, design, &plan);
        self.stage_code_review(run, &design.requirement);

        let report_path = self
            .save_reports(run)
            .map_err(|e| StageFailure::at(Stage::CodeReview, e))?;
        Ok(Outcome::Completed { report_path })
    }

    // -----------------------------------------------------------------------
    // Stages
    // -----------------------------------------------------------------------

    fn stage_requirement(&self, run: &mut Run, input: &str) -> StageResult<Requirement> {
        let stage = Stage::RequirementAnalysis;
        run.enter(stage);
        let requirement = self
            .agents
            .requirement_analyst
            .execute(self.llm, input)
            .map_err(|f| StageFailure::agent(stage, f))?;

        info!(title = %requirement.title, kind = %requirement.requirement_type, "requirement analyzed");
        run.state.record(StageReport::completed(StageDetail::RequirementAnalysis {
            input: input.to_string(),
            summary: RequirementSummary::of(&requirement),
            output: requirement.clone(),
        }));
        Ok(requirement)
    }

    fn stage_design(&self, run: &mut Run, requirement: Requirement) -> StageResult<Design> {
        let stage = Stage::Design;
        run.enter(stage);
        let architecture = self
            .agents
            .system_architect
            .execute(self.llm, &requirement)
            .map_err(|f| StageFailure::agent(stage, f))?;
        let api_spec = self
            .agents
            .api_designer
            .execute(self.llm, &requirement, &architecture)
            .map_err(|f| StageFailure::agent(stage, f))?;

        let summary = DesignSummary::of(&architecture, &api_spec);
        info!(
            components = summary.components,
            endpoints = summary.endpoints,
            data_models = summary.data_models,
            "design completed"
        );
        run.state.record(StageReport::completed(StageDetail::Design {
            architecture: architecture.clone(),
            api_spec: api_spec.clone(),
            summary,
        }));
        Ok(Design {
            requirement,
            architecture,
            api_spec,
        })
    }

    fn stage_design_review(
        &self,
        run: &mut Run,
        design: &Design,
        review_mode: ReviewMode,
    ) -> DesignReview {
        run.enter(Stage::DesignReview);
        let review = review_design(&design.architecture, &design.api_spec);
        let summary = DesignReviewSummary::of(&review);
        info!(
            passed = review.passed,
            issues = summary.total_issues,
            critical = summary.critical_issues,
            "design review {}",
            if review.passed { "passed" } else { "failed" }
        );
        run.state.record(StageReport::completed(StageDetail::DesignReview {
            review_mode,
            review_result: review.clone(),
            summary,
        }));
        review
    }

    fn stage_task_planning(&self, run: &mut Run, design: &Design) -> StageResult<TaskPlan> {
        let stage = Stage::TaskPlanning;
        run.enter(stage);
        let plan = self
            .agents
            .task_planner
            .execute(
                self.llm,
                &design.requirement,
                &design.architecture,
                &design.api_spec,
            )
            .map_err(|f| StageFailure::agent(stage, f))?;

        info!(tasks = plan.tasks.len(), "task plan ready");
        run.state.record(StageReport::completed(StageDetail::TaskPlanning {
            summary: TaskPlanSummary::of(&plan),
            task_plan: plan.clone(),
        }));
        Ok(plan)
    }

    /// Tasks run in list order. A failed task is recorded and skipped; the
    /// stage itself always completes.
    fn stage_code_generation(&self, run: &mut Run, design: &Design, plan: &TaskPlan) {
        run.enter(Stage::CodeGeneration);
        let context = GenerationContext::Design {
            requirement: &design.requirement,
            architecture: &design.architecture,
            api_spec: &design.api_spec,
        };

        let total = plan.tasks.len();
        let output = self
            .agents
            .code_generator
            .run_plan(self.llm, self.sink, plan, &context);
        run.generated_files.extend(output.paths());
        run.generated.extend(output.written);
        run.failed_tasks.extend(output.failed);
        let completed = output.completed;

        let summary = CodeGenerationSummary::new(
            total,
            completed.len(),
            run.failed_tasks.len(),
            run.generated_files.len(),
        );
        info!(
            completed = summary.completed_tasks,
            failed = summary.failed_tasks,
            files = summary.total_files,
            success_rate = %summary.success_rate,
            "code generation finished"
        );
        run.state.record(StageReport::completed(StageDetail::CodeGeneration {
            generated_files: run.generated_files.clone(),
            completed_tasks: completed,
            failed_tasks: run.failed_tasks.clone(),
            summary,
        }));
    }

    /// A reviewer failure degrades to an empty, zero-score review.
    fn stage_code_review(&self, run: &mut Run, requirement: &Requirement) {
        run.enter(Stage::CodeReview);
        let (review, reviewer_error) =
            match self
                .agents
                .code_reviewer
                .execute(self.llm, &run.generated, requirement)
            {
                Ok(review) => (review, None),
                Err(f) => {
                    warn!(error = %f.error, "code review failed; recording an empty review");
                    (ReviewReport::default(), Some(f.error.to_string()))
                }
            };

        let summary = CodeReviewSummary::of(&review);
        info!(
            score = summary.overall_score,
            issues = summary.total_issues,
            quality = ?summary.quality_level,
            "code review finished"
        );
        run.final_score = Some(review.overall_score);
        run.state.record(StageReport::completed(StageDetail::CodeReview {
            review,
            reviewer_error,
            summary,
        }));
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    fn save_stage_reports(&self, run: &Run) -> crate::Result<()> {
        for (key, report) in &run.state.reports {
            write_json(self.sink, &paths::stage_report(key), report)?;
        }
        Ok(())
    }

    fn save_reports(&self, run: &Run) -> crate::Result<String> {
        self.save_stage_reports(run)?;
        let report = WorkflowReport::completed(&run.id, &run.state);
        write_json(self.sink, paths::WORKFLOW_REPORT_FILE, &report)?;
        info!(path = paths::WORKFLOW_REPORT_FILE, "reports saved");
        Ok(paths::WORKFLOW_REPORT_FILE.to_string())
    }

    fn save_checkpoint(&self, run: &Run, design: &Design) -> crate::Result<String> {
        self.save_stage_reports(run)?;
        let checkpoint = WorkflowCheckpoint {
            workflow_state: run.state.clone(),
            data: CheckpointData {
                requirement: design.requirement.clone(),
                architecture: design.architecture.clone(),
                api_spec: design.api_spec.clone(),
            },
            timestamp: Utc::now(),
        };
        write_json(self.sink, paths::CHECKPOINT_FILE, &checkpoint)?;
        Ok(paths::CHECKPOINT_FILE.to_string())
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
