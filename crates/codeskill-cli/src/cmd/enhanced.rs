use super::{Overrides, Session};
use crate::output::{print_json, print_list, print_table};
use codeskill_core::coordinator::{Coordinator, WorkflowRequest, WorkflowResult, WorkflowStatus};
use codeskill_core::gate::ReviewMode;
use codeskill_core::healing::SelfHealing;
use codeskill_core::report::Stage;
use std::path::Path;
use std::time::Duration;

pub struct Args {
    pub requirement: String,
    pub review_mode: Option<String>,
    pub pause_for_review: bool,
    pub max_retries: Option<u32>,
}

pub fn run(root: &Path, overrides: &Overrides, args: Args, json: bool) -> anyhow::Result<()> {
    let session = Session::open(root, overrides)?;
    let wf = &session.config.workflow;

    let review_mode = match &args.review_mode {
        Some(m) => m.parse::<ReviewMode>().map_err(anyhow::Error::msg)?,
        None => wf.review_mode,
    };
    let request = WorkflowRequest {
        requirement: args.requirement,
        review_mode,
        pause_for_review: args.pause_for_review || wf.pause_for_review,
    };
    let max_retries = args.max_retries.unwrap_or(wf.max_retries);

    let coordinator = Coordinator::new(&session.backend, &session.sink, session.agents());
    let result = SelfHealing::new(coordinator, &session.sink)
        .with_max_retries(max_retries)
        .with_retry_delay(Duration::from_secs(wf.retry_delay_seconds))
        .execute(&request);

    render(&result, json)
}

/// Shared by `enhanced-code` and `resume`.
pub(super) fn render(result: &WorkflowResult, json: bool) -> anyhow::Result<()> {
    if json {
        print_json(result)?;
    } else {
        print_summary(result);
    }

    if result.status == WorkflowStatus::Failed {
        let stage = result.stage.map_or("workflow", Stage::as_str);
        let message = result.error.as_deref().unwrap_or("unknown error");
        match result.error_code {
            Some(code) => anyhow::bail!("{stage} failed [{code}]: {message}"),
            None => anyhow::bail!("{stage} failed: {message}"),
        }
    }
    Ok(())
}

fn print_summary(result: &WorkflowResult) {
    let banner = match result.status {
        WorkflowStatus::Completed => "Workflow completed",
        WorkflowStatus::PausedForReview => "Workflow paused for design review",
        WorkflowStatus::Failed => "Workflow failed",
    };
    println!("{banner} (run {})", result.run_id);
    println!();

    let rows = Stage::all()
        .iter()
        .map(|&stage| {
            let state = if result.stages_completed.contains(&stage.short_id()) {
                "done"
            } else if result.stage == Some(stage) {
                "failed"
            } else {
                "-"
            };
            vec![
                stage.number().to_string(),
                stage.title().to_string(),
                state.to_string(),
            ]
        })
        .collect();
    print_table(&["#", "STAGE", "STATUS"], rows);
    println!();

    print_list("Generated files", &result.generated_files);
    print_list("Failed tasks", &result.failed_tasks);
    if let Some(score) = result.final_score {
        println!("Final score: {score:.1}/100");
    }
    if let Some(path) = &result.report_path {
        println!("Report: {path}");
    }
    if let Some(path) = &result.checkpoint_path {
        println!("Checkpoint: {path}");
        println!("Review the design documents, then run `codeskill resume`.");
    }
    if let Some(summary) = &result.fix_summary {
        println!("{summary}");
    }
    if let Some(path) = &result.fix_log_path {
        println!("Fix log: {path}");
    }
}
