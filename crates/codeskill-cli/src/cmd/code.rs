use super::{Overrides, Session};
use crate::output::{print_json, print_list};
use codeskill_core::report::percent;
use codeskill_core::skills::{CodeMode, Skills};
use std::path::Path;

pub fn run(
    root: &Path,
    overrides: &Overrides,
    requirement: &str,
    mode: &str,
    json: bool,
) -> anyhow::Result<()> {
    let mode: CodeMode = mode.parse()?;
    let session = Session::open(root, overrides)?;
    let outcome = Skills::new(&session.backend, &session.sink, session.agents()).code(requirement, mode)?;

    if json {
        return print_json(&outcome);
    }
    let total = outcome.task_plan.tasks.len();
    println!("Code generation complete: {} ({mode})", outcome.requirement.title);
    println!(
        "  {}/{total} task(s) completed ({})",
        outcome.completed_tasks.len(),
        percent(outcome.completed_tasks.len(), total)
    );
    print_list("Generated files", &outcome.generated_files);
    print_list("Failed tasks", &outcome.failed_tasks);
    match &outcome.review {
        Some(review) => println!(
            "Review score: {:.1}/100 ({} issue(s))",
            review.overall_score,
            review.issues.len()
        ),
        None => println!("Review: unavailable"),
    }
    print_list("Saved", &outcome.saved);
    Ok(())
}
