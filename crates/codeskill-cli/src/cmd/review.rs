use super::{Overrides, Session};
use crate::output::print_json;
use codeskill_core::skills::{ReviewOptions, Skills};
use std::path::Path;

pub fn run(
    root: &Path,
    overrides: &Overrides,
    files: Vec<String>,
    ext: String,
    requirement_path: Option<String>,
    json: bool,
) -> anyhow::Result<()> {
    let session = Session::open(root, overrides)?;
    let options = ReviewOptions {
        files,
        extension: Some(ext),
        requirement_path,
    };
    let outcome =
        Skills::new(&session.backend, &session.sink, session.agents()).review(&session.root, &options)?;

    if json {
        return print_json(&outcome);
    }
    let review = &outcome.review;
    println!(
        "Reviewed {} file(s): score {:.1}/100, {} issue(s)",
        outcome.files.len(),
        review.overall_score,
        review.issues.len()
    );
    let critical: Vec<_> = outcome.critical_preview().collect();
    if !critical.is_empty() {
        println!("Critical issues:");
        for issue in critical {
            if issue.file.is_empty() {
                println!("  - {}", issue.description);
            } else {
                println!("  - {}: {}", issue.file, issue.description);
            }
        }
    }
    println!("Saved: {}", outcome.saved);
    Ok(())
}
