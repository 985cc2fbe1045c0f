use super::{Overrides, Session};
use crate::output::{print_json, print_list};
use codeskill_core::skills::Skills;
use std::path::Path;

pub fn run(
    root: &Path,
    overrides: &Overrides,
    files: &[String],
    goal: &str,
    json: bool,
) -> anyhow::Result<()> {
    let session = Session::open(root, overrides)?;
    let outcome = Skills::new(&session.backend, &session.sink, session.agents()).refactor(files, goal)?;

    if json {
        return print_json(&outcome);
    }
    println!(
        "Refactored {}/{} file(s)",
        outcome.refactored_files.len(),
        outcome.total_files
    );
    print_list("Refactored", &outcome.refactored_files);
    print_list("Skipped", &outcome.skipped_files);
    Ok(())
}
