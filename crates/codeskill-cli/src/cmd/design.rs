use super::{Overrides, Session};
use crate::output::{print_json, print_list};
use codeskill_core::skills::Skills;
use std::path::Path;

pub fn run(root: &Path, overrides: &Overrides, requirement: &str, json: bool) -> anyhow::Result<()> {
    let session = Session::open(root, overrides)?;
    let outcome = Skills::new(&session.backend, &session.sink, session.agents()).design(requirement)?;

    if json {
        return print_json(&outcome);
    }
    println!("Design complete: {}", outcome.requirement.title);
    println!(
        "  {} feature(s), {} data model(s), {} endpoint(s)",
        outcome.requirement.features.len(),
        outcome.architecture.data_model_count(),
        outcome.api_spec.endpoint_count()
    );
    print_list("Saved", &outcome.saved);
    Ok(())
}
