use super::{enhanced, Overrides, Session};
use anyhow::Context;
use codeskill_core::coordinator::Coordinator;
use codeskill_core::paths;
use std::path::Path;

pub fn run(root: &Path, overrides: &Overrides, json: bool) -> anyhow::Result<()> {
    let session = Session::open(root, overrides)?;
    let coordinator = Coordinator::new(&session.backend, &session.sink, session.agents());
    let checkpoint = coordinator
        .load_checkpoint()
        .with_context(|| format!("no paused workflow found at {}", paths::CHECKPOINT_FILE))?;
    let result = coordinator.resume(checkpoint);
    enhanced::render(&result, json)
}
