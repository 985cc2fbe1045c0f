//! Project-relative locations of everything the workflow persists.
//!
//! Sink paths are plain relative strings; [`crate::sink::FsSink`] joins them
//! onto the project root.

use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Directory and file constants
// ---------------------------------------------------------------------------

pub const DOCS_DIR: &str = "docs";
pub const CONFIG_DIR: &str = ".codeskill";
pub const CONFIG_FILE: &str = ".codeskill/config.yaml";

pub const CHECKPOINT_FILE: &str = "docs/workflow_checkpoint.json";
pub const WORKFLOW_REPORT_FILE: &str = "docs/complete_workflow_report.json";
pub const FIX_LOG_FILE: &str = "docs/fix_log.json";

pub const REQUIREMENT_DOC: &str = "docs/requirement.json";
pub const ARCHITECTURE_DOC: &str = "docs/architecture.json";
pub const API_SPEC_DOC: &str = "docs/api_spec.json";
pub const CODE_REVIEW_DOC: &str = "docs/code_review.json";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

/// `docs/<report_key>_report.json`
pub fn stage_report(report_key: &str) -> String {
    format!("{DOCS_DIR}/{report_key}_report.json")
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_report_lives_under_docs() {
        assert_eq!(
            stage_report("stage3_design_review"),
            "docs/stage3_design_review_report.json"
        );
    }

    #[test]
    fn config_path_joins_root() {
        let p = config_path(Path::new("/tmp/proj"));
        assert_eq!(p, PathBuf::from("/tmp/proj/.codeskill/config.yaml"));
    }
}
