use super::{required, Skills};
use crate::artifact::SourceFile;
use crate::error::{Result, SkillError};
use crate::paths;
use crate::score::{ReviewIssue, ReviewReport};
use crate::sink::write_json;
use ignore::WalkBuilder;
use serde::Serialize;
use serde_json::Value;
use std::path::Path;
use tracing::{info, warn};

pub const DEFAULT_EXTENSION: &str = "py";

/// Critical issues shown after a review.
pub const CRITICAL_PREVIEW: usize = 5;

#[derive(Debug, Clone, Default)]
pub struct ReviewOptions {
    /// Project-relative files. Empty means discover by extension.
    pub files: Vec<String>,
    pub extension: Option<String>,
    pub requirement_path: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReviewOutcome {
    pub files: Vec<String>,
    pub review: ReviewReport,
    pub saved: String,
}

impl ReviewOutcome {
    pub fn critical_preview(&self) -> impl Iterator<Item = &ReviewIssue> {
        self.review.critical_issues().take(CRITICAL_PREVIEW)
    }
}

impl Skills<'_> {
    /// Review existing files against an optional requirement document.
    /// `root` is only used for discovery when no files are given.
    pub fn review(&self, root: &Path, options: &ReviewOptions) -> Result<ReviewOutcome> {
        let candidates = if options.files.is_empty() {
            let ext = options.extension.as_deref().unwrap_or(DEFAULT_EXTENSION);
            discover(root, ext)?
        } else {
            options.files.clone()
        };
        if candidates.is_empty() {
            return Err(SkillError::Failed("No files found to review".to_string()));
        }
        info!(files = candidates.len(), "found files to review");

        let requirement = options
            .requirement_path
            .as_deref()
            .map(|p| self.load_requirement(p))
            .unwrap_or_else(|| Value::Object(Default::default()));

        let mut sources = Vec::new();
        for path in &candidates {
            match self.sink.read_to_string(path) {
                Ok(content) => sources.push(SourceFile {
                    path: path.clone(),
                    content,
                    language: language_of(path),
                }),
                Err(e) => warn!(path = %path, error = %e, "could not read file; skipping"),
            }
        }
        if sources.is_empty() {
            return Err(SkillError::Failed("No files found to review".to_string()));
        }

        let review = required(self.agents.code_reviewer.execute(self.llm, &sources, &requirement))?;
        write_json(self.sink, paths::CODE_REVIEW_DOC, &review)?;
        Ok(ReviewOutcome {
            files: sources.into_iter().map(|s| s.path).collect(),
            review,
            saved: paths::CODE_REVIEW_DOC.to_string(),
        })
    }

    /// A missing or unparsable requirement is reviewed against `{}`.
    fn load_requirement(&self, path: &str) -> Value {
        let parsed = self
            .sink
            .read_to_string(path)
            .and_then(|text| Ok(serde_json::from_str::<Value>(&text)?));
        match parsed {
            Ok(value) => value,
            Err(e) => {
                warn!(path, error = %e, "ignoring requirement document");
                Value::Object(Default::default())
            }
        }
    }
}

fn language_of(path: &str) -> String {
    Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_string()
}

/// Project-relative paths of every `*.<ext>` file under `root`, honoring
/// `.gitignore` and skipping hidden and `venv` directories. Sorted.
pub fn discover(root: &Path, ext: &str) -> Result<Vec<String>> {
    let ext = ext.trim_start_matches('.');
    let mut files = Vec::new();
    for entry in WalkBuilder::new(root)
        .require_git(false)
        .filter_entry(|e| e.file_name() != "venv")
        .build()
    {
        let entry = match entry {
            Ok(e) => e,
            Err(err) => {
                warn!(error = %err, "failed to read directory entry");
                continue;
            }
        };
        let path = entry.path();
        if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some(ext) {
            continue;
        }
        let rel = path.strip_prefix(root).unwrap_or(path);
        let rel: Vec<_> = rel.components().map(|c| c.as_os_str().to_string_lossy()).collect();
        files.push(rel.join("/"));
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::{Agents, MockLlm};
    use crate::sink::FsSink;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn project() -> TempDir {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("app")).unwrap();
        fs::create_dir_all(root.join("venv/lib")).unwrap();
        fs::create_dir_all(root.join("build")).unwrap();
        fs::write(root.join("app/main.py"), "print('hi')\n").unwrap();
        fs::write(root.join("app/util.py"), "def f(): pass\n").unwrap();
        fs::write(root.join("app/readme.md"), "# app\n").unwrap();
        fs::write(root.join("venv/lib/site.py"), "").unwrap();
        fs::write(root.join("build/gen.py"), "").unwrap();
        fs::write(root.join(".gitignore"), "build/\n").unwrap();
        dir
    }

    #[test]
    fn discover_filters_and_sorts() {
        let dir = project();
        assert_eq!(
            discover(dir.path(), "py").unwrap(),
            ["app/main.py", "app/util.py"]
        );
        assert_eq!(discover(dir.path(), ".md").unwrap(), ["app/readme.md"]);
    }

    #[test]
    fn reviews_discovered_files_with_requirement() {
        let dir = project();
        fs::create_dir_all(dir.path().join("docs")).unwrap();
        fs::write(
            dir.path().join("docs/requirement.json"),
            r#"{"title": "Greeter"}"#,
        )
        .unwrap();
        let sink = FsSink::new(dir.path());
        let llm = MockLlm::new();
        llm.push_json(json!({
            "overall_score": 55,
            "issues": [
                {"severity": "critical", "file": "app/main.py", "description": "prints"},
                {"severity": "low", "description": "style"}
            ]
        }));

        let out = Skills::new(&llm, &sink, Agents::default())
            .review(
                dir.path(),
                &ReviewOptions {
                    requirement_path: Some("docs/requirement.json".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(out.files, ["app/main.py", "app/util.py"]);
        assert_eq!(out.critical_preview().count(), 1);
        assert!(dir.path().join(paths::CODE_REVIEW_DOC).exists());

        let prompt = &llm.requests()[0].prompt;
        assert!(prompt.contains("Greeter"));
        assert!(prompt.contains("print('hi')"));
    }

    #[test]
    fn no_files_is_an_error() {
        let dir = TempDir::new().unwrap();
        let sink = FsSink::new(dir.path());
        let llm = MockLlm::new();
        let err = Skills::new(&llm, &sink, Agents::default())
            .review(dir.path(), &ReviewOptions::default())
            .unwrap_err();
        assert_eq!(err.to_string(), "No files found to review");
        assert!(llm.calls().is_empty());
    }
}
