use super::Skills;
use crate::agents::GenerationContext;
use crate::error::{Result, SkillError};
use crate::task::{PlannedFile, Task};
use serde::Serialize;
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize)]
pub struct RefactorOutcome {
    pub refactored_files: Vec<String>,
    pub skipped_files: Vec<String>,
    pub total_files: usize,
}

impl Skills<'_> {
    /// Regenerate each file toward `goal`. A file is overwritten unless the
    /// quick review reports critical issues; an unreadable file, a failed
    /// generation or an empty result skips it.
    pub fn refactor(&self, files: &[String], goal: &str) -> Result<RefactorOutcome> {
        if files.is_empty() {
            return Err(SkillError::Failed(
                "No files specified for refactoring".to_string(),
            ));
        }
        info!(files = files.len(), goal, "refactoring");

        let mut refactored_files = Vec::new();
        let mut skipped_files = Vec::new();
        for (i, path) in files.iter().enumerate() {
            match self.refactor_one(i, path, goal) {
                Ok(true) => {
                    info!(path = %path, "refactored");
                    refactored_files.push(path.clone());
                }
                Ok(false) => skipped_files.push(path.clone()),
                Err(e) => {
                    warn!(path = %path, error = %e, "refactor failed; skipping");
                    skipped_files.push(path.clone());
                }
            }
        }

        Ok(RefactorOutcome {
            refactored_files,
            skipped_files,
            total_files: files.len(),
        })
    }

    /// `Ok(false)` when the file was deliberately left alone.
    fn refactor_one(&self, index: usize, path: &str, goal: &str) -> Result<bool> {
        let original = self.sink.read_to_string(path)?;

        let mut task = Task::new(format!("refactor-{}", index + 1), format!("Refactor {path}"));
        task.description = goal.to_string();
        task.files_to_create = vec![PlannedFile::Described {
            path: path.to_string(),
            description: "Refactored version".to_string(),
        }];
        let context = GenerationContext::Refactor {
            original_code: &original,
            refactor_goal: goal,
        };
        let code = self
            .agents
            .code_generator
            .execute(self.llm, &task, &context)?;
        let Some(new_content) = code.files.into_iter().next().map(|f| f.content) else {
            warn!(path, "generator returned no files");
            return Ok(false);
        };

        match self
            .agents
            .code_reviewer
            .quick_review(self.llm, path, &new_content)
        {
            Ok(review) if review.has_critical_issues => {
                warn!(path, issues = ?review.issues, "critical issues found; skipping");
                return Ok(false);
            }
            Ok(_) => {}
            Err(f) => warn!(path, error = %f.error, "quick review failed; writing anyway"),
        }

        self.sink.write(path, new_content.as_bytes())?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::{Agents, MockLlm};
    use crate::error::CompletionErrorKind;
    use crate::sink::FsSink;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn rewritten(content: &str) -> serde_json::Value {
        json!({"files": [{"path": "ignored", "content": content}]})
    }

    #[test]
    fn writes_clean_skips_critical() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.py"), "x=1\n").unwrap();
        fs::write(dir.path().join("b.py"), "y=2\n").unwrap();
        let sink = FsSink::new(dir.path());
        let llm = MockLlm::new();
        llm.push_json(rewritten("x = 1\n"));
        llm.push_json(json!({"has_critical_issues": false, "issues": []}));
        llm.push_json(rewritten("eval(input())\n"));
        llm.push_json(json!({"has_critical_issues": true, "issues": ["eval"]}));

        let files = vec!["a.py".to_string(), "b.py".to_string()];
        let out = Skills::new(&llm, &sink, Agents::default())
            .refactor(&files, "pep8")
            .unwrap();
        assert_eq!(out.refactored_files, ["a.py"]);
        assert_eq!(out.skipped_files, ["b.py"]);
        assert_eq!(out.total_files, 2);
        assert_eq!(fs::read_to_string(dir.path().join("a.py")).unwrap(), "x = 1\n");
        assert_eq!(fs::read_to_string(dir.path().join("b.py")).unwrap(), "y=2\n");

        let gen_prompt = &llm.requests()[0].prompt;
        assert!(gen_prompt.contains("Refactor a.py"));
        assert!(gen_prompt.contains("x=1"));
        assert_eq!(llm.requests()[1].max_tokens, 2000);
    }

    #[test]
    fn failed_quick_review_still_writes() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.py"), "x=1\n").unwrap();
        let sink = FsSink::new(dir.path());
        let llm = MockLlm::new();
        llm.push_json(rewritten("x = 1\n"));
        llm.push_error(CompletionErrorKind::Timeout, "timed out");

        let out = Skills::new(&llm, &sink, Agents::default())
            .refactor(&["a.py".to_string()], "tidy")
            .unwrap();
        assert_eq!(out.refactored_files, ["a.py"]);
    }

    #[test]
    fn missing_file_is_skipped_without_calls() {
        let dir = TempDir::new().unwrap();
        let sink = FsSink::new(dir.path());
        let llm = MockLlm::new();
        let out = Skills::new(&llm, &sink, Agents::default())
            .refactor(&["nope.py".to_string()], "tidy")
            .unwrap();
        assert_eq!(out.skipped_files, ["nope.py"]);
        assert!(llm.calls().is_empty());
    }

    #[test]
    fn no_files_is_an_error() {
        let dir = TempDir::new().unwrap();
        let sink = FsSink::new(dir.path());
        let llm = MockLlm::new();
        assert!(Skills::new(&llm, &sink, Agents::default())
            .refactor(&[], "tidy")
            .is_err());
    }
}
