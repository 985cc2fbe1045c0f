use super::{required, Skills};
use crate::artifact::{ApiSpec, Architecture, Requirement};
use crate::error::Result;
use crate::paths;
use crate::sink::{write_json, ProjectSink};
use serde::Serialize;
use tracing::info;

#[derive(Debug, Clone, Serialize)]
pub struct DesignOutcome {
    pub requirement: Requirement,
    pub architecture: Architecture,
    pub api_spec: ApiSpec,
    pub saved: Vec<String>,
}

impl Skills<'_> {
    /// Requirement analysis, architecture and API design, then the three
    /// design documents under `docs/`.
    pub fn design(&self, requirement: &str) -> Result<DesignOutcome> {
        info!("Step 1/3: analyzing requirements");
        let req = required(self.agents.requirement_analyst.execute(self.llm, requirement))?;
        info!("Step 2/3: designing architecture");
        let architecture = required(self.agents.system_architect.execute(self.llm, &req))?;
        info!("Step 3/3: designing API");
        let api_spec = required(self.agents.api_designer.execute(self.llm, &req, &architecture))?;

        let saved = save_design(self.sink, &req, &architecture, &api_spec)?;
        Ok(DesignOutcome {
            requirement: req,
            architecture,
            api_spec,
            saved,
        })
    }
}

pub(super) fn save_design(
    sink: &dyn ProjectSink,
    requirement: &Requirement,
    architecture: &Architecture,
    api_spec: &ApiSpec,
) -> Result<Vec<String>> {
    write_json(sink, paths::REQUIREMENT_DOC, requirement)?;
    write_json(sink, paths::ARCHITECTURE_DOC, architecture)?;
    write_json(sink, paths::API_SPEC_DOC, api_spec)?;
    Ok(vec![
        paths::REQUIREMENT_DOC.to_string(),
        paths::ARCHITECTURE_DOC.to_string(),
        paths::API_SPEC_DOC.to_string(),
    ])
}

#[cfg(test)]
mod tests {
    use crate::agents::{Agents, MockLlm};
    use crate::coordinator::tests::{api_spec_json, architecture_json, requirement_json};
    use crate::error::ErrorKind;
    use crate::sink::FsSink;
    use crate::skills::Skills;
    use tempfile::TempDir;

    #[test]
    fn saves_three_documents() {
        let dir = TempDir::new().unwrap();
        let sink = FsSink::new(dir.path());
        let llm = MockLlm::new();
        llm.push_json(requirement_json());
        llm.push_json(architecture_json());
        llm.push_json(api_spec_json());

        let out = Skills::new(&llm, &sink, Agents::default())
            .design("todo api")
            .unwrap();
        assert_eq!(out.requirement.title, "Todo API");
        assert_eq!(out.saved.len(), 3);
        for doc in &out.saved {
            assert!(dir.path().join(doc).exists(), "{doc} missing");
        }
    }

    #[test]
    fn architect_failure_saves_nothing() {
        let dir = TempDir::new().unwrap();
        let sink = FsSink::new(dir.path());
        let llm = MockLlm::new();
        llm.push_json(requirement_json());
        llm.push_text("I need more details first.");

        let err = Skills::new(&llm, &sink, Agents::default())
            .design("todo api")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedResponse);
        assert!(!dir.path().join("docs").exists());
    }
}
