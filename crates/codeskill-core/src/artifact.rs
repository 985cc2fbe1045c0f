//! Typed artifacts produced by the design-side agents.
//!
//! Every agent response is deserialized into one of these and then passed
//! through [`Validate`], so a shape mismatch surfaces as a
//! [`SkillError::SchemaViolation`] at the stage that produced it.

use crate::error::{Result, SkillError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Structural checks that serde alone can't express.
pub trait Validate {
    const ARTIFACT: &'static str;

    fn validate(&self) -> Result<()> {
        Ok(())
    }
}

fn require_text(artifact: &str, field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(SkillError::schema(artifact, format!("'{field}' must not be empty")));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Requirement
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Requirement {
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub requirement_type: String,
    #[serde(default)]
    pub features: Vec<Feature>,
    #[serde(default)]
    pub technical_requirements: Vec<String>,
    #[serde(default)]
    pub constraints: Vec<String>,
    #[serde(default)]
    pub success_criteria: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complexity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_tasks: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub priority: String,
}

impl Validate for Requirement {
    const ARTIFACT: &'static str = "requirement";

    fn validate(&self) -> Result<()> {
        require_text(Self::ARTIFACT, "title", &self.title)?;
        for (i, f) in self.features.iter().enumerate() {
            require_text(Self::ARTIFACT, &format!("features[{i}].name"), &f.name)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Architecture
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Architecture {
    #[serde(default)]
    pub overview: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tech_stack: Option<TechStack>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory_structure: Option<DirectoryStructure>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_model: Option<Vec<DataEntity>>,
    #[serde(default)]
    pub architecture_patterns: Vec<String>,
    #[serde(default)]
    pub security_considerations: Vec<String>,
    #[serde(default)]
    pub scalability_considerations: Vec<String>,
}

/// Each layer is optional so that `{}` (nothing stated) can be told apart
/// from `{"backend": []}` (stated but empty).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TechStack {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frontend: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub infrastructure: Option<Vec<String>>,
}

impl TechStack {
    fn layers(&self) -> [&Option<Vec<String>>; 4] {
        [
            &self.frontend,
            &self.backend,
            &self.database,
            &self.infrastructure,
        ]
    }

    /// No layer is mentioned at all.
    pub fn is_unset(&self) -> bool {
        self.layers().iter().all(|l| l.is_none())
    }

    /// Every mentioned layer is empty.
    pub fn is_empty(&self) -> bool {
        self.layers()
            .iter()
            .all(|l| l.as_ref().map_or(true, |v| v.is_empty()))
    }

    pub fn backend_count(&self) -> usize {
        self.backend.as_ref().map_or(0, Vec::len)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DirectoryStructure {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tree: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataEntity {
    pub entity: String,
    #[serde(default)]
    pub fields: Vec<EntityField>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityField {
    pub name: String,
    #[serde(rename = "type", default)]
    pub field_type: String,
    #[serde(default)]
    pub description: String,
}

impl Architecture {
    pub fn data_model_count(&self) -> usize {
        self.data_model.as_ref().map_or(0, Vec::len)
    }
}

impl Validate for Architecture {
    const ARTIFACT: &'static str = "architecture";

    fn validate(&self) -> Result<()> {
        for (i, e) in self.data_model.iter().flatten().enumerate() {
            require_text(Self::ARTIFACT, &format!("data_model[{i}].entity"), &e.entity)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// ApiSpec
// ---------------------------------------------------------------------------

/// An OpenAPI-3.0-shaped document. Only `paths` is inspected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApiSpec(pub Map<String, Value>);

impl ApiSpec {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn paths(&self) -> Option<&Map<String, Value>> {
        self.0.get("paths").and_then(Value::as_object)
    }

    pub fn endpoint_count(&self) -> usize {
        self.paths().map_or(0, Map::len)
    }
}

impl Validate for ApiSpec {
    const ARTIFACT: &'static str = "api_spec";

    fn validate(&self) -> Result<()> {
        match self.0.get("paths") {
            None | Some(Value::Object(_)) => Ok(()),
            Some(_) => Err(SkillError::schema(Self::ARTIFACT, "'paths' must be an object")),
        }
    }
}

// ---------------------------------------------------------------------------
// GeneratedCode
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedCode {
    pub files: Vec<SourceFile>,
    #[serde(default)]
    pub tests: Vec<SourceFile>,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub setup_instructions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceFile {
    pub path: String,
    pub content: String,
    #[serde(default)]
    pub language: String,
}

impl GeneratedCode {
    /// Source files followed by test files.
    pub fn all_files(&self) -> impl Iterator<Item = &SourceFile> {
        self.files.iter().chain(self.tests.iter())
    }
}

impl Validate for GeneratedCode {
    const ARTIFACT: &'static str = "generated_code";

    fn validate(&self) -> Result<()> {
        for f in self.all_files() {
            require_text(Self::ARTIFACT, "files[].path", &f.path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn requirement_requires_core_fields() {
        let ok: Requirement = serde_json::from_value(json!({
            "title": "Todo", "description": "d", "type": "web"
        }))
        .unwrap();
        assert!(ok.features.is_empty());
        assert!(ok.validate().is_ok());

        let missing = serde_json::from_value::<Requirement>(json!({"title": "Todo"}));
        assert!(missing.is_err());
    }

    #[test]
    fn blank_title_is_a_schema_violation() {
        let r: Requirement = serde_json::from_value(json!({
            "title": "  ", "description": "d", "type": "web"
        }))
        .unwrap();
        assert!(matches!(r.validate(), Err(SkillError::SchemaViolation { .. })));
    }

    #[test]
    fn tech_stack_unset_vs_empty() {
        let unset: TechStack = serde_json::from_value(json!({})).unwrap();
        assert!(unset.is_unset());
        assert!(unset.is_empty());

        let empty: TechStack = serde_json::from_value(json!({"backend": []})).unwrap();
        assert!(!empty.is_unset());
        assert!(empty.is_empty());

        let full: TechStack = serde_json::from_value(json!({"backend": ["axum"]})).unwrap();
        assert!(!full.is_empty());
        assert_eq!(full.backend_count(), 1);
    }

    #[test]
    fn architecture_tolerates_missing_sections() {
        let a: Architecture = serde_json::from_value(json!({})).unwrap();
        assert!(a.tech_stack.is_none());
        assert_eq!(a.data_model_count(), 0);
    }

    #[test]
    fn api_spec_paths_must_be_object() {
        let bad: ApiSpec = serde_json::from_value(json!({"paths": ["/a"]})).unwrap();
        assert!(bad.validate().is_err());

        let good: ApiSpec =
            serde_json::from_value(json!({"openapi": "3.0.0", "paths": {"/a": {}, "/b": {}}}))
                .unwrap();
        assert!(good.validate().is_ok());
        assert_eq!(good.endpoint_count(), 2);
    }

    #[test]
    fn generated_code_rejects_blank_paths() {
        let code: GeneratedCode = serde_json::from_value(json!({
            "files": [{"path": "", "content": "x"}]
        }))
        .unwrap();
        assert!(code.validate().is_err());
    }
}
