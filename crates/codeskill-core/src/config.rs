use crate::error::{Result, SkillError};
use crate::gate::ReviewMode;
use crate::paths;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

pub const DEFAULT_MODEL: &str = "claude-sonnet-4-5-20250929";

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    #[default]
    Anthropic,
    #[serde(alias = "open_ai")]
    Openai,
}

impl Provider {
    pub fn as_str(self) -> &'static str {
        match self {
            Provider::Anthropic => "anthropic",
            Provider::Openai => "openai",
        }
    }

    pub fn default_api_key_env(self) -> &'static str {
        match self {
            Provider::Anthropic => "ANTHROPIC_API_KEY",
            Provider::Openai => "OPENAI_API_KEY",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "anthropic" => Ok(Provider::Anthropic),
            "openai" | "open_ai" => Ok(Provider::Openai),
            other => Err(format!("unknown provider '{other}' (expected anthropic or openai)")),
        }
    }
}

// ---------------------------------------------------------------------------
// LlmConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub provider: Provider,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Environment variable holding the API key. Defaults per provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_timeout_seconds() -> u64 {
    300
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: Provider::default(),
            model: default_model(),
            base_url: None,
            api_key_env: None,
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl LlmConfig {
    pub fn api_key_env(&self) -> &str {
        self.api_key_env
            .as_deref()
            .unwrap_or_else(|| self.provider.default_api_key_env())
    }
}

// ---------------------------------------------------------------------------
// AgentOverride
// ---------------------------------------------------------------------------

/// Per-agent generation overrides. Unset fields fall back to the agent's
/// built-in profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

// ---------------------------------------------------------------------------
// WorkflowConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowConfig {
    #[serde(default)]
    pub review_mode: ReviewMode,
    #[serde(default)]
    pub pause_for_review: bool,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_delay")]
    pub retry_delay_seconds: u64,
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay() -> u64 {
    2
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            review_mode: ReviewMode::default(),
            pause_for_review: false,
            max_retries: default_max_retries(),
            retry_delay_seconds: default_retry_delay(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub llm: LlmConfig,
    /// Keyed by agent name, e.g. `task_planner`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub agents: BTreeMap<String, AgentOverride>,
    #[serde(default)]
    pub workflow: WorkflowConfig,
}

impl Config {
    /// Load `.codeskill/config.yaml`, or defaults when the file is absent.
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(&path)?;
        if data.trim().is_empty() {
            return Ok(Self::default());
        }
        let cfg: Config = serde_yaml::from_str(&data)
            .map_err(|e| SkillError::Config(format!("{}: {e}", path.display())))?;
        Ok(cfg)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    pub fn agent_override(&self, agent: &str) -> Option<&AgentOverride> {
        self.agents.get(agent)
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.llm.model.trim().is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "llm.model is empty".to_string(),
            });
        }

        let claude_model = self.llm.model.starts_with("claude");
        if self.llm.provider == Provider::Openai && claude_model {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "llm.model '{}' looks like an Anthropic model but provider is openai",
                    self.llm.model
                ),
            });
        }

        if self.llm.timeout_seconds == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "llm.timeout_seconds must be greater than 0".to_string(),
            });
        }

        for (name, ov) in &self.agents {
            if !crate::agents::AGENT_NAMES.contains(&name.as_str()) {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!("unknown agent '{name}' in agents"),
                });
            }
            if let Some(t) = ov.temperature {
                if !(0.0..=1.0).contains(&t) {
                    warnings.push(ConfigWarning {
                        level: WarnLevel::Warning,
                        message: format!("agents.{name}.temperature={t} is outside 0.0..=1.0"),
                    });
                }
            }
            if ov.max_tokens == Some(0) {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: format!("agents.{name}.max_tokens must be greater than 0"),
                });
            }
        }

        match self.workflow.max_retries {
            0 => warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "workflow.max_retries=0 would never run the workflow".to_string(),
            }),
            n if n > 10 => warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "workflow.max_retries={n} is unusual (>10); every retry re-runs all six stages"
                ),
            }),
            _ => {}
        }

        if self.workflow.pause_for_review && self.workflow.review_mode == ReviewMode::Auto {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "workflow.pause_for_review has no effect unless review_mode is manual"
                    .to_string(),
            });
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let cfg = Config::load(dir.path()).unwrap();
        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.llm.model, DEFAULT_MODEL);
        assert_eq!(cfg.workflow.max_retries, 3);
        assert_eq!(cfg.workflow.retry_delay_seconds, 2);
        assert_eq!(cfg.llm.api_key_env(), "ANTHROPIC_API_KEY");
    }

    #[test]
    fn save_then_load() {
        let dir = TempDir::new().unwrap();
        let mut cfg = Config::default();
        cfg.llm.provider = Provider::Openai;
        cfg.llm.model = "gpt-4o".into();
        cfg.agents.insert(
            "task_planner".into(),
            AgentOverride {
                temperature: Some(0.1),
                ..Default::default()
            },
        );
        cfg.save(dir.path()).unwrap();
        assert!(dir.path().join(".codeskill/config.yaml").exists());

        let loaded = Config::load(dir.path()).unwrap();
        assert_eq!(loaded, cfg);
        assert_eq!(loaded.llm.api_key_env(), "OPENAI_API_KEY");
    }

    #[test]
    fn partial_yaml_fills_defaults() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(".codeskill")).unwrap();
        std::fs::write(
            dir.path().join(".codeskill/config.yaml"),
            "workflow:\n  review_mode: manual\n  pause_for_review: true\n",
        )
        .unwrap();
        let cfg = Config::load(dir.path()).unwrap();
        assert_eq!(cfg.workflow.review_mode, ReviewMode::Manual);
        assert!(cfg.workflow.pause_for_review);
        assert_eq!(cfg.workflow.max_retries, 3);
        assert_eq!(cfg.llm.provider, Provider::Anthropic);
    }

    #[test]
    fn invalid_yaml_is_a_config_error() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(".codeskill")).unwrap();
        std::fs::write(dir.path().join(".codeskill/config.yaml"), "llm: [1, 2").unwrap();
        assert!(matches!(Config::load(dir.path()), Err(SkillError::Config(_))));
    }

    #[test]
    fn default_config_has_no_warnings() {
        assert!(Config::default().validate().is_empty());
    }

    #[test]
    fn validate_flags_bad_values() {
        let mut cfg = Config::default();
        cfg.workflow.max_retries = 15;
        cfg.agents.insert(
            "bogus_agent".into(),
            AgentOverride {
                temperature: Some(1.7),
                max_tokens: Some(0),
                ..Default::default()
            },
        );
        let warnings = cfg.validate();
        assert!(warnings.iter().any(|w| w.message.contains("max_retries=15")));
        assert!(warnings.iter().any(|w| w.message.contains("unknown agent 'bogus_agent'")));
        assert!(warnings.iter().any(|w| w.message.contains("temperature=1.7")));
        assert!(warnings
            .iter()
            .any(|w| w.level == WarnLevel::Error && w.message.contains("max_tokens")));
    }

    #[test]
    fn provider_model_mismatch_warns() {
        let mut cfg = Config::default();
        cfg.llm.provider = Provider::Openai;
        let warnings = cfg.validate();
        assert!(warnings.iter().any(|w| w.message.contains("provider is openai")));
    }
}
