pub mod code;
pub mod config;
pub mod design;
pub mod enhanced;
pub mod refactor;
pub mod resume;
pub mod review;

use crate::backend::HttpBackend;
use anyhow::Context;
use codeskill_core::agents::Agents;
use codeskill_core::config::{Config, Provider};
use codeskill_core::sink::FsSink;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const BASE_URL_ENV: &str = "CODESKILL_BASE_URL";

/// Global flags that override the config file.
pub struct Overrides {
    pub model: Option<String>,
    pub provider: Option<String>,
}

/// Everything a pipeline command needs: resolved config, a live backend and
/// a sink rooted at the project.
pub struct Session {
    pub root: PathBuf,
    pub config: Config,
    pub backend: HttpBackend,
    pub sink: FsSink,
}

impl Session {
    pub fn open(root: &Path, overrides: &Overrides) -> anyhow::Result<Self> {
        let mut config = Config::load(root).context("failed to load config")?;
        if let Some(p) = &overrides.provider {
            config.llm.provider = p.parse::<Provider>().map_err(anyhow::Error::msg)?;
        }
        if let Some(m) = &overrides.model {
            config.llm.model = m.clone();
        }
        if let Ok(url) = std::env::var(BASE_URL_ENV) {
            if !url.trim().is_empty() {
                config.llm.base_url = Some(url);
            }
        }

        let key_env = config.llm.api_key_env().to_string();
        let api_key = std::env::var(&key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .with_context(|| missing_key_help(&key_env))?;

        debug!(
            provider = %config.llm.provider,
            model = %config.llm.model,
            root = %root.display(),
            "session ready"
        );
        let backend = HttpBackend::new(&config.llm, api_key)?;
        Ok(Self {
            root: root.to_path_buf(),
            sink: FsSink::new(root),
            config,
            backend,
        })
    }

    pub fn agents(&self) -> Agents {
        Agents::from_config(&self.config)
    }
}

fn missing_key_help(env: &str) -> String {
    format!(
        "{env} is not set\n\n\
         Set it in your shell or in a .env file in the working directory:\n\
         \n    {env}=your-api-key\n"
    )
}
