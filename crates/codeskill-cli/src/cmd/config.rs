use crate::output::{print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use codeskill_core::config::{Config, WarnLevel};
use codeskill_core::paths;
use std::path::Path;

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Print the effective configuration
    Show,

    /// Validate the config for common mistakes
    Validate,

    /// Write a default .codeskill/config.yaml (never overwrites)
    Init,
}

pub fn run(root: &Path, subcmd: ConfigSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        ConfigSubcommand::Show => show(root, json),
        ConfigSubcommand::Validate => validate(root, json),
        ConfigSubcommand::Init => init(root, json),
    }
}

// ---------------------------------------------------------------------------
// show
// ---------------------------------------------------------------------------

fn show(root: &Path, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;
    if json {
        return print_json(&config);
    }

    let llm = &config.llm;
    let wf = &config.workflow;
    let rows = vec![
        vec!["llm.provider".to_string(), llm.provider.to_string()],
        vec!["llm.model".to_string(), llm.model.clone()],
        vec![
            "llm.base_url".to_string(),
            llm.base_url
                .clone()
                .unwrap_or_else(|| "(provider default)".to_string()),
        ],
        vec!["llm.api_key_env".to_string(), llm.api_key_env().to_string()],
        vec!["llm.timeout_seconds".to_string(), llm.timeout_seconds.to_string()],
        vec!["workflow.review_mode".to_string(), wf.review_mode.to_string()],
        vec!["workflow.pause_for_review".to_string(), wf.pause_for_review.to_string()],
        vec!["workflow.max_retries".to_string(), wf.max_retries.to_string()],
        vec![
            "workflow.retry_delay_seconds".to_string(),
            wf.retry_delay_seconds.to_string(),
        ],
    ];
    print_table(&["KEY", "VALUE"], rows);

    if !config.agents.is_empty() {
        println!();
        let rows = config
            .agents
            .iter()
            .map(|(name, ov)| {
                vec![
                    name.clone(),
                    ov.model.clone().unwrap_or_else(|| "-".to_string()),
                    ov.temperature.map_or_else(|| "-".to_string(), |t| t.to_string()),
                    ov.max_tokens.map_or_else(|| "-".to_string(), |n| n.to_string()),
                ]
            })
            .collect();
        print_table(&["AGENT", "MODEL", "TEMPERATURE", "MAX TOKENS"], rows);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// validate
// ---------------------------------------------------------------------------

fn validate(root: &Path, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;
    let warnings = config.validate();

    if json {
        print_json(&serde_json::json!({ "warnings": warnings }))?;
    } else if warnings.is_empty() {
        println!("Config is valid. No warnings.");
    } else {
        for w in &warnings {
            let prefix = match w.level {
                WarnLevel::Warning => "warning",
                WarnLevel::Error => "error",
            };
            println!("[{prefix}] {}", w.message);
        }
    }

    if warnings.iter().any(|w| w.level == WarnLevel::Error) {
        anyhow::bail!("config validation found errors");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// init
// ---------------------------------------------------------------------------

fn init(root: &Path, json: bool) -> anyhow::Result<()> {
    let path = paths::config_path(root);
    let created = !path.exists();
    if created {
        Config::default()
            .save(root)
            .context("failed to write config.yaml")?;
    }

    if json {
        print_json(&serde_json::json!({
            "path": paths::CONFIG_FILE,
            "created": created,
        }))
    } else {
        let verb = if created { "created:" } else { "exists: " };
        println!("  {verb} {}", paths::CONFIG_FILE);
        Ok(())
    }
}
