mod backend;
mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::config::ConfigSubcommand;
use cmd::Overrides;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "codeskill",
    about = "Requirement-to-code workflow driven by LLM stage agents",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project directory (default: auto-detect from .codeskill/ or .git/)
    #[arg(long = "project-path", global = true, env = "CODESKILL_PROJECT")]
    project_path: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    /// Override llm.model for every agent
    #[arg(long, global = true)]
    model: Option<String>,

    /// Override llm.provider (anthropic or openai)
    #[arg(long, global = true)]
    provider: Option<String>,

    /// Debug logging
    #[arg(long, short = 'v', global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Errors only
    #[arg(long, short = 'q', global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the plain pipeline: requirement, design, tasks, code, review
    Code {
        requirement: String,
        /// auto, semi-auto or manual (recorded only)
        #[arg(long, default_value = "auto")]
        mode: String,
    },

    /// Run the six-stage workflow with reports, design gate and retries
    EnhancedCode {
        requirement: String,
        /// auto or manual (default: workflow.review_mode)
        #[arg(long)]
        review_mode: Option<String>,
        /// Pause after design when review mode is manual
        #[arg(long)]
        pause_for_review: bool,
        /// Whole-workflow attempts (default: workflow.max_retries)
        #[arg(long)]
        max_retries: Option<u32>,
    },

    /// Continue a workflow paused for manual design review
    Resume,

    /// Requirement analysis, architecture and API design only
    Design { requirement: String },

    /// Review existing source files
    Review {
        /// Files to review (default: every *.<ext> file in the project)
        files: Vec<String>,
        /// Extension used when discovering files
        #[arg(long, default_value = "py")]
        ext: String,
        /// Requirement document (JSON) to review against
        #[arg(long)]
        requirement_path: Option<String>,
    },

    /// Regenerate files toward a goal, skipping results with critical issues
    Refactor {
        #[arg(required = true)]
        files: Vec<String>,
        /// What the refactor should achieve
        #[arg(long)]
        goal: String,
    },

    /// Show, validate or initialize the project configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        tracing::Level::DEBUG
    } else if cli.quiet {
        tracing::Level::ERROR
    } else {
        match &cli.command {
            Commands::Config { .. } => tracing::Level::WARN,
            _ => tracing::Level::INFO,
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    dotenv::dotenv().ok();

    let root = root::resolve_root(cli.project_path.as_deref());
    let overrides = Overrides {
        model: cli.model,
        provider: cli.provider,
    };

    let result = match cli.command {
        Commands::Code { requirement, mode } => {
            cmd::code::run(&root, &overrides, &requirement, &mode, cli.json)
        }
        Commands::EnhancedCode {
            requirement,
            review_mode,
            pause_for_review,
            max_retries,
        } => cmd::enhanced::run(
            &root,
            &overrides,
            cmd::enhanced::Args {
                requirement,
                review_mode,
                pause_for_review,
                max_retries,
            },
            cli.json,
        ),
        Commands::Resume => cmd::resume::run(&root, &overrides, cli.json),
        Commands::Design { requirement } => {
            cmd::design::run(&root, &overrides, &requirement, cli.json)
        }
        Commands::Review {
            files,
            ext,
            requirement_path,
        } => cmd::review::run(&root, &overrides, files, ext, requirement_path, cli.json),
        Commands::Refactor { files, goal } => {
            cmd::refactor::run(&root, &overrides, &files, &goal, cli.json)
        }
        Commands::Config { subcommand } => cmd::config::run(&root, subcommand, cli.json),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
