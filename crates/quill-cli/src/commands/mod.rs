use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{Shell, generate};
use std::path::PathBuf;

use quill_config::ConfigLoader;
use quill_core::QuillError;

mod engine;
mod skills;
mod tools;

/// Quill: run prompt, workflow, tool and hybrid skills from the terminal
#[derive(Parser)]
#[command(name = "quill", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to quill.toml config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level override (e.g. debug, info, warn, error)
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Enable verbose output (debug logging)
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Suppress all log output (errors only)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage and run skills
    Skill {
        #[command(subcommand)]
        action: SkillAction,
    },
    /// Inspect the tool plugins skills can call
    Tool {
        #[command(subcommand)]
        action: ToolAction,
    },
    /// Show current configuration
    Config {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show version and build info
    Version,
    /// Generate shell completions for bash, zsh, or fish
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum SkillAction {
    /// List registered skills
    List {
        /// Only show one category (writing, editing, analysis, automation, custom)
        #[arg(long)]
        category: Option<String>,
    },
    /// Show details of a skill
    Show { id: String },
    /// Search skills by name, description and tags
    Search { query: String },
    /// Run a skill
    Run {
        id: String,
        /// Parameters as key=value pairs; values that parse as JSON are passed as JSON
        #[arg(short, long, value_parser = parse_key_val)]
        param: Vec<(String, String)>,
        /// Path of the document the skill operates on
        #[arg(long)]
        document: Option<PathBuf>,
        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Enable a skill
    Enable { id: String },
    /// Disable a skill
    Disable { id: String },
    /// Remove a disabled skill
    Remove { id: String },
    /// Import a skill from a JSON file
    Import { file: PathBuf },
    /// Export a skill as JSON
    Export {
        id: String,
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Register the builtin skill library
    Builtin,
}

#[derive(Subcommand)]
enum ToolAction {
    /// List tools and the plugins that provide them
    List {
        /// Only show tools matching this query
        #[arg(long)]
        search: Option<String>,
    },
}

/// Parse "key=value" CLI arguments.
fn parse_key_val(s: &str) -> std::result::Result<(String, String), String> {
    let pos = s
        .find('=')
        .ok_or_else(|| format!("invalid KEY=VALUE: no `=` found in `{s}`"))?;
    Ok((s[..pos].to_string(), s[pos + 1..].to_string()))
}

impl Cli {
    pub async fn run(self) -> quill_core::Result<()> {
        // Load config first so we can use it for log format
        let config_loader = ConfigLoader::load(self.config.as_deref())?;
        let config = config_loader.get();

        // Resolve log level: --verbose > --quiet > --log-level > config
        let log_level = if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            self.log_level.as_deref().unwrap_or(config.logging.level.as_str())
        };

        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));
        match config.logging.format.as_str() {
            "json" => tracing_subscriber::fmt()
                .with_env_filter(filter)
                .json()
                .with_target(true)
                .with_writer(std::io::stderr)
                .init(),
            "compact" => tracing_subscriber::fmt()
                .with_env_filter(filter)
                .compact()
                .with_target(false)
                .with_writer(std::io::stderr)
                .init(),
            _ => tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init(),
        }

        match self.command {
            Commands::Skill { action } => skills::cmd_skill(&config, action).await,
            Commands::Tool { action } => tools::cmd_tool(action),
            Commands::Config { json } => Self::cmd_config(&config, json, &config_loader),
            Commands::Version => Self::cmd_version(),
            Commands::Completions { shell } => Self::cmd_completions(shell),
        }
    }

    fn cmd_config(
        config: &quill_config::QuillConfig,
        json: bool,
        loader: &ConfigLoader,
    ) -> quill_core::Result<()> {
        let mut shown = config.clone();
        if shown.ai.api_key.is_some() {
            shown.ai.api_key = Some("********".into());
        }

        if json {
            println!("{}", serde_json::to_string_pretty(&shown)?);
        } else {
            println!("# {}", loader.path().display());
            println!(
                "{}",
                toml::to_string_pretty(&shown).map_err(|e| QuillError::Config(e.to_string()))?
            );
        }
        Ok(())
    }

    fn cmd_version() -> quill_core::Result<()> {
        println!("Quill v{}", env!("CARGO_PKG_VERSION"));
        println!("   Rust edition: 2024");
        println!("   Target: {}", std::env::consts::ARCH);
        println!("   OS: {}", std::env::consts::OS);
        #[cfg(debug_assertions)]
        println!("   Profile: debug");
        #[cfg(not(debug_assertions))]
        println!("   Profile: release");
        Ok(())
    }

    fn cmd_completions(shell: Shell) -> quill_core::Result<()> {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "quill", &mut std::io::stdout());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_val_splits_on_first_equals() {
        assert_eq!(
            parse_key_val("query=a=b").unwrap(),
            ("query".to_string(), "a=b".to_string())
        );
        assert!(parse_key_val("novalue").is_err());
    }

    #[test]
    fn cli_parses_skill_run() {
        let cli = Cli::try_parse_from([
            "quill", "skill", "run", "skill-summarize", "-p", "content=hello", "--json",
        ])
        .unwrap();
        match cli.command {
            Commands::Skill {
                action: SkillAction::Run { id, param, json, .. },
            } => {
                assert_eq!(id, "skill-summarize");
                assert_eq!(param, vec![("content".to_string(), "hello".to_string())]);
                assert!(json);
            }
            _ => panic!("expected skill run"),
        }
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }
}
