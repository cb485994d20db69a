//! aidev - developer assistant backed by a local Ollama model.
//!
//! Builds prompts for everyday development chores and streams the model's
//! answer to the terminal, with `<think>` reasoning shown separately.

mod backend;
mod commands;
mod config;
mod context;
mod error;
mod input;
mod interrupt;
mod prompts;
mod render;
mod saved;
mod stream;
mod ui;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use commands::api::ApiCommand;
use commands::code::CodeCommand;
use commands::docs::DocsCommand;
use commands::git::GitCommand;
use commands::terminal::TerminalCommand;
use commands::Session;
use error::GenerateError;
use std::process::Command as ProcessCommand;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "aidev")]
#[command(author, version, about = "Developer assistant backed by a local Ollama model")]
#[command(long_about = "Generates and explains code, shell commands, commit messages and \
documentation using a model served by Ollama.\n\nStart the server with: ollama serve")]
struct Cli {
    /// More logging (-v info, -vv debug). AIDEV_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate or explain code
    Code {
        #[command(subcommand)]
        action: CodeCommand,
    },
    /// Suggest or explain shell commands
    Terminal {
        #[command(subcommand)]
        action: TerminalCommand,
    },
    /// Commit messages and pull request descriptions
    Git {
        #[command(subcommand)]
        action: GitCommand,
    },
    /// Search and summarize documentation
    Docs {
        #[command(subcommand)]
        action: DocsCommand,
    },
    /// Direct requests, saved requests and settings
    Api {
        #[command(subcommand)]
        action: ApiCommand,
    },
    /// List installed models
    Models,
    /// Open configuration file in $EDITOR
    Config,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.verbose) {
        eprintln!("Failed to initialise logging: {:#}", e);
    }

    if let Err(e) = run(cli.command).await {
        std::process::exit(report_error(&e));
    }
}

async fn run(command: Commands) -> Result<()> {
    if let Commands::Config = command {
        return handle_config();
    }

    let config = config::Config::load().context("Failed to load configuration")?;
    ui::set_color(config.display.color && atty::is(atty::Stream::Stderr));
    debug!("Loaded configuration: {:?}", config);
    let session = Session::new(config)?;
    interrupt::watch(session.interrupts());

    match command {
        Commands::Code { action } => commands::code::run(&session, action).await,
        Commands::Terminal { action } => commands::terminal::run(&session, action).await,
        Commands::Git { action } => commands::git::run(&session, action).await,
        Commands::Docs { action } => commands::docs::run(&session, action).await,
        Commands::Api { action } => commands::api::run(&session, action).await,
        Commands::Models => commands::models::run(&session).await,
        Commands::Config => handle_config(),
    }
}

fn init_logging(verbose: u8) -> Result<()> {
    let filter = match std::env::var("AIDEV_LOG") {
        Ok(directives) => EnvFilter::try_new(directives)?,
        Err(_) => {
            let level = match verbose {
                0 => "warn",
                1 => "info",
                _ => "debug",
            };
            EnvFilter::new(format!("aidev={}", level)).add_directive("reqwest=warn".parse()?)
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("{}", e))
}

/// Print `err` with its hint and return the exit code.
fn report_error(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<GenerateError>() {
        Some(GenerateError::Interrupted) => {
            ui::warning("Interrupted.");
            GenerateError::Interrupted.exit_code()
        }
        Some(generate_err) => {
            ui::error(format!("{:#}", err));
            if let Some(hint) = generate_err.hint() {
                ui::info(hint);
            }
            generate_err.exit_code()
        }
        None => {
            ui::error(format!("{:#}", err));
            1
        }
    }
}

/// Open the config file in $EDITOR, creating it first if needed.
fn handle_config() -> Result<()> {
    let config_path = config::Config::config_path()?;

    if !config_path.exists() {
        config::Config::default().save()?;
        ui::info(format!("Created default config at {}", config_path.display()));
    }

    let editor = std::env::var("EDITOR").unwrap_or_else(|_| "vi".to_string());
    let status = ProcessCommand::new(&editor)
        .arg(&config_path)
        .status()
        .with_context(|| format!("Failed to open editor '{}'", editor))?;

    if !status.success() {
        ui::warning("Editor exited with non-zero status");
    }

    // Catch mistakes while the user is still looking at the file.
    config::Config::load_from(&config_path)
        .with_context(|| format!("{} is no longer valid", config_path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_generation_flags() {
        let cli = Cli::try_parse_from([
            "aidev",
            "-vv",
            "code",
            "generate",
            "parse a csv file",
            "--language",
            "rust",
            "-m",
            "llama3.2:3b",
            "--no-thinking",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Code {
                action:
                    CodeCommand::Generate {
                        description,
                        language,
                        generation,
                        ..
                    },
            } => {
                assert_eq!(description, "parse a csv file");
                assert_eq!(language, "rust");
                assert_eq!(generation.model.as_deref(), Some("llama3.2:3b"));
                assert!(generation.no_thinking);
                assert!(!generation.no_stream);
            }
            _ => panic!("wrong command"),
        }
    }

    #[test]
    fn test_parse_terminal_explain_keeps_flags() {
        let cli = Cli::try_parse_from(["aidev", "terminal", "explain", "tar", "-xzf", "a.tgz"])
            .unwrap();
        match cli.command {
            Commands::Terminal {
                action: TerminalCommand::Explain { command, .. },
            } => assert_eq!(command, vec!["tar", "-xzf", "a.tgz"]),
            _ => panic!("wrong command"),
        }
    }

    #[test]
    fn test_report_error_exit_codes() {
        let interrupted = anyhow::Error::new(GenerateError::Interrupted);
        assert_eq!(report_error(&interrupted), 130);

        let missing = anyhow::Error::new(GenerateError::ModelNotFound {
            model: "x".to_string(),
        })
        .context("while generating");
        assert_eq!(report_error(&missing), 1);
    }
}
