use super::{GenerationArgs, Session};
use crate::config::Config;
use crate::prompts::Prompt;
use crate::saved::{RequestStore, SavedRequest};
use crate::ui;
use anyhow::{Context, Result};
use clap::Subcommand;

const DEFAULT_TEMPERATURE: f32 = 0.7;

#[derive(Debug, Subcommand)]
pub enum ApiCommand {
    /// Send a prompt straight to the model
    Request {
        prompt: String,

        /// Also save the request under this name
        #[arg(long, value_name = "NAME")]
        save: Option<String>,

        #[command(flatten)]
        generation: GenerationArgs,
    },
    /// List saved requests
    Saved,
    /// Show a saved request, optionally running it
    Load {
        name: String,

        /// Run the request
        #[arg(short, long)]
        execute: bool,

        /// Hide the model's <think> reasoning
        #[arg(long)]
        no_thinking: bool,
    },
    /// Show or change configuration
    Config {
        /// Set a value, e.g. --set ollama.timeout_secs=120 (repeatable)
        #[arg(long = "set", value_name = "KEY=VALUE")]
        set: Vec<String>,

        /// Restore the default configuration
        #[arg(long)]
        reset: bool,
    },
}

pub async fn run(session: &Session, command: ApiCommand) -> Result<()> {
    match command {
        ApiCommand::Request {
            prompt,
            save,
            generation,
        } => {
            if let Some(name) = save {
                let model = generation
                    .model
                    .clone()
                    .unwrap_or_else(|| session.config.ollama.default_model.clone());
                let request = SavedRequest::new(
                    &name,
                    &prompt,
                    &model,
                    generation.temperature.unwrap_or(DEFAULT_TEMPERATURE),
                    session.render_options(&generation).stream,
                );
                let path = store()?.save(&request)?;
                ui::success(format!("Request saved as '{}' ({})", name, path.display()));
            }
            let prompt = Prompt {
                system: None,
                user: prompt,
            };
            session
                .generate(&generation, prompt, DEFAULT_TEMPERATURE, None)
                .await?;
            Ok(())
        }
        ApiCommand::Saved => list_saved(),
        ApiCommand::Load {
            name,
            execute,
            no_thinking,
        } => {
            let request = store()?.load(&name)?;
            println!("{}", ui::heading(&format!("Request '{}'", request.name)));
            println!("Model:       {}", request.model);
            println!("Temperature: {}", request.temperature);
            println!("Stream:      {}", request.stream);
            println!("Saved:       {}", request.saved_at);
            println!("Prompt:\n{}\n", request.prompt);

            if execute {
                let generation = GenerationArgs {
                    model: Some(request.model),
                    temperature: Some(request.temperature),
                    no_stream: !request.stream,
                    no_thinking,
                };
                let prompt = Prompt {
                    system: None,
                    user: request.prompt,
                };
                session
                    .generate(&generation, prompt, DEFAULT_TEMPERATURE, None)
                    .await?;
            }
            Ok(())
        }
        ApiCommand::Config { set, reset } => configure(session.config.clone(), &set, reset),
    }
}

fn store() -> Result<RequestStore> {
    Ok(RequestStore::new(Config::requests_dir()?))
}

fn list_saved() -> Result<()> {
    let store = store()?;
    let requests = store.list()?;
    if requests.is_empty() {
        ui::info(format!(
            "No saved requests in {}. Save one with: aidev api request <PROMPT> --save <NAME>",
            store.dir().display()
        ));
        return Ok(());
    }

    println!("{}", ui::heading("Saved requests"));
    for request in &requests {
        println!(
            "  {:<20} {:<20} {}",
            request.name, request.model, request.saved_at
        );
    }
    Ok(())
}

fn configure(mut config: Config, assignments: &[String], reset: bool) -> Result<()> {
    let changed = apply_changes(&mut config, assignments, reset)?;
    if changed {
        config.save()?;
        ui::success(format!(
            "Configuration saved to {}",
            Config::config_path()?.display()
        ));
    }

    println!("{}", ui::heading("Configuration"));
    for (key, value) in config.entries() {
        println!("  {:<24} {}", key, value);
    }
    Ok(())
}

/// Apply `--reset` then each `KEY=VALUE`. Returns whether anything changed.
fn apply_changes(config: &mut Config, assignments: &[String], reset: bool) -> Result<bool> {
    if reset {
        *config = Config::default();
    }
    for assignment in assignments {
        let (key, value) = assignment
            .split_once('=')
            .with_context(|| format!("Expected KEY=VALUE, got '{}'", assignment))?;
        config.set(key.trim(), value)?;
    }
    Ok(reset || !assignments.is_empty())
}
