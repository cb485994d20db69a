//! Command handlers.
//!
//! Each submodule owns one command group. They share a [`Session`] that
//! holds the configuration and the backend registry and knows how to run a
//! prompt through the model and onto the terminal.

pub mod api;
pub mod code;
pub mod docs;
pub mod git;
pub mod models;
pub mod terminal;

use crate::backend::ollama::OllamaBackend;
use crate::backend::{choose_model, BackendRegistry, GenerateRequest, ModelBackend, ModelChoice};
use crate::config::Config;
use crate::interrupt::InterruptRouter;
use crate::prompts::Prompt;
use crate::render::{self, RenderOptions, RenderedOutput};
use crate::ui;
use anyhow::{bail, Context, Result};
use clap::Args;
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use tracing::{debug, info};

/// Flags shared by every command that talks to the model.
#[derive(Debug, Clone, Default, Args)]
pub struct GenerationArgs {
    /// Model to use (default: ollama.default_model)
    #[arg(short = 'm', long, value_name = "MODEL")]
    pub model: Option<String>,

    /// Sampling temperature
    #[arg(short = 't', long, value_name = "TEMP")]
    pub temperature: Option<f32>,

    /// Print the answer once it is complete
    #[arg(long)]
    pub no_stream: bool,

    /// Hide the model's <think> reasoning
    #[arg(long)]
    pub no_thinking: bool,
}

/// Configuration plus the backends built from it.
pub struct Session {
    pub config: Config,
    registry: BackendRegistry,
    interrupts: Arc<InterruptRouter>,
}

impl Session {
    pub fn new(config: Config) -> Result<Self> {
        let mut registry = BackendRegistry::new();
        registry.register(Box::new(OllamaBackend::new(&config.ollama)?));
        Ok(Self {
            config,
            registry,
            interrupts: Arc::new(InterruptRouter::new()),
        })
    }

    /// Router that Ctrl-C is delivered through while generating.
    pub fn interrupts(&self) -> Arc<InterruptRouter> {
        Arc::clone(&self.interrupts)
    }

    /// The backend named in the configuration.
    pub fn backend(&self) -> Result<&dyn ModelBackend> {
        self.registry.get(&self.config.backend).with_context(|| {
            format!(
                "Unknown backend '{}'. Available: {}",
                self.config.backend,
                self.registry.names().join(", ")
            )
        })
    }

    /// Check `requested` (or the default model) against the installed models,
    /// falling back with a warning when it is missing.
    pub async fn resolve_model(&self, requested: Option<&str>) -> Result<String> {
        let default = self.config.ollama.default_model.as_str();
        let requested = requested.unwrap_or(default);
        let installed = self.backend()?.list_models().await?;

        match choose_model(&installed, requested, default) {
            ModelChoice::Requested(model) => Ok(model),
            ModelChoice::Fallback { requested, chosen } => {
                ui::warning(format!(
                    "Model '{}' is not installed, using '{}' instead.",
                    requested, chosen
                ));
                Ok(chosen)
            }
            ModelChoice::NoneInstalled => bail!(
                "No models are installed. Pull one with: ollama pull {}",
                default
            ),
        }
    }

    pub fn render_options(&self, args: &GenerationArgs) -> RenderOptions {
        let display = &self.config.display;
        RenderOptions {
            stream: display.stream && !args.no_stream,
            show_thinking: display.show_thinking && !args.no_thinking,
            color: display.color && atty::is(atty::Stream::Stdout),
        }
    }

    /// Run `prompt` through the model and render the answer on stdout.
    ///
    /// `temperature` applies when the user gave none on the command line.
    pub async fn generate(
        &self,
        args: &GenerationArgs,
        prompt: Prompt,
        temperature: f32,
        max_tokens: Option<u32>,
    ) -> Result<RenderedOutput> {
        let model = self.resolve_model(args.model.as_deref()).await?;
        let options = self.render_options(args);

        let mut request = GenerateRequest::new(&model, prompt.user)
            .with_temperature(args.temperature.unwrap_or(temperature))
            .with_max_tokens(max_tokens)
            .with_stream(options.stream);
        if let Some(system) = prompt.system {
            request = request.with_system(system);
        }
        info!(
            "Generating with {} (temperature {}, stream {})",
            model, request.temperature, request.stream
        );

        let backend = self.backend()?;
        let chunks = backend.generate(&request).await?;

        let mut out = io::stdout();
        let interrupted = self.interrupts.arm();
        let rendered = render::drive(chunks, options, &mut out, interrupted).await;
        self.interrupts.disarm();
        let output = rendered?;
        debug!(
            "Rendered {} bytes, {} reasoning blocks",
            output.visible.len(),
            output.thinking.len()
        );

        report(&model, &output);
        Ok(output)
    }
}

fn report(model: &str, output: &RenderedOutput) {
    if output.unterminated {
        ui::warning("The model stopped in the middle of its reasoning.");
    }
    let mut message = format!("Generated with {}", model);
    if let Some(stats) = output.stats {
        if stats.total_duration > 0 {
            message.push_str(&format!(
                " ({} tokens in {:.1}s)",
                stats.eval_count,
                stats.total_duration as f64 / 1e9
            ));
        }
    }
    ui::success(message);
}

/// Ask a yes/no question on stderr. Anything but `y`/`yes` is a no.
pub fn confirm(question: &str) -> Result<bool> {
    eprint!("{} [y/N] ", question);
    io::stderr().flush()?;

    let mut answer = String::new();
    io::stdin()
        .lock()
        .read_line(&mut answer)
        .context("Failed to read answer")?;
    Ok(is_yes(&answer))
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

/// Read a text file given on the command line, refusing empty ones.
pub fn read_input_file(path: &std::path::Path) -> Result<String> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    if contents.trim().is_empty() {
        bail!("{} is empty", path.display());
    }
    Ok(contents)
}
