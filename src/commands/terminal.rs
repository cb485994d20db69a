use super::{GenerationArgs, Session};
use crate::context::{Environment, Platform};
use crate::{input, prompts, ui};
use anyhow::Result;
use clap::Subcommand;

#[derive(Debug, Subcommand)]
pub enum TerminalCommand {
    /// Suggest a shell command for a task
    Suggest {
        /// What you want to do (asked interactively when omitted)
        description: Option<String>,

        /// Target platform: auto, linux, mac or windows
        #[arg(short, long, default_value = "auto")]
        platform: Platform,

        #[command(flatten)]
        generation: GenerationArgs,
    },
    /// Explain what a shell command does
    Explain {
        #[arg(required = true, num_args = 1.., trailing_var_arg = true)]
        command: Vec<String>,

        #[command(flatten)]
        generation: GenerationArgs,
    },
}

pub async fn run(session: &Session, command: TerminalCommand) -> Result<()> {
    match command {
        TerminalCommand::Suggest {
            description,
            platform,
            generation,
        } => {
            let description = match description {
                Some(description) => description,
                None => match input::prompt_line("aidev terminal", "describe the task")? {
                    Some(description) => description,
                    None => {
                        ui::info("Cancelled.");
                        return Ok(());
                    }
                },
            };

            let env = Environment::gather(platform);
            let prompt = prompts::terminal_suggest(&description, &env);
            session.generate(&generation, prompt, 0.2, None).await?;
            Ok(())
        }
        TerminalCommand::Explain {
            command,
            generation,
        } => {
            let prompt = prompts::terminal_explain(&command.join(" "));
            session.generate(&generation, prompt, 0.3, None).await?;
            Ok(())
        }
    }
}
