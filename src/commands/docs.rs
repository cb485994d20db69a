use super::{read_input_file, GenerationArgs, Session};
use crate::prompts::{self, SummaryLength};
use anyhow::Result;
use clap::Subcommand;
use std::path::PathBuf;

#[derive(Debug, Subcommand)]
pub enum DocsCommand {
    /// Look up documentation for a topic
    Search {
        #[arg(required = true, num_args = 1..)]
        terms: Vec<String>,

        /// Restrict results to one language or tool
        #[arg(short, long)]
        language: Option<String>,

        /// Maximum number of results
        #[arg(long, default_value_t = 5)]
        max: usize,

        #[command(flatten)]
        generation: GenerationArgs,
    },
    /// Summarize a documentation file
    Summarize {
        file: PathBuf,

        #[arg(short, long, value_enum, default_value_t = SummaryLength::Medium)]
        length: SummaryLength,

        #[command(flatten)]
        generation: GenerationArgs,
    },
}

pub async fn run(session: &Session, command: DocsCommand) -> Result<()> {
    match command {
        DocsCommand::Search {
            terms,
            language,
            max,
            generation,
        } => {
            let prompt = prompts::docs_search(&terms.join(" "), language.as_deref(), max);
            session.generate(&generation, prompt, 0.3, None).await?;
        }
        DocsCommand::Summarize {
            file,
            length,
            generation,
        } => {
            let content = read_input_file(&file)?;
            let name = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| file.display().to_string());
            let prompt = prompts::docs_summarize(&name, &content, length);
            session.generate(&generation, prompt, 0.3, None).await?;
        }
    }
    Ok(())
}
