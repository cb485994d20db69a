use super::{read_input_file, GenerationArgs, Session};
use crate::prompts::{self, DetailLevel};
use crate::ui;
use anyhow::{bail, Context, Result};
use clap::Subcommand;
use std::path::PathBuf;

#[derive(Debug, Subcommand)]
pub enum CodeCommand {
    /// Generate code from a description
    Generate {
        /// What the code should do
        description: String,

        /// Programming language
        #[arg(short, long, default_value = "python")]
        language: String,

        /// Write the generated code to this file
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Maximum number of tokens to generate
        #[arg(long, value_name = "N")]
        max_length: Option<u32>,

        #[command(flatten)]
        generation: GenerationArgs,
    },
    /// Explain the code in a file
    Explain {
        file: PathBuf,

        /// Only explain lines START-END (1-based, inclusive)
        #[arg(long, value_name = "START-END")]
        lines: Option<String>,

        /// Language of the file (default: inferred from the extension)
        #[arg(short, long)]
        language: Option<String>,

        #[arg(short, long, value_enum, default_value_t = DetailLevel::Medium)]
        detail: DetailLevel,

        #[command(flatten)]
        generation: GenerationArgs,
    },
}

pub async fn run(session: &Session, command: CodeCommand) -> Result<()> {
    match command {
        CodeCommand::Generate {
            description,
            language,
            output,
            max_length,
            generation,
        } => {
            let prompt = prompts::code_generate(&description, &language);
            let rendered = session
                .generate(&generation, prompt, 0.2, max_length)
                .await?;

            if let Some(path) = output {
                let code = prompts::extract_code_block(&rendered.visible);
                if code.is_empty() {
                    bail!("The model returned no code to write");
                }
                std::fs::write(&path, format!("{}\n", code))
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                ui::success(format!("Code written to {}", path.display()));
            }
            Ok(())
        }
        CodeCommand::Explain {
            file,
            lines,
            language,
            detail,
            generation,
        } => {
            let mut code = read_input_file(&file)?;
            if let Some(range) = lines {
                let (start, end) = prompts::parse_line_range(&range)?;
                code = prompts::select_lines(&code, start, end);
                if code.trim().is_empty() {
                    bail!("Lines {} are empty or past the end of {}", range, file.display());
                }
            }
            let language = language
                .unwrap_or_else(|| prompts::infer_language(&file).to_string());

            let prompt = prompts::code_explain(&code, &language, detail);
            session.generate(&generation, prompt, 0.3, None).await?;
            Ok(())
        }
    }
}
