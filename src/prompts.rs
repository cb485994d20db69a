//! Prompt construction for each command.

use crate::context::Environment;
use anyhow::{bail, Context, Result};
use clap::ValueEnum;
use std::path::Path;

/// Diffs longer than this are cut before being sent to the model.
pub const MAX_DIFF_CHARS: usize = 4000;
/// Documents longer than this are summarized from their head and tail.
pub const MAX_SUMMARY_CHARS: usize = 10_000;
const SUMMARY_EDGE_CHARS: usize = 5000;

/// A system prompt plus the user prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: Option<String>,
    pub user: String,
}

impl Prompt {
    fn user(user: String) -> Self {
        Self { system: None, user }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DetailLevel {
    Brief,
    Medium,
    Detailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CommitStyle {
    Conventional,
    Descriptive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SummaryLength {
    Short,
    Medium,
    Long,
}

pub fn code_generate(description: &str, language: &str) -> Prompt {
    Prompt {
        system: Some(format!(
            "You are an expert {} programmer. Generate high-quality, working code that \
             addresses the user's request. Include comments to explain key parts. \
             Only output code, no explanations.",
            language
        )),
        user: format!("# {} code to {}\n\n", language, description),
    }
}

pub fn code_explain(code: &str, language: &str, detail: DetailLevel) -> Prompt {
    let detail_text = match detail {
        DetailLevel::Brief => {
            "Give a brief explanation highlighting only the most important aspects."
        }
        DetailLevel::Medium => "Give a medium-length explanation with moderate detail.",
        DetailLevel::Detailed => "Give a detailed explanation covering all aspects of the code.",
    };
    Prompt::user(format!(
        "# Task: Explain the following {} code\n{}\n\n```{}\n{}\n```\n\n# Explanation:\n",
        language, detail_text, language, code
    ))
}

pub fn terminal_suggest(description: &str, env: &Environment) -> Prompt {
    Prompt {
        system: Some(
            "You are a terminal expert. Suggest the shell commands that accomplish the \
             user's goal and explain briefly what each one does."
                .to_string(),
        ),
        user: format!(
            "Suggest terminal commands for: {}\n{}",
            description,
            env.describe()
        ),
    }
}

pub fn terminal_explain(command: &str) -> Prompt {
    Prompt::user(format!(
        "Explain the following terminal command in detail: {}",
        command
    ))
}

/// Inputs for a commit message prompt.
pub struct CommitContext<'a> {
    pub repo: &'a str,
    pub changes: &'a str,
    pub diff_stat: &'a str,
    pub diff: &'a str,
}

pub fn git_commit(style: CommitStyle, ctx: &CommitContext<'_>) -> Prompt {
    let style = match style {
        CommitStyle::Conventional => "conventional",
        CommitStyle::Descriptive => "descriptive",
    };
    Prompt::user(format!(
        r#"Generate a {style} commit message for the following changes in the repository '{repo}'.

Changed files:
{changes}

Diff summary:
{stat}

Full diff:
{diff}

Guidelines:
- For conventional commit messages, use: type(scope): description
- Common types: feat, fix, docs, style, refactor, test, chore
- Keep the commit message concise and descriptive
- Focus on WHAT and WHY, not HOW
- Use imperative mood ("Add feature" not "Added feature")

Respond with the commit message only.
"#,
        style = style,
        repo = ctx.repo,
        changes = ctx.changes,
        stat = ctx.diff_stat,
        diff = truncate_diff(ctx.diff),
    ))
}

pub fn git_pr(branch: &str, base: &str, commits: &str, summary: &str) -> Prompt {
    Prompt::user(format!(
        r#"Generate a comprehensive pull request description for the following changes in branch '{branch}'.

Commits between {base} and this branch:
{commits}

Summary of changes:
{summary}

Guidelines for a good PR description:
1. Include a clear title that summarizes the changes
2. Group related changes by category (Features, Fixes, etc.)
3. Explain WHY the changes were made, not just WHAT was changed
4. Include testing instructions if applicable
5. Mention any dependency changes or deployment considerations

Format the PR description in Markdown with appropriate headings, bullet points, and sections.
"#,
        branch = branch,
        base = base,
        commits = commits,
        summary = summary,
    ))
}

pub fn docs_search(terms: &str, language: Option<&str>, max_results: usize) -> Prompt {
    let language_filter = language
        .map(|l| format!(" for {}", l))
        .unwrap_or_default();
    Prompt::user(format!(
        r#"You are a documentation search engine.

Search for information about "{terms}"{filter} and provide up to {max} results.

Each result should include:
1. The programming language or tool
2. The specific topic or function name
3. A brief description of how it works
4. A short example of its usage

Format the results in a clean, numbered list with clear headings for each item.
"#,
        terms = terms,
        filter = language_filter,
        max = max_results,
    ))
}

pub fn docs_summarize(file_name: &str, content: &str, length: SummaryLength) -> Prompt {
    let length_instruction = match length {
        SummaryLength::Short => "Create a concise summary in about 2-3 sentences.",
        SummaryLength::Medium => "Create a medium-length summary in about 1-2 paragraphs.",
        SummaryLength::Long => {
            "Create a comprehensive summary with multiple paragraphs covering all main points."
        }
    };
    let (content, truncated) = head_and_tail(content);
    let note = if truncated {
        "\nNote: The file was truncated due to its size. Summarize the beginning and end \
         of the document."
    } else {
        ""
    };
    Prompt::user(format!(
        r#"Summarize the following documentation file: {file}

{length}

The summary should:
1. Identify the main topic
2. Highlight key concepts, functions, or features
3. Note any important usage patterns or warnings
4. Be clear and informative

Here's the content to summarize:

{content}
{note}"#,
        file = file_name,
        length = length_instruction,
        content = content,
        note = note,
    ))
}

/// Cut `diff` to [`MAX_DIFF_CHARS`] characters.
pub fn truncate_diff(diff: &str) -> String {
    match diff.char_indices().nth(MAX_DIFF_CHARS) {
        Some((idx, _)) => format!("{}\n... (diff truncated for brevity)", &diff[..idx]),
        None => diff.to_string(),
    }
}

/// Keep the first and last few thousand characters of a long document.
fn head_and_tail(content: &str) -> (String, bool) {
    let total = content.chars().count();
    if total <= MAX_SUMMARY_CHARS {
        return (content.to_string(), false);
    }
    let head: String = content.chars().take(SUMMARY_EDGE_CHARS).collect();
    let tail: String = content.chars().skip(total - SUMMARY_EDGE_CHARS).collect();
    (
        format!(
            "{}\n\n[... content truncated for brevity ...]\n\n{}",
            head, tail
        ),
        true,
    )
}

/// Guess a language name from a file extension.
pub fn infer_language(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("py") => "python",
        Some("js") | Some("mjs") | Some("cjs") => "javascript",
        Some("ts") | Some("tsx") => "typescript",
        Some("java") => "java",
        Some("go") => "go",
        Some("rs") => "rust",
        Some("c") | Some("h") => "c",
        Some("cpp") | Some("cc") | Some("cxx") | Some("hpp") => "c++",
        Some("rb") => "ruby",
        Some("sh") | Some("bash") | Some("zsh") => "shell",
        _ => "unknown",
    }
}

/// Parse an inclusive, 1-based `START-END` line range.
pub fn parse_line_range(range: &str) -> Result<(usize, usize)> {
    let (start, end) = range
        .split_once('-')
        .with_context(|| format!("Invalid line range '{}': expected START-END", range))?;
    let start: usize = start
        .trim()
        .parse()
        .with_context(|| format!("Invalid start line in '{}'", range))?;
    let end: usize = end
        .trim()
        .parse()
        .with_context(|| format!("Invalid end line in '{}'", range))?;
    if start == 0 || end < start {
        bail!("Invalid line range '{}': lines start at 1 and END >= START", range);
    }
    Ok((start, end))
}

/// Select lines `start..=end` (1-based) from `code`.
pub fn select_lines(code: &str, start: usize, end: usize) -> String {
    code.lines()
        .skip(start - 1)
        .take(end - start + 1)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Pull the body of the first fenced code block out of a model answer, or
/// return the trimmed answer when there is none.
pub fn extract_code_block(answer: &str) -> String {
    let Some(open) = answer.find("```") else {
        return answer.trim().to_string();
    };
    let after_fence = &answer[open + 3..];
    // Skip the language tag line.
    let body_start = after_fence.find('\n').map(|i| i + 1).unwrap_or(after_fence.len());
    let body = &after_fence[body_start..];
    match body.find("```") {
        Some(close) => body[..close].trim_end().to_string(),
        None => body.trim_end().to_string(),
    }
}

/// Tidy a generated commit message: drop code fences and surrounding quotes.
pub fn clean_commit_message(answer: &str) -> String {
    let message = if answer.contains("```") {
        extract_code_block(answer)
    } else {
        answer.trim().to_string()
    };
    message
        .trim_matches(|c| c == '"' || c == '`')
        .trim()
        .to_string()
}
