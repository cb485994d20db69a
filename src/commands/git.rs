use super::{confirm, GenerationArgs, Session};
use crate::prompts::{self, CommitContext, CommitStyle};
use crate::ui;
use anyhow::{bail, Context, Result};
use clap::Subcommand;
use std::path::Path;
use std::process::Command;
use tracing::debug;

#[derive(Debug, Subcommand)]
pub enum GitCommand {
    /// Write a commit message for the current changes and offer to commit
    Commit {
        #[arg(short, long, value_enum, default_value_t = CommitStyle::Conventional)]
        style: CommitStyle,

        /// Commit without asking
        #[arg(short, long)]
        yes: bool,

        #[command(flatten)]
        generation: GenerationArgs,
    },
    /// Write a pull request description for the current branch
    Pr {
        #[command(flatten)]
        generation: GenerationArgs,
    },
}

pub async fn run(session: &Session, command: GitCommand) -> Result<()> {
    match command {
        GitCommand::Commit {
            style,
            yes,
            generation,
        } => commit(session, style, yes, &generation).await,
        GitCommand::Pr { generation } => pull_request(session, &generation).await,
    }
}

async fn commit(
    session: &Session,
    style: CommitStyle,
    yes: bool,
    generation: &GenerationArgs,
) -> Result<()> {
    let status = git(&["status", "--porcelain"])?;
    if status.trim().is_empty() {
        bail!("No changes to commit.");
    }

    let changes = summarize_status(&status);
    let diff_stat = staged_or_unstaged(&["diff", "--cached", "--stat"], &["diff", "--stat"])?;
    let diff = staged_or_unstaged(&["diff", "--cached"], &["diff"])?;
    let remote = git(&["remote", "get-url", "origin"]).ok();
    let cwd = std::env::current_dir().context("Failed to read current directory")?;
    let repo = repo_name(remote.as_deref(), &cwd);

    let ctx = CommitContext {
        repo: &repo,
        changes: &changes,
        diff_stat: &diff_stat,
        diff: &diff,
    };
    let output = session
        .generate(generation, prompts::git_commit(style, &ctx), 0.3, None)
        .await?;

    let message = prompts::clean_commit_message(&output.visible);
    if message.is_empty() {
        bail!("The model returned an empty commit message");
    }
    println!("\n{}\n", message);

    if !yes && !confirm("Commit with this message?")? {
        ui::info("Not committed.");
        return Ok(());
    }
    git(&["commit", "-m", &message])?;
    ui::success("Changes committed.");
    Ok(())
}

async fn pull_request(session: &Session, generation: &GenerationArgs) -> Result<()> {
    let base = if git(&["show-ref", "--verify", "--quiet", "refs/heads/main"]).is_ok() {
        "main"
    } else {
        "master"
    };
    let range = format!("{}..HEAD", base);

    let commits = git(&["log", &range, "--pretty=format: %h %s%n%b"])?;
    if commits.trim().is_empty() {
        bail!("No commits found between {} and the current branch.", base);
    }
    let branch = git(&["rev-parse", "--abbrev-ref", "HEAD"])?;
    let summary = git(&["diff", &range, "--stat"])?;

    let prompt = prompts::git_pr(branch.trim(), base, &commits, &summary);
    session.generate(generation, prompt, 0.3, None).await?;
    Ok(())
}

/// Run git and return its stdout.
fn git(args: &[&str]) -> Result<String> {
    debug!("git {}", args.join(" "));
    let output = Command::new("git")
        .args(args)
        .output()
        .context("Failed to run git. Is it installed?")?;
    if !output.status.success() {
        bail!(
            "git {} failed: {}",
            args.join(" "),
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Output of `staged`, or of `unstaged` when nothing is staged.
fn staged_or_unstaged(staged: &[&str], unstaged: &[&str]) -> Result<String> {
    let out = git(staged)?;
    if out.trim().is_empty() {
        git(unstaged)
    } else {
        Ok(out)
    }
}

/// Turn `git status --porcelain` output into `STATUS: path` lines.
fn summarize_status(porcelain: &str) -> String {
    porcelain
        .lines()
        .filter(|line| line.len() > 3)
        .map(|line| format!("{}: {}", line[..2].trim(), &line[3..]))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Repository name from the origin URL, else the directory name.
fn repo_name(remote: Option<&str>, cwd: &Path) -> String {
    let from_remote = remote
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .and_then(|url| {
            let url = url.trim_end_matches('/').trim_end_matches(".git");
            match url.split_once("github.com") {
                Some((_, path)) => Some(path.trim_start_matches([':', '/']).to_string()),
                None => url
                    .rsplit(['/', ':'])
                    .next()
                    .filter(|s| !s.is_empty())
                    .map(str::to_string),
            }
        });
    from_remote.unwrap_or_else(|| {
        cwd.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "unknown".to_string())
    })
}
