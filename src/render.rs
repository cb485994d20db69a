//! Terminal rendering of generated text.
//!
//! [`drive`] pulls chunks, runs them through the [`ThinkFilter`] and prints
//! the two channels: answer text goes straight to the terminal, reasoning is
//! shown in a framed block (or not at all when thinking display is off).

use crate::error::GenerateError;
use crate::stream::{ChunkStream, GenerationStats, Segment, ThinkFilter};
use crossterm::style::Stylize;
use futures::StreamExt;
use std::future::Future;
use std::io::Write;
use tracing::{debug, warn};

/// Caller-side rendering switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    /// Print text as it arrives; otherwise print once at the end.
    pub stream: bool,
    /// Render reasoning blocks. When off they are discarded unseen.
    pub show_thinking: bool,
    /// Use ANSI styling.
    pub color: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            stream: true,
            show_thinking: true,
            color: true,
        }
    }
}

/// Everything one invocation produced.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RenderedOutput {
    /// Answer text with reasoning removed.
    pub visible: String,
    /// Reasoning blocks, only collected when thinking display is on.
    pub thinking: Vec<String>,
    pub stats: Option<GenerationStats>,
    /// The stream ended inside a reasoning block.
    pub unterminated: bool,
}

/// Writes segments to an output in streaming or buffered style.
pub struct Renderer<'a, W: Write> {
    out: &'a mut W,
    options: RenderOptions,
    output: RenderedOutput,
    /// Nothing written yet, or the last byte written was a newline.
    at_line_start: bool,
    /// Drop leading newlines of the next answer text (start of output or
    /// right after a reasoning block).
    trim_newlines: bool,
}

impl<'a, W: Write> Renderer<'a, W> {
    pub fn new(out: &'a mut W, options: RenderOptions) -> Self {
        Self {
            out,
            options,
            output: RenderedOutput::default(),
            at_line_start: true,
            trim_newlines: true,
        }
    }

    pub fn segment(&mut self, segment: Segment) -> std::io::Result<()> {
        match segment {
            Segment::Visible(text) => {
                if self.options.stream {
                    self.write_visible(&text)?;
                }
                self.output.visible.push_str(&text);
            }
            Segment::Thinking(text) => {
                if !self.options.show_thinking {
                    return Ok(());
                }
                if self.options.stream {
                    self.write_thinking(self.output.thinking.len() + 1, &text)?;
                }
                self.output.thinking.push(text);
            }
        }
        Ok(())
    }

    /// Print whatever buffered mode held back and end the last line.
    pub fn finish(mut self) -> std::io::Result<RenderedOutput> {
        if !self.options.stream {
            let blocks = std::mem::take(&mut self.output.thinking);
            for (i, block) in blocks.iter().enumerate() {
                self.write_thinking(i + 1, block)?;
            }
            self.output.thinking = blocks;
            let visible = self.output.visible.clone();
            self.write_visible(&visible)?;
        }
        self.end_line()?;
        Ok(self.output)
    }

    /// End the current line so error messages start cleanly.
    pub fn end_line(&mut self) -> std::io::Result<()> {
        if !self.at_line_start {
            writeln!(self.out)?;
            self.at_line_start = true;
        }
        self.out.flush()
    }

    fn write_visible(&mut self, text: &str) -> std::io::Result<()> {
        let text = if self.trim_newlines {
            text.trim_start_matches(['\n', '\r'])
        } else {
            text
        };
        if text.is_empty() {
            return Ok(());
        }
        self.trim_newlines = false;
        self.out.write_all(text.as_bytes())?;
        self.at_line_start = text.ends_with('\n');
        self.out.flush()
    }

    fn write_thinking(&mut self, index: usize, block: &str) -> std::io::Result<()> {
        let body = block.trim();
        if body.is_empty() {
            return Ok(());
        }
        self.end_line()?;

        let title = format!("╭─ Thinking Process #{}", index);
        let footer = "╰─";
        if self.options.color {
            writeln!(self.out, "{}", title.blue().bold())?;
            for line in body.lines() {
                writeln!(self.out, "{} {}", "│".blue(), line.dim())?;
            }
            writeln!(self.out, "{}", footer.blue())?;
        } else {
            writeln!(self.out, "{}", title)?;
            for line in body.lines() {
                writeln!(self.out, "│ {}", line)?;
            }
            writeln!(self.out, "{}", footer)?;
        }
        self.at_line_start = true;
        self.trim_newlines = true;
        self.out.flush()
    }
}

/// Pull `chunks` to the end and render them.
///
/// Stops early with [`GenerateError::Interrupted`] when `interrupt` resolves;
/// dropping the chunk stream closes the connection. Text rendered before an
/// error or interrupt stays where it is.
pub async fn drive<W, I>(
    mut chunks: ChunkStream,
    options: RenderOptions,
    out: &mut W,
    interrupt: I,
) -> Result<RenderedOutput, GenerateError>
where
    W: Write,
    I: Future<Output = ()>,
{
    let mut filter = ThinkFilter::new();
    let mut renderer = Renderer::new(out, options);
    let mut stats = None;
    tokio::pin!(interrupt);

    loop {
        let next = tokio::select! {
            biased;
            _ = &mut interrupt => {
                debug!("Generation interrupted in {:?} mode", filter.mode());
                renderer.end_line()?;
                return Err(GenerateError::Interrupted);
            }
            next = chunks.next() => next,
        };

        match next {
            Some(Ok(chunk)) => {
                for segment in filter.push(&chunk.delta) {
                    renderer.segment(segment)?;
                }
                if chunk.stats.is_some() {
                    stats = chunk.stats;
                }
                if chunk.is_final {
                    break;
                }
            }
            Some(Err(e)) => {
                renderer.end_line()?;
                return Err(e);
            }
            None => break,
        }
    }

    let flush = filter.finish();
    if flush.unterminated {
        warn!("Model output ended inside a <think> block");
    }
    for segment in flush.segments {
        renderer.segment(segment)?;
    }

    let mut output = renderer.finish()?;
    output.stats = stats;
    output.unterminated = flush.unterminated;
    Ok(output)
}
