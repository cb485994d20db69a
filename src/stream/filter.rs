//! Splits model output into visible text and `<think>` reasoning blocks.
//!
//! Delimiters can arrive split across network chunks (`"<thi"` + `"nk>"`), so
//! the filter holds back any trailing text that could still turn into the
//! delimiter it is currently looking for and rescans it with the next fragment.

use tracing::warn;

/// Opens a reasoning block.
pub const THINK_START: &str = "<think>";
/// Closes a reasoning block.
pub const THINK_END: &str = "</think>";

/// A classified piece of model output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Answer text, in wire order.
    Visible(String),
    /// One complete reasoning block, without its delimiters.
    Thinking(String),
}

/// Which channel unscanned text currently belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Visible,
    Thinking,
}

impl Mode {
    fn delimiter(self) -> &'static str {
        match self {
            Mode::Visible => THINK_START,
            Mode::Thinking => THINK_END,
        }
    }
}

/// What is left once the stream has ended.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Flush {
    pub segments: Vec<Segment>,
    /// The stream ended inside a reasoning block.
    pub unterminated: bool,
}

/// Incremental `<think>` / `</think>` classifier. One per generation.
#[derive(Debug, Default)]
pub struct ThinkFilter {
    mode: Mode,
    /// Tail that is a strict prefix of the active delimiter.
    pending: String,
    /// Body of the reasoning block being read.
    thinking: String,
}

impl ThinkFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Feed one fragment and collect whatever can already be classified.
    pub fn push(&mut self, fragment: &str) -> Vec<Segment> {
        let mut segments = Vec::new();
        let mut buf = std::mem::take(&mut self.pending);
        buf.push_str(fragment);
        let mut rest = buf.as_str();

        loop {
            let delimiter = self.mode.delimiter();
            if let Some(idx) = rest.find(delimiter) {
                self.take_text(&rest[..idx], &mut segments);
                self.switch(&mut segments);
                rest = &rest[idx + delimiter.len()..];
                continue;
            }

            let held = partial_delimiter_len(rest, delimiter);
            let split = rest.len() - held;
            self.take_text(&rest[..split], &mut segments);
            self.pending = rest[split..].to_string();
            break;
        }

        segments
    }

    /// Signal end of stream.
    ///
    /// An unterminated reasoning block goes to the thinking channel as it is,
    /// with `unterminated` set.
    pub fn finish(mut self) -> Flush {
        let pending = std::mem::take(&mut self.pending);
        match self.mode {
            Mode::Visible => {
                let mut segments = Vec::new();
                if !pending.is_empty() {
                    segments.push(Segment::Visible(pending));
                }
                Flush {
                    segments,
                    unterminated: false,
                }
            }
            Mode::Thinking => {
                self.thinking.push_str(&pending);
                warn!(
                    "Stream ended inside a thinking block; flushing {} buffered bytes",
                    self.thinking.len()
                );
                let mut segments = Vec::new();
                if !self.thinking.is_empty() {
                    segments.push(Segment::Thinking(self.thinking));
                }
                Flush {
                    segments,
                    unterminated: true,
                }
            }
        }
    }

    fn take_text(&mut self, text: &str, segments: &mut Vec<Segment>) {
        if text.is_empty() {
            return;
        }
        match self.mode {
            Mode::Visible => segments.push(Segment::Visible(text.to_string())),
            Mode::Thinking => self.thinking.push_str(text),
        }
    }

    fn switch(&mut self, segments: &mut Vec<Segment>) {
        self.mode = match self.mode {
            Mode::Visible => Mode::Thinking,
            Mode::Thinking => {
                let block = std::mem::take(&mut self.thinking);
                if !block.is_empty() {
                    segments.push(Segment::Thinking(block));
                }
                Mode::Visible
            }
        };
    }
}

/// Length of the longest suffix of `text` that is a strict prefix of
/// `delimiter`.
fn partial_delimiter_len(text: &str, delimiter: &str) -> usize {
    let max = (delimiter.len() - 1).min(text.len());
    (1..=max)
        .rev()
        .find(|&n| {
            let start = text.len() - n;
            text.is_char_boundary(start) && delimiter.starts_with(&text[start..])
        })
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Run fragments through a fresh filter, returning (visible, thinking blocks).
    fn run(fragments: &[&str]) -> (String, Vec<String>, bool) {
        let mut filter = ThinkFilter::new();
        let mut segments = Vec::new();
        for fragment in fragments {
            segments.extend(filter.push(fragment));
        }
        let flush = filter.finish();
        segments.extend(flush.segments);

        let mut visible = String::new();
        let mut thinking = Vec::new();
        for segment in segments {
            match segment {
                Segment::Visible(text) => visible.push_str(&text),
                Segment::Thinking(text) => thinking.push(text),
            }
        }
        (visible, thinking, flush.unterminated)
    }

    #[test]
    fn test_no_delimiters_passthrough() {
        let (visible, thinking, unterminated) = run(&["no delimiters here"]);
        assert_eq!(visible, "no delimiters here");
        assert!(thinking.is_empty());
        assert!(!unterminated);
    }

    #[test]
    fn test_many_fragments_without_delimiters() {
        let fragments = ["fn main() {", " println!(\"<b>\"); ", "}", " a < b", " <"];
        let (visible, thinking, _) = run(&fragments);
        assert_eq!(visible, fragments.concat());
        assert!(thinking.is_empty());
    }

    #[test]
    fn test_pair_inside_single_fragment() {
        let (visible, thinking, _) = run(&["before<think>the reasoning</think>after"]);
        assert_eq!(visible, "beforeafter");
        assert_eq!(thinking, vec!["the reasoning".to_string()]);
        assert!(!visible.contains("think>"));
    }

    #[test]
    fn test_start_delimiter_split_across_fragments() {
        let mut filter = ThinkFilter::new();
        assert_eq!(
            filter.push("Hello <thi"),
            vec![Segment::Visible("Hello ".to_string())]
        );
        assert_eq!(
            filter.push("nk>reasoning</think> world"),
            vec![
                Segment::Thinking("reasoning".to_string()),
                Segment::Visible(" world".to_string()),
            ]
        );
        assert_eq!(filter.finish(), Flush::default());
    }

    #[test]
    fn test_unterminated_block_is_flushed() {
        let mut filter = ThinkFilter::new();
        assert!(filter.push("<think>partial").is_empty());
        assert_eq!(filter.mode(), Mode::Thinking);
        let flush = filter.finish();
        assert!(flush.unterminated);
        assert_eq!(flush.segments, vec![Segment::Thinking("partial".to_string())]);
    }

    #[test]
    fn test_unterminated_block_keeps_partial_end_delimiter() {
        let (visible, thinking, unterminated) = run(&["<think>almost</thi"]);
        assert!(visible.is_empty());
        assert_eq!(thinking, vec!["almost</thi".to_string()]);
        assert!(unterminated);
    }

    #[test]
    fn test_trailing_partial_start_is_visible_at_end() {
        let (visible, thinking, unterminated) = run(&["compare a <th"]);
        assert_eq!(visible, "compare a <th");
        assert!(thinking.is_empty());
        assert!(!unterminated);
    }

    #[test]
    fn test_pending_never_reaches_delimiter_length() {
        let mut filter = ThinkFilter::new();
        for piece in ["<", "t", "h", "i", "n", "k"] {
            filter.push(piece);
            assert!(filter.pending.len() < THINK_START.len());
        }
        assert_eq!(filter.pending, "<think");
        filter.push(">");
        assert!(filter.pending.is_empty());
        assert_eq!(filter.mode(), Mode::Thinking);
    }

    #[test]
    fn test_multiple_blocks() {
        let (visible, thinking, _) = run(&[
            "<think>first</think>A",
            "B<think>sec",
            "ond</think>C",
        ]);
        assert_eq!(visible, "ABC");
        assert_eq!(thinking, vec!["first".to_string(), "second".to_string()]);
    }

    #[test]
    fn test_empty_block_emits_nothing() {
        let mut filter = ThinkFilter::new();
        let segments = filter.push("<think></think>answer");
        assert_eq!(segments, vec![Segment::Visible("answer".to_string())]);
    }

    #[test]
    fn test_end_delimiter_in_visible_mode_is_plain_text() {
        let (visible, thinking, _) = run(&["stray </think> tag"]);
        assert_eq!(visible, "stray </think> tag");
        assert!(thinking.is_empty());
    }

    #[test]
    fn test_split_at_every_boundary_matches_single_fragment() {
        let inputs = [
            "Hello <think>reasoning</think> world",
            "<think>a</think><think>b</think>",
            "x <thinking> y </think> z",
            "ünïcödé <think>日本語の思考</think> 答え",
            "<think>never closed",
            "trailing <thi",
            "plain text",
        ];
        for input in inputs {
            let expected = run(&[input]);
            for split in 0..=input.len() {
                if !input.is_char_boundary(split) {
                    continue;
                }
                let (a, b) = input.split_at(split);
                assert_eq!(run(&[a, b]), expected, "split {:?} at {}", input, split);
            }
        }
    }

    #[test]
    fn test_partial_delimiter_len() {
        assert_eq!(partial_delimiter_len("abc<thi", THINK_START), 4);
        assert_eq!(partial_delimiter_len("abc<", THINK_START), 1);
        assert_eq!(partial_delimiter_len("abc", THINK_START), 0);
        assert_eq!(partial_delimiter_len("</think", THINK_END), 7);
        assert_eq!(partial_delimiter_len("思", THINK_START), 0);
    }
}
