//! Line-delimited JSON stream reader.
//!
//! Turns a streaming HTTP body into [`StreamChunk`]s. Only the current line is
//! buffered; bytes are split on `\n` before UTF-8 decoding so a multi-byte
//! character split across two network reads survives intact.

use crate::error::GenerateError;
use futures::stream::{BoxStream, Stream, StreamExt};
use serde::Deserialize;
use tracing::{debug, warn};

/// One decoded unit from the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamChunk {
    /// Incremental text, possibly empty.
    pub delta: String,
    /// Set on the last chunk of a generation.
    pub is_final: bool,
    /// Generation statistics, reported on the final chunk.
    pub stats: Option<GenerationStats>,
}

/// Token and timing statistics reported by the backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenerationStats {
    pub eval_count: u64,
    /// Nanoseconds.
    pub total_duration: u64,
}

/// Wire shape of a generate response, streamed or not.
#[derive(Debug, Deserialize)]
pub(crate) struct WireChunk {
    #[serde(default)]
    response: String,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    eval_count: Option<u64>,
    #[serde(default)]
    total_duration: Option<u64>,
}

impl WireChunk {
    pub(crate) fn into_chunk(self) -> Result<StreamChunk, GenerateError> {
        if let Some(message) = self.error {
            return Err(GenerateError::Backend {
                status: None,
                message,
            });
        }
        let stats = if self.done {
            Some(GenerationStats {
                eval_count: self.eval_count.unwrap_or(0),
                total_duration: self.total_duration.unwrap_or(0),
            })
        } else {
            None
        };
        Ok(StreamChunk {
            delta: self.response,
            is_final: self.done,
            stats,
        })
    }
}

/// Decode one line. Blank lines (keep-alives) yield `None`.
fn decode_line(raw: &[u8]) -> Result<Option<StreamChunk>, GenerateError> {
    let text = String::from_utf8_lossy(raw);
    let line = text.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let wire: WireChunk =
        serde_json::from_str(line).map_err(|source| GenerateError::MalformedChunk {
            line: line.to_string(),
            source,
        })?;
    wire.into_chunk().map(Some)
}

/// Pull-based reader over a streaming response body.
pub struct StreamReader<S> {
    body: S,
    buffer: Vec<u8>,
    url: String,
    timeout_secs: u64,
    eof: bool,
    done: bool,
    skipped: usize,
}

impl<S, B> StreamReader<S>
where
    S: Stream<Item = Result<B, reqwest::Error>> + Unpin,
    B: AsRef<[u8]>,
{
    /// Wrap a body stream. `url` and `timeout_secs` are only used to describe
    /// transport failures.
    pub fn new(body: S, url: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            body,
            buffer: Vec::new(),
            url: url.into(),
            timeout_secs,
            eof: false,
            done: false,
            skipped: 0,
        }
    }

    /// Number of malformed lines skipped so far.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Pull the next chunk. `None` once the final chunk has been returned,
    /// the connection has closed, or a terminal error has been reported.
    pub async fn next_chunk(&mut self) -> Option<Result<StreamChunk, GenerateError>> {
        while !self.done {
            if let Some(line) = self.next_line() {
                match decode_line(&line) {
                    Ok(None) => continue,
                    Ok(Some(chunk)) => {
                        if chunk.is_final {
                            debug!(
                                "Final chunk received, {} malformed lines skipped",
                                self.skipped()
                            );
                            self.done = true;
                        }
                        return Some(Ok(chunk));
                    }
                    Err(GenerateError::MalformedChunk { line, source }) => {
                        warn!("Skipping malformed stream line {:?}: {}", line, source);
                        self.skipped += 1;
                        continue;
                    }
                    Err(e) => {
                        self.done = true;
                        return Some(Err(e));
                    }
                }
            }

            if self.eof {
                debug!("Connection closed without a final chunk");
                self.done = true;
                break;
            }

            match self.body.next().await {
                Some(Ok(bytes)) => self.buffer.extend_from_slice(bytes.as_ref()),
                Some(Err(e)) => {
                    self.done = true;
                    return Some(Err(GenerateError::from_transport(
                        e,
                        &self.url,
                        self.timeout_secs,
                    )));
                }
                None => self.eof = true,
            }
        }
        None
    }

    fn next_line(&mut self) -> Option<Vec<u8>> {
        if let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            return Some(self.buffer.drain(..=pos).collect());
        }
        if self.eof && !self.buffer.is_empty() {
            return Some(std::mem::take(&mut self.buffer));
        }
        None
    }
}

impl<S, B> StreamReader<S>
where
    S: Stream<Item = Result<B, reqwest::Error>> + Unpin + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
{
    /// Expose the reader as a boxed chunk stream.
    pub fn into_stream(self) -> BoxStream<'static, Result<StreamChunk, GenerateError>> {
        futures::stream::unfold(self, |mut reader| async move {
            reader.next_chunk().await.map(|item| (item, reader))
        })
        .boxed()
    }
}
