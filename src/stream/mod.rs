//! Streaming response handling.
//!
//! The reader turns an HTTP body into chunks; the filter separates `<think>`
//! reasoning from the answer text.

pub mod filter;
pub mod reader;

pub use filter::{Segment, ThinkFilter};
pub use reader::{GenerationStats, StreamChunk, StreamReader};

use crate::error::GenerateError;
use futures::stream::BoxStream;

/// Lazily produced chunks of one generation.
pub type ChunkStream = BoxStream<'static, Result<StreamChunk, GenerateError>>;
