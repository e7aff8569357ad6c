//! Chunk sources.
//!
//! A chunk source is a finite, non-restartable iterator of decoded
//! payloads. Any `Iterator<Item = SourceItem>` qualifies; [`LineSource`]
//! reads recorded or live server-sent-event / newline-delimited JSON
//! streams.

use crate::core::ChunkPayload;
use crate::error::StreamError;
use crate::stream::decode_chunk;
use std::io::BufRead;

/// One step of a chunk source.
pub type SourceItem = std::result::Result<ChunkPayload, StreamError>;

/// Producer of decoded response payloads in arrival order.
///
/// Blanket-implemented for every iterator over [`SourceItem`], so vectors,
/// adapters and provider streams plug in directly.
pub trait ChunkSource: Iterator<Item = SourceItem> {}

impl<T: Iterator<Item = SourceItem>> ChunkSource for T {}

/// SSE `data:` payload that terminates an OpenAI-style stream.
const DONE_MARKER: &str = "[DONE]";

/// Reads chunks from a line-oriented stream.
///
/// Accepts both server-sent events (`data: {...}` lines, blank separators,
/// `:` comments, `event:`/`id:`/`retry:` fields) and bare JSON lines.
/// The stream ends at EOF or at `data: [DONE]`.
///
/// # Examples
///
/// ```
/// use devtools_rs::core::ChunkPayload;
/// use devtools_rs::stream::LineSource;
///
/// let transcript = "data: {\"choices\":[{\"delta\":{\"content\":\"Hi\"}}]}\n\ndata: [DONE]\n";
/// let items: Vec<_> = LineSource::new(transcript.as_bytes()).collect();
/// assert_eq!(items, vec![Ok(ChunkPayload::Delta("Hi".to_string()))]);
/// ```
#[derive(Debug)]
pub struct LineSource<R> {
    reader: R,
    line_no: usize,
    done: bool,
}

impl<R: BufRead> LineSource<R> {
    /// Wraps a buffered reader.
    pub const fn new(reader: R) -> Self {
        Self {
            reader,
            line_no: 0,
            done: false,
        }
    }

    /// Returns the number of lines consumed so far.
    #[must_use]
    pub const fn lines_read(&self) -> usize {
        self.line_no
    }

    /// Classifies one line. `None` means "skip".
    fn decode_line(&mut self, line: &str) -> Option<SourceItem> {
        let line = line.trim();
        if line.is_empty() || line.starts_with(':') {
            return None;
        }

        let payload = if let Some(data) = line.strip_prefix("data:") {
            data.trim_start()
        } else if line.starts_with("event:") || line.starts_with("id:") || line.starts_with("retry:")
        {
            return None;
        } else {
            line
        };

        if payload == DONE_MARKER {
            self.done = true;
            return None;
        }

        Some(
            serde_json::from_str::<serde_json::Value>(payload)
                .map(|value| decode_chunk(&value))
                .map_err(|e| StreamError::Decode {
                    line: self.line_no,
                    reason: e.to_string(),
                }),
        )
    }
}

impl<R: BufRead> Iterator for LineSource<R> {
    type Item = SourceItem;

    fn next(&mut self) -> Option<Self::Item> {
        let mut line = String::new();
        while !self.done {
            line.clear();
            match self.reader.read_line(&mut line) {
                Ok(0) => {
                    self.done = true;
                }
                Ok(_) => {
                    self.line_no += 1;
                    if let Some(item) = self.decode_line(&line) {
                        if item.is_err() {
                            self.done = true;
                        }
                        return Some(item);
                    }
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(StreamError::Transport {
                        reason: e.to_string(),
                    }));
                }
            }
        }
        None
    }
}

/// Builds a source from payloads that are already decoded.
pub fn from_payloads<I>(payloads: I) -> impl ChunkSource
where
    I: IntoIterator<Item = ChunkPayload>,
{
    payloads.into_iter().map(Ok)
}
