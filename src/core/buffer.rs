//! Response buffer for streamed model output.
//!
//! A response buffer is created empty when a request starts, grows by
//! appending fragments in arrival order, and is frozen when the stream
//! ends (normally or with an error).

use crate::core::Fragment;
use crate::error::{Error, Result};
use crate::io::find_char_boundary;
use serde::{Deserialize, Serialize};

/// The cumulative assembled answer for one request.
///
/// `text` is always the in-order concatenation of every fragment folded
/// so far. Exactly one aggregation writes to a buffer; renderers only see
/// `&str` snapshots.
///
/// # Examples
///
/// ```
/// use devtools_rs::core::{Fragment, ResponseBuffer};
///
/// let mut buffer = ResponseBuffer::new();
/// buffer.append(&Fragment { index: 0, text: "Hel".to_string() }).unwrap();
/// buffer.append(&Fragment { index: 1, text: "lo".to_string() }).unwrap();
/// assert_eq!(buffer.text(), "Hello");
/// assert_eq!(buffer.sequence_number(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResponseBuffer {
    /// Assembled text.
    text: String,

    /// Number of fragments folded (empty ones included).
    sequence_number: usize,

    /// Set once the stream has terminated.
    frozen: bool,

    /// Buffer metadata.
    pub metadata: ResponseMetadata,
}

/// Metadata associated with a response buffer.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResponseMetadata {
    /// Unix timestamp when the buffer was created.
    pub created_at: i64,

    /// Unix timestamp when the buffer was frozen.
    pub finalized_at: Option<i64>,

    /// Number of fragments that carried text.
    pub non_empty_fragments: usize,
}

impl ResponseBuffer {
    /// Creates a new empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            metadata: ResponseMetadata {
                created_at: current_timestamp(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Creates an already-frozen buffer holding a complete response.
    ///
    /// Used for non-streaming completions, which arrive as one piece.
    #[must_use]
    pub fn from_complete(text: String) -> Self {
        let mut buffer = Self::new();
        let non_empty = usize::from(!text.is_empty());
        buffer.text = text;
        buffer.sequence_number = 1;
        buffer.metadata.non_empty_fragments = non_empty;
        buffer.freeze();
        buffer
    }

    /// Appends a fragment.
    ///
    /// Returns `true` if the fragment changed the text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] if the buffer is frozen.
    pub fn append(&mut self, fragment: &Fragment) -> Result<bool> {
        if self.frozen {
            return Err(Error::InvalidState {
                message: format!(
                    "cannot append fragment {} to a finalized response buffer",
                    fragment.index
                ),
            });
        }

        self.sequence_number += 1;
        if fragment.is_empty() {
            return Ok(false);
        }

        self.text.push_str(&fragment.text);
        self.metadata.non_empty_fragments += 1;
        Ok(true)
    }

    /// Freezes the buffer. Further appends are rejected.
    pub fn freeze(&mut self) {
        if !self.frozen {
            self.frozen = true;
            self.metadata.finalized_at = Some(current_timestamp());
        }
    }

    /// Returns the assembled text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Consumes the buffer and returns its text.
    #[must_use]
    pub fn into_text(self) -> String {
        self.text
    }

    /// Returns the number of fragments folded so far.
    #[must_use]
    pub const fn sequence_number(&self) -> usize {
        self.sequence_number
    }

    /// Returns true once the buffer has been frozen.
    #[must_use]
    pub const fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Returns the size of the text in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        self.text.len()
    }

    /// Checks if no text has been assembled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Returns the line count of the text.
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.text.lines().count()
    }

    /// Returns a peek of the text from the beginning.
    ///
    /// # Arguments
    ///
    /// * `len` - Maximum number of bytes to return.
    #[must_use]
    pub fn peek(&self, len: usize) -> &str {
        let end = find_char_boundary(&self.text, len.min(self.text.len()));
        &self.text[..end]
    }

    /// Returns the text that follows the first `offset` bytes.
    ///
    /// Renderers that can append use this to write only what they have
    /// not seen yet.
    #[must_use]
    pub fn suffix_from(&self, offset: usize) -> &str {
        suffix_from(&self.text, offset)
    }
}

/// Returns `text` after the first `offset` bytes, clamped to a char boundary.
#[must_use]
pub fn suffix_from(text: &str, offset: usize) -> &str {
    let start = find_char_boundary(text, offset.min(text.len()));
    &text[start..]
}

/// Returns the current Unix timestamp in seconds.
#[allow(clippy::cast_possible_wrap)]
pub(crate) fn current_timestamp() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frag(index: usize, text: &str) -> Fragment {
        Fragment {
            index,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_new_buffer_is_empty() {
        let buffer = ResponseBuffer::new();
        assert!(buffer.is_empty());
        assert_eq!(buffer.sequence_number(), 0);
        assert!(!buffer.is_frozen());
        assert!(buffer.metadata.finalized_at.is_none());
    }

    #[test]
    fn test_append_in_order() {
        let mut buffer = ResponseBuffer::new();
        assert!(buffer.append(&frag(0, "Hel")).unwrap());
        assert!(buffer.append(&frag(1, "lo")).unwrap());
        assert_eq!(buffer.text(), "Hello");
        assert_eq!(buffer.metadata.non_empty_fragments, 2);
    }

    #[test]
    fn test_empty_fragment_counts_but_does_not_change_text() {
        let mut buffer = ResponseBuffer::new();
        assert!(!buffer.append(&frag(0, "")).unwrap());
        assert!(buffer.append(&frag(1, "X")).unwrap());
        assert!(!buffer.append(&frag(2, "")).unwrap());
        assert_eq!(buffer.text(), "X");
        assert_eq!(buffer.sequence_number(), 3);
        assert_eq!(buffer.metadata.non_empty_fragments, 1);
    }

    #[test]
    fn test_frozen_buffer_rejects_append() {
        let mut buffer = ResponseBuffer::new();
        buffer.append(&frag(0, "done")).unwrap();
        buffer.freeze();
        assert!(buffer.is_frozen());
        assert!(buffer.metadata.finalized_at.is_some());

        let result = buffer.append(&frag(1, "more"));
        assert!(matches!(result, Err(Error::InvalidState { .. })));
        assert_eq!(buffer.text(), "done");
    }

    #[test]
    fn test_from_complete() {
        let buffer = ResponseBuffer::from_complete("whole answer".to_string());
        assert!(buffer.is_frozen());
        assert_eq!(buffer.text(), "whole answer");
        assert_eq!(buffer.sequence_number(), 1);
    }

    #[test]
    fn test_peek_respects_char_boundary() {
        let buffer = ResponseBuffer::from_complete("Hello, 世界!".to_string());
        assert_eq!(buffer.peek(5), "Hello");
        assert_eq!(buffer.peek(8), "Hello, ");
        assert_eq!(buffer.peek(100), "Hello, 世界!");
    }

    #[test]
    fn test_suffix_from() {
        let buffer = ResponseBuffer::from_complete("Hello!".to_string());
        assert_eq!(buffer.suffix_from(3), "lo!");
        assert_eq!(buffer.suffix_from(6), "");
        assert_eq!(buffer.suffix_from(99), "");
        assert_eq!(suffix_from("ab世", 3), "世");
    }

    #[test]
    fn test_line_count() {
        let buffer = ResponseBuffer::from_complete("a\nb\nc".to_string());
        assert_eq!(buffer.line_count(), 3);
    }

    #[test]
    fn test_buffer_serialization() {
        let buffer = ResponseBuffer::from_complete("content".to_string());
        let json = serde_json::to_string(&buffer).unwrap();
        let restored: ResponseBuffer = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.text(), "content");
        assert!(restored.is_frozen());
    }
}
