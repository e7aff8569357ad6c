//! Decoded chunk payloads and fragments.
//!
//! Providers disagree on where a streamed chunk carries its text. The
//! shape is resolved once, at the stream boundary, into a [`ChunkPayload`];
//! everything downstream only sees the variant.

use serde::{Deserialize, Serialize};

/// The text payload of one streamed chunk after shape resolution.
///
/// # Examples
///
/// ```
/// use devtools_rs::core::ChunkPayload;
///
/// assert_eq!(ChunkPayload::Delta("Hel".to_string()).text(), "Hel");
/// assert_eq!(ChunkPayload::Empty.text(), "");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "text", rename_all = "snake_case")]
pub enum ChunkPayload {
    /// Incremental delta (`choices[0].delta.content`).
    Delta(String),

    /// Full-text-per-chunk shape (`choices[0].text`).
    Full(String),

    /// Chunk carried no recognised payload.
    Empty,
}

impl ChunkPayload {
    /// Returns the payload text (empty for [`ChunkPayload::Empty`]).
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Delta(text) | Self::Full(text) => text,
            Self::Empty => "",
        }
    }

    /// Returns true if the payload contributes no characters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text().is_empty()
    }

    /// Consumes the payload and returns its text.
    #[must_use]
    pub fn into_text(self) -> String {
        match self {
            Self::Delta(text) | Self::Full(text) => text,
            Self::Empty => String::new(),
        }
    }
}

/// One incremental piece of model output, tagged with its arrival index.
///
/// Fragments are immutable and are discarded once folded into a
/// [`crate::core::ResponseBuffer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    /// Zero-based arrival position in the stream.
    pub index: usize,

    /// Fragment text (possibly empty).
    pub text: String,
}

impl Fragment {
    /// Creates a fragment from a decoded payload.
    #[must_use]
    pub fn from_payload(index: usize, payload: ChunkPayload) -> Self {
        Self {
            index,
            text: payload.into_text(),
        }
    }

    /// Returns true if the fragment adds nothing to the buffer.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Returns the fragment size in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        self.text.len()
    }
}
