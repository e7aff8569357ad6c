//! Wire shapes of streamed chat-completion chunks.
//!
//! A chunk exposes its text either as an incremental delta
//! (`{"choices":[{"delta":{"content":"..."}}]}`) or as full text
//! (`{"choices":[{"text":"..."}]}`). [`decode_chunk`] probes the delta
//! shape first, then the text shape; anything else is an empty payload.

use crate::core::ChunkPayload;
use serde::Deserialize;

/// Serde view of one streamed chunk. Unknown fields are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WireChunk {
    /// Completion choices; only the first is read.
    #[serde(default)]
    pub choices: Vec<WireChoice>,
}

/// One choice inside a chunk.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WireChoice {
    /// Incremental-delta shape.
    #[serde(default)]
    pub delta: Option<WireDelta>,

    /// Full-text shape.
    #[serde(default)]
    pub text: Option<String>,
}

/// Delta object of the incremental shape.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WireDelta {
    /// Content fragment; absent or null on role/finish chunks.
    #[serde(default)]
    pub content: Option<String>,
}

impl WireChunk {
    /// Resolves this chunk into a payload variant.
    #[must_use]
    pub fn into_payload(self) -> ChunkPayload {
        let Some(choice) = self.choices.into_iter().next() else {
            return ChunkPayload::Empty;
        };

        if let Some(content) = choice.delta.and_then(|d| d.content) {
            return ChunkPayload::Delta(content);
        }
        choice.text.map_or(ChunkPayload::Empty, ChunkPayload::Full)
    }
}

/// Decodes a JSON value into a payload variant.
///
/// Values that do not look like a chunk at all (wrong types, missing
/// `choices`) decode to [`ChunkPayload::Empty`]; a shape mismatch is not
/// an error.
///
/// # Examples
///
/// ```
/// use devtools_rs::core::ChunkPayload;
/// use devtools_rs::stream::decode_chunk;
/// use serde_json::json;
///
/// let delta = json!({"choices": [{"delta": {"content": "Hel"}}]});
/// assert_eq!(decode_chunk(&delta), ChunkPayload::Delta("Hel".to_string()));
///
/// let full = json!({"choices": [{"text": "Hello"}]});
/// assert_eq!(decode_chunk(&full), ChunkPayload::Full("Hello".to_string()));
///
/// assert_eq!(decode_chunk(&json!({})), ChunkPayload::Empty);
/// ```
#[must_use]
pub fn decode_chunk(value: &serde_json::Value) -> ChunkPayload {
    WireChunk::deserialize(value).map_or(ChunkPayload::Empty, WireChunk::into_payload)
}

#[cfg(feature = "provider")]
impl From<async_openai::types::CreateChatCompletionStreamResponse> for ChunkPayload {
    fn from(response: async_openai::types::CreateChatCompletionStreamResponse) -> Self {
        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.delta.content)
            .map_or(Self::Empty, Self::Delta)
    }
}
