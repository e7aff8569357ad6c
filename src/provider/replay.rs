//! Offline provider that replays recorded response streams.
//!
//! Transcripts are SSE or NDJSON text as captured from an
//! OpenAI-compatible endpoint. Each call consumes the next transcript,
//! wrapping around after the last, so one transcript answers every call.

use crate::error::{ProviderError, Result};
use crate::io::read_file;
use crate::provider::{ChatProvider, ChatRequest};
use crate::stream::{ChunkSource, LineSource, NullRenderer, aggregate};
use std::cell::{Cell, RefCell};
use std::io::Cursor;
use std::path::Path;
use tracing::debug;

/// Provider backed by recorded transcripts.
///
/// # Examples
///
/// ```
/// use devtools_rs::provider::{ChatMessage, ChatProvider, ChatRequest, ReplayProvider};
///
/// let provider = ReplayProvider::new("data: {\"choices\":[{\"delta\":{\"content\":\"Hi\"}}]}\n");
/// let request = ChatRequest::new(vec![ChatMessage::user("hello")]);
/// assert_eq!(provider.complete(&request).unwrap(), "Hi");
/// assert_eq!(provider.requests().len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct ReplayProvider {
    transcripts: Vec<String>,
    next: Cell<usize>,
    requests: RefCell<Vec<ChatRequest>>,
}

impl ReplayProvider {
    /// Creates a provider replaying a single transcript.
    pub fn new(transcript: impl Into<String>) -> Self {
        Self::with_transcripts(vec![transcript.into()])
    }

    /// Creates a provider replaying `transcripts` in turn.
    #[must_use]
    pub fn with_transcripts(transcripts: Vec<String>) -> Self {
        Self {
            transcripts,
            next: Cell::new(0),
            requests: RefCell::new(Vec::new()),
        }
    }

    /// Loads a transcript from a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::new(read_file(path)?))
    }

    /// Returns every request received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.borrow().clone()
    }

    fn take_transcript(&self, request: &ChatRequest) -> Result<&str> {
        self.requests.borrow_mut().push(request.clone());
        if self.transcripts.is_empty() {
            return Err(ProviderError::Request("no transcript recorded".to_string()).into());
        }
        let index = self.next.get() % self.transcripts.len();
        self.next.set(index + 1);
        debug!(index, "replaying transcript");
        Ok(&self.transcripts[index])
    }
}

impl ChatProvider for ReplayProvider {
    fn name(&self) -> &'static str {
        "replay"
    }

    fn stream(&self, request: &ChatRequest) -> Result<Box<dyn ChunkSource + '_>> {
        let transcript = self.take_transcript(request)?;
        Ok(Box::new(LineSource::new(Cursor::new(transcript.as_bytes()))))
    }

    fn complete(&self, request: &ChatRequest) -> Result<String> {
        let transcript = self.take_transcript(request)?;
        let text = aggregate(LineSource::new(Cursor::new(transcript.as_bytes())), &mut NullRenderer)
            .into_result()?;
        if text.is_empty() {
            return Err(ProviderError::EmptyResponse.into());
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, StreamError};
    use crate::provider::ChatMessage;
    use crate::stream::CollectingRenderer;

    const HELLO: &str = concat!(
        "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n\n",
        "data: [DONE]\n",
    );

    fn request() -> ChatRequest {
        ChatRequest::new(vec![ChatMessage::user("q")])
    }

    #[test]
    fn test_stream_replays_transcript() {
        let provider = ReplayProvider::new(HELLO);
        let mut renderer = CollectingRenderer::new();
        let source = provider.stream(&request()).unwrap();
        let outcome = aggregate(source, &mut renderer);
        assert!(outcome.is_complete());
        assert_eq!(renderer.snapshots, vec!["Hel", "Hello"]);
    }

    #[test]
    fn test_transcripts_rotate() {
        let provider = ReplayProvider::with_transcripts(vec![
            "{\"choices\":[{\"text\":\"one\"}]}".to_string(),
            "{\"choices\":[{\"text\":\"two\"}]}".to_string(),
        ]);
        assert_eq!(provider.complete(&request()).unwrap(), "one");
        assert_eq!(provider.complete(&request()).unwrap(), "two");
        assert_eq!(provider.complete(&request()).unwrap(), "one");
        assert_eq!(provider.requests().len(), 3);
    }

    #[test]
    fn test_complete_surfaces_stream_error() {
        let provider = ReplayProvider::new("data: {broken\n");
        let err = provider.complete(&request()).unwrap_err();
        assert!(matches!(err.stream_error(), Some(StreamError::Decode { line: 1, .. })));
        assert_eq!(err.partial_text(), Some(""));
    }

    #[test]
    fn test_complete_empty_response() {
        let provider = ReplayProvider::new("data: [DONE]\n");
        let err = provider.complete(&request()).unwrap_err();
        assert!(matches!(err, Error::Provider(ProviderError::EmptyResponse)));
    }

    #[test]
    fn test_no_transcripts() {
        let provider = ReplayProvider::default();
        assert!(provider.stream(&request()).is_err());
        assert_eq!(provider.requests().len(), 1);
    }

    #[test]
    fn test_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hello.sse");
        std::fs::write(&path, HELLO).unwrap();
        let provider = ReplayProvider::from_path(&path).unwrap();
        assert_eq!(provider.complete(&request()).unwrap(), "Hello");
    }
}
