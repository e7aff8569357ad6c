//! Streaming-response aggregation.
//!
//! [`StreamAggregator`] folds payloads from a [`ChunkSource`] into a
//! [`ResponseBuffer`] in arrival order and republishes the full buffer
//! after every non-empty fragment. A source error stops aggregation at
//! once; the text received so far is kept and returned with the error.
//!
//! States: `Idle -> Streaming -> {Completed | Failed}`.

use crate::core::{Fragment, ResponseBuffer};
use crate::error::{Error, Result, StreamError};
use crate::stream::{ChunkSource, Renderer, SourceItem};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

/// Lifecycle of an aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationState {
    /// Nothing received yet.
    Idle,
    /// At least one item received; source not yet exhausted.
    Streaming,
    /// Source exhausted normally.
    Completed,
    /// Source reported an error; buffer holds the partial text.
    Failed,
}

impl AggregationState {
    /// Returns true for `Completed` and `Failed`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Incremental aggregator over one response stream.
///
/// Owns the response buffer for the lifetime of the request; the renderer
/// only ever sees `&str` snapshots.
///
/// # Examples
///
/// ```
/// use devtools_rs::core::ChunkPayload;
/// use devtools_rs::stream::{CollectingRenderer, StreamAggregator, from_payloads};
///
/// let source = from_payloads(vec![
///     ChunkPayload::Delta("Hel".to_string()),
///     ChunkPayload::Delta("lo".to_string()),
///     ChunkPayload::Empty,
///     ChunkPayload::Delta("!".to_string()),
/// ]);
///
/// let mut renderer = CollectingRenderer::new();
/// let outcome = StreamAggregator::new(&mut renderer).run(source);
///
/// assert_eq!(outcome.text(), "Hello!");
/// assert_eq!(renderer.snapshots, vec!["Hel", "Hello", "Hello!"]);
/// ```
pub struct StreamAggregator<'r> {
    buffer: ResponseBuffer,
    state: AggregationState,
    renderer: &'r mut dyn Renderer,
    publishes: usize,
    error: Option<StreamError>,
}

impl<'r> StreamAggregator<'r> {
    /// Creates an idle aggregator that publishes to `renderer`.
    pub fn new(renderer: &'r mut dyn Renderer) -> Self {
        Self {
            buffer: ResponseBuffer::new(),
            state: AggregationState::Idle,
            renderer,
            publishes: 0,
            error: None,
        }
    }

    /// Returns the current state.
    #[must_use]
    pub const fn state(&self) -> AggregationState {
        self.state
    }

    /// Returns the text assembled so far.
    #[must_use]
    pub fn text(&self) -> &str {
        self.buffer.text()
    }

    /// Folds one source item.
    ///
    /// Returns `Ok(true)` while the stream can continue and `Ok(false)`
    /// once the item was an error and the aggregation has failed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] if the aggregation already ended.
    pub fn feed(&mut self, item: SourceItem) -> Result<bool> {
        self.ensure_open()?;
        self.state = AggregationState::Streaming;

        match item {
            Ok(payload) => {
                let fragment = Fragment::from_payload(self.buffer.sequence_number(), payload);
                if self.buffer.append(&fragment)? {
                    self.renderer.publish(self.buffer.text());
                    self.publishes += 1;
                }
                Ok(true)
            }
            Err(err) => {
                warn!(
                    error = %err,
                    received = self.buffer.size(),
                    "response stream failed; keeping partial text"
                );
                self.error = Some(err);
                self.terminate(AggregationState::Failed);
                Ok(false)
            }
        }
    }

    /// Marks the source as exhausted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] if the aggregation already ended.
    pub fn finish(&mut self) -> Result<()> {
        self.ensure_open()?;
        debug!(
            fragments = self.buffer.sequence_number(),
            publishes = self.publishes,
            bytes = self.buffer.size(),
            "response stream completed"
        );
        self.terminate(AggregationState::Completed);
        Ok(())
    }

    /// Drains `source` to the end (or to its first error).
    #[must_use]
    pub fn run<S: ChunkSource>(mut self, source: S) -> Aggregation {
        for item in source {
            // feed cannot fail here: the loop stops as soon as the state is terminal
            match self.feed(item) {
                Ok(true) => {}
                Ok(false) | Err(_) => break,
            }
        }
        if !self.state.is_terminal() {
            let _ = self.finish();
        }
        self.into_outcome()
    }

    /// Stops aggregating and returns what was assembled.
    ///
    /// Called before the stream ended, this is a cancellation: the state
    /// stays `Idle`/`Streaming` and the renderer is not finalized.
    #[must_use]
    pub fn into_outcome(self) -> Aggregation {
        Aggregation {
            buffer: self.buffer,
            state: self.state,
            error: self.error,
            publishes: self.publishes,
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.state.is_terminal() {
            return Err(Error::InvalidState {
                message: format!("aggregation already {:?}", self.state).to_lowercase(),
            });
        }
        Ok(())
    }

    fn terminate(&mut self, state: AggregationState) {
        self.state = state;
        self.buffer.freeze();
        self.renderer.finalize(self.buffer.text());
    }
}

/// Result of an aggregation: the buffer, its final state and any error.
#[derive(Debug, Clone, Serialize)]
pub struct Aggregation {
    /// Assembled (and, once terminal, frozen) buffer.
    pub buffer: ResponseBuffer,

    /// State the aggregation ended in.
    pub state: AggregationState,

    /// Source error that ended a failed aggregation.
    #[serde(serialize_with = "serialize_error")]
    pub error: Option<StreamError>,

    /// Number of publishes made to the renderer.
    pub publishes: usize,
}

impl Aggregation {
    /// Returns the assembled text (partial if failed).
    #[must_use]
    pub fn text(&self) -> &str {
        self.buffer.text()
    }

    /// Returns true if the source was drained without error.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.state == AggregationState::Completed
    }

    /// Converts into the final text, or the error with the partial text.
    ///
    /// # Errors
    ///
    /// Returns [`PartialResponse`] if the stream failed or was cancelled.
    pub fn into_result(self) -> std::result::Result<String, PartialResponse> {
        match (self.state, self.error) {
            (AggregationState::Completed, _) => Ok(self.buffer.into_text()),
            (_, Some(error)) => Err(PartialResponse {
                text: self.buffer.into_text(),
                error,
            }),
            (state, None) => Err(PartialResponse {
                text: self.buffer.into_text(),
                error: StreamError::Transport {
                    reason: format!("stream stopped while {state:?}").to_lowercase(),
                },
            }),
        }
    }
}

/// A failed stream together with the text received before the failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{error} ({} bytes received)", text.len())]
pub struct PartialResponse {
    /// Text received before the failure.
    pub text: String,

    /// The source error, unchanged.
    pub error: StreamError,
}

/// Convenience wrapper: aggregate `source` into `renderer`.
pub fn aggregate<S: ChunkSource>(source: S, renderer: &mut dyn Renderer) -> Aggregation {
    StreamAggregator::new(renderer).run(source)
}

#[allow(clippy::ref_option)]
fn serialize_error<S: serde::Serializer>(
    error: &Option<StreamError>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    match error {
        Some(e) => serializer.serialize_some(&e.to_string()),
        None => serializer.serialize_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ChunkPayload;
    use crate::stream::{CollectingRenderer, NullRenderer, from_payloads};

    fn delta(text: &str) -> SourceItem {
        Ok(ChunkPayload::Delta(text.to_string()))
    }

    fn reset() -> SourceItem {
        Err(StreamError::Transport {
            reason: "connection reset".to_string(),
        })
    }

    #[test]
    fn test_scenario_publishes_full_buffer() {
        let items = vec![delta("Hel"), delta("lo"), Ok(ChunkPayload::Empty), delta("!")];
        let mut renderer = CollectingRenderer::new();
        let outcome = aggregate(items.into_iter(), &mut renderer);

        assert_eq!(renderer.snapshots, vec!["Hel", "Hello", "Hello!"]);
        assert_eq!(renderer.finalized.as_deref(), Some("Hello!"));
        assert_eq!(outcome.text(), "Hello!");
        assert_eq!(outcome.state, AggregationState::Completed);
        assert_eq!(outcome.publishes, 3);
        assert_eq!(outcome.buffer.sequence_number(), 4);
        assert!(outcome.buffer.is_frozen());
    }

    #[test]
    fn test_full_text_shape_is_appended() {
        let source = from_payloads(vec![
            ChunkPayload::Full("a".to_string()),
            ChunkPayload::Delta("b".to_string()),
        ]);
        let outcome = aggregate(source, &mut NullRenderer);
        assert_eq!(outcome.text(), "ab");
    }

    #[test]
    fn test_empty_source_completes() {
        let mut renderer = CollectingRenderer::new();
        let outcome = aggregate(std::iter::empty::<SourceItem>(), &mut renderer);
        assert!(outcome.is_complete());
        assert_eq!(outcome.text(), "");
        assert!(renderer.snapshots.is_empty());
        assert_eq!(renderer.finalized.as_deref(), Some(""));
    }

    #[test]
    fn test_transport_error_keeps_partial_text() {
        let items = vec![delta("par"), delta("tial"), reset(), delta("never")];
        let mut renderer = CollectingRenderer::new();
        let outcome = aggregate(items.into_iter(), &mut renderer);

        assert_eq!(outcome.state, AggregationState::Failed);
        assert_eq!(outcome.text(), "partial");
        assert_eq!(renderer.finalized.as_deref(), Some("partial"));
        assert_eq!(
            outcome.error,
            Some(StreamError::Transport {
                reason: "connection reset".to_string()
            })
        );
    }

    #[test]
    fn test_into_result() {
        let ok = aggregate(vec![delta("done")].into_iter(), &mut NullRenderer);
        assert_eq!(ok.into_result().unwrap(), "done");

        let failed = aggregate(vec![delta("half"), reset()].into_iter(), &mut NullRenderer);
        let partial = failed.into_result().unwrap_err();
        assert_eq!(partial.text, "half");
        assert!(matches!(partial.error, StreamError::Transport { .. }));
        assert!(partial.to_string().contains("4 bytes received"));
    }

    #[test]
    fn test_stepwise_feed_and_cancel() {
        let mut renderer = CollectingRenderer::new();
        let mut aggregator = StreamAggregator::new(&mut renderer);
        assert_eq!(aggregator.state(), AggregationState::Idle);

        assert!(aggregator.feed(delta("a")).unwrap());
        assert_eq!(aggregator.state(), AggregationState::Streaming);
        assert_eq!(aggregator.text(), "a");

        let outcome = aggregator.into_outcome();
        assert_eq!(outcome.state, AggregationState::Streaming);
        assert!(!outcome.buffer.is_frozen());
        assert!(renderer.finalized.is_none());
        assert!(outcome.into_result().is_err());
    }

    #[test]
    fn test_feed_after_terminal_is_rejected() {
        let mut renderer = NullRenderer;
        let mut aggregator = StreamAggregator::new(&mut renderer);
        aggregator.finish().unwrap();
        assert!(matches!(
            aggregator.feed(delta("late")),
            Err(Error::InvalidState { .. })
        ));
        assert!(aggregator.finish().is_err());
    }

    #[test]
    fn test_feed_error_returns_false() {
        let mut renderer = NullRenderer;
        let mut aggregator = StreamAggregator::new(&mut renderer);
        assert!(!aggregator.feed(reset()).unwrap());
        assert_eq!(aggregator.state(), AggregationState::Failed);
    }

    #[test]
    fn test_partial_response_into_error() {
        let partial = PartialResponse {
            text: "x".to_string(),
            error: StreamError::Timeout { secs: 5 },
        };
        let err: Error = partial.into();
        assert_eq!(err.partial_text(), Some("x"));
        assert_eq!(err.stream_error(), Some(&StreamError::Timeout { secs: 5 }));
        assert_eq!(err.to_string(), "stream error: no chunk received within 5s");
    }

    #[test]
    fn test_outcome_serializes() {
        let outcome = aggregate(vec![delta("hi"), reset()].into_iter(), &mut NullRenderer);
        let json = serde_json::to_string(&outcome).unwrap();
        assert!(json.contains("\"state\":\"failed\""));
        assert!(json.contains("connection reset"));
    }
}
