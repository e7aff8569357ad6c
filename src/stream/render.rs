//! Render sinks for aggregated text.
//!
//! The aggregator publishes the *entire* buffer after every non-empty
//! fragment and once more through [`Renderer::finalize`] when the stream
//! terminates. Sinks that can append (a terminal) diff against what they
//! already wrote; sinks that cannot simply repaint.

use crate::core::buffer::suffix_from;
use std::io::{self, Write};

/// Receives buffer snapshots.
pub trait Renderer {
    /// Called with the full buffer after each non-empty fragment.
    fn publish(&mut self, text: &str);

    /// Called once with the frozen buffer when the stream terminates,
    /// whether it completed or failed.
    fn finalize(&mut self, text: &str) {
        let _ = text;
    }
}

/// Discards every snapshot.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRenderer;

impl Renderer for NullRenderer {
    fn publish(&mut self, _text: &str) {}
}

/// Records every snapshot; used by tests and JSON output.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CollectingRenderer {
    /// Snapshots in publish order.
    pub snapshots: Vec<String>,

    /// Text passed to `finalize`, if it was called.
    pub finalized: Option<String>,
}

impl CollectingRenderer {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Renderer for CollectingRenderer {
    fn publish(&mut self, text: &str) {
        self.snapshots.push(text.to_string());
    }

    fn finalize(&mut self, text: &str) {
        self.finalized = Some(text.to_string());
    }
}

/// Streams snapshots to a writer, emitting only the unseen suffix.
///
/// Write errors cannot be returned through the publish contract; the
/// first one is kept and further output is suppressed. Check
/// [`TerminalRenderer::take_error`] after the stream ends.
#[derive(Debug)]
pub struct TerminalRenderer<W: Write> {
    writer: W,
    written: usize,
    error: Option<io::Error>,
}

impl<W: Write> TerminalRenderer<W> {
    /// Wraps a writer.
    pub const fn new(writer: W) -> Self {
        Self {
            writer,
            written: 0,
            error: None,
        }
    }

    /// Returns the number of bytes of buffer text written so far.
    #[must_use]
    pub const fn written(&self) -> usize {
        self.written
    }

    /// Returns the first write error, if any.
    pub fn take_error(&mut self) -> Option<io::Error> {
        self.error.take()
    }

    /// Consumes the renderer and returns the writer.
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_suffix(&mut self, text: &str) {
        if self.error.is_some() {
            return;
        }
        let suffix = suffix_from(text, self.written);
        if suffix.is_empty() {
            return;
        }
        match self
            .writer
            .write_all(suffix.as_bytes())
            .and_then(|()| self.writer.flush())
        {
            Ok(()) => self.written = text.len(),
            Err(e) => self.error = Some(e),
        }
    }
}

impl<W: Write> Renderer for TerminalRenderer<W> {
    fn publish(&mut self, text: &str) {
        self.write_suffix(text);
    }

    fn finalize(&mut self, text: &str) {
        self.write_suffix(text);
        if self.error.is_none()
            && !text.is_empty()
            && !text.ends_with('\n')
            && let Err(e) = self.writer.write_all(b"\n").and_then(|()| self.writer.flush())
        {
            self.error = Some(e);
        }
    }
}

/// Adapts a closure into a renderer.
pub struct FnRenderer<F>(pub F);

impl<F: FnMut(&str)> Renderer for FnRenderer<F> {
    fn publish(&mut self, text: &str) {
        (self.0)(text);
    }
}
