//! Per-request context.
//!
//! Carries the selected tool, the user input, tool options and the cached
//! result of the last run through the call chain. Nothing here is global:
//! each request owns its context.

use crate::core::buffer::current_timestamp;
use crate::tools::{Tool, ToolOptions};
use serde::{Deserialize, Serialize};

/// Explicit state for one tool request.
///
/// A result is cached against the input that produced it; changing the
/// input discards the cached result so the next run goes back to the
/// provider.
///
/// # Examples
///
/// ```
/// use devtools_rs::core::RequestContext;
/// use devtools_rs::tools::Tool;
///
/// let mut ctx = RequestContext::new(Tool::ArchMaster, "a queue service");
/// assert!(!ctx.has_result());
/// ctx.store_result("design".to_string());
/// assert!(ctx.has_result());
///
/// ctx.set_input("a different service");
/// assert!(!ctx.has_result());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestContext {
    /// Selected tool.
    pub tool: Tool,

    /// User input text.
    input: String,

    /// Tool options (target language, execution policy, ...).
    pub options: ToolOptions,

    /// Result generated for the current input, if any.
    result: Option<String>,

    /// Unix timestamp when the context was created.
    pub created_at: i64,

    /// Number of provider round trips made through this context.
    pub requests_sent: u32,
}

impl RequestContext {
    /// Creates a context for `tool` with `input` and default options.
    #[must_use]
    pub fn new(tool: Tool, input: impl Into<String>) -> Self {
        Self {
            tool,
            input: input.into(),
            options: ToolOptions::default(),
            result: None,
            created_at: current_timestamp(),
            requests_sent: 0,
        }
    }

    /// Sets tool options.
    #[must_use]
    pub fn with_options(mut self, options: ToolOptions) -> Self {
        self.options = options;
        self
    }

    /// Returns the user input.
    #[must_use]
    pub fn input(&self) -> &str {
        &self.input
    }

    /// Replaces the input. A cached result is discarded if the input changed.
    pub fn set_input(&mut self, input: impl Into<String>) {
        let input = input.into();
        if input != self.input {
            self.input = input;
            self.result = None;
        }
    }

    /// Returns true if a result was generated for the current input.
    #[must_use]
    pub const fn has_result(&self) -> bool {
        self.result.is_some()
    }

    /// Returns the cached result for the current input.
    #[must_use]
    pub fn result(&self) -> Option<&str> {
        self.result.as_deref()
    }

    /// Caches a result for the current input.
    pub fn store_result(&mut self, result: String) {
        self.result = Some(result);
    }

    /// Drops the cached result so the next run regenerates it.
    pub fn clear_result(&mut self) {
        self.result = None;
    }

    /// Records a provider round trip.
    pub const fn record_request(&mut self) {
        self.requests_sent += 1;
    }
}
