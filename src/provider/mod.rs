//! Chat-completion providers.
//!
//! A provider turns a [`ChatRequest`] into either a [`ChunkSource`]
//! (streaming) or a complete response (non-streaming).
//!
//! ## Available Providers
//!
//! - [`ReplayProvider`]: Replays recorded SSE/NDJSON transcripts (always available)
//! - `OpenAiProvider`: OpenAI-compatible HTTP endpoint (requires `provider` feature)

#[cfg(feature = "provider")]
pub mod openai;
pub mod replay;
pub mod request;

#[cfg(feature = "provider")]
pub use openai::OpenAiProvider;
pub use replay::ReplayProvider;
pub use request::{ChatMessage, ChatRequest, Role};

use crate::config::ProviderConfig;
use crate::error::Result;
use crate::stream::ChunkSource;

/// Source of chat completions.
pub trait ChatProvider {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Starts a streaming completion.
    ///
    /// # Errors
    ///
    /// Returns an error if the request could not be started. Failures after
    /// the first chunk surface through the returned source.
    fn stream(&self, request: &ChatRequest) -> Result<Box<dyn ChunkSource + '_>>;

    /// Runs a non-streaming completion and returns the response text.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response carries no text.
    fn complete(&self, request: &ChatRequest) -> Result<String>;
}

/// Creates the remote provider for `config`.
///
/// # Errors
///
/// Returns an error if no API key is configured or the client cannot be
/// set up.
#[cfg(feature = "provider")]
pub fn create_provider(config: &ProviderConfig) -> Result<Box<dyn ChatProvider>> {
    Ok(Box::new(OpenAiProvider::new(config)?))
}

/// Creates the remote provider for `config`.
///
/// # Errors
///
/// Always fails: this build has no remote provider.
#[cfg(not(feature = "provider"))]
pub fn create_provider(config: &ProviderConfig) -> Result<Box<dyn ChatProvider>> {
    let _ = config;
    Err(crate::error::ProviderError::Unavailable.into())
}
