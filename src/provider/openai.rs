//! OpenAI-compatible chat-completion provider.
//!
//! Wraps `async-openai` on a private current-thread tokio runtime so the
//! rest of the crate stays synchronous. Streamed responses are exposed as
//! a blocking [`ChunkSource`] that drives the runtime one chunk at a time.

use crate::config::{API_KEY_VAR, ProviderConfig};
use crate::core::ChunkPayload;
use crate::error::{ProviderError, Result, StreamError};
use crate::provider::{ChatMessage, ChatProvider, ChatRequest, Role};
use crate::stream::{ChunkSource, SourceItem};
use async_openai::Client;
use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
    ChatCompletionResponseStream, CreateChatCompletionRequest, CreateChatCompletionRequestArgs,
};
use futures_util::StreamExt;
use std::future::Future;
use std::time::Duration;
use tokio::runtime::Runtime;
use tracing::{debug, info};

/// Provider for any OpenAI-compatible endpoint (`DashScope`, `OpenAI`, local servers).
pub struct OpenAiProvider {
    client: Client<OpenAIConfig>,
    runtime: Runtime,
    model: String,
    timeout: Option<Duration>,
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl OpenAiProvider {
    /// Creates a provider from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::MissingApiKey`] if no key is configured, or
    /// [`ProviderError::Runtime`] if the runtime cannot be built.
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .as_deref()
            .ok_or_else(|| ProviderError::MissingApiKey {
                var: API_KEY_VAR.to_string(),
            })?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| ProviderError::Runtime(e.to_string()))?;

        let client = Client::with_config(
            OpenAIConfig::new()
                .with_api_key(api_key)
                .with_api_base(&config.base_url),
        );

        Ok(Self {
            client,
            runtime,
            model: config.model.clone(),
            timeout: config.timeout,
        })
    }

    /// Runs `future` on the private runtime, bounded by the timeout.
    fn block_on<F: Future>(&self, future: F) -> std::result::Result<F::Output, StreamError> {
        match self.timeout {
            Some(limit) => self
                .runtime
                .block_on(tokio::time::timeout(limit, future))
                .map_err(|_| StreamError::Timeout {
                    secs: limit.as_secs(),
                }),
            None => Ok(self.runtime.block_on(future)),
        }
    }

    #[allow(deprecated)]
    fn build_request(&self, request: &ChatRequest, stream: bool) -> Result<CreateChatCompletionRequest> {
        let messages = request
            .messages
            .iter()
            .map(to_openai_message)
            .collect::<Result<Vec<_>>>()?;

        let built = CreateChatCompletionRequestArgs::default()
            .model(request.model.as_deref().unwrap_or(&self.model))
            .messages(messages)
            .temperature(request.temperature)
            .top_p(request.top_p)
            .max_tokens(request.max_tokens)
            .stream(stream)
            .build()?;
        Ok(built)
    }
}

fn to_openai_message(message: &ChatMessage) -> Result<ChatCompletionRequestMessage> {
    let content = message.content.clone();
    let converted = match message.role {
        Role::System => ChatCompletionRequestSystemMessageArgs::default()
            .content(content)
            .build()?
            .into(),
        Role::User => ChatCompletionRequestUserMessageArgs::default()
            .content(content)
            .build()?
            .into(),
        Role::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
            .content(content)
            .build()?
            .into(),
    };
    Ok(converted)
}

impl ChatProvider for OpenAiProvider {
    fn name(&self) -> &'static str {
        "openai-compatible"
    }

    fn stream(&self, request: &ChatRequest) -> Result<Box<dyn ChunkSource + '_>> {
        let built = self.build_request(request, true)?;
        info!(model = %built.model, max_tokens = request.max_tokens, "starting streaming completion");

        let chat = self.client.chat();
        let stream = self.block_on(chat.create_stream(built))??;

        Ok(Box::new(BlockingStream {
            provider: self,
            stream,
            done: false,
            received: 0,
        }))
    }

    fn complete(&self, request: &ChatRequest) -> Result<String> {
        let built = self.build_request(request, false)?;
        info!(model = %built.model, max_tokens = request.max_tokens, "starting completion");

        let chat = self.client.chat();
        let response = self.block_on(chat.create(built))??;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| ProviderError::EmptyResponse.into())
    }
}

/// Pulls one chunk at a time from the async response stream.
struct BlockingStream<'p> {
    provider: &'p OpenAiProvider,
    stream: ChatCompletionResponseStream,
    done: bool,
    received: usize,
}

impl Iterator for BlockingStream<'_> {
    type Item = SourceItem;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let next = match self.provider.block_on(self.stream.next()) {
            Ok(next) => next,
            Err(timeout) => {
                self.done = true;
                return Some(Err(timeout));
            }
        };

        match next {
            Some(Ok(chunk)) => {
                self.received += 1;
                Some(Ok(ChunkPayload::from(chunk)))
            }
            Some(Err(e)) => {
                self.done = true;
                Some(Err(StreamError::Transport {
                    reason: e.to_string(),
                }))
            }
            None => {
                debug!(chunks = self.received, "response stream ended");
                self.done = true;
                None
            }
        }
    }
}
