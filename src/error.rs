//! Error types for devtools-rs operations.
//!
//! This module provides the error hierarchy using `thiserror` for stream
//! aggregation, provider calls, file I/O, code execution, tool input
//! validation and CLI commands.

use crate::stream::PartialResponse;
use thiserror::Error;

/// Result type alias for devtools-rs operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Comprehensive error types for devtools-rs operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Chunk stream errors (reading or decoding the next chunk).
    #[error("stream error: {0}")]
    Stream(#[from] StreamError),

    /// A response stream failed; carries the text received before the failure.
    #[error("stream error: {}", .0.error)]
    PartialStream(#[from] PartialResponse),

    /// Chat-completion provider errors.
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    /// I/O errors (file operations).
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// CLI command errors.
    #[error("command error: {0}")]
    Command(#[from] CommandError),

    /// Local code execution errors.
    #[error("execution error: {0}")]
    Exec(#[from] ExecError),

    /// Tool selection or input validation errors.
    #[error("tool error: {0}")]
    Tool(#[from] ToolError),

    /// Invalid state errors.
    #[error("invalid state: {message}")]
    InvalidState {
        /// Description of the invalid state.
        message: String,
    },

    /// Configuration errors.
    #[error("configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },
}

/// Failures while pulling chunks from a response stream.
///
/// These end an aggregation in the failed state. The aggregator hands the
/// value back unchanged together with the partial text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StreamError {
    /// The transport failed while reading the next chunk.
    #[error("transport failed: {reason}")]
    Transport {
        /// Reason reported by the transport.
        reason: String,
    },

    /// A chunk could not be decoded.
    #[error("malformed chunk at line {line}: {reason}")]
    Decode {
        /// 1-based line number in the transcript.
        line: usize,
        /// Decoder message.
        reason: String,
    },

    /// No chunk arrived within the configured timeout.
    #[error("no chunk received within {secs}s")]
    Timeout {
        /// Timeout in seconds.
        secs: u64,
    },
}

/// Chat-completion provider errors.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// API key not configured.
    #[error("API key not set. Export {var} or add it to .env")]
    MissingApiKey {
        /// Environment variable that should hold the key.
        var: String,
    },

    /// Request construction or submission failed.
    #[error("request failed: {0}")]
    Request(String),

    /// Async runtime could not be created.
    #[error("runtime error: {0}")]
    Runtime(String),

    /// The provider returned no content.
    #[error("provider returned an empty response")]
    EmptyResponse,

    /// Provider support was not compiled in.
    #[error("provider support disabled (build with --features provider)")]
    Unavailable,
}

/// I/O-specific errors for file operations.
#[derive(Error, Debug)]
pub enum IoError {
    /// File not found.
    #[error("file not found: {path}")]
    FileNotFound {
        /// Path to the file that was not found.
        path: String,
    },

    /// Failed to read file.
    #[error("failed to read file: {path}: {reason}")]
    ReadFailed {
        /// Path to the file.
        path: String,
        /// Reason for failure.
        reason: String,
    },

    /// Failed to write file.
    #[error("failed to write file: {path}: {reason}")]
    WriteFailed {
        /// Path to the file.
        path: String,
        /// Reason for failure.
        reason: String,
    },

    /// Memory mapping error.
    #[error("memory mapping failed: {path}: {reason}")]
    MmapFailed {
        /// Path to the file.
        path: String,
        /// Reason for failure.
        reason: String,
    },

    /// Directory creation error.
    #[error("failed to create directory: {path}: {reason}")]
    DirectoryFailed {
        /// Path to the directory.
        path: String,
        /// Reason for failure.
        reason: String,
    },

    /// Generic I/O error wrapper.
    #[error("I/O error: {0}")]
    Generic(String),
}

/// CLI command-specific errors.
#[derive(Error, Debug)]
pub enum CommandError {
    /// Invalid argument provided.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Output format error.
    #[error("output format error: {0}")]
    OutputFormat(String),
}

/// Errors from running generated code locally.
#[derive(Error, Debug)]
pub enum ExecError {
    /// Execution was not explicitly allowed.
    #[error("code execution is disabled. Pass --allow-exec to enable it")]
    Disabled,

    /// Language has no runner.
    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),

    /// Interpreter or compiler missing from PATH.
    #[error("{command} is not installed or not found in PATH.\n\nInstallation instructions:\n{hint}")]
    RuntimeNotFound {
        /// Command that was looked up.
        command: String,
        /// Install instructions for the current OS.
        hint: String,
    },

    /// Process could not be started.
    #[error("failed to spawn {command}: {reason}")]
    Spawn {
        /// Command that failed.
        command: String,
        /// Reason for failure.
        reason: String,
    },
}

/// Tool selection and input validation errors.
#[derive(Error, Debug)]
pub enum ToolError {
    /// Unknown tool key.
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    /// Tool requires non-empty input.
    #[error("{tool} requires non-empty input")]
    EmptyInput {
        /// Tool key.
        tool: String,
    },

    /// Repository URL was not a GitHub URL.
    #[error("invalid repository URL: {url} (expected https://github.com/<owner>/<repo>)")]
    InvalidRepositoryUrl {
        /// Rejected URL.
        url: String,
    },

    /// Target language not supported by the transformer.
    #[error("unsupported target language: {0}")]
    UnsupportedTarget(String),
}

impl Error {
    /// Returns the text received before a stream failed, if any was kept.
    #[must_use]
    pub fn partial_text(&self) -> Option<&str> {
        match self {
            Self::PartialStream(partial) => Some(&partial.text),
            _ => None,
        }
    }

    /// Returns the underlying stream error.
    #[must_use]
    pub const fn stream_error(&self) -> Option<&StreamError> {
        match self {
            Self::Stream(error) | Self::PartialStream(PartialResponse { error, .. }) => Some(error),
            _ => None,
        }
    }
}

// Implement From traits for standard library errors

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io(IoError::Generic(err.to_string()))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Command(CommandError::OutputFormat(err.to_string()))
    }
}

#[cfg(feature = "provider")]
impl From<async_openai::error::OpenAIError> for ProviderError {
    fn from(err: async_openai::error::OpenAIError) -> Self {
        Self::Request(err.to_string())
    }
}

#[cfg(feature = "provider")]
impl From<async_openai::error::OpenAIError> for Error {
    fn from(err: async_openai::error::OpenAIError) -> Self {
        Self::Provider(err.into())
    }
}
