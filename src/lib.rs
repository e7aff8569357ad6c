//! # devtools-rs
//!
//! Streaming LLM developer tools.
//!
//! devtools-rs sends developer requests (architecture design, diagram and
//! code generation, code conversion, review, test generation, security
//! audits, repository analysis, RFP answering) to an OpenAI-compatible
//! chat-completion endpoint and turns the response into something usable.
//!
//! ## Features
//!
//! - **Stream aggregation**: Incremental chunks are folded into one buffer
//!   and the full buffer is republished after every fragment
//! - **Post-processing**: Fenced-code extraction, rule-based language
//!   detection and diagram-code sanitising
//! - **Replay**: Recorded SSE/NDJSON transcripts stand in for the endpoint
//! - **Local execution**: Generated code runs only when explicitly allowed
//!
//! ## Example
//!
//! ```
//! use devtools_rs::stream::{CollectingRenderer, LineSource, aggregate};
//!
//! let transcript = "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\
//!                   data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n\
//!                   data: [DONE]\n";
//! let mut renderer = CollectingRenderer::new();
//! let outcome = aggregate(LineSource::new(transcript.as_bytes()), &mut renderer);
//!
//! assert_eq!(outcome.text(), "Hello");
//! assert_eq!(renderer.snapshots, vec!["Hel", "Hello"]);
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
// Note: unsafe is needed for memory-mapped I/O (memmap2)
#![warn(unsafe_code)]

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod io;
pub mod postprocess;
pub mod provider;
pub mod stream;
pub mod tools;

// Re-export commonly used types at crate root
pub use error::{Error, Result};

// Re-export core domain types
pub use core::{ChunkPayload, Fragment, RequestContext, ResponseBuffer};

// Re-export stream types
pub use stream::{
    Aggregation, AggregationState, ChunkSource, LineSource, Renderer, StreamAggregator, aggregate,
};

// Re-export post-processing
pub use postprocess::{Language, detect_language, extract_code, sanitize_diagram_code};

// Re-export provider types
#[cfg(feature = "provider")]
pub use provider::OpenAiProvider;
pub use provider::{ChatProvider, ChatRequest, ReplayProvider, create_provider};

// Re-export tool types
pub use tools::{ExecPolicy, Tool, ToolOutput, run_tool};

// Re-export configuration and CLI types
pub use cli::{Cli, Commands, OutputFormat};
pub use config::ProviderConfig;
