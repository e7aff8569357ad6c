//! Core domain models for devtools-rs.
//!
//! This module contains the fundamental data structures shared by the
//! stream and tool layers: decoded chunk payloads, fragments, the response
//! buffer and the per-request context. These are pure domain models with
//! no network dependencies.

pub mod buffer;
pub mod context;
pub mod fragment;

pub use buffer::{ResponseBuffer, ResponseMetadata};
pub use context::RequestContext;
pub use fragment::{ChunkPayload, Fragment};
