//! Streaming-response aggregation and incremental rendering.
//!
//! Data flow: provider stream -> [`decode_chunk`] (shape resolution at the
//! boundary) -> [`ChunkSource`] -> [`StreamAggregator`] -> [`Renderer`].

pub mod aggregator;
pub mod render;
pub mod source;
pub mod wire;

pub use aggregator::{Aggregation, AggregationState, PartialResponse, StreamAggregator, aggregate};
pub use render::{CollectingRenderer, FnRenderer, NullRenderer, Renderer, TerminalRenderer};
pub use source::{ChunkSource, LineSource, SourceItem, from_payloads};
pub use wire::{WireChunk, decode_chunk};
