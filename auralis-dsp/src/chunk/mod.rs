//! Context-padded chunking and equal-power crossfade stitching (§4.4).

pub mod pipeline;
pub mod source;

pub use pipeline::{stitch, ChunkPipeline, ProcessedChunk};
pub use source::{ChunkSource, InMemorySource};
