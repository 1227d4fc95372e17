//! # quarry-core
//!
//! Core types and traits for Quarry, a document retrieval engine that turns
//! heterogeneous text sources into a searchable collection of bounded,
//! overlap-aware fragments.
//!
//! The crate provides the foundational abstractions shared by the rest of
//! the workspace:
//!
//! - **Records and chunks**: [`SourceRecord`], [`Chunk`], [`SegmentConfig`]
//! - **Embedding**: the [`Embedder`] trait and [`VectorRecord`]
//! - **Indexing and search**: the [`VectorIndex`] trait, [`Hit`],
//!   [`SearchResult`], [`IndexManifest`], [`IndexStats`]
//! - **Errors**: [`Error`] and the per-concern error enums
//!
//! ## Architecture
//!
//! The engine is a pipeline over these abstractions:
//!
//! ```text
//! SourceRecord → segmenter → Chunk → Embedder → VectorIndex
//!                                                    ↓
//!                                     query → Hit → SearchResult
//! ```
//!
//! Scores use a single convention everywhere: `1 - cosine similarity`,
//! ascending, 0 = best.
//!
//! ## Related Crates
//!
//! - `quarry-segment`: bounded, overlap-aware text segmentation
//! - `quarry-embed`: embedding backends, cache, and concurrency pool
//! - `quarry-index`: in-memory cosine index with snapshot persistence
//! - `quarry-retrieve`: query → ranked, deduplicated results
//! - `quarry-ingest`: the record → index pipeline

pub mod error;
pub mod traits;
pub mod types;

pub use error::{EmbedError, Error, IndexError, IngestError, Result, SegmentError};
pub use traits::{Embedder, VectorIndex};
pub use types::{
    Attributes, Chunk, Hit, IndexManifest, IndexStats, SearchResult, SegmentConfig, SourceRecord,
    VectorRecord,
};
