//! Core traits for Quarry components.
//!
//! - [`Embedder`]: map text to fixed-length vectors
//! - [`VectorIndex`]: store vectors joined to chunk metadata and answer
//!   nearest-neighbor queries
//!
//! Both traits are object-safe so backends can be swapped without touching
//! the rest of the system.

use async_trait::async_trait;
use std::path::Path;

use crate::error::{EmbedError, IndexError};
use crate::types::{Chunk, Hit, IndexStats, VectorRecord};

// ============================================================================
// Embedding
// ============================================================================

/// Trait for generating embeddings.
///
/// An embedder is a pure function of its input for a fixed model id:
/// embedding a string alone or as part of a batch yields the same vector,
/// and repeated calls yield identical results.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Opaque model identifier, recorded in index manifests.
    fn model_id(&self) -> &str;

    /// Embedding dimension, fixed per instance.
    fn dimension(&self) -> usize;

    /// True when this embedder produces placeholder vectors (explicit
    /// offline/test operation). Production paths must be able to tell
    /// degraded output apart from real embeddings.
    fn degraded(&self) -> bool {
        false
    }

    /// Embed a batch of texts, one vector per input, in input order.
    async fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedError>;

    /// Embed a single query string.
    ///
    /// Empty queries are permitted; their embedding is model-defined.
    async fn embed_query(&self, query: &str) -> Result<Vec<f32>, EmbedError> {
        let mut vectors = self.embed(&[query]).await?;
        vectors
            .pop()
            .ok_or_else(|| EmbedError::Inference("empty embedding result".to_string()))
    }
}

// ============================================================================
// Vector Index
// ============================================================================

/// Trait for vector storage and nearest-neighbor search.
///
/// The index owns its vectors and the chunk metadata needed to reconstruct
/// results. Writers are exclusive; searches run concurrently and never
/// observe a partially-applied insert.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Insert or replace chunks with their vectors (upsert by chunk id).
    ///
    /// `chunks` and `vectors` are matched by position and must have equal
    /// length. Re-inserting a chunk id replaces the previous entry without
    /// duplicating it.
    async fn insert(&self, chunks: &[Chunk], vectors: &[VectorRecord]) -> Result<(), IndexError>;

    /// Return up to `k` nearest neighbors, ascending by cosine distance.
    ///
    /// Searching an empty index returns an empty vector, never an error.
    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<Hit>, IndexError>;

    /// Look up the chunk metadata for a stored chunk id.
    async fn chunk(&self, chunk_id: &str) -> Result<Option<Chunk>, IndexError>;

    /// Aggregate statistics.
    async fn stats(&self) -> Result<IndexStats, IndexError>;

    /// Write a snapshot that [`VectorIndex::search`] results can be rebuilt
    /// from without re-embedding.
    async fn persist(&self, path: &Path) -> Result<(), IndexError>;
}
