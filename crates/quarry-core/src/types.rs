//! Core types for Quarry.
//!
//! This module contains the shared data structures used across the engine:
//!
//! ## Records and Chunks
//! - [`SourceRecord`]: A unit of raw text produced by an extraction collaborator
//! - [`Chunk`]: A bounded fragment of a source, the unit of indexing
//! - [`SegmentConfig`]: Configuration for segmentation behavior
//!
//! ## Vectors and Search
//! - [`VectorRecord`]: An embedding vector joined to a chunk id
//! - [`Hit`]: A raw nearest-neighbor match from the index
//! - [`SearchResult`]: A ranked match with provenance, returned to callers
//!
//! ## Index State
//! - [`IndexManifest`]: Compatibility metadata persisted with every snapshot
//! - [`IndexStats`]: Aggregate statistics about an index

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Attribute map carried from records through chunks into results.
pub type Attributes = HashMap<String, serde_json::Value>;

// ============================================================================
// Source Records
// ============================================================================

/// A unit of raw text handed to the engine by an extraction collaborator.
///
/// Records are immutable once produced. Everything besides `text` and
/// `source_id` is opaque passthrough metadata. The serde representation
/// accepts `source` as an alias for `source_id` and gathers unknown keys
/// into `attributes`, so corpora exported by upstream scrapers load
/// unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRecord {
    /// Raw text content
    #[serde(default)]
    pub text: String,
    /// Stable identifier of the originating source
    #[serde(alias = "source")]
    pub source_id: String,
    /// Passthrough metadata (source type, page number, ...)
    #[serde(flatten)]
    pub attributes: Attributes,
}

impl SourceRecord {
    /// Create a record with no extra attributes.
    pub fn new(source_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source_id: source_id.into(),
            attributes: Attributes::new(),
        }
    }
}

// ============================================================================
// Chunks
// ============================================================================

/// A bounded fragment of source text, the unit of indexing and retrieval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Deterministic identifier, derived from the source and position
    pub chunk_id: String,
    /// The fragment text
    pub text: String,
    /// Identifier of the originating source
    pub source_id: String,
    /// Position within the source (0-indexed)
    pub sequence_index: u32,
    /// Number of chunks the source produced
    pub total_in_source: u32,
    /// True when a single oversized sentence had to be cut at fixed offsets
    #[serde(default)]
    pub hard_split: bool,
    /// Metadata inherited from the source record
    #[serde(default)]
    pub attributes: Attributes,
}

impl Chunk {
    /// Derive the deterministic chunk id for a source position.
    ///
    /// Re-chunking the same source with the same configuration reproduces
    /// the same ids, which is what makes re-ingestion idempotent.
    #[must_use]
    pub fn id_for(source_id: &str, sequence_index: u32) -> String {
        format!("{source_id}_chunk{sequence_index}")
    }
}

/// Configuration for segmentation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentConfig {
    /// Maximum chunk size in characters
    pub max_chunk_size: usize,
    /// Overlap budget in characters shared between adjacent chunks
    pub overlap: usize,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: 1000,
            overlap: 0,
        }
    }
}

impl SegmentConfig {
    /// Reject configurations the segmenter cannot honor.
    pub fn validate(&self) -> Result<(), crate::error::SegmentError> {
        if self.max_chunk_size == 0 {
            return Err(crate::error::SegmentError::InvalidConfig(
                "max_chunk_size must be greater than zero".to_string(),
            ));
        }
        if self.overlap >= self.max_chunk_size {
            return Err(crate::error::SegmentError::InvalidConfig(format!(
                "overlap ({}) must be smaller than max_chunk_size ({})",
                self.overlap, self.max_chunk_size
            )));
        }
        Ok(())
    }
}

// ============================================================================
// Vectors
// ============================================================================

/// An embedding vector owned by the index once inserted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    /// Chunk this vector embeds
    pub chunk_id: String,
    /// The embedding
    pub vector: Vec<f32>,
    /// Vector dimension; constant across one index instance
    pub dim: usize,
}

impl VectorRecord {
    /// Create a record, deriving `dim` from the vector.
    #[must_use]
    pub fn new(chunk_id: impl Into<String>, vector: Vec<f32>) -> Self {
        let dim = vector.len();
        Self {
            chunk_id: chunk_id.into(),
            vector,
            dim,
        }
    }
}

/// A raw nearest-neighbor match.
///
/// `distance = 1 - cosine similarity`, so 0 is an exact match and results
/// sort ascending. The same scale is used for [`SearchResult::score`]; there
/// is exactly one ranking direction in the system.
#[derive(Debug, Clone, PartialEq)]
pub struct Hit {
    /// Matched chunk id
    pub chunk_id: String,
    /// Cosine distance to the query (lower is better)
    pub distance: f32,
}

// ============================================================================
// Search Results
// ============================================================================

/// A ranked match with provenance, the stable contract toward answer
/// generation collaborators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// Chunk text
    pub content: String,
    /// Identifier of the originating source
    pub source_id: String,
    /// Provenance metadata (source type, page number, chunk position)
    pub attributes: Attributes,
    /// Cosine distance to the query; 0 = identical, 2 = opposite, lower is better
    pub score: f32,
}

// ============================================================================
// Index Metadata
// ============================================================================

/// Compatibility metadata persisted alongside every index snapshot.
///
/// A snapshot is only reloaded when the configured embedder matches the one
/// the snapshot was built with; anything else would silently corrupt scores.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexManifest {
    /// Identifier of the embedding model the vectors came from
    pub embedding_model_id: String,
    /// Vector dimension
    pub vector_dim: usize,
    /// Number of chunks in the snapshot
    pub chunk_count: u64,
    /// When the snapshot was written
    pub built_at: DateTime<Utc>,
}

impl IndexManifest {
    /// Whether a snapshot built with this manifest can serve an embedder.
    #[must_use]
    pub fn is_compatible(&self, model_id: &str, dim: usize) -> bool {
        self.embedding_model_id == model_id && self.vector_dim == dim
    }
}

/// Aggregate statistics about an index.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexStats {
    /// Total chunks stored
    pub chunk_count: u64,
    /// Distinct sources represented
    pub source_count: u64,
    /// Vector dimension (0 while the index is empty and unpinned)
    pub dim: usize,
    /// Last mutation time
    pub last_updated: Option<DateTime<Utc>>,
}
