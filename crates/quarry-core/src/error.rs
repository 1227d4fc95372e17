//! Error types for Quarry.

use thiserror::Error;

/// Main error type for Quarry operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Segmentation failed
    #[error("segmentation error: {0}")]
    Segment(#[from] SegmentError),

    /// Embedding generation failed
    #[error("embedding error: {0}")]
    Embed(#[from] EmbedError),

    /// Vector index operation failed
    #[error("index error: {0}")]
    Index(#[from] IndexError),

    /// Ingestion pipeline failed
    #[error("ingest error: {0}")]
    Ingest(#[from] IngestError),

    /// I/O error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("config error: {0}")]
    Config(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

/// Segmentation errors.
///
/// The segmenter itself never fails for well-formed input; these cover
/// invalid configuration and records the pipeline skips.
#[derive(Error, Debug)]
pub enum SegmentError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("record {source_id} has no usable text")]
    EmptyText { source_id: String },
}

/// Embedding errors.
#[derive(Error, Debug)]
pub enum EmbedError {
    /// The backing model cannot produce embeddings right now. Callers decide
    /// fallback policy; the embedder never substitutes degenerate data.
    #[error("embedding model unavailable: {0}")]
    Unavailable(String),

    #[error("model loading failed: {0}")]
    ModelLoad(String),

    #[error("inference failed: {0}")]
    Inference(String),
}

/// Vector index errors.
#[derive(Error, Debug)]
pub enum IndexError {
    /// Snapshot was built with a different embedder; requires rebuild.
    #[error("incompatible snapshot: {0}")]
    Incompatible(String),

    #[error("vector dimension mismatch: expected {expected}, got {got}")]
    Dimension { expected: usize, got: usize },

    #[error("insert failed: {0}")]
    Insert(String),

    #[error("query failed: {0}")]
    Query(String),

    #[error("snapshot io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Ingestion errors not covered by the component errors.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("ingest task failed: {0}")]
    Task(String),
}

/// Result type alias for Quarry operations.
pub type Result<T> = std::result::Result<T, Error>;
