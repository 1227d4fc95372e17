//! Offline embedder for running without a model.
//!
//! This module provides an [`OfflineEmbedder`] that returns zero-vectors for
//! all inputs. It exists for explicit offline or test operation only: its
//! output carries no meaning, so it reports itself as degraded and callers
//! must never treat its vectors as real embeddings.

use async_trait::async_trait;
use quarry_core::{EmbedError, Embedder};

/// Zero-vector embedder for offline and test operation.
///
/// Always available, no model download, no inference. Downstream code can
/// tell its output apart from real embeddings through
/// [`Embedder::degraded`], which returns `true` here.
pub struct OfflineEmbedder {
    dimension: usize,
}

impl OfflineEmbedder {
    /// Create an offline embedder with the default dimension (384).
    #[must_use]
    pub fn new() -> Self {
        Self { dimension: 384 }
    }

    /// Create an offline embedder with a custom dimension.
    #[must_use]
    pub fn with_dimension(dimension: usize) -> Self {
        Self { dimension }
    }
}

impl Default for OfflineEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Embedder for OfflineEmbedder {
    fn model_id(&self) -> &str {
        "offline"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn degraded(&self) -> bool {
        true
    }

    async fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedError> {
        Ok(texts.iter().map(|_| vec![0.0; self.dimension]).collect())
    }
}
