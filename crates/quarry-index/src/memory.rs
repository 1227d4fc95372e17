//! In-memory vector index with brute-force cosine search.
//!
//! The index is an exact linear scan: every query computes the cosine
//! distance to every stored vector. That is the right tradeoff for the
//! corpus sizes this engine targets (well under ~100k chunks): recall is
//! exact and there is no build step. An approximate backend can implement
//! the same [`VectorIndex`] trait if a corpus ever outgrows the scan.
//!
//! Concurrency: state lives behind one `tokio::sync::RwLock`. Searches take
//! the read lock and run concurrently; inserts take the write lock, so a
//! search never observes a partially-applied insert.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quarry_core::{Chunk, Hit, IndexError, IndexManifest, IndexStats, VectorIndex, VectorRecord};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::snapshot::{Snapshot, SnapshotEntry};

struct Entry {
    chunk: Chunk,
    vector: Vec<f32>,
    /// Insertion sequence; upserts keep the original value so ranking ties
    /// stay stable.
    seq: u64,
}

struct Inner {
    entries: HashMap<String, Entry>,
    next_seq: u64,
    last_updated: Option<DateTime<Utc>>,
}

/// Exact in-memory cosine index.
pub struct MemoryIndex {
    model_id: String,
    dim: usize,
    inner: RwLock<Inner>,
}

impl MemoryIndex {
    /// Create an empty index for vectors of `dim` dimensions produced by
    /// the named embedding model.
    #[must_use]
    pub fn new(model_id: impl Into<String>, dim: usize) -> Self {
        Self {
            model_id: model_id.into(),
            dim,
            inner: RwLock::new(Inner {
                entries: HashMap::new(),
                next_seq: 0,
                last_updated: None,
            }),
        }
    }

    /// Bulk construction from a chunked, embedded corpus.
    pub async fn build(
        model_id: impl Into<String>,
        dim: usize,
        chunks: &[Chunk],
        vectors: &[VectorRecord],
    ) -> Result<Self, IndexError> {
        let index = Self::new(model_id, dim);
        index.insert(chunks, vectors).await?;
        Ok(index)
    }

    /// Load an index from a snapshot written by [`VectorIndex::persist`].
    ///
    /// The snapshot must have been built with the same embedding model and
    /// vector dimension as the caller is configured for; anything else is
    /// rejected with [`IndexError::Incompatible`] rather than silently
    /// corrupting scores.
    pub async fn load(path: &Path, model_id: &str, dim: usize) -> Result<Self, IndexError> {
        let bytes = tokio::fs::read(path).await?;
        let snapshot: Snapshot = serde_json::from_slice(&bytes)?;

        if !snapshot.manifest.is_compatible(model_id, dim) {
            return Err(IndexError::Incompatible(format!(
                "snapshot was built with model {} (dim {}), configured embedder is {} (dim {})",
                snapshot.manifest.embedding_model_id,
                snapshot.manifest.vector_dim,
                model_id,
                dim
            )));
        }

        let mut entries = HashMap::with_capacity(snapshot.entries.len());
        let mut next_seq = 0u64;
        for entry in snapshot.entries {
            if entry.vector.len() != dim {
                return Err(IndexError::Dimension {
                    expected: dim,
                    got: entry.vector.len(),
                });
            }
            next_seq = next_seq.max(entry.seq + 1);
            entries.insert(
                entry.chunk.chunk_id.clone(),
                Entry {
                    chunk: entry.chunk,
                    vector: entry.vector,
                    seq: entry.seq,
                },
            );
        }

        info!(
            chunks = entries.len(),
            model = model_id,
            "loaded index snapshot from {:?}",
            path
        );

        Ok(Self {
            model_id: model_id.to_string(),
            dim,
            inner: RwLock::new(Inner {
                entries,
                next_seq,
                last_updated: Some(snapshot.manifest.built_at),
            }),
        })
    }

    /// The embedding model this index was built for.
    #[must_use]
    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    /// Vector dimension.
    #[must_use]
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Cosine similarity between two equal-length vectors.
    fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }

        dot / (norm_a * norm_b)
    }
}

#[async_trait]
impl VectorIndex for MemoryIndex {
    async fn insert(&self, chunks: &[Chunk], vectors: &[VectorRecord]) -> Result<(), IndexError> {
        if chunks.len() != vectors.len() {
            return Err(IndexError::Insert(format!(
                "{} chunks paired with {} vectors",
                chunks.len(),
                vectors.len()
            )));
        }

        for (chunk, vector) in chunks.iter().zip(vectors.iter()) {
            if chunk.chunk_id != vector.chunk_id {
                return Err(IndexError::Insert(format!(
                    "chunk {} paired with vector for {}",
                    chunk.chunk_id, vector.chunk_id
                )));
            }
            if vector.vector.len() != self.dim {
                return Err(IndexError::Dimension {
                    expected: self.dim,
                    got: vector.vector.len(),
                });
            }
        }

        let mut inner = self.inner.write().await;
        for (chunk, vector) in chunks.iter().zip(vectors.iter()) {
            let seq = match inner.entries.get(&chunk.chunk_id) {
                Some(existing) => existing.seq,
                None => {
                    let seq = inner.next_seq;
                    inner.next_seq += 1;
                    seq
                }
            };
            inner.entries.insert(
                chunk.chunk_id.clone(),
                Entry {
                    chunk: chunk.clone(),
                    vector: vector.vector.clone(),
                    seq,
                },
            );
        }
        inner.last_updated = Some(Utc::now());

        debug!("upserted {} chunks", chunks.len());
        Ok(())
    }

    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<Hit>, IndexError> {
        let inner = self.inner.read().await;
        if inner.entries.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        if query.len() != self.dim {
            return Err(IndexError::Dimension {
                expected: self.dim,
                got: query.len(),
            });
        }

        let mut scored: Vec<(f32, u64, &str)> = inner
            .entries
            .values()
            .map(|entry| {
                let distance = 1.0 - Self::cosine_similarity(query, &entry.vector);
                (distance, entry.seq, entry.chunk.chunk_id.as_str())
            })
            .collect();

        // Ascending distance; insertion order breaks ties so rankings are
        // reproducible.
        scored.sort_by(|a, b| {
            a.0.partial_cmp(&b.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.1.cmp(&b.1))
        });

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(distance, _, chunk_id)| Hit {
                chunk_id: chunk_id.to_string(),
                distance,
            })
            .collect())
    }

    async fn chunk(&self, chunk_id: &str) -> Result<Option<Chunk>, IndexError> {
        let inner = self.inner.read().await;
        Ok(inner.entries.get(chunk_id).map(|entry| entry.chunk.clone()))
    }

    async fn stats(&self) -> Result<IndexStats, IndexError> {
        let inner = self.inner.read().await;
        let sources: HashSet<&str> = inner
            .entries
            .values()
            .map(|entry| entry.chunk.source_id.as_str())
            .collect();

        Ok(IndexStats {
            chunk_count: inner.entries.len() as u64,
            source_count: sources.len() as u64,
            dim: self.dim,
            last_updated: inner.last_updated,
        })
    }

    async fn persist(&self, path: &Path) -> Result<(), IndexError> {
        let inner = self.inner.read().await;

        let mut entries: Vec<SnapshotEntry> = inner
            .entries
            .values()
            .map(|entry| SnapshotEntry {
                chunk: entry.chunk.clone(),
                vector: entry.vector.clone(),
                seq: entry.seq,
            })
            .collect();
        entries.sort_by_key(|entry| entry.seq);

        let snapshot = Snapshot {
            manifest: IndexManifest {
                embedding_model_id: self.model_id.clone(),
                vector_dim: self.dim,
                chunk_count: entries.len() as u64,
                built_at: Utc::now(),
            },
            entries,
        };

        let bytes = serde_json::to_vec(&snapshot)?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(path, bytes).await?;

        info!(
            chunks = snapshot.manifest.chunk_count,
            "persisted index snapshot to {:?}", path
        );
        Ok(())
    }
}
