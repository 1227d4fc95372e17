//! Embedding cache for avoiding redundant computations.
//!
//! Re-ingesting a corpus mostly re-embeds text that has not changed. The
//! cache keys embeddings by a blake3 hash of the content so unchanged chunks
//! skip inference entirely.

use quarry_core::{EmbedError, Embedder};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Maximum number of entries in the cache.
const DEFAULT_CACHE_SIZE: usize = 10_000;

/// A cached embedding entry.
#[derive(Clone)]
struct CacheEntry {
    vector: Vec<f32>,
    /// Access counter for LRU eviction
    access_count: u64,
}

/// Cache statistics.
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    /// Number of cache hits
    pub hits: u64,
    /// Number of cache misses
    pub misses: u64,
    /// Number of entries evicted
    pub evictions: u64,
}

/// LRU embedding cache wrapping another embedder.
pub struct EmbeddingCache {
    embedder: Arc<dyn Embedder>,
    /// content hash -> embedding
    cache: RwLock<HashMap<String, CacheEntry>>,
    max_size: usize,
    access_counter: RwLock<u64>,
    stats: RwLock<CacheStats>,
}

impl EmbeddingCache {
    /// Create a cache with the default capacity.
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self::with_capacity(embedder, DEFAULT_CACHE_SIZE)
    }

    /// Create a cache with an explicit capacity.
    pub fn with_capacity(embedder: Arc<dyn Embedder>, max_size: usize) -> Self {
        Self {
            embedder,
            cache: RwLock::new(HashMap::new()),
            max_size,
            access_counter: RwLock::new(0),
            stats: RwLock::new(CacheStats::default()),
        }
    }

    fn hash_text(text: &str) -> String {
        blake3::hash(text.as_bytes()).to_hex().to_string()
    }

    async fn next_access(&self) -> u64 {
        let mut counter = self.access_counter.write().await;
        *counter += 1;
        *counter
    }

    /// Evict the oldest tenth of entries when the cache is full.
    async fn maybe_evict(&self) {
        let mut cache = self.cache.write().await;
        if cache.len() < self.max_size {
            return;
        }

        let evict_count = (self.max_size / 10).max(1);
        let mut entries: Vec<_> = cache
            .iter()
            .map(|(key, entry)| (key.clone(), entry.access_count))
            .collect();
        entries.sort_by_key(|(_, count)| *count);

        let mut stats = self.stats.write().await;
        for (key, _) in entries.into_iter().take(evict_count) {
            cache.remove(&key);
            stats.evictions += 1;
        }
    }

    /// Current cache statistics.
    pub async fn stats(&self) -> CacheStats {
        self.stats.read().await.clone()
    }
}

#[async_trait::async_trait]
impl Embedder for EmbeddingCache {
    fn model_id(&self) -> &str {
        self.embedder.model_id()
    }

    fn dimension(&self) -> usize {
        self.embedder.dimension()
    }

    fn degraded(&self) -> bool {
        self.embedder.degraded()
    }

    async fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedError> {
        let mut results: Vec<Option<Vec<f32>>> = Vec::with_capacity(texts.len());
        let mut uncached_texts = Vec::new();
        let mut uncached_indices = Vec::new();

        {
            let cache = self.cache.read().await;
            let mut stats = self.stats.write().await;
            for (i, text) in texts.iter().enumerate() {
                let hash = Self::hash_text(text);
                if let Some(entry) = cache.get(&hash) {
                    stats.hits += 1;
                    results.push(Some(entry.vector.clone()));
                } else {
                    stats.misses += 1;
                    uncached_texts.push(*text);
                    uncached_indices.push(i);
                    results.push(None);
                }
            }
        }

        if !uncached_texts.is_empty() {
            debug!("cache miss for {} texts, embedding", uncached_texts.len());

            let fresh = self.embedder.embed(&uncached_texts).await?;

            self.maybe_evict().await;

            let mut cache = self.cache.write().await;
            for ((text, vector), index) in uncached_texts
                .iter()
                .zip(fresh.into_iter())
                .zip(uncached_indices.into_iter())
            {
                let access = self.next_access().await;
                cache.insert(
                    Self::hash_text(text),
                    CacheEntry {
                        vector: vector.clone(),
                        access_count: access,
                    },
                );
                results[index] = Some(vector);
            }
        }

        results
            .into_iter()
            .map(|r| r.ok_or_else(|| EmbedError::Inference("missing embedding result".to_string())))
            .collect()
    }
}
