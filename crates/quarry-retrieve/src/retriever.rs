//! Query execution and ranking.

use quarry_core::{Embedder, Error, SearchResult, VectorIndex};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// Options controlling retrieval behavior.
#[derive(Debug, Clone)]
pub struct RetrieveOptions {
    /// Default number of results when the caller does not specify one
    pub k: usize,
    /// Over-fetch factor applied before source deduplication
    pub overfetch: usize,
    /// Return at most one result per source for source-level diversity
    pub dedup_sources: bool,
}

impl Default for RetrieveOptions {
    fn default() -> Self {
        Self {
            k: 3,
            overfetch: 3,
            dedup_sources: false,
        }
    }
}

/// Converts a query into a ranked, deduplicated list of relevant chunks.
///
/// Scores are cosine distances (`1 - similarity`): 0 is an exact match and
/// results come back ascending, best first. The retriever never propagates a
/// raw backend failure; everything surfaces as a typed [`Error`], and an
/// empty index simply produces an empty result list.
pub struct Retriever {
    index: Arc<dyn VectorIndex>,
    embedder: Arc<dyn Embedder>,
    options: RetrieveOptions,
}

impl Retriever {
    /// Create a retriever over an index and the embedder it was built with.
    pub fn new(index: Arc<dyn VectorIndex>, embedder: Arc<dyn Embedder>) -> Self {
        Self::with_options(index, embedder, RetrieveOptions::default())
    }

    /// Create a retriever with explicit options.
    pub fn with_options(
        index: Arc<dyn VectorIndex>,
        embedder: Arc<dyn Embedder>,
        options: RetrieveOptions,
    ) -> Self {
        Self {
            index,
            embedder,
            options,
        }
    }

    /// Retrieve the `k` most relevant chunks for a query.
    ///
    /// `k == 0` yields an empty list. Empty query strings are embedded
    /// as-is; their meaning is up to the model.
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<SearchResult>, Error> {
        if k == 0 {
            return Ok(Vec::new());
        }

        debug!(k, "retrieving for query: {query:?}");

        let embedding = self.embedder.embed_query(query).await?;

        // Over-fetch so deduplication still has k candidates left.
        let fetch = if self.options.dedup_sources {
            k.saturating_mul(self.options.overfetch.max(1))
        } else {
            k
        };

        let hits = self.index.search(&embedding, fetch).await?;
        if hits.is_empty() {
            debug!("no relevant chunks found for query");
            return Ok(Vec::new());
        }

        let mut results = Vec::with_capacity(hits.len());
        let mut seen_sources: HashSet<String> = HashSet::new();

        // Hits arrive sorted ascending with stable ties, so keeping the
        // first occurrence per source keeps the best one.
        for hit in hits {
            let Some(chunk) = self.index.chunk(&hit.chunk_id).await? else {
                warn!("hit {} has no chunk record, skipping", hit.chunk_id);
                continue;
            };

            if self.options.dedup_sources && !seen_sources.insert(chunk.source_id.clone()) {
                continue;
            }

            let mut attributes = chunk.attributes;
            attributes.insert(
                "chunk_index".to_string(),
                serde_json::json!(chunk.sequence_index),
            );
            attributes.insert(
                "chunk_count".to_string(),
                serde_json::json!(chunk.total_in_source),
            );

            results.push(SearchResult {
                content: chunk.text,
                source_id: chunk.source_id,
                attributes,
                score: hit.distance,
            });

            if results.len() == k {
                break;
            }
        }

        debug!("returning {} results", results.len());
        Ok(results)
    }

    /// Retrieve with the configured default `k`.
    pub async fn retrieve_default(&self, query: &str) -> Result<Vec<SearchResult>, Error> {
        self.retrieve(query, self.options.k).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use quarry_core::{Attributes, Chunk, EmbedError, VectorRecord};
    use quarry_index::MemoryIndex;

    const TEST_DIM: usize = 3;

    /// Embedder that maps known phrases onto fixed directions.
    struct DirectionEmbedder;

    #[async_trait]
    impl Embedder for DirectionEmbedder {
        fn model_id(&self) -> &str {
            "direction-embedder"
        }

        fn dimension(&self) -> usize {
            TEST_DIM
        }

        async fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedError> {
            Ok(texts
                .iter()
                .map(|text| match *text {
                    t if t.contains("alpha") => vec![1.0, 0.0, 0.0],
                    t if t.contains("beta") => vec![0.0, 1.0, 0.0],
                    t if t.contains("both") => vec![0.7, 0.7, 0.0],
                    _ => vec![0.0, 0.0, 1.0],
                })
                .collect())
        }
    }

    /// Embedder that always fails.
    struct DownEmbedder;

    #[async_trait]
    impl Embedder for DownEmbedder {
        fn model_id(&self) -> &str {
            "down-embedder"
        }

        fn dimension(&self) -> usize {
            TEST_DIM
        }

        async fn embed(&self, _texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedError> {
            Err(EmbedError::Unavailable("backend offline".to_string()))
        }
    }

    fn chunk(id: &str, source: &str, seq: u32, total: u32, text: &str) -> Chunk {
        let mut attributes = Attributes::new();
        attributes.insert("source_type".to_string(), serde_json::json!("qa"));
        Chunk {
            chunk_id: id.to_string(),
            text: text.to_string(),
            source_id: source.to_string(),
            sequence_index: seq,
            total_in_source: total,
            hard_split: false,
            attributes,
        }
    }

    async fn populated_index() -> Arc<MemoryIndex> {
        let chunks = vec![
            chunk("alpha_chunk0", "alpha", 0, 2, "about alpha, part one"),
            chunk("alpha_chunk1", "alpha", 1, 2, "about alpha, part two"),
            chunk("beta_chunk0", "beta", 0, 1, "about beta"),
            chunk("gamma_chunk0", "gamma", 0, 1, "about something else"),
        ];
        let vectors = vec![
            VectorRecord::new("alpha_chunk0", vec![1.0, 0.0, 0.0]),
            VectorRecord::new("alpha_chunk1", vec![0.95, 0.05, 0.0]),
            VectorRecord::new("beta_chunk0", vec![0.0, 1.0, 0.0]),
            VectorRecord::new("gamma_chunk0", vec![0.0, 0.0, 1.0]),
        ];
        Arc::new(
            MemoryIndex::build("direction-embedder", TEST_DIM, &chunks, &vectors)
                .await
                .unwrap(),
        )
    }

    #[tokio::test]
    async fn test_retrieve_ranks_by_distance() {
        let retriever = Retriever::new(populated_index().await, Arc::new(DirectionEmbedder));

        let results = retriever.retrieve("tell me about alpha", 3).await.unwrap();

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].content, "about alpha, part one");
        assert!(results[0].score.abs() < 1e-6);
        assert_eq!(results[1].content, "about alpha, part two");
        assert!(results[0].score <= results[1].score);
        assert!(results[1].score <= results[2].score);
    }

    #[tokio::test]
    async fn test_retrieve_attaches_provenance() {
        let retriever = Retriever::new(populated_index().await, Arc::new(DirectionEmbedder));

        let results = retriever.retrieve("alpha", 1).await.unwrap();
        let attrs = &results[0].attributes;

        assert_eq!(results[0].source_id, "alpha");
        assert_eq!(attrs.get("source_type").and_then(|v| v.as_str()), Some("qa"));
        assert_eq!(attrs.get("chunk_index").and_then(|v| v.as_u64()), Some(0));
        assert_eq!(attrs.get("chunk_count").and_then(|v| v.as_u64()), Some(2));
    }

    #[tokio::test]
    async fn test_retrieve_k_zero_is_empty() {
        let retriever = Retriever::new(populated_index().await, Arc::new(DirectionEmbedder));
        let results = retriever.retrieve("alpha", 0).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_retrieve_empty_query_does_not_fail() {
        let retriever = Retriever::new(populated_index().await, Arc::new(DirectionEmbedder));
        let results = retriever.retrieve("", 5).await.unwrap();
        assert_eq!(results.len(), 4);
    }

    #[tokio::test]
    async fn test_retrieve_empty_index_is_empty_not_error() {
        let index = Arc::new(MemoryIndex::new("direction-embedder", TEST_DIM));
        let retriever = Retriever::new(index, Arc::new(DirectionEmbedder));

        let results = retriever.retrieve("anything", 5).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_dedup_keeps_best_chunk_per_source() {
        let options = RetrieveOptions {
            k: 3,
            overfetch: 3,
            dedup_sources: true,
        };
        let retriever = Retriever::with_options(
            populated_index().await,
            Arc::new(DirectionEmbedder),
            options,
        );

        let results = retriever.retrieve("alpha", 3).await.unwrap();

        let sources: Vec<&str> = results.iter().map(|r| r.source_id.as_str()).collect();
        assert_eq!(sources.len(), 3);
        assert_eq!(sources[0], "alpha");
        // Each source appears exactly once, best chunk kept.
        let unique: HashSet<&&str> = sources.iter().collect();
        assert_eq!(unique.len(), sources.len());
        assert_eq!(results[0].content, "about alpha, part one");
    }

    #[tokio::test]
    async fn test_without_dedup_sources_repeat() {
        let retriever = Retriever::new(populated_index().await, Arc::new(DirectionEmbedder));

        let results = retriever.retrieve("alpha", 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.source_id == "alpha"));
    }

    #[tokio::test]
    async fn test_truncates_to_k() {
        let retriever = Retriever::new(populated_index().await, Arc::new(DirectionEmbedder));
        let results = retriever.retrieve("both", 2).await.unwrap();
        assert_eq!(results.len(), 2);
    }

    #[tokio::test]
    async fn test_embedder_failure_surfaces_as_typed_error() {
        let retriever = Retriever::new(populated_index().await, Arc::new(DownEmbedder));

        let err = retriever.retrieve("alpha", 3).await.unwrap_err();
        assert!(matches!(err, Error::Embed(EmbedError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_retrieve_default_uses_configured_k() {
        let options = RetrieveOptions {
            k: 2,
            ..RetrieveOptions::default()
        };
        let retriever = Retriever::with_options(
            populated_index().await,
            Arc::new(DirectionEmbedder),
            options,
        );

        let results = retriever.retrieve_default("alpha").await.unwrap();
        assert_eq!(results.len(), 2);
    }
}
