//! Embedder pool for concurrent embedding with bounded retry.
//!
//! Embedding calls dominate ingestion latency. The pool caps how many
//! batches run against the backend at once and retries failed batches with
//! exponential backoff before surfacing a hard failure, so one flaky call
//! does not sink an entire corpus build.

use quarry_core::{EmbedError, Embedder};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::warn;

/// Bounded retry with exponential backoff for embedding calls.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Attempts after the first failure
    pub max_retries: u32,
    /// Delay before the first retry
    pub base_delay: Duration,
    /// Ceiling for the backoff delay
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Backoff delay before retry number `attempt` (0-indexed).
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Pool wrapping an embedder with a concurrency cap and a retry policy.
pub struct EmbedderPool {
    embedder: Arc<dyn Embedder>,
    semaphore: Semaphore,
    max_concurrent: usize,
    retry: RetryPolicy,
}

impl EmbedderPool {
    /// Create a new pool with the default retry policy.
    pub fn new(embedder: Arc<dyn Embedder>, max_concurrent: usize) -> Self {
        Self::with_retry(embedder, max_concurrent, RetryPolicy::default())
    }

    /// Create a new pool with an explicit retry policy.
    pub fn with_retry(
        embedder: Arc<dyn Embedder>,
        max_concurrent: usize,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            embedder,
            semaphore: Semaphore::new(max_concurrent),
            max_concurrent,
            retry,
        }
    }

    /// Embedding dimension of the wrapped embedder.
    pub fn dimension(&self) -> usize {
        self.embedder.dimension()
    }

    /// Model identifier of the wrapped embedder.
    pub fn model_id(&self) -> &str {
        self.embedder.model_id()
    }

    /// Whether the wrapped embedder produces placeholder vectors.
    pub fn degraded(&self) -> bool {
        self.embedder.degraded()
    }

    /// The wrapped embedder.
    pub fn embedder(&self) -> Arc<dyn Embedder> {
        Arc::clone(&self.embedder)
    }

    /// Embed a batch of texts, one attempt.
    pub async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedError> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|e| EmbedError::Inference(format!("semaphore error: {e}")))?;

        self.embedder.embed(texts).await
    }

    /// Embed a batch, retrying failures per the pool's policy.
    ///
    /// Each attempt holds a concurrency permit only for its own duration, so
    /// a batch waiting out its backoff does not starve other batches.
    pub async fn embed_batch_with_retry(
        &self,
        texts: &[&str],
    ) -> Result<Vec<Vec<f32>>, EmbedError> {
        let mut attempt = 0u32;
        loop {
            match self.embed_batch(texts).await {
                Ok(vectors) => return Ok(vectors),
                Err(err) if attempt < self.retry.max_retries => {
                    let delay = self.retry.delay_for(attempt);
                    warn!(
                        attempt = attempt + 1,
                        max = self.retry.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        "embedding batch failed, retrying: {err}"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Embed a single query.
    pub async fn embed_query(&self, query: &str) -> Result<Vec<f32>, EmbedError> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|e| EmbedError::Inference(format!("semaphore error: {e}")))?;

        self.embedder.embed_query(query).await
    }

    /// Currently available concurrency permits.
    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Concurrency cap.
    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const TEST_DIM: usize = 8;

    /// Deterministic mock embedder.
    struct MockEmbedder {
        dimension: usize,
        calls: AtomicUsize,
    }

    impl MockEmbedder {
        fn new(dimension: usize) -> Self {
            Self {
                dimension,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Embedder for MockEmbedder {
        fn model_id(&self) -> &str {
            "mock-embedder"
        }

        fn dimension(&self) -> usize {
            self.dimension
        }

        async fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(texts
                .iter()
                .map(|text| {
                    (0..self.dimension)
                        .map(|i| ((i + text.len()) as f32 * 0.01).sin())
                        .collect()
                })
                .collect())
        }
    }

    /// Embedder that fails a fixed number of times before succeeding.
    struct FlakyEmbedder {
        dimension: usize,
        failures: AtomicUsize,
    }

    impl FlakyEmbedder {
        fn failing(times: usize) -> Self {
            Self {
                dimension: TEST_DIM,
                failures: AtomicUsize::new(times),
            }
        }
    }

    #[async_trait]
    impl Embedder for FlakyEmbedder {
        fn model_id(&self) -> &str {
            "flaky-embedder"
        }

        fn dimension(&self) -> usize {
            self.dimension
        }

        async fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedError> {
            let remaining = self.failures.load(Ordering::SeqCst);
            if remaining > 0 {
                self.failures.store(remaining - 1, Ordering::SeqCst);
                return Err(EmbedError::Unavailable("transient outage".to_string()));
            }
            Ok(texts.iter().map(|_| vec![0.5; self.dimension]).collect())
        }
    }

    #[tokio::test]
    async fn test_pool_creation() {
        let pool = EmbedderPool::new(Arc::new(MockEmbedder::new(TEST_DIM)), 4);

        assert_eq!(pool.dimension(), TEST_DIM);
        assert_eq!(pool.model_id(), "mock-embedder");
        assert_eq!(pool.max_concurrent(), 4);
        assert_eq!(pool.available_permits(), 4);
        assert!(!pool.degraded());
    }

    #[tokio::test]
    async fn test_embed_batch() {
        let pool = EmbedderPool::new(Arc::new(MockEmbedder::new(TEST_DIM)), 4);

        let results = pool.embed_batch(&["hello", "vector search"]).await.unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].len(), TEST_DIM);
        assert_eq!(results[1].len(), TEST_DIM);
    }

    #[tokio::test]
    async fn test_batch_and_single_agree() {
        let pool = EmbedderPool::new(Arc::new(MockEmbedder::new(TEST_DIM)), 4);

        let alone = pool.embed_batch(&["consistency"]).await.unwrap();
        let batched = pool
            .embed_batch(&["other text", "consistency", "more text"])
            .await
            .unwrap();

        assert_eq!(alone[0], batched[1]);
    }

    #[tokio::test]
    async fn test_retry_recovers_from_transient_failure() {
        let embedder = Arc::new(FlakyEmbedder::failing(2));
        let retry = RetryPolicy {
            max_retries: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(4),
        };
        let pool = EmbedderPool::with_retry(embedder, 2, retry);

        let results = pool.embed_batch_with_retry(&["text"]).await.unwrap();
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn test_retry_gives_up_after_budget() {
        let embedder = Arc::new(FlakyEmbedder::failing(10));
        let retry = RetryPolicy {
            max_retries: 2,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
        };
        let pool = EmbedderPool::with_retry(embedder, 2, retry);

        let err = pool.embed_batch_with_retry(&["text"]).await.unwrap_err();
        assert!(matches!(err, EmbedError::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_permits_are_returned() {
        let pool = Arc::new(EmbedderPool::new(Arc::new(MockEmbedder::new(TEST_DIM)), 2));

        let a = Arc::clone(&pool);
        let b = Arc::clone(&pool);
        let handle_a = tokio::spawn(async move { a.embed_query("one").await });
        let handle_b = tokio::spawn(async move { b.embed_query("two").await });

        handle_a.await.unwrap().unwrap();
        handle_b.await.unwrap().unwrap();

        assert_eq!(pool.available_permits(), 2);
    }

    #[test]
    fn test_backoff_grows_and_caps() {
        let retry = RetryPolicy {
            max_retries: 5,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(1),
        };

        assert_eq!(retry.delay_for(0), Duration::from_millis(100));
        assert_eq!(retry.delay_for(1), Duration::from_millis(200));
        assert_eq!(retry.delay_for(2), Duration::from_millis(400));
        assert_eq!(retry.delay_for(5), Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let pool = EmbedderPool::new(Arc::new(MockEmbedder::new(TEST_DIM)), 4);
        let results = pool.embed_batch(&[]).await.unwrap();
        assert!(results.is_empty());
    }
}
