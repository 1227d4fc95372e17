//! The ingestion pipeline: records → chunks → embeddings → index.

use quarry_core::{
    Chunk, SegmentConfig, SegmentError, SourceRecord, VectorIndex, VectorRecord,
};
use quarry_embed::EmbedderPool;
use quarry_segment::{chunk_source, normalize};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

/// Configuration for the ingestion pipeline.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Segmentation parameters
    pub segment: SegmentConfig,
    /// Chunks per embedding call
    pub batch_size: usize,
    /// Apply whitespace/punctuation normalization before segmentation
    pub normalize: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            segment: SegmentConfig::default(),
            batch_size: 32,
            normalize: false,
        }
    }
}

/// Progress events emitted while a corpus is ingested.
#[derive(Debug, Clone)]
pub enum IngestUpdate {
    RecordIngested {
        source_id: String,
        chunk_count: u32,
    },
    RecordSkipped {
        source_id: String,
    },
    BatchFailed {
        source_id: String,
        error: String,
    },
}

/// Summary of one ingestion run.
#[derive(Debug, Clone, Default)]
pub struct IngestReport {
    /// Records that contributed at least one chunk attempt
    pub records_ingested: u64,
    /// Records skipped for having no usable text
    pub records_skipped: u64,
    /// Chunks embedded and upserted into the index
    pub chunks_indexed: u64,
    /// Embedding batches that failed after exhausting retries
    pub batches_failed: u64,
}

/// Coordinates segmentation, embedding, and index insertion.
///
/// Embedding batches for one record run concurrently; the pool's semaphore
/// bounds how many reach the backend at once, and each batch retries with
/// backoff before it is recorded as failed. A failed batch never undoes
/// vectors that already made it into the index.
pub struct Ingestor {
    embedder: Arc<EmbedderPool>,
    index: Arc<dyn VectorIndex>,
    config: IngestConfig,
    update_tx: broadcast::Sender<IngestUpdate>,
}

impl Ingestor {
    /// Create an ingestor writing into `index` with vectors from `embedder`.
    pub fn new(
        embedder: Arc<EmbedderPool>,
        index: Arc<dyn VectorIndex>,
        config: IngestConfig,
    ) -> Self {
        let (update_tx, _) = broadcast::channel(256);
        Self {
            embedder,
            index,
            config,
            update_tx,
        }
    }

    /// Subscribe to progress events.
    pub fn subscribe(&self) -> broadcast::Receiver<IngestUpdate> {
        self.update_tx.subscribe()
    }

    /// Ingest a corpus of source records.
    ///
    /// Malformed records (no usable text) are skipped with a warning, never
    /// fatal to the run. Returns an aggregate report; per-batch failures are
    /// inside it rather than in the error channel.
    pub async fn ingest(&self, records: &[SourceRecord]) -> quarry_core::Result<IngestReport> {
        self.config.segment.validate()?;

        if self.embedder.degraded() {
            warn!(
                model = self.embedder.model_id(),
                "ingesting with a degraded embedder; vectors will carry no meaning"
            );
        }

        info!(records = records.len(), "starting ingest");
        let mut report = IngestReport::default();

        for record in records {
            if record.text.trim().is_empty() {
                warn!(
                    "skipping record: {}",
                    SegmentError::EmptyText {
                        source_id: record.source_id.clone(),
                    }
                );
                report.records_skipped += 1;
                let _ = self.update_tx.send(IngestUpdate::RecordSkipped {
                    source_id: record.source_id.clone(),
                });
                continue;
            }

            let chunks = self.segment_record(record);
            if chunks.is_empty() {
                report.records_skipped += 1;
                let _ = self.update_tx.send(IngestUpdate::RecordSkipped {
                    source_id: record.source_id.clone(),
                });
                continue;
            }

            let (indexed, failed) = self.embed_and_insert(&record.source_id, chunks).await?;
            report.records_ingested += 1;
            report.chunks_indexed += u64::from(indexed);
            report.batches_failed += failed;

            let _ = self.update_tx.send(IngestUpdate::RecordIngested {
                source_id: record.source_id.clone(),
                chunk_count: indexed,
            });
        }

        info!(
            ingested = report.records_ingested,
            skipped = report.records_skipped,
            chunks = report.chunks_indexed,
            failed_batches = report.batches_failed,
            "ingest finished"
        );
        Ok(report)
    }

    fn segment_record(&self, record: &SourceRecord) -> Vec<Chunk> {
        if self.config.normalize {
            let cleaned = SourceRecord {
                text: normalize(&record.text),
                source_id: record.source_id.clone(),
                attributes: record.attributes.clone(),
            };
            chunk_source(&cleaned, &self.config.segment)
        } else {
            chunk_source(record, &self.config.segment)
        }
    }

    /// Embed the chunks of one record in concurrent batches and upsert the
    /// survivors. Returns (chunks indexed, batches failed).
    async fn embed_and_insert(
        &self,
        source_id: &str,
        chunks: Vec<Chunk>,
    ) -> quarry_core::Result<(u32, u64)> {
        let batch_size = self.config.batch_size.max(1);
        let mut handles = Vec::new();

        for batch in chunks.chunks(batch_size) {
            let batch: Vec<Chunk> = batch.to_vec();
            let embedder = Arc::clone(&self.embedder);
            let index = Arc::clone(&self.index);

            handles.push(tokio::spawn(async move {
                let texts: Vec<&str> = batch.iter().map(|c| c.text.as_str()).collect();
                let vectors = embedder.embed_batch_with_retry(&texts).await?;

                let records: Vec<VectorRecord> = batch
                    .iter()
                    .zip(vectors.into_iter())
                    .map(|(chunk, vector)| VectorRecord::new(chunk.chunk_id.clone(), vector))
                    .collect();

                index
                    .insert(&batch, &records)
                    .await
                    .map_err(quarry_core::Error::Index)?;
                Ok::<u32, quarry_core::Error>(batch.len() as u32)
            }));
        }

        let mut indexed = 0u32;
        let mut failed = 0u64;
        for handle in handles {
            match handle.await {
                Ok(Ok(count)) => {
                    indexed += count;
                }
                Ok(Err(err)) => {
                    error!(source_id, "embedding batch failed permanently: {err}");
                    failed += 1;
                    let _ = self.update_tx.send(IngestUpdate::BatchFailed {
                        source_id: source_id.to_string(),
                        error: err.to_string(),
                    });
                }
                Err(join_err) => {
                    return Err(quarry_core::Error::Ingest(
                        quarry_core::IngestError::Task(join_err.to_string()),
                    ));
                }
            }
        }

        debug!(source_id, indexed, failed, "record pipeline complete");
        Ok((indexed, failed))
    }
}
