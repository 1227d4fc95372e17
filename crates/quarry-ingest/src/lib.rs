//! Ingestion pipeline for Quarry.
//!
//! [`Ingestor`] drives a corpus of source records through segmentation,
//! batched concurrent embedding (with bounded retry), and index insertion,
//! emitting [`IngestUpdate`] progress events along the way.
//!
//! # Example
//!
//! ```rust,ignore
//! use quarry_ingest::{IngestConfig, Ingestor};
//!
//! let ingestor = Ingestor::new(pool, index, IngestConfig::default());
//! let mut updates = ingestor.subscribe();
//! let report = ingestor.ingest(&records).await?;
//! println!("indexed {} chunks", report.chunks_indexed);
//! ```

pub mod pipeline;

pub use pipeline::{IngestConfig, IngestReport, IngestUpdate, Ingestor};
