//! # quarry-embed
//!
//! Embedding generation for Quarry.
//!
//! Embeddings are generated locally with the Candle ML framework; no
//! external API is required once the model is cached.
//!
//! ## Cargo Features
//!
//! - `candle` (default): enables the Candle ML stack for real embeddings
//! - Without `candle`: only [`OfflineEmbedder`] is available
//!
//! ## Model Details
//!
//! | Property | Value |
//! |----------|-------|
//! | Model | `sentence-transformers/all-MiniLM-L6-v2` |
//! | Dimension | 384 |
//! | Max tokens | 512 |
//! | Architecture | BERT, mean pooling |
//!
//! ## Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`CandleEmbedder`] | Local transformer embeddings (requires `candle`) |
//! | [`EmbeddingCache`] | LRU cache keyed by content hash |
//! | [`EmbedderPool`] | Concurrency cap plus bounded retry with backoff |
//! | [`OfflineEmbedder`] | Zero-vector embedder, flagged degraded |

#[cfg(feature = "candle")]
pub mod candle;

#[cfg(feature = "candle")]
pub use candle::CandleEmbedder;

pub mod cache;
pub mod offline;
pub mod pool;

pub use cache::{CacheStats, EmbeddingCache};
pub use offline::OfflineEmbedder;
pub use pool::{EmbedderPool, RetryPolicy};
