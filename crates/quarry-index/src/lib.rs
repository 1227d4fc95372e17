//! Vector storage layer for Quarry.
//!
//! Provides [`MemoryIndex`], an exact in-memory implementation of the
//! [`VectorIndex`](quarry_core::VectorIndex) trait with JSON snapshot
//! persistence.
//!
//! # Example
//!
//! ```rust,ignore
//! use quarry_index::MemoryIndex;
//! use quarry_core::VectorIndex;
//!
//! let index = MemoryIndex::new("all-MiniLM-L6-v2", 384);
//! index.insert(&chunks, &vectors).await?;
//! let hits = index.search(&query_vector, 5).await?;
//! index.persist(&snapshot_path).await?;
//!
//! // Later, without re-embedding:
//! let index = MemoryIndex::load(&snapshot_path, "all-MiniLM-L6-v2", 384).await?;
//! ```

pub mod memory;
pub mod snapshot;

pub use memory::MemoryIndex;
pub use snapshot::{Snapshot, SnapshotEntry};
