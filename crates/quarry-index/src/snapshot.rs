//! Snapshot format for index persistence.
//!
//! A snapshot is one JSON document: a manifest that pins the embedder the
//! vectors came from, followed by the entries in insertion order. Reloading
//! a snapshot restores byte-identical search behavior without re-embedding.

use quarry_core::{Chunk, IndexManifest};
use serde::{Deserialize, Serialize};

/// One persisted index entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotEntry {
    /// Chunk metadata needed to reconstruct results
    pub chunk: Chunk,
    /// The embedding
    pub vector: Vec<f32>,
    /// Insertion sequence number, preserved so tie-breaking stays stable
    /// across a save/load cycle
    pub seq: u64,
}

/// The on-disk snapshot document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// Compatibility metadata
    pub manifest: IndexManifest,
    /// Entries ordered by insertion sequence
    pub entries: Vec<SnapshotEntry>,
}
