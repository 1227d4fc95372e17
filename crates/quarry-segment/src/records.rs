//! Mapping source records onto chunk records.

use quarry_core::{Chunk, SegmentConfig, SourceRecord};
use tracing::debug;

use crate::splitter::segment_marked;

/// Segment one source record into chunk records.
///
/// Chunk ids are derived from the source id and position, so re-chunking the
/// same record with the same configuration reproduces identical chunks.
/// A record with empty or whitespace-only text produces no chunks.
#[must_use]
pub fn chunk_source(record: &SourceRecord, config: &SegmentConfig) -> Vec<Chunk> {
    let pieces = segment_marked(&record.text, config.max_chunk_size, config.overlap);
    let total = pieces.len() as u32;
    debug!(
        source_id = %record.source_id,
        chunks = total,
        "segmented source record"
    );

    pieces
        .into_iter()
        .enumerate()
        .map(|(index, piece)| {
            let sequence_index = index as u32;
            Chunk {
                chunk_id: Chunk::id_for(&record.source_id, sequence_index),
                text: piece.text,
                source_id: record.source_id.clone(),
                sequence_index,
                total_in_source: total,
                hard_split: piece.hard_split,
                attributes: record.attributes.clone(),
            }
        })
        .collect()
}
