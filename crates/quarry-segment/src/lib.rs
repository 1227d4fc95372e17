//! Text segmentation for Quarry.
//!
//! Turns raw source text into bounded fragments for indexing:
//!
//! - [`segment`]: the core splitting algorithm (paragraphs → sentences →
//!   fixed offsets, with an optional overlap budget)
//! - [`chunk_source`]: applies [`segment`] to a [`SourceRecord`] and stamps
//!   deterministic chunk ids and positions
//! - [`normalize`]: optional whitespace/punctuation cleanup for noisy
//!   sources
//!
//! [`SourceRecord`]: quarry_core::SourceRecord

pub mod normalize;
pub mod records;
pub mod splitter;

pub use normalize::normalize;
pub use records::chunk_source;
pub use splitter::segment;
