//! Query execution for Quarry.
//!
//! [`Retriever`] embeds an incoming query, searches the index with a small
//! over-fetch, joins chunk provenance onto each hit, optionally
//! deduplicates by source, and returns results sorted ascending by score
//! (0 = best).

pub mod retriever;

pub use retriever::{RetrieveOptions, Retriever};
