//! Chunk extraction, size-bounded compression, and neighbor windowing.
//!
//! The three stages are pure and total:
//!
//! - [`extract`] walks a parsed [`crate::markdown::Node`] tree and emits one raw chunk per
//!   qualifying node, in reading order.
//! - [`compress`] merges adjacent chunks until the accumulated text exceeds a byte threshold.
//! - [`window`] rewrites each chunk's `context` from its immediate neighbors.
//!
//! Each stage consumes its input and returns a fresh sequence; nothing is mutated in place.

mod compress;
mod extract;
mod window;

pub use compress::compress;
pub use extract::extract;
pub use window::window;

use std::num::NonZeroUsize;

/// Threshold used by the ingestion pipeline when no override is configured.
pub const DEFAULT_CHUNK_MAX_SIZE: NonZeroUsize = match NonZeroUsize::new(300) {
    Some(size) => size,
    None => unreachable!(),
};

/// Fragment of document text destined for embedding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Literal content.
    pub text: String,
    /// Text shown alongside the chunk when it is retrieved.
    pub context: String,
    /// Reserved cross-reference slot; the extractor never sets it.
    pub reference: Option<String>,
}

impl Chunk {
    /// Build a chunk whose context mirrors its text.
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            context: text.clone(),
            text,
            reference: None,
        }
    }
}

/// Run the full pure pipeline over markdown source: parse, extract, compress, window.
pub fn chunk_markdown(source: &str, max_size: NonZeroUsize) -> Vec<Chunk> {
    let tree = crate::markdown::parse(source);
    let raw = extract(&tree);
    let raw_count = raw.len();
    let compressed = compress(raw, max_size);
    tracing::debug!(
        raw = raw_count,
        compressed = compressed.len(),
        max_size = max_size.get(),
        "Chunked markdown document"
    );
    window(compressed)
}
