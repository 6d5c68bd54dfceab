use std::num::NonZeroUsize;

use super::Chunk;

/// Merge adjacent chunks into larger ones bounded by `max_size` bytes.
///
/// Texts are appended to an accumulator in order. The accumulator is flushed as a new chunk as
/// soon as its length exceeds `max_size`, and once more after the last input chunk. A single
/// oversized chunk is flushed on its own and never split, so the concatenated output always
/// equals the concatenated input.
pub fn compress(chunks: Vec<Chunk>, max_size: NonZeroUsize) -> Vec<Chunk> {
    let total = chunks.len();
    let mut compressed = Vec::new();
    let mut accumulator = String::new();

    for (index, chunk) in chunks.into_iter().enumerate() {
        accumulator.push_str(&chunk.text);
        if accumulator.len() > max_size.get() || index + 1 == total {
            compressed.push(Chunk::new(std::mem::take(&mut accumulator)));
        }
    }

    compressed
}
