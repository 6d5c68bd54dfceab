use super::Chunk;

/// Replace each chunk's context with the concatenation of itself and both neighbors.
///
/// Chunks at either end keep their own text as context. `text` is never modified.
pub fn window(chunks: Vec<Chunk>) -> Vec<Chunk> {
    let count = chunks.len();
    let contexts: Vec<String> = (0..count)
        .map(|index| {
            if index > 0 && index + 1 < count {
                [
                    chunks[index - 1].text.as_str(),
                    chunks[index].text.as_str(),
                    chunks[index + 1].text.as_str(),
                ]
                .concat()
            } else {
                chunks[index].text.clone()
            }
        })
        .collect();

    chunks
        .into_iter()
        .zip(contexts)
        .map(|(chunk, context)| Chunk { context, ..chunk })
        .collect()
}
