//! Joins selected passages into the context handed to the model

use crate::chunking::Chunk;

/// Separator between passages in the assembled context
pub const PASSAGE_SEPARATOR: &str = "\n\n";

/// Join chunk texts in the given order; `None` when there is nothing to join
pub fn assemble(chunks: &[Chunk]) -> Option<String> {
    if chunks.is_empty() {
        return None;
    }

    Some(
        chunks
            .iter()
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join(PASSAGE_SEPARATOR),
    )
}
