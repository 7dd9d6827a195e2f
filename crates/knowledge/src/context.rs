//! Context assembly for the answer prompt.

use crate::types::Chunk;

/// Separator between passages: one blank line.
pub const PASSAGE_SEPARATOR: &str = "\n\n";

/// Concatenate chunk contents in the given order, separated by a blank line.
pub fn assemble(chunks: &[Chunk]) -> String {
    chunks
        .iter()
        .map(|chunk| chunk.content.as_str())
        .collect::<Vec<_>>()
        .join(PASSAGE_SEPARATOR)
}
