//! Text chunking with configurable size and overlap.

use crate::types::{Chunk, Document};
use askpolicy_core::{AppError, AppResult};

/// Split a document into overlapping character windows.
///
/// Windows are `chunk_size` characters long and advance by
/// `chunk_size - overlap`, so neighbours share exactly `overlap` characters.
/// The final window may be shorter. Content is not trimmed.
pub fn chunk_document(doc: &Document, chunk_size: usize, overlap: usize) -> AppResult<Vec<Chunk>> {
    if chunk_size == 0 {
        return Err(AppError::InvalidInput(
            "chunk_size must be greater than zero".to_string(),
        ));
    }
    if overlap >= chunk_size {
        return Err(AppError::InvalidInput(format!(
            "chunk overlap ({}) must be smaller than chunk size ({})",
            overlap, chunk_size
        )));
    }

    let chars: Vec<char> = doc.content.chars().collect();
    if chars.is_empty() {
        return Ok(Vec::new());
    }

    let step = chunk_size - overlap;
    let mut chunks = Vec::new();
    let mut start = 0;

    loop {
        let end = (start + chunk_size).min(chars.len());
        chunks.push(Chunk::new(
            chars[start..end].iter().collect::<String>(),
            doc.source_id.clone(),
            chunks.len(),
        ));

        if end == chars.len() {
            break;
        }
        start += step;
    }

    Ok(chunks)
}

/// Chunk every document, preserving document order.
pub fn chunk_documents(docs: &[Document], chunk_size: usize, overlap: usize) -> AppResult<Vec<Chunk>> {
    let mut chunks = Vec::new();
    for doc in docs {
        chunks.extend(chunk_document(doc, chunk_size, overlap)?);
    }

    tracing::debug!(
        "Chunked {} documents into {} chunks (size: {}, overlap: {})",
        docs.len(),
        chunks.len(),
        chunk_size,
        overlap
    );

    Ok(chunks)
}
