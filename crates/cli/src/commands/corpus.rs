//! Corpus loading shared by the commands.

use askpolicy_core::{config::AppConfig, AppResult};
use askpolicy_knowledge::{chunk_documents, load_documents, Chunk, Document, Embedder};
use std::sync::Arc;

/// Load and chunk every document in the configured corpus directory.
pub fn load_corpus(config: &AppConfig) -> AppResult<(Vec<Document>, Vec<Chunk>)> {
    let data_dir = config.data_dir();
    tracing::debug!("Loading corpus from {:?}", data_dir);

    let documents = load_documents(&data_dir, &config.corpus.extensions)?;
    let chunks = chunk_documents(
        &documents,
        config.chunking.chunk_size,
        config.chunking.chunk_overlap,
    )?;

    tracing::info!(
        documents = documents.len(),
        chunks = chunks.len(),
        "Loaded corpus"
    );
    Ok((documents, chunks))
}

/// Embedder for the configured provider; the model loads on first use.
pub fn embedder(config: &AppConfig) -> Arc<Embedder> {
    Arc::new(Embedder::new(config.embedding.clone()))
}
