//! Policy corpus, retrieval and answering for AskPolicy.
//!
//! Documents are split into overlapping chunks, embedded into a Passage
//! Index persisted in SQLite, and queried by the retrieval-augmented
//! pipeline. The question history feeds the FAQ clusterer.
//!
//! # Example
//! ```no_run
//! use askpolicy_core::AppConfig;
//! use askpolicy_knowledge::{chunk_documents, load_documents, load_or_build, Embedder, IndexHandle};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::load()?;
//! let docs = load_documents(&config.data_dir(), &config.corpus.extensions)?;
//! let chunks = chunk_documents(&docs, config.chunking.chunk_size, config.chunking.chunk_overlap)?;
//!
//! let embedder = Arc::new(Embedder::new(config.embedding.clone()));
//! let index = load_or_build(&config.index_path(), chunks, embedder).await?;
//! let handle = IndexHandle::new(index);
//!
//! for chunk in handle.query("How many leave days do I get?", 4).await? {
//!     println!("{}: {}", chunk.source_id, chunk.content);
//! }
//! # Ok(())
//! # }
//! ```

pub mod chunker;
pub mod clusterer;
pub mod context;
pub mod embeddings;
pub mod evaluation;
pub mod history;
pub mod index;
pub mod insights;
pub mod loader;
pub mod rag;
pub mod similarity;
pub mod types;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use chunker::{chunk_document, chunk_documents};
pub use clusterer::{greedy_clusters, SimilarityClusterer};
pub use embeddings::{create_provider, Embedder, EmbeddingProvider};
pub use evaluation::{evaluate, rouge_l_f1, sentence_bleu, EvaluationScores};
pub use history::HistoryLog;
pub use index::{load_or_build, rebuild, IndexHandle, IndexStatus, PassageIndex};
pub use insights::{document_stats, faq_insights, frequent_terms};
pub use loader::load_documents;
pub use rag::RagPipeline;
pub use types::{
    AnswerResult, Chunk, Cluster, Document, DocumentStats, HistoryRecord, PipelineStage,
    UNANSWERABLE_RESPONSE,
};
