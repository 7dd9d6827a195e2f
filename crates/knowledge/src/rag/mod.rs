//! Retrieval-augmented question answering.

pub mod pipeline;

pub use pipeline::RagPipeline;
