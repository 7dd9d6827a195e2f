//! Generation backend implementations.

pub mod extractive;
pub mod ollama;

pub use extractive::{is_greeting, ExtractiveClient, ANSWER_CUE, CONTEXT_HEADER, QUESTION_HEADER};
pub use ollama::{OllamaClient, DEFAULT_OLLAMA_URL};
