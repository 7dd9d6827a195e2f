//! Error types for AskPolicy.
//!
//! One enum covers the whole taxonomy: caller contract violations, index
//! construction and restore problems, model loading, generation, and the
//! pipeline wrapper that attaches the failing stage to an underlying cause.

use thiserror::Error;

/// Unified error type for AskPolicy.
///
/// All fallible functions return `Result<T, AppError>`.
#[derive(Error, Debug)]
pub enum AppError {
    /// The caller violated an input contract (e.g. an empty question).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The Passage Index was asked to build from zero chunks.
    #[error("Empty corpus: no chunks to index")]
    EmptyCorpus,

    /// A persisted index could not be restored; the caller must rebuild.
    #[error("Corrupt index: {0}")]
    CorruptIndex(String),

    /// An embedding or generation model could not be loaded.
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    /// Both generation backends failed for a query.
    #[error("Generation unavailable: {0}")]
    GenerationUnavailable(String),

    /// A query failed inside the retrieval-augmented pipeline.
    #[error("Pipeline failed at stage {stage}: {source}")]
    Pipeline {
        stage: String,
        #[source]
        source: Box<AppError>,
    },

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// LLM backend errors
    #[error("LLM error: {0}")]
    Llm(String),

    /// Knowledge base and retrieval errors
    #[error("Knowledge error: {0}")]
    Knowledge(String),

    /// Question history store errors
    #[error("History error: {0}")]
    History(String),

    /// Prompt system errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl AppError {
    /// Wrap an error with the name of the pipeline stage it escaped from.
    pub fn at_stage(stage: impl Into<String>, source: AppError) -> Self {
        AppError::Pipeline {
            stage: stage.into(),
            source: Box::new(source),
        }
    }

    /// Stage name if this is a pipeline failure.
    pub fn stage(&self) -> Option<&str> {
        match self {
            AppError::Pipeline { stage, .. } => Some(stage),
            _ => None,
        }
    }

    /// The innermost cause, unwrapping pipeline stage context.
    pub fn root_cause(&self) -> &AppError {
        match self {
            AppError::Pipeline { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
