//! Knowledge system type definitions.

use askpolicy_llm::BackendKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One unit of loaded source material.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Full text content
    pub content: String,

    /// Source identifier (file name)
    pub source_id: String,
}

impl Document {
    pub fn new(content: impl Into<String>, source_id: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            source_id: source_id.into(),
        }
    }
}

/// A contiguous slice of a document; the retrieval unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Slice content, untrimmed
    pub content: String,

    /// Source identifier of the owning document
    pub source_id: String,

    /// Zero-based position within the owning document
    pub position: usize,
}

impl Chunk {
    pub fn new(content: impl Into<String>, source_id: impl Into<String>, position: usize) -> Self {
        Self {
            content: content.into(),
            source_id: source_id.into(),
            position,
        }
    }
}

/// A group of near-duplicate historical questions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cluster {
    /// First-seen phrasing of the question
    pub representative_question: String,

    /// Number of questions merged into this cluster
    pub member_count: usize,
}

/// The answer to one question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerResult {
    pub question: String,

    /// Generated answer, trimmed
    pub answer_text: String,

    /// Supporting passages in retrieval order
    pub source_chunks: Vec<Chunk>,

    /// Which path produced the answer
    pub backend_used: BackendKind,
}

/// Answer shown when a query fails.
pub const UNANSWERABLE_RESPONSE: &str =
    "Sorry, I could not answer this question right now. Please try again later.";

impl AnswerResult {
    /// User-visible result for a failed query.
    pub fn unanswerable(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer_text: UNANSWERABLE_RESPONSE.to_string(),
            source_chunks: Vec::new(),
            backend_used: BackendKind::Policy,
        }
    }

    /// Concatenated source content, used as the evaluation reference.
    pub fn reference_text(&self) -> String {
        self.source_chunks
            .iter()
            .map(|chunk| chunk.content.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Per-query pipeline states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PipelineStage {
    Received,
    Retrieved,
    ContextBuilt,
    Generated,
    Returned,
    Failed,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Received => "RECEIVED",
            Self::Retrieved => "RETRIEVED",
            Self::ContextBuilt => "CONTEXT_BUILT",
            Self::Generated => "GENERATED",
            Self::Returned => "RETURNED",
            Self::Failed => "FAILED",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One logged question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub question: String,

    /// Answer text, when the question was answered
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
}

/// Corpus size summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentStats {
    pub num_documents: usize,
    pub num_chunks: usize,
    pub total_words: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_names() {
        assert_eq!(PipelineStage::ContextBuilt.as_str(), "CONTEXT_BUILT");
        assert_eq!(PipelineStage::Failed.to_string(), "FAILED");
        assert_eq!(
            serde_json::to_string(&PipelineStage::ContextBuilt).unwrap(),
            "\"CONTEXT_BUILT\""
        );
    }

    #[test]
    fn test_unanswerable_result() {
        let result = AnswerResult::unanswerable("How many leave days?");
        assert_eq!(result.question, "How many leave days?");
        assert_eq!(result.answer_text, UNANSWERABLE_RESPONSE);
        assert!(result.source_chunks.is_empty());
        assert_eq!(result.backend_used, BackendKind::Policy);
    }

    #[test]
    fn test_answer_result_serialization() {
        let result = AnswerResult {
            question: "q".to_string(),
            answer_text: "a".to_string(),
            source_chunks: vec![Chunk::new("Leave is 20 days.", "leave.txt", 0)],
            backend_used: BackendKind::Fallback,
        };

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["backend_used"], "fallback");
        assert_eq!(json["source_chunks"][0]["source_id"], "leave.txt");
        assert_eq!(result.reference_text(), "Leave is 20 days.");
    }

    #[test]
    fn test_history_record_omits_missing_answer() {
        let record = HistoryRecord {
            id: 1,
            timestamp: Utc::now(),
            question: "hi".to_string(),
            answer: None,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("answer").is_none());
    }
}
